//! Binding destinations and the textual syntax administrators use for them.
//!
//! Accepted forms:
//! ```text
//! world,x,y,z
//! world,x,y,z,yaw,pitch
//! random
//! random <world>
//! random_radius(point=world,x,y,z radius=N)
//! ```
use std::fmt;

use crate::ids::WorldId;
use crate::location::{CoordinateError, Orientation, SavedLocation, Vec3};

const RANDOM: &str = "random";
const RANDOM_RADIUS: &str = "random_radius(";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DestinationParseError {
    #[error("destination must be in format world,x,y,z[,yaw,pitch] (got {0} parts)")]
    Arity(usize),

    #[error("world name cannot be empty")]
    EmptyWorld,

    #[error("invalid {field} value '{value}'")]
    Number { field: &'static str, value: String },

    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error("random_radius must be written random_radius(point=world,x,y,z radius=N) with N > 0")]
    RandomRadius,
}

/// Where a binding sends its scrolls.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Destination {
    /// A fixed point.
    Fixed(SavedLocation),
    /// The surface of a random column, in `world` or in any loaded world.
    Random {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        world: Option<WorldId>,
    },
    /// The surface of a random column within `radius` blocks of `center`.
    RandomRadius { center: SavedLocation, radius: u32 },
}

impl Destination {
    /// World the destination lies in, when it names one.
    pub fn world(&self) -> Option<&WorldId> {
        match self {
            Destination::Fixed(location) => Some(&location.world),
            Destination::Random { world } => world.as_ref(),
            Destination::RandomRadius { center, .. } => Some(&center.world),
        }
    }

    /// Checks that every coordinate the destination carries is on the grid.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        match self {
            Destination::Fixed(location) => location.validate().map(|_| ()),
            Destination::Random { .. } => Ok(()),
            Destination::RandomRadius { center, .. } => center.validate().map(|_| ()),
        }
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl From<SavedLocation> for Destination {
    fn from(location: SavedLocation) -> Self {
        Destination::Fixed(location)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Fixed(location) => f.write_str(&location.describe()),
            Destination::Random { world: None } => f.write_str("a random spot in any world"),
            Destination::Random { world: Some(world) } => write!(f, "a random spot in {}", world),
            Destination::RandomRadius { center, radius } => {
                write!(f, "a random spot within {} blocks of {}", radius, center.describe())
            }
        }
    }
}

/// Parse an administrator supplied destination string.
pub fn parse_destination(raw: &str) -> Result<Destination, DestinationParseError> {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();

    if lower.starts_with(RANDOM_RADIUS) {
        return parse_random_radius(&raw[RANDOM_RADIUS.len()..]);
    }
    if lower == RANDOM {
        return Ok(Destination::Random { world: None });
    }
    if let Some(world) = lower
        .strip_prefix(RANDOM)
        .filter(|rest| rest.starts_with(char::is_whitespace))
    {
        let world = raw[raw.len() - world.len()..].trim();
        return Ok(Destination::Random {
            world: Some(WorldId::new(world)),
        });
    }
    parse_location(raw).map(Destination::Fixed)
}

fn parse_random_radius(body: &str) -> Result<Destination, DestinationParseError> {
    let body = body
        .trim_end()
        .strip_suffix(')')
        .ok_or(DestinationParseError::RandomRadius)?;

    let mut center = None;
    let mut radius = None;
    for part in body.split_whitespace() {
        match part.split_once('=') {
            Some(("point", value)) if center.is_none() => center = Some(parse_location(value)?),
            Some(("radius", value)) if radius.is_none() => {
                radius = Some(number::<u32>("radius", value)?);
            }
            _ => return Err(DestinationParseError::RandomRadius),
        }
    }

    match (center, radius) {
        (Some(center), Some(radius)) if radius > 0 => Ok(Destination::RandomRadius { center, radius }),
        _ => Err(DestinationParseError::RandomRadius),
    }
}

/// Parse a fixed `world,x,y,z[,yaw,pitch]` point.
///
/// Every coordinate must be finite and fall inside the `i32` block grid.
pub fn parse_location(raw: &str) -> Result<SavedLocation, DestinationParseError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 4 && parts.len() != 6 {
        return Err(DestinationParseError::Arity(parts.len()));
    }

    let world = parts[0];
    if world.is_empty() {
        return Err(DestinationParseError::EmptyWorld);
    }

    let x = number::<f64>("x", parts[1])?;
    let y = number::<f64>("y", parts[2])?;
    let z = number::<f64>("z", parts[3])?;

    let orientation = if parts.len() == 6 {
        Orientation::new(number("yaw", parts[4])?, number("pitch", parts[5])?)
    } else {
        Orientation::default()
    };

    let location = SavedLocation::new(WorldId::new(world), Vec3::new(x, y, z), orientation);
    location.validate()?;
    Ok(location)
}

fn number<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, DestinationParseError> {
    value.parse().map_err(|_| DestinationParseError::Number {
        field,
        value: value.to_owned(),
    })
}
