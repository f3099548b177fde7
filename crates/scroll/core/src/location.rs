//! World coordinates: block grid, chunk columns, and saved locations.
use std::fmt;

use crate::ids::WorldId;

/// Edge length of a chunk column in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// Integer block coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Shifted block, or `None` when any axis leaves the `i32` grid.
    pub const fn checked_offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        match (
            self.x.checked_add(dx),
            self.y.checked_add(dy),
            self.z.checked_add(dz),
        ) {
            (Some(x), Some(y), Some(z)) => Some(Self::new(x, y, z)),
            _ => None,
        }
    }

    /// Chunk column containing this block.
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_SIZE),
            z: self.z.div_euclid(CHUNK_SIZE),
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

/// Chunk column coordinate (16×16 blocks, full build height).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk({}, {})", self.x, self.z)
    }
}

/// A coordinate that has no block on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("{axis} is not a finite number")]
    NonFinite { axis: &'static str },

    #[error("{axis} lies outside the block grid")]
    OutOfRange { axis: &'static str },
}

/// Continuous position inside a world.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Block containing this point.
    pub fn block(self) -> Result<BlockPos, CoordinateError> {
        Ok(BlockPos::new(
            grid("x", self.x)?,
            grid("y", self.y)?,
            grid("z", self.z)?,
        ))
    }
}

fn grid(axis: &'static str, value: f64) -> Result<i32, CoordinateError> {
    if !value.is_finite() {
        return Err(CoordinateError::NonFinite { axis });
    }
    let floored = value.floor();
    if floored < f64::from(i32::MIN) || floored > f64::from(i32::MAX) {
        return Err(CoordinateError::OutOfRange { axis });
    }
    Ok(floored as i32)
}

/// Facing of an entity in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orientation {
    pub const fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }
}

/// A named world coordinate owned by the location registry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavedLocation {
    pub world: WorldId,
    pub position: Vec3,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: Orientation,
}

impl SavedLocation {
    pub fn new(world: WorldId, position: Vec3, orientation: Orientation) -> Self {
        Self {
            world,
            position,
            orientation,
        }
    }

    /// Location at the given block coordinates facing the default direction.
    pub fn at_block(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self::new(
            world,
            Vec3::new(f64::from(x), f64::from(y), f64::from(z)),
            Orientation::default(),
        )
    }

    pub fn block(&self) -> Result<BlockPos, CoordinateError> {
        self.position.block()
    }

    /// Checks that the location can be stored and later teleported to.
    pub fn validate(&self) -> Result<BlockPos, CoordinateError> {
        let block = self.block()?;
        for (axis, angle) in [("yaw", self.orientation.yaw), ("pitch", self.orientation.pitch)] {
            if !angle.is_finite() {
                return Err(CoordinateError::NonFinite { axis });
            }
        }
        Ok(block)
    }

    /// Human readable form used in item lore and chat messages.
    pub fn describe(&self) -> String {
        match self.block() {
            Ok(block) => format!("{} in {}", block, self.world),
            Err(_) => format!(
                "{}, {}, {} in {}",
                self.position.x, self.position.y, self.position.z, self.world
            ),
        }
    }
}

/// A landing spot verified against loaded terrain.
#[derive(Clone, Debug, PartialEq)]
pub struct SafeLocation {
    pub world: WorldId,
    /// Block the entity's feet occupy.
    pub feet: BlockPos,
    /// Block-centred landing point.
    pub position: Vec3,
    pub orientation: Orientation,
}

impl SafeLocation {
    pub fn new(world: WorldId, feet: BlockPos, orientation: Orientation) -> Self {
        let position = Vec3::new(
            f64::from(feet.x) + 0.5,
            f64::from(feet.y),
            f64::from(feet.z) + 0.5,
        );
        Self {
            world,
            feet,
            position,
            orientation,
        }
    }
}
