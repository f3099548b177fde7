//! Block classification as seen by the landing scan.

/// Coarse block category reported by the host world.
///
/// The scan only needs to know whether an entity can stand inside a block,
/// and whether it can stand on top of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Block {
    Air,
    /// Non-colliding decoration such as grass, flowers, or torches.
    Passable,
    Solid,
    /// Water and similar fluids.
    Liquid,
    /// Damaging blocks: lava, fire, cactus, magma.
    Hazard,
    /// Outside the world's build height.
    Void,
}

impl Block {
    /// Whether an entity's body may occupy this block.
    pub const fn is_clear(self) -> bool {
        matches!(self, Block::Air | Block::Passable)
    }

    /// Whether an entity may stand on top of this block.
    pub const fn is_floor(self) -> bool {
        matches!(self, Block::Solid)
    }
}

/// Vertical build limits of a world: `min_y` inclusive, `max_y` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeightRange {
    pub min_y: i32,
    pub max_y: i32,
}

impl HeightRange {
    pub const fn new(min_y: i32, max_y: i32) -> Self {
        Self { min_y, max_y }
    }

    pub const fn contains(&self, y: i32) -> bool {
        y >= self.min_y && y < self.max_y
    }
}

impl Default for HeightRange {
    fn default() -> Self {
        Self::new(-64, 320)
    }
}
