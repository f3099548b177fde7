//! Vertical landing scan.
//!
//! Given a raw target block, walks a bounded vertical window looking for the
//! first position where the entity footprint is clear and stands on solid
//! floor. The scan is pure: callers hand in a [`BlockView`] over terrain they
//! have already loaded, and any unloaded block aborts the scan instead of
//! being guessed.

use std::collections::BTreeSet;

use crate::block::{Block, HeightRange};
use crate::location::{BlockPos, ChunkPos};

/// Read-only access to loaded terrain.
pub trait BlockView {
    /// Returns `None` when the chunk holding `pos` is not loaded.
    fn block(&self, pos: BlockPos) -> Option<Block>;

    fn height_range(&self) -> HeightRange;
}

/// Ordering policy for candidates above and below the raw coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VerticalPreference {
    /// Try the raw height and everything above it before looking below.
    #[default]
    Above,
    /// Smallest displacement first; on equal displacement the lower one wins.
    Nearest,
}

impl VerticalPreference {
    /// Vertical offsets in the order they are tried.
    pub fn offsets(self, radius: u32) -> Offsets {
        let radius = i64::from(radius.min(i32::MAX as u32));
        Offsets {
            preference: self,
            radius,
            next: 0,
            len: 2 * radius + 1,
        }
    }
}

/// Lazily generated candidate offsets for a [`VerticalPreference`].
#[derive(Clone, Debug)]
pub struct Offsets {
    preference: VerticalPreference,
    radius: i64,
    next: i64,
    len: i64,
}

impl Offsets {
    fn at(&self, index: i64) -> i64 {
        match self.preference {
            VerticalPreference::Above if index <= self.radius => index,
            VerticalPreference::Above => self.radius - index,
            VerticalPreference::Nearest if index == 0 => 0,
            VerticalPreference::Nearest => {
                let distance = (index + 1) / 2;
                if index % 2 == 1 { -distance } else { distance }
            }
        }
    }
}

impl Iterator for Offsets {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.next >= self.len {
            return None;
        }
        let offset = self.at(self.next);
        self.next += 1;
        i32::try_from(offset).ok()
    }

    fn nth(&mut self, n: usize) -> Option<i32> {
        self.next = self
            .next
            .saturating_add(i64::try_from(n).unwrap_or(i64::MAX))
            .min(self.len);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.len - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Space an entity occupies, in whole blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footprint {
    pub height: u32,
    pub width: u32,
}

impl Footprint {
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    fn span(extent: u32) -> i32 {
        i32::try_from(extent).unwrap_or(i32::MAX)
    }

    /// Whether every column of the footprint stays on the block grid.
    pub fn fits(self, anchor: BlockPos) -> bool {
        let reach = Self::span(self.width).saturating_sub(1);
        anchor.x.checked_add(reach).is_some() && anchor.z.checked_add(reach).is_some()
    }

    /// Block columns covered when the entity's anchor is at `anchor`.
    /// Columns past the edge of the grid are left out.
    pub fn columns(self, anchor: BlockPos) -> impl Iterator<Item = (i32, i32)> {
        let width = Self::span(self.width);
        (0..width).flat_map(move |dx| {
            (0..width).filter_map(move |dz| Some((anchor.x.checked_add(dx)?, anchor.z.checked_add(dz)?)))
        })
    }

    /// Every chunk column the footprint touches. Columns span the full build
    /// height, so this covers the whole vertical window.
    pub fn chunks(self, anchor: BlockPos) -> Vec<ChunkPos> {
        let chunks: BTreeSet<ChunkPos> = self
            .columns(anchor)
            .map(|(x, z)| BlockPos::new(x, anchor.y, z).chunk())
            .collect();
        chunks.into_iter().collect()
    }
}

impl Default for Footprint {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

/// Result of a landing scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Landing {
    /// Feet position of the chosen spot.
    Safe(BlockPos),
    /// Every candidate in the window was obstructed or unsupported.
    Unsafe,
    /// The view reported an unloaded chunk.
    Unloaded(ChunkPos),
}

/// Scan parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LandingScan {
    pub radius: u32,
    pub footprint: Footprint,
    pub preference: VerticalPreference,
}

impl LandingScan {
    pub fn find(&self, view: &impl BlockView, raw: BlockPos) -> Landing {
        let range = view.height_range();
        for dy in self.preference.offsets(self.radius) {
            let Some(feet) = raw.checked_offset(0, dy, 0) else {
                continue;
            };
            match self.check(view, range, feet) {
                Ok(true) => return Landing::Safe(feet),
                Ok(false) => continue,
                Err(chunk) => return Landing::Unloaded(chunk),
            }
        }
        Landing::Unsafe
    }

    /// Landing on the highest surface of the column at `x`, `z`.
    ///
    /// Walks down from the top of the build height to the first block that
    /// is not clear. The column is safe only when that block is a floor and
    /// the footprint fits on top of it.
    pub fn surface(&self, view: &impl BlockView, x: i32, z: i32) -> Landing {
        let range = view.height_range();
        for y in (range.min_y..range.max_y).rev() {
            let pos = BlockPos::new(x, y, z);
            let block = match block_at(view, pos) {
                Ok(block) => block,
                Err(chunk) => return Landing::Unloaded(chunk),
            };
            if block.is_clear() {
                continue;
            }
            if !block.is_floor() {
                return Landing::Unsafe;
            }
            let Some(feet) = pos.checked_offset(0, 1, 0) else {
                return Landing::Unsafe;
            };
            return match self.check(view, range, feet) {
                Ok(true) => Landing::Safe(feet),
                Ok(false) => Landing::Unsafe,
                Err(chunk) => Landing::Unloaded(chunk),
            };
        }
        Landing::Unsafe
    }

    /// Whether the footprint standing at `feet` is clear and supported.
    ///
    /// Candidates whose body would leave the build height, or whose floor
    /// would lie below it, are never safe.
    fn check(
        &self,
        view: &impl BlockView,
        range: HeightRange,
        feet: BlockPos,
    ) -> Result<bool, ChunkPos> {
        let height = Footprint::span(self.footprint.height);
        let (Some(floor_y), Some(top_y)) = (feet.y.checked_sub(1), feet.y.checked_add(height - 1))
        else {
            return Ok(false);
        };
        if !range.contains(floor_y) || !range.contains(top_y) || !self.footprint.fits(feet) {
            return Ok(false);
        }

        for (x, z) in self.footprint.columns(feet) {
            let floor = BlockPos::new(x, floor_y, z);
            if !block_at(view, floor)?.is_floor() {
                return Ok(false);
            }
            for dy in 0..height {
                let body = BlockPos::new(x, feet.y + dy, z);
                if !block_at(view, body)?.is_clear() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

fn block_at(view: &impl BlockView, pos: BlockPos) -> Result<Block, ChunkPos> {
    view.block(pos).ok_or(pos.chunk())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Column world: everything is air unless set, floor below `min_y` is void.
    struct Column {
        blocks: HashMap<BlockPos, Block>,
        unloaded: Option<ChunkPos>,
    }

    impl Column {
        fn new() -> Self {
            Self {
                blocks: HashMap::new(),
                unloaded: None,
            }
        }

        fn set(mut self, y: i32, block: Block) -> Self {
            self.blocks.insert(BlockPos::new(0, y, 0), block);
            self
        }

        fn fill(mut self, ys: std::ops::RangeInclusive<i32>, block: Block) -> Self {
            for y in ys {
                self.blocks.insert(BlockPos::new(0, y, 0), block);
            }
            self
        }
    }

    impl BlockView for Column {
        fn block(&self, pos: BlockPos) -> Option<Block> {
            if self.unloaded == Some(pos.chunk()) {
                return None;
            }
            Some(self.blocks.get(&pos).copied().unwrap_or(Block::Air))
        }

        fn height_range(&self) -> HeightRange {
            HeightRange::new(0, 256)
        }
    }

    fn scan(preference: VerticalPreference) -> LandingScan {
        LandingScan {
            radius: 8,
            footprint: Footprint::default(),
            preference,
        }
    }

    #[test]
    fn keeps_raw_position_when_safe() {
        let world = Column::new().set(63, Block::Solid);
        let raw = BlockPos::new(0, 64, 0);
        assert_eq!(scan(VerticalPreference::Above).find(&world, raw), Landing::Safe(raw));
    }

    #[test]
    fn climbs_out_of_solid_matter() {
        // Buried at 64: stone up to 66, floor top at 66 so feet land at 67.
        let world = Column::new().fill(60..=66, Block::Solid);
        let raw = BlockPos::new(0, 64, 0);
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, raw),
            Landing::Safe(BlockPos::new(0, 67, 0))
        );
    }

    #[test]
    fn above_preference_beats_closer_spot_below() {
        // Safe at 63 (one below) and at 67 (three above).
        let world = Column::new()
            .set(62, Block::Solid)
            .set(65, Block::Solid)
            .set(66, Block::Solid);
        let raw = BlockPos::new(0, 64, 0);
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, raw),
            Landing::Safe(BlockPos::new(0, 67, 0))
        );
        assert_eq!(
            scan(VerticalPreference::Nearest).find(&world, raw),
            Landing::Safe(BlockPos::new(0, 63, 0))
        );
    }

    #[test]
    fn nearest_prefers_lower_on_equal_displacement() {
        // Safe at 62 and 66, both two blocks away from the raw height.
        let world = Column::new()
            .set(61, Block::Solid)
            .set(65, Block::Solid);
        let raw = BlockPos::new(0, 64, 0);
        assert_eq!(
            scan(VerticalPreference::Nearest).find(&world, raw),
            Landing::Safe(BlockPos::new(0, 62, 0))
        );
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, raw),
            Landing::Safe(BlockPos::new(0, 66, 0))
        );
    }

    #[test]
    fn refuses_hazard_and_liquid_floors() {
        let world = Column::new()
            .set(63, Block::Hazard)
            .set(58, Block::Liquid);
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, BlockPos::new(0, 64, 0)),
            Landing::Unsafe
        );
    }

    #[test]
    fn fully_obstructed_window_is_unsafe() {
        let world = Column::new().fill(50..=80, Block::Solid);
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, BlockPos::new(0, 64, 0)),
            Landing::Unsafe
        );
    }

    #[test]
    fn floor_below_build_height_is_void() {
        let world = Column::new();
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, BlockPos::new(0, 0, 0)),
            Landing::Unsafe
        );
    }

    #[test]
    fn reports_unloaded_chunk() {
        let mut world = Column::new().set(63, Block::Solid);
        world.unloaded = Some(ChunkPos::new(0, 0));
        assert_eq!(
            scan(VerticalPreference::Above).find(&world, BlockPos::new(0, 64, 0)),
            Landing::Unloaded(ChunkPos::new(0, 0))
        );
    }

    #[test]
    fn wide_footprint_spans_chunks() {
        let footprint = Footprint::new(2, 2);
        let chunks = footprint.chunks(BlockPos::new(15, 64, 15));
        assert_eq!(
            chunks,
            vec![
                ChunkPos::new(0, 0),
                ChunkPos::new(0, 1),
                ChunkPos::new(1, 0),
                ChunkPos::new(1, 1),
            ]
        );
    }

    #[test]
    fn offsets_follow_policy() {
        let above: Vec<i32> = VerticalPreference::Above.offsets(2).collect();
        let nearest: Vec<i32> = VerticalPreference::Nearest.offsets(2).collect();
        assert_eq!(above, vec![0, 1, 2, -1, -2]);
        assert_eq!(nearest, vec![0, -1, 1, -2, 2]);
    }

    #[test]
    fn huge_radius_is_generated_lazily() {
        let mut offsets = VerticalPreference::Nearest.offsets(u32::MAX);
        assert_eq!(offsets.size_hint().0 as u64, 2 * i32::MAX as u64 + 1);
        assert_eq!(offsets.nth(4), Some(2));

        let last = VerticalPreference::Above.offsets(u32::MAX).nth(2 * i32::MAX as usize);
        assert_eq!(last, Some(-i32::MAX));
    }

    #[test]
    fn raw_height_at_the_grid_edge_does_not_overflow() {
        let world = Column::new();
        for y in [i32::MAX, i32::MIN] {
            assert_eq!(
                scan(VerticalPreference::Nearest).find(&world, BlockPos::new(0, y, 0)),
                Landing::Unsafe
            );
        }
        let wide = LandingScan {
            footprint: Footprint::new(2, 3),
            ..scan(VerticalPreference::Above)
        };
        assert_eq!(wide.find(&world, BlockPos::new(i32::MAX, 64, 0)), Landing::Unsafe);
        assert!(!Footprint::new(2, 3).fits(BlockPos::new(i32::MAX - 1, 64, 0)));
        assert!(Footprint::new(2, 3).fits(BlockPos::new(i32::MAX - 2, 64, 0)));
    }

    #[test]
    fn surface_lands_on_the_highest_floor() {
        let world = Column::new().fill(0..=40, Block::Solid).set(70, Block::Solid);
        assert_eq!(
            scan(VerticalPreference::Above).surface(&world, 0, 0),
            Landing::Safe(BlockPos::new(0, 71, 0))
        );

        let lake = Column::new().fill(0..=40, Block::Solid).set(41, Block::Liquid);
        assert_eq!(scan(VerticalPreference::Above).surface(&lake, 0, 0), Landing::Unsafe);

        let empty = Column::new();
        assert_eq!(scan(VerticalPreference::Above).surface(&empty, 0, 0), Landing::Unsafe);
    }
}
