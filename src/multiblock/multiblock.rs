use glam::IVec3;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::multiblock::{MatchContext, StateMatcher};
use crate::world::{BlockState, BlockView, BlockWorld, ResourceId, Rotation, VoxelPos};

/// Kind given to multiblocks whose JSON names no `type`
pub const DEFAULT_KIND: &str = "codex:multiblock";

/// Largest extent along any axis
pub const MAX_DIMENSION: i32 = 256;

/// Largest number of cells in the size box
pub const MAX_VOLUME: usize = 1 << 20;

/// Cell table key. Tuple order gives x, then y, then z iteration.
pub(crate) type CellKey = (i32, i32, i32);

pub(crate) fn cell_key(pos: IVec3) -> CellKey {
    (pos.x, pos.y, pos.z)
}

/// A sized 3D pattern of cell matchers, detectable and placeable under the
/// four horizontal rotations.
///
/// Cells without a matcher are "don't care". Matchers are shared, so a legend
/// symbol used a thousand times is stored once.
#[derive(Debug, Clone)]
pub struct Multiblock {
    pub(crate) id: ResourceId,
    pub(crate) kind: ResourceId,
    pub(crate) size: IVec3,
    /// Occupied cells only; an empty box costs nothing
    pub(crate) cells: BTreeMap<CellKey, Arc<StateMatcher>>,
    /// Legend symbols, filled only for dense-authored multiblocks
    pub(crate) symbols: BTreeMap<CellKey, char>,
    pub(crate) offset: IVec3,
    pub(crate) view_offset: IVec3,
    pub(crate) symmetrical: bool,
}

/// One occupied cell of a simulated placement
#[derive(Debug, Clone)]
pub struct SimulateResult<'a> {
    world_pos: VoxelPos,
    matcher: &'a StateMatcher,
    symbol: Option<char>,
    rotation: Rotation,
}

impl<'a> SimulateResult<'a> {
    /// Final world position this cell is matched or placed at
    pub fn world_position(&self) -> VoxelPos {
        self.world_pos
    }

    pub fn matcher(&self) -> &'a StateMatcher {
        self.matcher
    }

    /// Legend symbol, if the multiblock was authored as a dense pattern
    pub fn symbol(&self) -> Option<char> {
        self.symbol
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Whether the world currently satisfies this cell.
    /// The observed state is turned back into the pattern's own frame first.
    pub fn test(&self, ctx: &MatchContext, world: &dyn BlockView) -> bool {
        let observed = world.get_state(self.world_pos).rotated(self.rotation.inverse());
        self.matcher.matches(ctx, world, self.world_pos, &observed)
    }
}

impl Multiblock {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> &ResourceId {
        &self.kind
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    pub fn view_offset(&self) -> IVec3 {
        self.view_offset
    }

    pub fn is_symmetrical(&self) -> bool {
        self.symmetrical
    }

    pub fn with_id(mut self, id: ResourceId) -> Self {
        self.id = id;
        self
    }

    /// Shift where the pattern sits relative to the anchor.
    /// Affects placement, validation and rendering.
    pub fn with_offset(mut self, offset: IVec3) -> Self {
        self.offset = offset;
        self
    }

    /// Shift only where the pattern renders
    pub fn with_view_offset(mut self, view_offset: IVec3) -> Self {
        self.view_offset = view_offset;
        self
    }

    /// Symmetrical multiblocks are only validated at [`Rotation::None`]
    pub fn with_symmetrical(mut self, symmetrical: bool) -> Self {
        self.symmetrical = symmetrical;
        self
    }

    /// Number of cells that carry a matcher
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, pos: IVec3) -> bool {
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(self.size).all()
    }

    pub fn matcher_at(&self, pos: IVec3) -> Option<&StateMatcher> {
        if !self.contains(pos) {
            return None;
        }
        self.cells.get(&cell_key(pos)).map(|matcher| matcher.as_ref())
    }

    pub fn symbol_at(&self, pos: IVec3) -> Option<char> {
        if !self.contains(pos) {
            return None;
        }
        self.symbols.get(&cell_key(pos)).copied()
    }

    /// Occupied cells in x, then y, then z order
    pub fn cells(&self) -> impl Iterator<Item = (IVec3, &StateMatcher)> + '_ {
        self.cells
            .iter()
            .map(|(&(x, y, z), matcher)| (IVec3::new(x, y, z), matcher.as_ref()))
    }

    /// Where the pattern's local origin lands for an anchor and rotation
    fn origin(&self, anchor: VoxelPos, rotation: Rotation) -> VoxelPos {
        anchor + rotation.rotate(self.offset)
    }

    /// Map every occupied cell to its world position for the given anchor and
    /// rotation. Returns the center (anchor shifted by the rotated offset) and
    /// one result per occupied cell.
    ///
    /// `for_view` additionally applies the unrotated view offset; use it only
    /// for rendering.
    pub fn simulate(
        &self,
        anchor: VoxelPos,
        rotation: Rotation,
        for_view: bool,
    ) -> (VoxelPos, Vec<SimulateResult<'_>>) {
        let center = self.origin(anchor, rotation);
        let base = if for_view { center + self.view_offset } else { center };

        let results = self
            .cells()
            .map(|(pos, matcher)| SimulateResult {
                world_pos: base + rotation.rotate(pos),
                matcher,
                symbol: self.symbol_at(pos),
                rotation,
            })
            .collect();

        (center, results)
    }

    /// Find the first rotation under which the whole pattern is present.
    /// Symmetrical multiblocks only try [`Rotation::None`].
    pub fn validate(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
    ) -> Option<Rotation> {
        let candidates: &[Rotation] = if self.symmetrical {
            &[Rotation::None]
        } else {
            &Rotation::ALL
        };

        candidates
            .iter()
            .copied()
            .find(|&rotation| self.validate_rotation(ctx, world, pos, rotation))
    }

    /// Check a single, known rotation
    pub fn validate_rotation(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
        rotation: Rotation,
    ) -> bool {
        let (_, results) = self.simulate(pos, rotation, false);
        results.iter().all(|result| result.test(ctx, world))
    }

    /// Cells that currently fail under the given rotation
    pub fn mismatches(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
        rotation: Rotation,
    ) -> Vec<SimulateResult<'_>> {
        let (_, results) = self.simulate(pos, rotation, false);
        results.into_iter().filter(|result| !result.test(ctx, world)).collect()
    }

    /// Check a single cell `(x, y, z)` of the pattern.
    ///
    /// `anchor` is treated like in [`simulate`](Self::simulate): the offset is
    /// applied to it. Cells outside the size box never match; empty cells
    /// always do.
    #[allow(clippy::too_many_arguments)]
    pub fn test(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        anchor: VoxelPos,
        x: i32,
        y: i32,
        z: i32,
        rotation: Rotation,
    ) -> bool {
        let pos = IVec3::new(x, y, z);
        if !self.contains(pos) {
            return false;
        }
        let Some(matcher) = self.cells.get(&cell_key(pos)) else {
            return true;
        };

        let world_pos = self.origin(anchor, rotation) + rotation.rotate(pos);
        let observed = world.get_state(world_pos).rotated(rotation.inverse());
        matcher.matches(ctx, world, world_pos, &observed)
    }

    /// Write the pattern into the world. Every non-wildcard cell gets its
    /// matcher's display state at tick 0, turned to face the rotation.
    pub fn place(&self, world: &mut dyn BlockWorld, anchor: VoxelPos, rotation: Rotation) {
        let (_, results) = self.simulate(anchor, rotation, false);
        let mut placed = 0usize;
        for result in results.iter().filter(|result| !result.matcher.is_any()) {
            let state = result.matcher.display_state(0).rotated(rotation);
            world.set_state(result.world_pos, state);
            placed += 1;
        }
        log::debug!("Placed {} blocks of {} at {} ({})", placed, self.id, anchor, rotation);
    }

    /// Ghost blocks for a preview at the given animation tick.
    /// Wildcard and air cells are skipped since there is nothing to draw.
    pub fn preview(
        &self,
        anchor: VoxelPos,
        rotation: Rotation,
        ticks: u64,
    ) -> Vec<(VoxelPos, BlockState)> {
        let (_, results) = self.simulate(anchor, rotation, true);
        results
            .iter()
            .filter(|result| !result.matcher.is_any())
            .map(|result| (result.world_pos, result.matcher.display_state(ticks).rotated(rotation)))
            .filter(|(_, state)| !state.is_air())
            .collect()
    }
}

/// Equality covers identity, geometry and matchers. Legend symbols are
/// documentation only and don't take part.
impl PartialEq for Multiblock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.size == other.size
            && self.offset == other.offset
            && self.view_offset == other.view_offset
            && self.symmetrical == other.symmetrical
            && self.cells == other.cells
    }
}

impl Eq for Multiblock {}
