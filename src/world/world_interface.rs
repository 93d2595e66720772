use crate::world::{BlockState, VoxelPos};
use std::collections::HashMap;

/// Read access to world block states.
/// Multiblock matching only ever reads through this trait.
pub trait BlockView {
    /// Get the block state at the given position; unset positions are air
    fn get_state(&self, pos: VoxelPos) -> BlockState;
}

/// Write access, needed for placing structures
pub trait BlockWorld: BlockView {
    /// Set the block state at the given position
    fn set_state(&mut self, pos: VoxelPos, state: BlockState);
}

/// Hash-map backed world used for dry runs, self checks and tests
#[derive(Debug, Clone, Default)]
pub struct SparseWorld {
    blocks: HashMap<VoxelPos, BlockState>,
}

impl SparseWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-air blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VoxelPos, &BlockState)> {
        self.blocks.iter()
    }
}

impl BlockView for SparseWorld {
    fn get_state(&self, pos: VoxelPos) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or_else(BlockState::air)
    }
}

impl BlockWorld for SparseWorld {
    fn set_state(&mut self, pos: VoxelPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }
}
