use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{CodexError, CodexResult};
use crate::multiblock::{MatchContext, Multiblock};
use crate::world::{BlockView, ResourceId, Rotation, VoxelPos};

/// Registry that stores every loaded multiblock, keyed by id
#[derive(Debug, Clone, Default)]
pub struct MultiblockRegistry {
    multiblocks: BTreeMap<ResourceId, Arc<Multiblock>>,
}

impl MultiblockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a multiblock under its own id
    pub fn register(&mut self, multiblock: Multiblock) -> CodexResult<Arc<Multiblock>> {
        if self.multiblocks.contains_key(multiblock.id()) {
            return Err(CodexError::DuplicateId(multiblock.id().clone()));
        }
        let multiblock = Arc::new(multiblock);
        self.multiblocks.insert(multiblock.id().clone(), Arc::clone(&multiblock));
        Ok(multiblock)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Arc<Multiblock>> {
        self.multiblocks.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.multiblocks.contains_key(id)
    }

    /// All multiblocks in id order
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Arc<Multiblock>)> {
        self.multiblocks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.multiblocks.keys()
    }

    pub fn len(&self) -> usize {
        self.multiblocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multiblocks.is_empty()
    }

    /// First multiblock (in id order) that is complete with its anchor at `pos`
    pub fn detect(
        &self,
        ctx: &MatchContext,
        world: &dyn BlockView,
        pos: VoxelPos,
    ) -> Option<(&Arc<Multiblock>, Rotation)> {
        self.multiblocks.values().find_map(|multiblock| {
            multiblock
                .validate(ctx, world, pos)
                .map(|rotation| (multiblock, rotation))
        })
    }
}

impl FromIterator<Multiblock> for MultiblockRegistry {
    /// Later duplicates are dropped with a warning
    fn from_iter<I: IntoIterator<Item = Multiblock>>(iter: I) -> Self {
        let mut registry = Self::new();
        for multiblock in iter {
            if let Err(e) = registry.register(multiblock) {
                log::warn!("Skipping multiblock: {}", e);
            }
        }
        registry
    }
}
