//! Predicate and tag lookups used by matchers
//!
//! Predicate ids are bound lazily: a matcher only names its predicate, and the
//! [`PredicateResolver`] owned by the current [`MatchContext`] resolves each id
//! once, on first use. Registries are filled during a data load and replaced
//! wholesale on reload, together with a fresh context.

use dashmap::DashMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{LookupError, ParseError};
use crate::world::{BlockState, BlockView, ResourceId, VoxelPos};

/// A registered predicate over one cell: world, position, observed state
pub type BlockPredicate = Arc<dyn Fn(&dyn BlockView, VoxelPos, &BlockState) -> bool + Send + Sync>;

/// Resolves predicate ids to predicate functions
pub trait PredicateLookup: Send + Sync {
    fn resolve(&self, id: &ResourceId) -> Option<BlockPredicate>;
}

/// Answers block-tag membership
pub trait TagLookup: Send + Sync {
    fn is_member(&self, tag: &ResourceId, block: &ResourceId) -> Result<bool, LookupError>;
}

/// Id → predicate table, filled at data-load time
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<ResourceId, BlockPredicate>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the engine's own predicates (`codex:air`, `codex:non_air`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ResourceId::codex("air"), |_, _, state| state.is_air());
        registry.register(ResourceId::codex("non_air"), |_, _, state| !state.is_air());
        registry
    }

    /// Register a predicate, replacing any previous one under the same id
    pub fn register<F>(&mut self, id: ResourceId, predicate: F)
    where
        F: Fn(&dyn BlockView, VoxelPos, &BlockState) -> bool + Send + Sync + 'static,
    {
        if self.predicates.insert(id.clone(), Arc::new(predicate)).is_some() {
            log::warn!("Predicate {} registered twice, keeping the latest", id);
        }
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.predicates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl PredicateLookup for PredicateRegistry {
    fn resolve(&self, id: &ResourceId) -> Option<BlockPredicate> {
        self.predicates.get(id).cloned()
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.predicates.keys().map(ToString::to_string).collect();
        ids.sort();
        f.debug_struct("PredicateRegistry").field("ids", &ids).finish()
    }
}

/// Tag file contents, `{"values": ["minecraft:stone", ...]}`
#[derive(Debug, Deserialize)]
struct TagFile {
    #[serde(default)]
    replace: bool,
    values: Vec<String>,
}

/// Block tag → member blocks
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: HashMap<ResourceId, HashSet<ResourceId>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add members to a tag, creating it if needed
    pub fn extend<I>(&mut self, tag: ResourceId, members: I)
    where
        I: IntoIterator<Item = ResourceId>,
    {
        self.tags.entry(tag).or_default().extend(members);
    }

    /// Merge a tag file. `"replace": true` drops members collected so far.
    pub fn load_json(
        &mut self,
        tag: ResourceId,
        json: &serde_json::Value,
    ) -> Result<(), ParseError> {
        let file = TagFile::deserialize(json)
            .map_err(|e| ParseError::json(tag.to_string(), e.to_string()))?;

        let mut members = HashSet::with_capacity(file.values.len());
        for (i, value) in file.values.iter().enumerate() {
            let id = ResourceId::parse(value).map_err(|e| e.at(format!("{}.values[{}]", tag, i)))?;
            members.insert(id);
        }

        let entry = self.tags.entry(tag).or_default();
        if file.replace {
            entry.clear();
        }
        entry.extend(members);
        Ok(())
    }

    pub fn members(&self, tag: &ResourceId) -> Option<&HashSet<ResourceId>> {
        self.tags.get(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl TagLookup for TagRegistry {
    fn is_member(&self, tag: &ResourceId, block: &ResourceId) -> Result<bool, LookupError> {
        self.tags
            .get(tag)
            .map(|members| members.contains(block))
            .ok_or_else(|| LookupError::Tag(tag.clone()))
    }
}

/// Compute-once cache of predicate bindings for one data generation.
///
/// Both outcomes are cached, so an id that failed to resolve keeps failing
/// until a new resolver is built for the next load.
pub struct PredicateResolver {
    lookup: Arc<dyn PredicateLookup>,
    cache: DashMap<ResourceId, Option<BlockPredicate>>,
}

impl PredicateResolver {
    pub fn new(lookup: Arc<dyn PredicateLookup>) -> Self {
        Self {
            lookup,
            cache: DashMap::new(),
        }
    }

    pub fn resolve(&self, id: &ResourceId) -> Result<BlockPredicate, LookupError> {
        if let Some(cached) = self.cache.get(id) {
            return cached.value().clone().ok_or_else(|| LookupError::Predicate(id.clone()));
        }

        // The entry guard holds the shard lock, so racing callers resolve once
        let resolved = self
            .cache
            .entry(id.clone())
            .or_insert_with(|| {
                let predicate = self.lookup.resolve(id);
                if predicate.is_none() {
                    log::warn!(
                        "Predicate {} is not registered; cells using it will never match",
                        id
                    );
                }
                predicate
            })
            .value()
            .clone();

        resolved.ok_or_else(|| LookupError::Predicate(id.clone()))
    }

    /// Number of ids resolved so far, successful or not
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Everything a matcher may consult besides the world itself
pub struct MatchContext {
    predicates: PredicateResolver,
    tags: Arc<dyn TagLookup>,
}

impl MatchContext {
    pub fn new(predicates: Arc<dyn PredicateLookup>, tags: Arc<dyn TagLookup>) -> Self {
        Self {
            predicates: PredicateResolver::new(predicates),
            tags,
        }
    }

    /// Context with built-in predicates and no tags
    pub fn builtin() -> Self {
        Self::new(Arc::new(PredicateRegistry::with_builtins()), Arc::new(TagRegistry::new()))
    }

    pub fn predicates(&self) -> &PredicateResolver {
        &self.predicates
    }

    pub fn tags(&self) -> &dyn TagLookup {
        self.tags.as_ref()
    }
}

impl Default for MatchContext {
    fn default() -> Self {
        Self::builtin()
    }
}
