//! Load, reload and sync lifecycle for multiblock data
//!
//! Every load builds a brand new registry, tag table and [`MatchContext`],
//! then swaps them in together. Readers holding the previous snapshot keep
//! using it; nothing is ever patched in place.

use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CodexConfig;
use crate::data::LoadErrors;
use crate::error::{io_error, CodexError, CodexResult, ParseError};
use crate::multiblock::{
    self, MatchContext, Multiblock, MultiblockRegistry, PredicateRegistry, TagRegistry,
};
use crate::network::SyncMultiblocksMessage;
use crate::world::{ResourceId, Rotation, SparseWorld, VoxelPos};

const MULTIBLOCK_DIR: &str = "multiblocks";
const BLOCK_TAG_DIR: &str = "tags/blocks";

/// One data generation
struct Snapshot {
    registry: Arc<MultiblockRegistry>,
    tags: Arc<TagRegistry>,
    context: Arc<MatchContext>,
    errors: Arc<LoadErrors>,
    loaded: bool,
}

/// Owns the live multiblock registry and replaces it on every load or sync
pub struct MultiblockDataManager {
    predicates: Arc<PredicateRegistry>,
    self_check: bool,
    snapshot: RwLock<Snapshot>,
}

impl MultiblockDataManager {
    /// `predicates` are registered by code and survive reloads
    pub fn new(predicates: PredicateRegistry) -> Self {
        let predicates = Arc::new(predicates);
        let tags = Arc::new(TagRegistry::new());
        let context = Arc::new(MatchContext::new(predicates.clone(), tags.clone()));
        Self {
            predicates,
            self_check: false,
            snapshot: RwLock::new(Snapshot {
                registry: Arc::new(MultiblockRegistry::new()),
                tags,
                context,
                errors: Arc::new(LoadErrors::new()),
                loaded: false,
            }),
        }
    }

    pub fn from_config(config: &CodexConfig, predicates: PredicateRegistry) -> Self {
        Self::new(predicates).with_self_check(config.self_check)
    }

    pub fn with_self_check(mut self, self_check: bool) -> Self {
        self.self_check = self_check;
        self
    }

    /// Mark the data as unloaded ahead of a reload. The previous registry
    /// stays readable until the load replaces it.
    pub fn pre_load(&self) {
        let mut snapshot = self.snapshot.write();
        snapshot.loaded = false;
        snapshot.errors = Arc::new(LoadErrors::new());
    }

    /// Build a new generation from in-memory `(id, json)` sources.
    /// Broken structures are recorded and left out; the rest load.
    pub fn load_sources<I>(&self, tags: TagRegistry, sources: I) -> Arc<LoadErrors>
    where
        I: IntoIterator<Item = (ResourceId, Value)>,
    {
        self.build_generation(tags, sources, LoadErrors::new())
    }

    /// Load every `<namespace>/multiblocks/**.json` and
    /// `<namespace>/tags/blocks/**.json` under `dir`
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> CodexResult<Arc<LoadErrors>> {
        let dir = dir.as_ref();
        log::info!("Loading multiblock data from {}", dir.display());

        let mut errors = LoadErrors::new();
        let mut tags = TagRegistry::new();
        let mut sources = Vec::new();

        for namespace_dir in sorted_entries(dir)? {
            if !namespace_dir.is_dir() {
                continue;
            }
            let Some(namespace) = namespace_dir.file_name().and_then(|name| name.to_str()) else {
                log::warn!("Skipping non-UTF-8 namespace directory {}", namespace_dir.display());
                continue;
            };

            let tag_root = namespace_dir.join(BLOCK_TAG_DIR);
            for (id, json) in read_json_tree(namespace, &tag_root, &mut errors)? {
                if let Err(e) = tags.load_json(id.clone(), &json) {
                    errors.record(format!("tag {}", id), e);
                }
            }

            let multiblock_root = namespace_dir.join(MULTIBLOCK_DIR);
            sources.extend(read_json_tree(namespace, &multiblock_root, &mut errors)?);
        }

        Ok(self.build_generation(tags, sources, errors))
    }

    fn build_generation<I>(
        &self,
        tags: TagRegistry,
        sources: I,
        mut errors: LoadErrors,
    ) -> Arc<LoadErrors>
    where
        I: IntoIterator<Item = (ResourceId, Value)>,
    {
        let mut registry = MultiblockRegistry::new();
        for (id, json) in sources {
            let key = id.to_string();
            match multiblock::from_json(id, &json) {
                Ok(multiblock) => {
                    if let Err(e) = registry.register(multiblock) {
                        errors.record(key, e);
                    }
                }
                Err(e) => errors.record(key, e),
            }
        }

        let tags = Arc::new(tags);
        let context = Arc::new(MatchContext::new(self.predicates.clone(), tags.clone()));
        if self.self_check {
            run_self_check(&registry, &context);
        }

        log::info!(
            "Loaded {} multiblocks and {} block tags ({} failed)",
            registry.len(),
            tags.len(),
            errors.len()
        );

        let errors = Arc::new(errors);
        *self.snapshot.write() = Snapshot {
            registry: Arc::new(registry),
            tags,
            context,
            errors: errors.clone(),
            loaded: true,
        };
        errors
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().loaded
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<MultiblockRegistry> {
        self.snapshot.read().registry.clone()
    }

    /// Match context for the current generation
    pub fn context(&self) -> Arc<MatchContext> {
        self.snapshot.read().context.clone()
    }

    /// Errors from the most recent load
    pub fn errors(&self) -> Arc<LoadErrors> {
        self.snapshot.read().errors.clone()
    }

    pub fn get(&self, id: &ResourceId) -> Option<Arc<Multiblock>> {
        self.snapshot.read().registry.get(id).cloned()
    }

    /// Message carrying the whole registry to clients
    pub fn sync_message(&self) -> SyncMultiblocksMessage {
        SyncMultiblocksMessage::from_registry(&self.registry())
    }

    /// Client side: decode a sync message and replace the registry with it.
    /// On error the current registry is kept and the caller should ask for a
    /// fresh sync.
    pub fn on_sync(&self, bytes: &[u8]) -> CodexResult<usize> {
        let message = SyncMultiblocksMessage::from_bytes(bytes)?;
        Ok(self.apply_sync(message))
    }

    pub fn apply_sync(&self, message: SyncMultiblocksMessage) -> usize {
        let registry = message.into_registry();
        let count = registry.len();

        let mut snapshot = self.snapshot.write();
        snapshot.context = Arc::new(MatchContext::new(
            self.predicates.clone(),
            snapshot.tags.clone(),
        ));
        snapshot.registry = Arc::new(registry);
        snapshot.errors = Arc::new(LoadErrors::new());
        snapshot.loaded = true;

        log::info!("Replaced multiblock registry from sync: {} multiblocks", count);
        count
    }
}

/// Rotations at which `multiblock`, placed into an empty world, fails to
/// validate. Cells whose display state does not satisfy their own matcher
/// show up here.
pub fn self_check(multiblock: &Multiblock, ctx: &MatchContext) -> Vec<Rotation> {
    let mut world = SparseWorld::new();
    Rotation::ALL
        .into_iter()
        .filter(|&rotation| {
            world.clear();
            multiblock.place(&mut world, VoxelPos::ORIGIN, rotation);
            !multiblock.validate_rotation(ctx, &world, VoxelPos::ORIGIN, rotation)
        })
        .collect()
}

fn run_self_check(registry: &MultiblockRegistry, ctx: &MatchContext) {
    let mut failures = 0;
    for (id, multiblock) in registry.iter() {
        let failed = self_check(multiblock, ctx);
        if !failed.is_empty() {
            failures += 1;
            log::warn!("Self check: {} does not validate after placement at {:?}", id, failed);
        }
    }
    log::info!("Self check finished: {} of {} multiblocks failed", failures, registry.len());
}

fn sorted_entries(dir: &Path) -> CodexResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| io_error(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Every `.json` file under `root`, keyed `namespace:relative/path`.
/// Unreadable or unparsable files are recorded and skipped.
fn read_json_tree(
    namespace: &str,
    root: &Path,
    errors: &mut LoadErrors,
) -> CodexResult<Vec<(ResourceId, Value)>> {
    let mut files = Vec::new();
    if root.is_dir() {
        collect_json_files(root, &mut files)?;
    }

    let mut out = Vec::with_capacity(files.len());
    for file in files {
        let id = match resource_id_for(namespace, root, &file) {
            Ok(id) => id,
            Err(e) => {
                errors.record(file.display().to_string(), e);
                continue;
            }
        };
        let text = match std::fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) => {
                errors.record(id.to_string(), io_error(&file, e));
                continue;
            }
        };
        match serde_json::from_str(&text) {
            Ok(json) => out.push((id, json)),
            Err(e) => errors.record(
                id.to_string(),
                ParseError::json(file.display().to_string(), e.to_string()),
            ),
        }
    }
    Ok(out)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> CodexResult<()> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            collect_json_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(())
}

fn resource_id_for(namespace: &str, root: &Path, file: &Path) -> Result<ResourceId, CodexError> {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    let mut parts = Vec::new();
    for component in relative.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => return Err(CodexError::Config(format!("non-UTF-8 path {}", file.display()))),
        }
    }
    Ok(ResourceId::new(namespace, &parts.join("/"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BlockState, BlockWorld};
    use serde_json::json;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).expect("valid id")
    }

    fn stone_block() -> Value {
        json!({"pattern": [["#"]], "legend": {"#": "stone"}})
    }

    #[test]
    fn broken_structures_are_omitted_and_reported() {
        let manager = MultiblockDataManager::new(PredicateRegistry::with_builtins());
        assert!(!manager.is_loaded());

        let errors = manager.load_sources(
            TagRegistry::new(),
            [
                (id("codex:good"), stone_block()),
                (id("codex:ragged"), json!({"pattern": [["##", "#"]], "legend": {"#": "stone"}})),
                (id("codex:bad_state"), json!({"pattern": [["#"]], "legend": {"#": "stone[oops"}})),
            ],
        );

        assert!(manager.is_loaded());
        assert_eq!(errors.len(), 2);
        assert!(errors.contains("codex:ragged"));
        assert!(errors.contains("codex:bad_state"));
        let registry = manager.registry();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![&id("codex:good")]);
    }

    #[test]
    fn reload_replaces_wholesale() {
        let manager = MultiblockDataManager::new(PredicateRegistry::new());
        manager.load_sources(TagRegistry::new(), [(id("codex:old"), stone_block())]);
        let before = manager.registry();

        manager.pre_load();
        assert!(!manager.is_loaded());
        assert!(manager.get(&id("codex:old")).is_some());

        manager.load_sources(TagRegistry::new(), [(id("codex:new"), stone_block())]);
        assert!(manager.get(&id("codex:old")).is_none());
        assert!(manager.get(&id("codex:new")).is_some());
        assert!(before.contains(&id("codex:old")));
    }

    #[test]
    fn sync_replaces_client_registry() {
        let server = MultiblockDataManager::new(PredicateRegistry::with_builtins());
        server.load_sources(
            TagRegistry::new(),
            [(id("codex:a"), stone_block()), (id("codex:b"), stone_block())],
        );
        let bytes = server.sync_message().to_bytes().expect("encodes");

        let client = MultiblockDataManager::new(PredicateRegistry::with_builtins());
        client.load_sources(TagRegistry::new(), [(id("codex:stale"), stone_block())]);
        assert_eq!(client.on_sync(&bytes).expect("valid sync"), 2);

        assert!(client.get(&id("codex:stale")).is_none());
        assert_eq!(client.get(&id("codex:a")), server.get(&id("codex:a")));
    }

    #[test]
    fn bad_sync_keeps_the_current_registry() {
        let client = MultiblockDataManager::new(PredicateRegistry::new());
        client.load_sources(TagRegistry::new(), [(id("codex:kept"), stone_block())]);

        assert!(client.on_sync(b"CDXM\x01").is_err());
        assert!(client.get(&id("codex:kept")).is_some());
    }

    #[test]
    fn self_check_flags_unsatisfiable_display_states() {
        let ctx = MatchContext::builtin();
        let fine = multiblock::from_json(id("codex:fine"), &stone_block()).expect("valid");
        assert!(self_check(&fine, &ctx).is_empty());

        // displays air but demands a non-air block
        let contradictory = multiblock::from_json(
            id("codex:contradictory"),
            &json!({"blocks": [{"x": 0, "y": 0, "z": 0, "matcher":
                {"type": "codex:predicate", "display": "air", "predicate": "codex:non_air"}}]}),
        )
        .expect("valid");
        assert_eq!(self_check(&contradictory, &ctx), Rotation::ALL.to_vec());
    }

    #[test]
    fn load_dir_reads_namespaced_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let multiblocks = dir.path().join("testmod").join("multiblocks").join("shrines");
        let tags = dir.path().join("testmod").join("tags").join("blocks");
        std::fs::create_dir_all(&multiblocks).expect("create dirs");
        std::fs::create_dir_all(&tags).expect("create dirs");

        std::fs::write(
            multiblocks.join("log_altar.json"),
            json!({
                "pattern": [["L"]],
                "legend": {"L": {"type": "codex:tag", "display": "oak_log", "tag": "testmod:logs"}},
            })
            .to_string(),
        )
        .expect("write multiblock");
        std::fs::write(multiblocks.join("broken.json"), "{ not json").expect("write broken");
        let logs = json!({"values": ["oak_log", "birch_log"]});
        std::fs::write(tags.join("logs.json"), logs.to_string()).expect("write tag");

        let manager = MultiblockDataManager::new(PredicateRegistry::with_builtins());
        let errors = manager.load_dir(dir.path()).expect("directory readable");
        assert!(errors.contains("testmod:shrines/broken"));

        let altar = manager.get(&id("testmod:shrines/log_altar")).expect("altar loaded");
        let mut world = SparseWorld::new();
        world.set_state(VoxelPos::ORIGIN, BlockState::parse("birch_log").expect("valid state"));
        assert_eq!(
            altar.validate(&manager.context(), &world, VoxelPos::ORIGIN),
            Some(Rotation::None)
        );
    }

    #[test]
    fn missing_data_dir_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = MultiblockDataManager::new(PredicateRegistry::new());
        assert!(matches!(manager.load_dir(dir.path().join("nope")), Err(CodexError::Io { .. })));
    }
}
