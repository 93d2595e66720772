//! Codex engine: declarative multiblock structures for a voxel world
//!
//! Structures are authored as JSON (dense legend patterns or sparse block
//! lists), matched against a live world under the four horizontal rotations,
//! placed, previewed, and synced to clients in a compact binary form.

pub mod config;
pub mod data;
pub mod error;
pub mod multiblock;
pub mod network;
pub mod world;

pub use config::CodexConfig;
pub use data::{LoadErrors, MultiblockDataManager};
pub use error::{CodexError, CodexResult, LookupError, NetworkError, ParseError};
pub use multiblock::{
    MatchContext, Multiblock, MultiblockRegistry, PredicateRegistry, SimulateResult, StateMatcher,
    TagRegistry,
};
pub use network::SyncMultiblocksMessage;
pub use world::{BlockState, BlockView, BlockWorld, ResourceId, Rotation, SparseWorld, VoxelPos};
