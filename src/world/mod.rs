//! World-side primitives shared by matching, building and sync
//!
//! The host world is opaque to the engine: everything goes through
//! [`BlockView`] (reads) and [`BlockWorld`] (writes for placement).

pub mod block_state;
pub mod position;
pub mod resource_id;
pub mod rotation;
pub mod world_interface;

pub use block_state::BlockState;
pub use position::VoxelPos;
pub use resource_id::{ResourceId, CODEX_NAMESPACE, DEFAULT_NAMESPACE};
pub use rotation::Rotation;
pub use world_interface::{BlockView, BlockWorld, SparseWorld};
