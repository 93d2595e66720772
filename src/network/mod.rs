pub mod codec;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod wire;

pub use error::{malformed, NetworkResult};
pub use protocol::{
    MAX_MULTIBLOCKS, MAX_PACKET_SIZE, MAX_STRING_LENGTH, PROTOCOL_VERSION, SYNC_MAGIC,
};
pub use sync::SyncMultiblocksMessage;
pub use wire::{WireReader, WireWriter};
