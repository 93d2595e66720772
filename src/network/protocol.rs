/// Sync format version - increment when making breaking changes
pub const PROTOCOL_VERSION: u32 = 1;

/// Magic bytes opening every multiblock sync message
pub const SYNC_MAGIC: [u8; 4] = *b"CDXM";

/// Limits applied while decoding
pub const MAX_PACKET_SIZE: u64 = 16 * 1024 * 1024; // 16MB max sync payload
pub const MAX_STRING_LENGTH: usize = 32767;
pub const MAX_MULTIBLOCKS: u32 = 65536;
