use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::NetworkError;
use crate::multiblock::{Multiblock, MultiblockRegistry};
use crate::network::error::{malformed, NetworkResult};
use crate::network::protocol::{MAX_MULTIBLOCKS, PROTOCOL_VERSION, SYNC_MAGIC};
use crate::network::wire::{WireReader, WireWriter};

/// Header for the multiblock sync message
#[derive(Debug, Serialize, Deserialize)]
struct SyncHeader {
    magic: [u8; 4],
    version: u32,
    count: u32,
    checksum: u32,
}

/// Full snapshot of the server's multiblock registry, sent to clients after
/// every data load. Clients replace their registry with it wholesale.
#[derive(Debug, Clone, Default)]
pub struct SyncMultiblocksMessage {
    multiblocks: Vec<Arc<Multiblock>>,
}

impl SyncMultiblocksMessage {
    pub fn from_registry(registry: &MultiblockRegistry) -> Self {
        Self {
            multiblocks: registry.iter().map(|(_, multiblock)| Arc::clone(multiblock)).collect(),
        }
    }

    pub fn multiblocks(&self) -> &[Arc<Multiblock>] {
        &self.multiblocks
    }

    pub fn len(&self) -> usize {
        self.multiblocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multiblocks.is_empty()
    }

    /// Registry holding exactly the multiblocks in this message
    pub fn into_registry(self) -> MultiblockRegistry {
        self.multiblocks
            .into_iter()
            .map(|multiblock| {
                Arc::try_unwrap(multiblock).unwrap_or_else(|shared| (*shared).clone())
            })
            .collect()
    }

    /// Serialize message to bytes
    pub fn to_bytes(&self) -> NetworkResult<Vec<u8>> {
        let mut body = WireWriter::new();
        for multiblock in &self.multiblocks {
            multiblock.to_network(&mut body)?;
        }

        let count = u32::try_from(self.multiblocks.len())
            .ok()
            .filter(|count| *count <= MAX_MULTIBLOCKS)
            .ok_or_else(|| {
                malformed(format!(
                    "{} multiblocks exceed the sync limit",
                    self.multiblocks.len()
                ))
            })?;
        let header = SyncHeader {
            magic: SYNC_MAGIC,
            version: PROTOCOL_VERSION,
            count,
            checksum: calculate_checksum(body.as_bytes()),
        };

        let mut writer = WireWriter::new();
        writer.write("sync header", &header)?;
        writer.write_bytes(body.as_bytes());

        log::debug!(
            "Encoded multiblock sync: {} multiblocks, {} bytes",
            header.count,
            writer.len()
        );
        Ok(writer.into_bytes())
    }

    /// Deserialize message from bytes. Any defect fails the whole message.
    pub fn from_bytes(bytes: &[u8]) -> NetworkResult<Self> {
        let mut reader = WireReader::new(bytes);
        let header: SyncHeader = reader.read("sync header")?;

        if header.magic != SYNC_MAGIC {
            return Err(malformed("invalid sync magic"));
        }
        if header.version != PROTOCOL_VERSION {
            return Err(NetworkError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: header.version,
            });
        }
        if header.count > MAX_MULTIBLOCKS {
            return Err(malformed(format!(
                "sync claims {} multiblocks, limit is {}",
                header.count, MAX_MULTIBLOCKS
            )));
        }

        let body = reader.rest();
        let checksum = calculate_checksum(body);
        if checksum != header.checksum {
            return Err(NetworkError::ChecksumMismatch {
                expected: header.checksum,
                found: checksum,
            });
        }

        let mut reader = WireReader::new(body);
        let mut seen = HashSet::new();
        let mut multiblocks = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            let multiblock = Multiblock::from_network(&mut reader)?;
            if !seen.insert(multiblock.id().clone()) {
                return Err(malformed(format!("multiblock {} sent twice", multiblock.id())));
            }
            multiblocks.push(Arc::new(multiblock));
        }
        reader.finish()?;

        log::debug!(
            "Decoded multiblock sync: {} multiblocks from {} bytes",
            multiblocks.len(),
            bytes.len()
        );
        Ok(Self { multiblocks })
    }
}

/// Calculate CRC32 checksum
fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
