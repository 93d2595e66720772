//! Binary forms of matchers and multiblocks
//!
//! Matcher: type id string, then the variant payload. Multiblock: kind, id,
//! size, cell count, `(position, matcher)` per occupied cell in x, y, z order,
//! offset, view offset and the symmetry flag. Dense symbols are not sent.

use glam::IVec3;
use std::collections::BTreeMap;

use crate::error::NetworkError;
use crate::multiblock::{
    build, CellSpec, MatcherInterner, Multiblock, MultiblockParams, StateMatcher, ANY_TYPE,
    EXACT_STATE_TYPE, MAX_DIMENSION, MAX_VOLUME, PREDICATE_TYPE, TAG_TYPE,
};
use crate::network::error::{malformed, NetworkResult};
use crate::network::wire::{WireReader, WireWriter};
use crate::world::{BlockState, ResourceId};

/// Smallest possible encoded cell: a position plus a matcher type length
const MIN_CELL_BYTES: usize = 12 + 8;

impl StateMatcher {
    pub fn to_network(&self, writer: &mut WireWriter) -> NetworkResult<()> {
        writer.write_str("matcher type", self.type_name())?;
        match self {
            StateMatcher::ExactState { state } => writer.write_str("state", &state.to_string()),
            StateMatcher::Predicate { display, predicate } => {
                writer.write_str("display state", &display.to_string())?;
                writer.write_str("predicate id", &predicate.to_string())
            }
            StateMatcher::Tag {
                display,
                tag,
                properties,
            } => {
                writer.write_str("display state", &display.to_string())?;
                writer.write_str("tag id", &tag.to_string())?;
                writer.write("tag properties", properties)
            }
            StateMatcher::Any => Ok(()),
        }
    }

    pub fn from_network(reader: &mut WireReader<'_>) -> NetworkResult<Self> {
        let type_id = reader.read_str("matcher type")?;
        match type_id.as_str() {
            EXACT_STATE_TYPE => Ok(StateMatcher::ExactState {
                state: read_state(reader, "state")?,
            }),
            PREDICATE_TYPE => Ok(StateMatcher::Predicate {
                display: read_state(reader, "display state")?,
                predicate: read_id(reader, "predicate id")?,
            }),
            TAG_TYPE => Ok(StateMatcher::Tag {
                display: read_state(reader, "display state")?,
                tag: read_id(reader, "tag id")?,
                properties: reader.read::<BTreeMap<String, String>>("tag properties")?,
            }),
            ANY_TYPE => Ok(StateMatcher::Any),
            _ => Err(NetworkError::UnknownMatcherType(type_id)),
        }
    }
}

impl Multiblock {
    pub fn to_network(&self, writer: &mut WireWriter) -> NetworkResult<()> {
        writer.write_str("multiblock kind", &self.kind().to_string())?;
        writer.write_str("multiblock id", &self.id().to_string())?;
        writer.write("size", &self.size().to_array())?;
        writer.write("cell count", &(self.cell_count() as u32))?;
        for (pos, matcher) in self.cells() {
            writer.write("cell position", &pos.to_array())?;
            matcher.to_network(writer)?;
        }
        writer.write("offset", &self.offset().to_array())?;
        writer.write("view offset", &self.view_offset().to_array())?;
        writer.write("symmetrical", &self.is_symmetrical())
    }

    /// Rebuild a multiblock from its wire form. Memory grows with the bytes
    /// actually received, never with the declared size box.
    pub fn from_network(reader: &mut WireReader<'_>) -> NetworkResult<Self> {
        let kind = read_id(reader, "multiblock kind")?;
        let id = read_id(reader, "multiblock id")?;

        let size = IVec3::from_array(reader.read::<[i32; 3]>("size")?);
        let limit = IVec3::splat(MAX_DIMENSION);
        if size.cmplt(IVec3::ZERO).any() || size.cmpgt(limit).any() {
            return Err(NetworkError::OutOfBounds {
                what: "size",
                value: size.to_array(),
                limit: limit.to_array(),
            });
        }
        let volume = (size.x as usize) * (size.y as usize) * (size.z as usize);
        if volume > MAX_VOLUME {
            return Err(malformed(format!(
                "{} has {} cells, limit is {}",
                id, volume, MAX_VOLUME
            )));
        }

        let count = reader.read::<u32>("cell count")? as usize;
        if count > volume {
            return Err(malformed(format!(
                "{} claims {} cells in a box of {}",
                id, count, volume
            )));
        }

        let mut interner = MatcherInterner::new();
        let mut cells = Vec::with_capacity(count.min(reader.remaining() / MIN_CELL_BYTES));
        for _ in 0..count {
            let pos = IVec3::from_array(reader.read::<[i32; 3]>("cell position")?);
            if pos.cmplt(IVec3::ZERO).any() || pos.cmpge(size).any() {
                return Err(NetworkError::OutOfBounds {
                    what: "cell position",
                    value: pos.to_array(),
                    limit: size.to_array(),
                });
            }
            let matcher = StateMatcher::from_network(reader)?;
            cells.push(CellSpec::new(pos, interner.intern(matcher)));
        }

        let offset = IVec3::from_array(reader.read::<[i32; 3]>("offset")?);
        let view_offset = IVec3::from_array(reader.read::<[i32; 3]>("view offset")?);
        let symmetrical = reader.read::<bool>("symmetrical")?;

        build(MultiblockParams {
            id,
            kind,
            size,
            cells,
            offset,
            view_offset,
            symmetrical,
        })
        .map_err(|e| malformed(e.to_string()))
    }

    /// Standalone wire form of this multiblock
    pub fn to_bytes(&self) -> NetworkResult<Vec<u8>> {
        let mut writer = WireWriter::new();
        self.to_network(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> NetworkResult<Self> {
        let mut reader = WireReader::new(bytes);
        let multiblock = Self::from_network(&mut reader)?;
        reader.finish()?;
        Ok(multiblock)
    }
}

fn read_state(reader: &mut WireReader<'_>, what: &'static str) -> NetworkResult<BlockState> {
    let literal = reader.read_str(what)?;
    Ok(BlockState::parse(&literal).map_err(|e| e.at(what))?)
}

fn read_id(reader: &mut WireReader<'_>, what: &'static str) -> NetworkResult<ResourceId> {
    let literal = reader.read_str(what)?;
    Ok(ResourceId::parse(&literal).map_err(|e| e.at(what))?)
}
