//! Error taxonomy for the codex engine
//!
//! Authoring problems surface as [`ParseError`], unresolved registry ids as
//! [`LookupError`] (only when a matcher is actually queried), and malformed
//! sync bytes as [`NetworkError`]. [`CodexError`] wraps all of them for the
//! loading and sync entry points.

use crate::world::ResourceId;

/// Result type for engine operations
pub type CodexResult<T> = Result<T, CodexError>;

/// Location used before a caller attaches a real one
pub const UNKNOWN_LOCATION: &str = "<input>";

/// Malformed authoring input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid block state `{literal}` at {location} (column {column}): {reason}")]
    BlockState {
        literal: String,
        location: String,
        column: usize,
        reason: String,
    },

    #[error("invalid resource id `{literal}` at {location}: {reason}")]
    ResourceId {
        literal: String,
        location: String,
        reason: String,
    },

    /// Shape problems in a dense pattern or sparse block list
    #[error("{}", structure_message(*.layer, *.row, .reason))]
    Structure {
        layer: usize,
        row: Option<usize>,
        reason: String,
    },

    #[error("cell {pos:?}: {reason}")]
    Cell { pos: [i32; 3], reason: String },

    #[error("size {size:?}: {reason}")]
    Size { size: [i32; 3], reason: String },

    #[error("{what} {offset:?} is outside -{limit}..={limit}")]
    Offset {
        what: &'static str,
        offset: [i32; 3],
        limit: i32,
    },

    #[error("unknown matcher type `{type_id}` at {location}")]
    UnknownMatcherType { type_id: String, location: String },

    #[error("malformed json at {location}: {reason}")]
    Json { location: String, reason: String },
}

fn structure_message(layer: usize, row: Option<usize>, reason: &str) -> String {
    match row {
        Some(row) => format!("pattern layer {} row {}: {}", layer, row, reason),
        None => format!("pattern layer {}: {}", layer, reason),
    }
}

impl ParseError {
    /// Attach the source location (usually a JSON path) to this error.
    /// Shape errors already name their layer, row or cell and are returned as-is.
    pub fn at(self, new_location: impl Into<String>) -> Self {
        let new_location = new_location.into();
        match self {
            ParseError::BlockState { literal, column, reason, .. } => ParseError::BlockState {
                literal,
                location: new_location,
                column,
                reason,
            },
            ParseError::ResourceId { literal, reason, .. } => ParseError::ResourceId {
                literal,
                location: new_location,
                reason,
            },
            ParseError::UnknownMatcherType { type_id, .. } => ParseError::UnknownMatcherType {
                type_id,
                location: new_location,
            },
            ParseError::Json { reason, .. } => ParseError::Json {
                location: new_location,
                reason,
            },
            shape @ (ParseError::Structure { .. }
            | ParseError::Cell { .. }
            | ParseError::Size { .. }
            | ParseError::Offset { .. }) => shape,
        }
    }

    pub(crate) fn json(location: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::Json {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn structure(layer: usize, row: Option<usize>, reason: impl Into<String>) -> Self {
        ParseError::Structure {
            layer,
            row,
            reason: reason.into(),
        }
    }
}

/// A predicate or tag id that nothing registered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no predicate registered under `{0}`")]
    Predicate(ResourceId),

    #[error("no block tag registered under `{0}`")]
    Tag(ResourceId),
}

/// Failures while encoding or decoding the binary sync form
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },

    #[error("truncated or unreadable {what}: {message}")]
    Truncated { what: &'static str, message: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unknown matcher type `{0}` on the wire")]
    UnknownMatcherType(String),

    #[error("invalid value on the wire: {0}")]
    InvalidState(#[from] ParseError),

    #[error("{what} {value:?} is out of bounds (limit {limit:?})")]
    OutOfBounds {
        what: &'static str,
        value: [i32; 3],
        limit: [i32; 3],
    },

    #[error("checksum mismatch: header says {expected:#010x}, body hashes to {found:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },

    #[error("protocol version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("{0} unread bytes after payload")]
    TrailingBytes(usize),
}

/// Umbrella error for loading, registry and sync operations
#[derive(Debug, thiserror::Error)]
pub enum CodexError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("multiblock `{0}` is already registered")]
    DuplicateId(ResourceId),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

/// Create an io error carrying the path it happened on
pub fn io_error(path: impl AsRef<std::path::Path>, source: std::io::Error) -> CodexError {
    CodexError::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_errors_name_layer_and_row() {
        let err = ParseError::structure(2, Some(4), "row length 3, expected 5");
        assert_eq!(err.to_string(), "pattern layer 2 row 4: row length 3, expected 5");

        let err = ParseError::structure(1, None, "3 rows, expected 4");
        assert_eq!(err.to_string(), "pattern layer 1: 3 rows, expected 4");
    }

    #[test]
    fn at_replaces_location_but_keeps_literal() {
        let err = ParseError::BlockState {
            literal: "stone[".to_string(),
            location: UNKNOWN_LOCATION.to_string(),
            column: 6,
            reason: "unterminated property list".to_string(),
        }
        .at("legend.#");

        let message = err.to_string();
        assert!(message.contains("`stone[`"));
        assert!(message.contains("legend.#"));
        assert!(message.contains("column 6"));
    }
}
