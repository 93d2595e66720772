//! Network-specific result alias and error helpers

pub use crate::error::NetworkError;

/// Type alias for network-specific results
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Create a malformed payload error
pub fn malformed(message: impl Into<String>) -> NetworkError {
    NetworkError::Malformed(message.into())
}

pub(crate) fn encode_error(what: &'static str, error: bincode::Error) -> NetworkError {
    NetworkError::Encode {
        what,
        message: error.to_string(),
    }
}

/// Bytes that were present but not a valid encoding are malformed; anything
/// else (short input, size limit) reads as truncated.
pub(crate) fn decode_error(what: &'static str, error: bincode::Error) -> NetworkError {
    match *error {
        bincode::ErrorKind::InvalidUtf8Encoding(_)
        | bincode::ErrorKind::InvalidBoolEncoding(_)
        | bincode::ErrorKind::InvalidCharEncoding
        | bincode::ErrorKind::InvalidTagEncoding(_) => malformed(format!("{}: {}", what, error)),
        _ => NetworkError::Truncated {
            what,
            message: error.to_string(),
        },
    }
}
