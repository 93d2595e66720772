//! Bincode-backed primitives for the binary sync form
//!
//! Integers are fixed width and little-endian, strings are length-prefixed
//! UTF-8. Every read is bounded by [`MAX_PACKET_SIZE`], so a hostile length
//! prefix cannot force a large allocation.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::network::error::{decode_error, encode_error, malformed, NetworkError, NetworkResult};
use crate::network::protocol::{MAX_PACKET_SIZE, MAX_STRING_LENGTH};

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_PACKET_SIZE)
}

/// Append-only output buffer
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write any serde value. `what` names the field in error messages.
    pub fn write<T: Serialize + ?Sized>(
        &mut self,
        what: &'static str,
        value: &T,
    ) -> NetworkResult<()> {
        options()
            .serialize_into(&mut self.buffer, value)
            .map_err(|e| encode_error(what, e))
    }

    pub fn write_str(&mut self, what: &'static str, value: &str) -> NetworkResult<()> {
        if value.len() > MAX_STRING_LENGTH {
            return Err(malformed(format!(
                "{} is {} bytes, limit is {}",
                what,
                value.len(),
                MAX_STRING_LENGTH
            )));
        }
        self.write(what, value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over received bytes
#[derive(Debug)]
pub struct WireReader<'a> {
    remaining: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    pub fn read<T: DeserializeOwned>(&mut self, what: &'static str) -> NetworkResult<T> {
        options()
            .deserialize_from(&mut self.remaining)
            .map_err(|e| decode_error(what, e))
    }

    pub fn read_str(&mut self, what: &'static str) -> NetworkResult<String> {
        let value: String = self.read(what)?;
        if value.len() > MAX_STRING_LENGTH {
            return Err(malformed(format!(
                "{} is {} bytes, limit is {}",
                what,
                value.len(),
                MAX_STRING_LENGTH
            )));
        }
        Ok(value)
    }

    /// Everything not read yet
    pub fn rest(&self) -> &'a [u8] {
        self.remaining
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Fail if anything is left unread
    pub fn finish(self) -> NetworkResult<()> {
        match self.remaining.len() {
            0 => Ok(()),
            left => Err(NetworkError::TrailingBytes(left)),
        }
    }
}
