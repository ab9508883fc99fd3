//! Value encoding
//!
//! The store never interprets record bytes itself; it hands values to a
//! [`Codec`] and stores whatever bytes come back. [`JsonCodec`] is the
//! default and produces plain self-describing JSON with no header.

use crate::error::{StoreError, StoreResult};
use serde::{Serialize, de::DeserializeOwned};

/// Converts values to bytes and back
pub trait Codec: Send + Sync {
    /// Fails with [`StoreError::Encode`] when the value cannot be represented.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>>;

    /// Fails with [`StoreError::Decode`] on malformed or type-mismatched bytes.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T>;
}

/// JSON codec backed by `serde_json`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact output
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };

        encoded.map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}
