//! Codec Module
//!
//! Marshal/unmarshal pipeline used by the tiered cache.
//!
//! # Wire format
//! - `Nil` marshals to an empty payload.
//! - `Bytes` and `Text` pass through unframed.
//! - Everything else is MessagePack-encoded, then framed with one trailing
//!   tag byte: [`NO_COMPRESSION`] for payloads under the threshold,
//!   [`LZ4_COMPRESSION`] for payloads compressed with LZ4.

use std::fmt::Debug;

use tracing::debug;

use crate::cache::{Target, Value, DEFAULT_COMPRESSION_THRESHOLD};
use crate::error::{CacheError, Result};

/// Trailing tag for payloads stored as-is.
pub const NO_COMPRESSION: u8 = 0x00;
/// Trailing tag for LZ4-compressed payloads.
pub const LZ4_COMPRESSION: u8 = 0x01;

// == Codec Trait ==
/// Converts values to and from their stored byte form.
pub trait Codec: Send + Sync + Debug {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>>;

    fn unmarshal(&self, payload: &[u8], target: Target) -> Result<Value>;
}

// == Default Codec ==
/// MessagePack + LZ4 codec.
#[derive(Debug, Clone)]
pub struct DefaultCodec {
    compression_threshold: usize,
}

impl DefaultCodec {
    pub fn new(compression_threshold: usize) -> Self {
        Self {
            compression_threshold,
        }
    }

    /// Appends the tag byte, compressing payloads at or above the threshold.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < self.compression_threshold {
            let mut framed = Vec::with_capacity(data.len() + 1);
            framed.extend_from_slice(data);
            framed.push(NO_COMPRESSION);
            return Ok(framed);
        }

        let mut framed = lz4::block::compress(data, None, true)
            .map_err(|e| CacheError::Serialization(format!("LZ4 compression failed: {}", e)))?;
        debug!("LZ4 compressed: {} -> {} bytes", data.len(), framed.len());
        framed.push(LZ4_COMPRESSION);
        Ok(framed)
    }

    /// Strips the tag byte, decompressing if it says so.
    pub fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let Some((&tag, body)) = payload.split_last() else {
            return Ok(Vec::new());
        };

        match tag {
            NO_COMPRESSION => Ok(body.to_vec()),
            LZ4_COMPRESSION => lz4::block::decompress(body, None).map_err(|e| {
                CacheError::CorruptPayload(format!("LZ4 decompression failed: {}", e))
            }),
            other => Err(CacheError::CorruptPayload(format!(
                "unknown compression tag: {:#04x}",
                other
            ))),
        }
    }
}

impl Default for DefaultCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD)
    }
}

impl Codec for DefaultCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Nil => Ok(Vec::new()),
            Value::Bytes(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(text.as_bytes().to_vec()),
            other => {
                let encoded = rmp_serde::to_vec(other)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                self.compress(&encoded)
            }
        }
    }

    fn unmarshal(&self, payload: &[u8], target: Target) -> Result<Value> {
        if payload.is_empty() {
            return Ok(Value::Nil);
        }

        match target {
            Target::Bytes => Ok(Value::Bytes(payload.to_vec())),
            Target::Text => String::from_utf8(payload.to_vec())
                .map(Value::Text)
                .map_err(|_| CacheError::CorruptPayload("payload is not valid UTF-8".to_string())),
            Target::Any => {
                let decoded = self.decompress(payload)?;
                rmp_serde::from_slice(&decoded).map_err(|e| CacheError::Serialization(e.to_string()))
            }
        }
    }
}
