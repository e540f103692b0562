//! Pluggable body encoding and decoding.
//!
//! A [`Codec`] is injected per pipeline instance, not globally, so two
//! pipelines can use different encoding strategies side by side. The
//! default [`JsonCodec`] produces compact JSON; implement `Codec` to apply
//! alternate strategies such as pretty printing or date rewriting.

use crate::BoxError;
use bytes::Bytes;

/// Encodes structured values into request bodies and decodes response
/// bodies back into structured values.
///
/// The trait works over `serde_json::Value` boundaries so it stays object
/// safe; the typed pipeline entry points handle the conversion to and from
/// user types.
pub trait Codec: Send + Sync {
    /// The `Content-Type` for bodies this codec produces.
    fn content_type(&self) -> &str {
        "application/json"
    }

    /// Encodes a structured value into body bytes.
    fn encode(&self, value: &serde_json::Value) -> std::result::Result<Bytes, BoxError>;

    /// Decodes body bytes into a structured value.
    fn decode(&self, bytes: &[u8]) -> std::result::Result<serde_json::Value, BoxError>;
}

/// The default codec: compact JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &serde_json::Value) -> std::result::Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(&self, bytes: &[u8]) -> std::result::Result<serde_json::Value, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
