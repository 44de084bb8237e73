//! Error types for the protocol layer.
//!
//! Each Rally crate defines its own error enum. A `ProtocolError` always
//! means a serialization problem, never an identity or relationship fault.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (Rust value → bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (bytes → Rust value).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// enum value outside the allowed set (e.g. an unknown friend action).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
