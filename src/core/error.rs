//! Error types for tile persistence
//!
//! Index and mode preconditions are contract checks (`debug_assert!`), not
//! errors. Only decoding untrusted records can fail at runtime.

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported record version {found} (expected {expected})")]
    Version { expected: u32, found: u32 },

    #[error("Tile size mismatch: record has {found} voxels per tile, expected {expected}")]
    TileSize { expected: i32, found: i32 },

    #[error("Schema error: expected field `{expected}`, found `{found}`")]
    FieldMismatch { expected: &'static str, found: String },

    #[error("Schema error: field `{name}` is not a {expected}")]
    FieldKind { name: &'static str, expected: &'static str },

    #[error("Schema error: missing field `{0}`")]
    MissingField(&'static str),

    #[error("Schema error: {0} unread trailing field(s)")]
    TrailingFields(usize),

    #[error("Field `{name}` holds {found} bytes, expected {expected}")]
    BufferSize { name: &'static str, expected: usize, found: usize },
}
