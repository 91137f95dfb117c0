//! Error types for kernel operations.

/// Failure turning a value into canonical bytes.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    #[error("value is not representable as JSON: {0}")]
    Serialize(String),
}

/// Failure computing a content digest.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A number that JSON cannot carry (NaN or ±infinity).
    #[error("non-finite number at {path}")]
    NonFinite { path: String },

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// Failure encoding or decoding an asset payload.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset `{name}` is {size} bytes, above the embed ceiling of {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("asset `{name}` payload is not valid base64: {message}")]
    Decode { name: String, message: String },

    #[error("asset `{name}` digest mismatch: expected {expected}, computed {actual}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Failure assembling or serializing a document.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("duplicate canvas id: {0}")]
    DuplicateCanvasId(String),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}
