//! # Canvasport Kernel
//!
//! Turns a live project (node-graph canvases, a variable set, binary
//! attachments) into one portable, content-addressed document.
//!
//! The kernel is **graph-agnostic**: node and edge payloads are opaque JSON.
//! It only prescribes how they are ordered, encoded and digested.
//!
//! ## Architecture
//!
//! ```text
//! canonical   ← key-sorted JSON bytes (hash input + on-disk form)
//!     │
//! hash        ← SHA-256 per canvas, aggregate per project
//!     │
//! asset       ← base64 embed / external reference, digest-verified decode
//!     │
//! export      ← pure assembly of a ProjectDocument
//! ```

pub mod asset;
pub mod canonical;
pub mod error;
pub mod export;
pub mod hash;
pub mod model;

pub use canonical::{canonical_json_bytes, canonical_value, canonicalize, canonicalize_pretty};
pub use error::{AssetError, CanonicalError, ExportError, HashError};
pub use export::{ExportArgs, build_export, serialize_document};
pub use hash::{ProjectHashInput, asset_manifest, hash_canvas, hash_project, sha256_hex};
pub use model::{
    AssetEntry, AssetManifestEntry, CanvasEntry, CanvasHash, EmbeddedAsset, ExporterInfo,
    FORMAT_TAG, FORMAT_VERSION, GRAPH_SCHEMA_VERSION, GraphDocument, HashManifest,
    MAX_EMBED_BYTES, ProjectDocument, ProjectMeta, ReferencedAsset, Variable, VariablesMap,
};
