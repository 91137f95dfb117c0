//! Persistence boundary for imports.
//!
//! The orchestrator only ever talks to these two traits. Every write has a
//! matching delete so a failed import can be compensated in reverse order.
//!
//! Backends:
//! - `MemoryStore`: in-process state with optional fault injection
//! - `FsStore`: one JSON file per row under a root directory, atomic writes

mod error;
mod fs;
mod memory;
mod record;

pub use error::StoreError;
pub use fs::FsStore;
pub use memory::{FaultPlan, MemoryStore};
pub use record::{AssetUpload, CanvasRecord, ProjectRecord};

use async_trait::async_trait;

/// Project rows, canvas rows and graph blobs.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, record: &ProjectRecord) -> Result<(), StoreError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), StoreError>;

    async fn create_canvas(&self, record: &CanvasRecord) -> Result<(), StoreError>;

    async fn delete_canvas(&self, canvas_id: &str) -> Result<(), StoreError>;

    /// Write `bytes` under `key`, replacing any previous object.
    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}

/// Binary attachment storage.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store one asset and return the pointer it can be fetched by.
    async fn upload(&self, asset: &AssetUpload, bytes: &[u8]) -> Result<String, StoreError>;
}
