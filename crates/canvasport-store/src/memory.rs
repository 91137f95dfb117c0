//! In-process backend.
//!
//! Besides serving tests and dry runs, it can be told to fail at chosen
//! points so rollback paths can be exercised deterministically.

use crate::error::StoreError;
use crate::record::{AssetUpload, CanvasRecord, ProjectRecord};
use crate::{AssetStorage, ProjectStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where a `MemoryStore` should fail.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Fail the project row write.
    pub fail_project: bool,
    /// Let this many canvas rows succeed, then fail the next one.
    pub fail_canvas_after: Option<usize>,
    /// Fail every object write.
    pub fail_objects: bool,
    /// Asset names whose upload fails.
    pub fail_assets: BTreeSet<String>,
    /// Fail every delete, for checking that cleanup errors are swallowed.
    pub fail_deletes: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    projects: BTreeMap<String, ProjectRecord>,
    canvases: BTreeMap<String, CanvasRecord>,
    objects: BTreeMap<String, Vec<u8>>,
    assets: BTreeMap<String, (AssetUpload, Vec<u8>)>,
    canvas_writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: FaultPlan,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            state: Mutex::default(),
            faults,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn project(&self, id: &str) -> Option<ProjectRecord> {
        self.state().projects.get(id).cloned()
    }

    pub fn canvases(&self) -> Vec<CanvasRecord> {
        self.state().canvases.values().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state().objects.get(key).cloned()
    }

    pub fn project_count(&self) -> usize {
        self.state().projects.len()
    }

    pub fn canvas_count(&self) -> usize {
        self.state().canvases.len()
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    /// Names of every uploaded asset, sorted.
    pub fn asset_names(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state.assets.values().map(|(a, _)| a.name.clone()).collect();
        names.sort();
        names
    }

    /// Whether any write ever landed and survived.
    pub fn is_empty(&self) -> bool {
        let state = self.state();
        state.projects.is_empty()
            && state.canvases.is_empty()
            && state.objects.is_empty()
            && state.assets.is_empty()
    }

    fn injected_delete_failure(&self, what: &str) -> Result<(), StoreError> {
        if self.faults.fail_deletes {
            return Err(StoreError::Unavailable(format!("delete {what} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, record: &ProjectRecord) -> Result<(), StoreError> {
        if self.faults.fail_project {
            return Err(StoreError::Unavailable("project table offline".to_string()));
        }
        let mut state = self.state();
        if state.projects.contains_key(&record.id) {
            return Err(StoreError::Conflict {
                kind: "project",
                id: record.id.clone(),
            });
        }
        state.projects.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StoreError> {
        self.injected_delete_failure(project_id)?;
        self.state()
            .projects
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "project",
                id: project_id.to_string(),
            })
    }

    async fn create_canvas(&self, record: &CanvasRecord) -> Result<(), StoreError> {
        let mut state = self.state();
        if let Some(limit) = self.faults.fail_canvas_after
            && state.canvas_writes >= limit
        {
            return Err(StoreError::Unavailable(format!(
                "canvas table refused write #{}",
                state.canvas_writes + 1
            )));
        }
        if state.canvases.contains_key(&record.id) {
            return Err(StoreError::Conflict {
                kind: "canvas",
                id: record.id.clone(),
            });
        }
        state.canvas_writes += 1;
        state.canvases.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_canvas(&self, canvas_id: &str) -> Result<(), StoreError> {
        self.injected_delete_failure(canvas_id)?;
        self.state()
            .canvases
            .remove(canvas_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "canvas",
                id: canvas_id.to_string(),
            })
    }

    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.faults.fail_objects {
            return Err(StoreError::Unavailable(format!("object store refused {key}")));
        }
        self.state().objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.injected_delete_failure(key)?;
        self.state()
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "object",
                id: key.to_string(),
            })
    }
}

#[async_trait]
impl AssetStorage for MemoryStore {
    async fn upload(&self, asset: &AssetUpload, bytes: &[u8]) -> Result<String, StoreError> {
        if self.faults.fail_assets.contains(&asset.name) {
            return Err(StoreError::Unavailable(format!(
                "asset upload rejected: {}",
                asset.name
            )));
        }
        let mut state = self.state();
        let pointer = format!(
            "memory://{}/assets/{}/{}",
            asset.project_id,
            state.assets.len(),
            asset.name
        );
        state
            .assets
            .insert(pointer.clone(), (asset.clone(), bytes.to_vec()));
        Ok(pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(id: &str) -> CanvasRecord {
        CanvasRecord {
            id: id.to_string(),
            project_id: "p".to_string(),
            name: id.to_uppercase(),
            position: 0,
            blob_key: format!("projects/p/canvases/{id}.json"),
            schema_version: 2,
        }
    }

    #[tokio::test]
    async fn canvas_fault_fires_after_budget() {
        let store = MemoryStore::with_faults(FaultPlan {
            fail_canvas_after: Some(2),
            ..FaultPlan::default()
        });
        store.create_canvas(&canvas("a")).await.expect("first");
        store.create_canvas(&canvas("b")).await.expect("second");
        let err = store
            .create_canvas(&canvas("c"))
            .await
            .expect_err("third should fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.canvas_count(), 2);
    }

    #[tokio::test]
    async fn duplicate_canvas_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_canvas(&canvas("a")).await.expect("first");
        let err = store
            .create_canvas(&canvas("a"))
            .await
            .expect_err("duplicate");
        assert_eq!(
            err,
            StoreError::Conflict {
                kind: "canvas",
                id: "a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn deletes_report_missing_rows() {
        let store = MemoryStore::new();
        store
            .put_object("k", b"v")
            .await
            .expect("put should succeed");
        store.delete_object("k").await.expect("delete");
        assert!(store.is_empty());
        assert!(matches!(
            store.delete_object("k").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn upload_returns_distinct_pointers() {
        let store = MemoryStore::new();
        let upload = AssetUpload {
            project_id: "p".into(),
            name: "a.png".into(),
            mime_type: "image/png".into(),
            size_bytes: 3,
            sha256: String::new(),
        };
        let first = store.upload(&upload, b"abc").await.expect("first upload");
        let second = store.upload(&upload, b"abc").await.expect("second upload");
        assert_ne!(first, second);
        assert_eq!(store.asset_names(), vec!["a.png", "a.png"]);
    }
}
