//! Directory-backed backend.
//!
//! Layout under `root`:
//!
//! ```text
//! records/projects/<id>.json
//! records/canvases/<id>.json
//! objects/<key>
//! assets/<project>/<sha-prefix>-<name>
//! ```
//!
//! Every write goes to a sibling temp file first and is renamed into place.

use crate::error::StoreError;
use crate::record::{AssetUpload, CanvasRecord, ProjectRecord};
use crate::{AssetStorage, ProjectStore};
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_path(&self, id: &str) -> PathBuf {
        self.root
            .join("records/projects")
            .join(format!("{}.json", sanitize_for_file(id)))
    }

    fn canvas_path(&self, id: &str) -> PathBuf {
        self.root
            .join("records/canvases")
            .join(format!("{}.json", sanitize_for_file(id)))
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !clean {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join("objects").join(relative))
    }

    async fn create_record<T: Serialize + Sync>(
        &self,
        path: &Path,
        kind: &'static str,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        if fs::try_exists(path)
            .await
            .map_err(|e| StoreError::io(path, e))?
        {
            return Err(StoreError::Conflict {
                kind,
                id: id.to_string(),
            });
        }
        let mut bytes =
            serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialize(e.to_string()))?;
        bytes.push(b'\n');
        write_atomic(path, &bytes).await
    }
}

#[async_trait]
impl ProjectStore for FsStore {
    async fn create_project(&self, record: &ProjectRecord) -> Result<(), StoreError> {
        let path = self.project_path(&record.id);
        self.create_record(&path, "project", &record.id, record)
            .await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StoreError> {
        remove(&self.project_path(project_id), "project", project_id).await
    }

    async fn create_canvas(&self, record: &CanvasRecord) -> Result<(), StoreError> {
        let path = self.canvas_path(&record.id);
        self.create_record(&path, "canvas", &record.id, record)
            .await
    }

    async fn delete_canvas(&self, canvas_id: &str) -> Result<(), StoreError> {
        remove(&self.canvas_path(canvas_id), "canvas", canvas_id).await
    }

    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.object_path(key)?, bytes).await
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        remove(&self.object_path(key)?, "object", key).await
    }
}

#[async_trait]
impl AssetStorage for FsStore {
    async fn upload(&self, asset: &AssetUpload, bytes: &[u8]) -> Result<String, StoreError> {
        let digest_prefix = asset.sha256.get(..12).unwrap_or(&asset.sha256);
        let file_name = match digest_prefix {
            "" => sanitize_for_file(&asset.name),
            prefix => format!("{prefix}-{}", sanitize_for_file(&asset.name)),
        };
        let pointer = format!("assets/{}/{file_name}", sanitize_for_file(&asset.project_id));
        write_atomic(&self.root.join(&pointer), bytes).await?;
        tracing::debug!(pointer = %pointer, bytes = bytes.len(), "asset stored");
        Ok(pointer)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StoreError::io(&tmp_path, error));
    }

    fs::rename(&tmp_path, path).await.map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = fs::File::open(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
        dir.sync_all()
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }
    Ok(())
}

async fn remove(path: &Path, kind: &'static str, id: &str) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
            kind,
            id: id.to_string(),
        }),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn sanitize_for_file(input: &str) -> String {
    let sanitized: String = input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
