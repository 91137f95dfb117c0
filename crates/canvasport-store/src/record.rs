//! Rows written by an import.

use canvasport_kernel::VariablesMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub active_canvas_id: Option<String>,
    #[serde(default)]
    pub variables: VariablesMap,
    pub created_at: String,
    pub updated_at: String,
}

/// A canvas row. The graph itself lives in the object store under `blob_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub position: i64,
    pub blob_key: String,
    pub schema_version: u32,
}

/// Metadata accompanying one asset upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpload {
    pub project_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub sha256: String,
}
