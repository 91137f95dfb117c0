//! Portable project document model.
//!
//! A `ProjectDocument` is produced once by export and consumed once by
//! import. Everything here is plain data; hashing and validation live in
//! sibling modules.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Format tag carried by every document.
pub const FORMAT_TAG: &str = "canvasport.project";

/// The only supported document version.
pub const FORMAT_VERSION: u32 = 1;

/// Current per-canvas graph schema version.
pub const GRAPH_SCHEMA_VERSION: u32 = 2;

/// Ceiling for one embedded asset payload (10 MiB).
pub const MAX_EMBED_BYTES: u64 = 10 * 1024 * 1024;

/// Variables keyed by variable id.
pub type VariablesMap = BTreeMap<String, Variable>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub format: String,
    pub version: u32,
    pub exported_at: String,
    pub exporter: ExporterInfo,
    #[serde(rename = "hashes")]
    pub hash_manifest: HashManifest,
    pub project: ProjectMeta,
    pub canvases: Vec<CanvasEntry>,
    pub assets: Vec<AssetEntry>,
}

impl ProjectDocument {
    /// Lookup one canvas entry by id.
    pub fn canvas(&self, id: &str) -> Option<&CanvasEntry> {
        self.canvases.iter().find(|canvas| canvas.id == id)
    }

    /// Iterate embedded assets only.
    pub fn embedded_assets(&self) -> impl Iterator<Item = &EmbeddedAsset> {
        self.assets.iter().filter_map(|asset| match asset {
            AssetEntry::Embedded(embedded) => Some(embedded),
            AssetEntry::Referenced(_) => None,
        })
    }
}

/// Who produced the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterInfo {
    pub tool_version: String,
    pub build_info: String,
    pub engine_version: String,
    pub engine_contract_version: String,
}

/// The two-level digest tree embedded in every document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashManifest {
    pub project_hash: String,
    pub canvases: Vec<CanvasHash>,
    pub assets: Vec<AssetManifestEntry>,
}

impl HashManifest {
    pub fn canvas_hash(&self, canvas_id: &str) -> Option<&str> {
        self.canvases
            .iter()
            .find(|entry| entry.id == canvas_id)
            .map(|entry| entry.hash.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasHash {
    pub id: String,
    pub hash: String,
}

/// One asset line in the manifest. `name` holds the asset name for
/// embedded assets and the external pointer for referenced ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifestEntry {
    pub name: String,
    pub sha256: Option<String>,
    pub byte_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Variable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasEntry {
    pub id: String,
    pub name: String,
    pub position: i64,
    pub graph: GraphDocument,
}

/// Per-canvas graph payload. Nodes, edges and dataset references are
/// opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub schema_version: u32,
    pub canvas_id: String,
    pub project_id: String,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
    #[serde(default)]
    pub dataset_refs: Vec<Value>,
}

impl GraphDocument {
    /// Empty graph at the current schema version.
    pub fn empty(canvas_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            schema_version: GRAPH_SCHEMA_VERSION,
            canvas_id: canvas_id.into(),
            project_id: project_id.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            dataset_refs: Vec::new(),
        }
    }
}

/// Binary attachment, either carried inline or pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding")]
pub enum AssetEntry {
    #[serde(rename = "base64")]
    Embedded(EmbeddedAsset),
    #[serde(rename = "reference")]
    Referenced(ReferencedAsset),
}

impl AssetEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Embedded(asset) => &asset.name,
            Self::Referenced(asset) => &asset.name,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Embedded(asset) => asset.size_bytes,
            Self::Referenced(asset) => asset.size_bytes,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    /// Deterministic ordering key: `(name, pointer)`; embedded assets have
    /// an empty pointer.
    pub fn sort_key(&self) -> (&str, &str) {
        match self {
            Self::Embedded(asset) => (&asset.name, ""),
            Self::Referenced(asset) => (&asset.name, &asset.pointer),
        }
    }

    pub fn manifest_entry(&self) -> AssetManifestEntry {
        match self {
            Self::Embedded(asset) => AssetManifestEntry {
                name: asset.name.clone(),
                sha256: Some(asset.sha256.clone()),
                byte_count: asset.size_bytes,
            },
            Self::Referenced(asset) => AssetManifestEntry {
                name: asset.pointer.clone(),
                sha256: asset.sha256.clone(),
                byte_count: asset.size_bytes,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedAsset {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub data: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedAsset {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub pointer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}
