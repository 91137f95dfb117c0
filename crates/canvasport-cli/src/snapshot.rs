//! Reads a project snapshot directory into export arguments.
//!
//! ```text
//! <dir>/project.json        project metadata + canvas index
//! <dir>/canvases/<id>.json  one graph per canvas (legacy shapes accepted)
//! <dir>/assets/*            attachment files
//! <dir>/assets.json         optional external references
//! ```

use crate::config::Config;
use canvasport_coherence::migrate;
use canvasport_kernel::asset::{embed_checked, reference};
use canvasport_kernel::{
    AssetEntry, CanvasEntry, ExportArgs, ProjectMeta, ReferencedAsset, VariablesMap, sha256_hex,
};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid {path}: {message}")]
    Invalid { path: String, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotProject {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    active_canvas_id: Option<String>,
    #[serde(default)]
    variables: VariablesMap,
    created_at: String,
    updated_at: String,
    canvases: Vec<SnapshotCanvas>,
}

#[derive(Debug, Deserialize)]
struct SnapshotCanvas {
    id: String,
    name: String,
    position: i64,
}

const MIME_TYPES: &[(&str, &str)] = &[
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("parquet", "application/vnd.apache.parquet"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("mp4", "video/mp4"),
];

pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SnapshotError> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Invalid {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_error(path: &Path, error: std::io::Error) -> SnapshotError {
    SnapshotError::Read {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Load `dir` into `ExportArgs`; `exported_at` is stamped by the caller.
pub fn load_snapshot(
    dir: &Path,
    config: &Config,
    exported_at: String,
) -> Result<ExportArgs, SnapshotError> {
    let project: SnapshotProject = read_json(&dir.join("project.json"))?;

    let mut canvases = Vec::with_capacity(project.canvases.len());
    for canvas in &project.canvases {
        let graph_path = dir.join("canvases").join(format!("{}.json", canvas.id));
        let raw: Value = read_json(&graph_path)?;
        canvases.push(CanvasEntry {
            id: canvas.id.clone(),
            name: canvas.name.clone(),
            position: canvas.position,
            graph: migrate(&raw, &canvas.id, &project.id),
        });
    }

    let mut assets = load_asset_files(&dir.join("assets"), config.assets.effective_threshold())?;
    let references_path = dir.join("assets.json");
    if references_path.exists() {
        let references: Vec<ReferencedAsset> = read_json(&references_path)?;
        assets.extend(references.into_iter().map(AssetEntry::Referenced));
    }

    Ok(ExportArgs {
        project: ProjectMeta {
            id: project.id,
            name: project.name,
            description: project.description,
            active_canvas_id: project.active_canvas_id,
            variables: project.variables,
            created_at: project.created_at,
            updated_at: project.updated_at,
        },
        canvases,
        assets,
        exporter: config.exporter.exporter_info(),
        exported_at,
    })
}

fn load_asset_files(dir: &Path, threshold: u64) -> Result<Vec<AssetEntry>, SnapshotError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| read_error(dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut assets = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SnapshotError::Invalid {
                path: path.display().to_string(),
                message: "asset file name is not UTF-8".to_string(),
            })?
            .to_string();
        let bytes = fs::read(&path).map_err(|e| read_error(&path, e))?;
        let mime_type = mime_type_for(&path);
        let size = bytes.len() as u64;

        let embedded = if size <= threshold {
            embed_checked(&name, mime_type, &bytes).ok()
        } else {
            None
        };
        let entry = match embedded {
            Some(embedded) => AssetEntry::Embedded(embedded),
            None => {
                tracing::info!(asset = %name, size, "asset exported by reference");
                AssetEntry::Referenced(reference(
                    &name,
                    mime_type,
                    size,
                    format!("assets/{name}"),
                    Some(sha256_hex(&bytes)),
                ))
            }
        };
        assets.push(entry);
    }
    Ok(assets)
}
