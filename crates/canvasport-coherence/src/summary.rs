//! Pre-import preview of a document.

use canvasport_kernel::{AssetEntry, ProjectDocument};
use serde::{Deserialize, Serialize};

/// What an import would bring in, shown to the user before committing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub project_name: String,
    pub canvas_count: usize,
    pub canvas_names: Vec<String>,
    pub variable_count: usize,
    pub embedded_asset_count: usize,
    pub referenced_asset_count: usize,
    pub total_asset_bytes: u64,
    pub exported_at: String,
    pub tool_version: String,
}

impl ImportSummary {
    pub fn from_document(document: &ProjectDocument) -> Self {
        let mut canvases: Vec<_> = document.canvases.iter().collect();
        canvases.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

        let embedded_asset_count = document.assets.iter().filter(|a| a.is_embedded()).count();
        Self {
            project_name: document.project.name.clone(),
            canvas_count: canvases.len(),
            canvas_names: canvases.iter().map(|c| c.name.clone()).collect(),
            variable_count: document.project.variables.len(),
            embedded_asset_count,
            referenced_asset_count: document.assets.len() - embedded_asset_count,
            total_asset_bytes: document.assets.iter().map(AssetEntry::size_bytes).sum(),
            exported_at: document.exported_at.clone(),
            tool_version: document.exporter.tool_version.clone(),
        }
    }
}
