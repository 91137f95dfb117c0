//! Auditable record of one import attempt.

use crate::orchestrator::ImportResult;
use canvasport_coherence::{ImportSummary, ValidationResult};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStatus {
    Imported,
    Blocked,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub generated_at: String,
    pub status: ImportStatus,
    pub summary: ImportSummary,
    pub validation: ValidationResult,
    pub result: ImportResult,
}

impl ImportReport {
    pub fn new(summary: ImportSummary, validation: ValidationResult, result: ImportResult) -> Self {
        let status = if result.ok {
            ImportStatus::Imported
        } else if !validation.ok {
            ImportStatus::Blocked
        } else if result.has_error(canvasport_coherence::IssueCode::Aborted) {
            ImportStatus::Aborted
        } else {
            ImportStatus::Failed
        };
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            summary,
            validation,
            result,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering for download or terminal output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let summary = &self.summary;
        let _ = writeln!(out, "Import report: {}", summary.project_name);
        let _ = writeln!(out, "generated: {}", self.generated_at);
        let _ = writeln!(out, "status: {}", status_label(&self.status));
        let _ = writeln!(
            out,
            "exported: {} by {}",
            summary.exported_at, summary.tool_version
        );
        let _ = writeln!(
            out,
            "canvases: {} ({})",
            summary.canvas_count,
            summary.canvas_names.join(", ")
        );
        let _ = writeln!(out, "variables: {}", summary.variable_count);
        let _ = writeln!(
            out,
            "assets: {} embedded, {} referenced, {} bytes",
            summary.embedded_asset_count, summary.referenced_asset_count, summary.total_asset_bytes
        );

        let validation = &self.validation;
        let _ = writeln!(
            out,
            "validation: {} ({} errors, {} warnings)",
            if validation.ok { "ok" } else { "blocked" },
            validation.errors.len(),
            validation.warnings.len()
        );
        for issue in &validation.errors {
            let _ = writeln!(out, "  error {issue}");
        }
        for issue in &validation.warnings {
            let _ = writeln!(out, "  warning {issue}");
        }

        let result = &self.result;
        if let Some(project_id) = &result.project_id {
            let _ = writeln!(out, "project id: {project_id}");
        }
        let _ = writeln!(
            out,
            "imported: {} canvases, {} assets uploaded",
            result.canvases_imported, result.assets_uploaded
        );
        if !result.unreferenced_assets.is_empty() {
            let _ = writeln!(out, "unreferenced assets:");
            for name in &result.unreferenced_assets {
                let _ = writeln!(out, "  - {name}");
            }
        }
        if !result.errors.is_empty() {
            let _ = writeln!(out, "import errors:");
            for issue in &result.errors {
                let _ = writeln!(out, "  {issue}");
            }
        }
        if !result.operations.is_empty() {
            let _ = writeln!(out, "operations:");
            for operation in &result.operations {
                let _ = writeln!(out, "  {operation}");
            }
        }
        let remap = &result.id_remap;
        if remap.project.is_some() || !remap.canvases.is_empty() {
            let _ = writeln!(out, "id remap:");
            if let Some((old, new)) = &remap.project {
                let _ = writeln!(out, "  project {old} -> {new}");
            }
            for (old, new) in &remap.canvases {
                let _ = writeln!(out, "  canvas {old} -> {new}");
            }
        }
        out
    }
}

fn status_label(status: &ImportStatus) -> &'static str {
    match status {
        ImportStatus::Imported => "imported",
        ImportStatus::Blocked => "blocked by validation",
        ImportStatus::Failed => "failed and rolled back",
        ImportStatus::Aborted => "cancelled and rolled back",
    }
}
