use crate::support::{pre_import_or_exit, print_issue_block, print_json, yes_no};
use serde_json::json;
use std::process;

pub fn run(file: String, json_output: bool) {
    let pre = pre_import_or_exit(&file);
    let summary = &pre.summary;
    let validation = &pre.validation;

    if json_output {
        print_json(&json!({
            "file": file,
            "summary": summary,
            "validation": validation,
        }));
    } else {
        println!("canvasport inspect {file}");
        println!("  Project: {}", summary.project_name);
        println!(
            "  Exported: {} by {}",
            summary.exported_at, summary.tool_version
        );
        println!(
            "  Canvases: {} ({})",
            summary.canvas_count,
            summary.canvas_names.join(", ")
        );
        println!("  Variables: {}", summary.variable_count);
        println!(
            "  Assets: {} embedded, {} referenced, {} bytes",
            summary.embedded_asset_count,
            summary.referenced_asset_count,
            summary.total_asset_bytes
        );
        println!("  Importable: {}", yes_no(validation.ok));
        print_issue_block("Errors", &validation.errors);
        print_issue_block("Warnings", &validation.warnings);
        if !validation.found.is_empty() {
            println!("  Sensitive fields: {}", validation.found.join(", "));
        }
    }

    if !validation.ok {
        process::exit(1);
    }
}
