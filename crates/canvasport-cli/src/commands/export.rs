use crate::config::Config;
use crate::snapshot::load_snapshot;
use crate::support::{print_json, write_file_or_exit};
use canvasport_kernel::{build_export, serialize_document};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::path::Path;
use std::process;

pub fn run(
    config: &Config,
    snapshot: String,
    output: String,
    exported_at: Option<String>,
    json_output: bool,
) {
    let exported_at =
        exported_at.unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    let args = load_snapshot(Path::new(&snapshot), config, exported_at).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let document = build_export(&args).unwrap_or_else(|e| {
        eprintln!("error: export failed: {e}");
        process::exit(1);
    });
    let bytes = serialize_document(&document).unwrap_or_else(|e| {
        eprintln!("error: export failed: {e}");
        process::exit(1);
    });
    write_file_or_exit(Path::new(&output), &bytes);
    tracing::info!(output = %output, bytes = bytes.len(), "document written");

    let embedded = document.assets.iter().filter(|a| a.is_embedded()).count();
    if json_output {
        print_json(&json!({
            "output": output,
            "projectId": document.project.id,
            "projectHash": document.hash_manifest.project_hash,
            "canvasCount": document.canvases.len(),
            "embeddedAssetCount": embedded,
            "referencedAssetCount": document.assets.len() - embedded,
            "byteCount": bytes.len(),
        }));
    } else {
        println!("canvasport export {snapshot}");
        println!("  Output: {output}");
        println!("  Project: {} ({})", document.project.name, document.project.id);
        println!("  Canvases: {}", document.canvases.len());
        println!(
            "  Assets: {embedded} embedded, {} referenced",
            document.assets.len() - embedded
        );
        println!("  Project hash: {}", document.hash_manifest.project_hash);
    }
}
