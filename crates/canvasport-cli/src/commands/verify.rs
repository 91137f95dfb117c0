use crate::support::{print_issue_block, print_json, read_file_or_exit, yes_no};
use canvasport_coherence::{parse_document, verify_integrity};
use serde_json::json;
use std::process;

pub fn run(file: String, json_output: bool) {
    let bytes = read_file_or_exit(&file);
    let document = parse_document(&bytes).unwrap_or_else(|e| {
        eprintln!("error: {file}: {e}");
        process::exit(1);
    });

    let mut errors = Vec::new();
    verify_integrity(&document, &mut errors);
    let verified = errors.is_empty();

    if json_output {
        print_json(&json!({
            "file": file,
            "verified": verified,
            "projectHash": document.hash_manifest.project_hash,
            "canvasCount": document.canvases.len(),
            "assetCount": document.assets.len(),
            "errors": errors,
        }));
    } else {
        println!("canvasport verify {file}");
        println!("  Project hash: {}", document.hash_manifest.project_hash);
        println!("  Canvases: {}", document.canvases.len());
        println!("  Assets: {}", document.assets.len());
        println!("  Verified: {}", yes_no(verified));
        print_issue_block("Errors", &errors);
    }

    if !verified {
        process::exit(1);
    }
}
