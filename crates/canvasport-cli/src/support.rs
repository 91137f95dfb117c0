use crate::config::Config;
use canvasport_coherence::{ImportIssue, PreImport, pre_import};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process;

pub fn load_config_or_exit(explicit: Option<&str>) -> Config {
    Config::load(explicit.map(Path::new)).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn read_file_or_exit(path: &str) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {path}: {e}");
        process::exit(1);
    })
}

pub fn write_file_or_exit(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        eprintln!("error: failed to create {}: {e}", parent.display());
        process::exit(1);
    }
    if let Err(e) = fs::write(path, bytes) {
        eprintln!("error: failed to write {}: {e}", path.display());
        process::exit(1);
    }
}

pub fn pre_import_or_exit(path: &str) -> PreImport {
    let bytes = read_file_or_exit(path);
    pre_import(&bytes).unwrap_or_else(|e| {
        eprintln!("error: {path}: {e}");
        process::exit(1);
    })
}

pub fn runtime_or_exit() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        })
}

pub fn print_json<T: Serialize>(payload: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

pub fn print_issue_block(title: &str, issues: &[ImportIssue]) {
    if issues.is_empty() {
        return;
    }
    println!("  {title}:");
    for issue in issues {
        println!("    - {issue}");
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
