//! Security and sanity scan over a parsed document.
//!
//! The scan never fails: every problem becomes an `ImportIssue`, blocking
//! findings in `errors` and advisory ones in `warnings`.

use crate::issue::{ImportIssue, IssueCode, ValidationResult};
use canvasport_kernel::asset::{decode, decoded_len_upper_bound};
use canvasport_kernel::{
    AssetEntry, GRAPH_SCHEMA_VERSION, MAX_EMBED_BYTES, ProjectDocument, canonical_value, sha256_hex,
};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Field names that must never travel inside an export, compared after
/// lowercasing and dropping `_`, `-`, `.` and spaces.
pub const SENSITIVE_FIELD_NAMES: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "clientsecret",
    "secretkey",
    "apikey",
    "apisecret",
    "accesskey",
    "accesstoken",
    "refreshtoken",
    "authtoken",
    "idtoken",
    "sessiontoken",
    "bearertoken",
    "token",
    "privatekey",
    "credential",
    "credentials",
    "authorization",
    "email",
    "emailaddress",
];

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}")
            .expect("email regex must compile")
    })
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_sensitive_field(key: &str) -> bool {
    let normalized = normalize_key(key);
    SENSITIVE_FIELD_NAMES.contains(&normalized.as_str())
}

/// Run every scan over `document`.
pub fn scan(document: &ProjectDocument) -> ValidationResult {
    let mut result = ValidationResult::default();
    scan_sensitive_fields(document, &mut result);
    scan_free_text(document, &mut result);
    scan_numbers(document, &mut result);
    scan_canvases(document, &mut result);
    scan_assets(document, &mut result);
    result.settle();
    result
}

fn scan_sensitive_fields(document: &ProjectDocument, result: &mut ValidationResult) {
    let value = match serde_json::to_value(document) {
        Ok(value) => canonical_value(&value),
        Err(e) => {
            tracing::warn!(error = %e, "document could not be rendered for field scan");
            return;
        }
    };
    let mut found = BTreeSet::new();
    walk_fields(&value, "$", &mut |key, path| {
        if is_sensitive_field(key) {
            result.errors.push(ImportIssue::at(
                IssueCode::SecretDetected,
                format!("sensitive field `{key}` must not be exported"),
                path,
            ));
            found.insert(key.to_string());
        }
    });
    result.found.extend(found);
}

fn walk_fields(value: &Value, path: &str, visit: &mut impl FnMut(&str, &str)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                visit(key, &child_path);
                walk_fields(child, &child_path, visit);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                walk_fields(child, &format!("{path}[{idx}]"), visit);
            }
        }
        _ => {}
    }
}

fn scan_free_text(document: &ProjectDocument, result: &mut ValidationResult) {
    let fields = [
        ("$.project.name", document.project.name.as_str()),
        ("$.project.description", document.project.description.as_str()),
    ];
    for (path, text) in fields {
        if email_pattern().is_match(text) {
            result.errors.push(ImportIssue::at(
                IssueCode::EmailDetected,
                "free text contains an email address",
                path,
            ));
        }
    }
}

fn scan_numbers(document: &ProjectDocument, result: &mut ValidationResult) {
    for (id, variable) in &document.project.variables {
        if !variable.value.is_finite() {
            result.errors.push(ImportIssue::at(
                IssueCode::InvalidNumber,
                format!("variable `{id}` is not a finite number"),
                format!("$.project.variables.{id}.value"),
            ));
        }
    }
    for (idx, canvas) in document.canvases.iter().enumerate() {
        let base = format!("$.canvases[{idx}].graph");
        for (key, items) in [("nodes", &canvas.graph.nodes), ("edges", &canvas.graph.edges)] {
            for (item_idx, item) in items.iter().enumerate() {
                let path = format!("{base}.{key}[{item_idx}]");
                find_non_finite(item, &path, &mut |bad_path| {
                    result.errors.push(ImportIssue::at(
                        IssueCode::InvalidNumber,
                        "graph payload contains a non-finite number",
                        bad_path,
                    ));
                });
            }
        }
    }
}

fn find_non_finite(value: &Value, path: &str, report: &mut impl FnMut(String)) {
    match value {
        Value::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => report(path.to_string()),
        Value::Object(map) => {
            for (key, child) in map {
                find_non_finite(child, &format!("{path}.{key}"), report);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                find_non_finite(child, &format!("{path}[{idx}]"), report);
            }
        }
        _ => {}
    }
}

fn scan_canvases(document: &ProjectDocument, result: &mut ValidationResult) {
    let mut seen = BTreeSet::new();
    for (idx, canvas) in document.canvases.iter().enumerate() {
        let path = format!("$.canvases[{idx}]");
        if !seen.insert(canvas.id.as_str()) {
            result.errors.push(ImportIssue::at(
                IssueCode::DuplicateCanvasId,
                format!("canvas id `{}` appears more than once", canvas.id),
                format!("{path}.id"),
            ));
        }
        if canvas.graph.schema_version != GRAPH_SCHEMA_VERSION {
            result.errors.push(ImportIssue::at(
                IssueCode::SchemaVersion,
                format!(
                    "graph schema version {} is not supported (expected {GRAPH_SCHEMA_VERSION})",
                    canvas.graph.schema_version
                ),
                format!("{path}.graph.schemaVersion"),
            ));
        }
        if canvas.graph.canvas_id != canvas.id {
            result.warnings.push(ImportIssue::at(
                IssueCode::CanvasIdMismatch,
                format!(
                    "graph claims canvas `{}` but sits under `{}`",
                    canvas.graph.canvas_id, canvas.id
                ),
                format!("{path}.graph.canvasId"),
            ));
        }
        if canvas.graph.project_id != document.project.id {
            result.warnings.push(ImportIssue::at(
                IssueCode::ProjectIdMismatch,
                format!(
                    "graph claims project `{}` but the document is `{}`",
                    canvas.graph.project_id, document.project.id
                ),
                format!("{path}.graph.projectId"),
            ));
        }
    }
}

fn scan_assets(document: &ProjectDocument, result: &mut ValidationResult) {
    for (idx, asset) in document.assets.iter().enumerate() {
        let path = format!("$.assets[{idx}]");
        let AssetEntry::Embedded(embedded) = asset else {
            continue;
        };
        let name = embedded.name.as_str();

        // Base64 padding can inflate the bound by at most two bytes.
        if embedded.size_bytes > MAX_EMBED_BYTES
            || decoded_len_upper_bound(&embedded.data) > MAX_EMBED_BYTES + 2
        {
            result.errors.push(ImportIssue::at(
                IssueCode::AssetTooLarge,
                format!("embedded asset `{name}` exceeds the {MAX_EMBED_BYTES}-byte ceiling"),
                path,
            ));
            continue;
        }

        let bytes = match decode(embedded) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.warnings.push(ImportIssue::at(
                    IssueCode::AssetDecodeFailed,
                    format!("{e}; the asset will be skipped"),
                    format!("{path}.data"),
                ));
                continue;
            }
        };

        if bytes.len() as u64 > MAX_EMBED_BYTES {
            result.errors.push(ImportIssue::at(
                IssueCode::AssetTooLarge,
                format!("embedded asset `{name}` exceeds the {MAX_EMBED_BYTES}-byte ceiling"),
                path,
            ));
            continue;
        }
        if bytes.len() as u64 != embedded.size_bytes {
            result.errors.push(ImportIssue::at(
                IssueCode::AssetSizeMismatch,
                format!(
                    "asset `{name}` declares {} bytes but decodes to {}",
                    embedded.size_bytes,
                    bytes.len()
                ),
                format!("{path}.sizeBytes"),
            ));
            continue;
        }
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(&embedded.sha256) {
            result.warnings.push(ImportIssue::at(
                IssueCode::AssetHashMismatch,
                format!("asset `{name}` payload does not match its digest; the asset will be skipped"),
                format!("{path}.sha256"),
            ));
        }
    }
}
