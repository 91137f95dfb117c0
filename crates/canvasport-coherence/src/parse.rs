//! Strict document parsing.
//!
//! Bytes → `ProjectDocument`, or a `ParseError` that names the offending
//! path (`$.canvases[1].graph.nodes`). Format tag and version must match
//! exactly; ambiguity is rejected rather than guessed. Legacy graphs are
//! lifted by the migrator before the structural walk sees them.

use crate::migrate::{migrate, needs_migration};
use canvasport_kernel::{FORMAT_TAG, FORMAT_VERSION, GRAPH_SCHEMA_VERSION, ProjectDocument};
use chrono::DateTime;
use serde_json::{Map, Value};

type Object = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("{path}: missing required field")]
    Missing { path: String },

    #[error("{path}: expected {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("{path}: unsupported format `{found}` (expected `{expected}`)")]
    Format {
        path: String,
        found: String,
        expected: String,
    },

    #[error("{path}: unsupported version {found} (expected {expected})")]
    Version {
        path: String,
        found: String,
        expected: u32,
    },

    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
}

impl ParseError {
    /// JSON path of the offending node, when the failure has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Missing { path }
            | Self::WrongType { path, .. }
            | Self::Format { path, .. }
            | Self::Version { path, .. }
            | Self::Invalid { path, .. } => Some(path),
        }
    }
}

/// Parse and structurally validate a serialized project document.
pub fn parse_document(bytes: &[u8]) -> Result<ProjectDocument, ParseError> {
    let mut root: Value =
        serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))?;
    check_document(&mut root)?;
    serde_json::from_value(root).map_err(|e| ParseError::Invalid {
        path: "$".to_string(),
        message: e.to_string(),
    })
}

fn check_document(root: &mut Value) -> Result<(), ParseError> {
    let obj = root
        .as_object_mut()
        .ok_or_else(|| wrong_type("$", "object"))?;

    let format = str_field(obj, "format", "$")?;
    if format != FORMAT_TAG {
        return Err(ParseError::Format {
            path: "$.format".to_string(),
            found: format.to_string(),
            expected: FORMAT_TAG.to_string(),
        });
    }

    let version = field(obj, "version", "$")?;
    if version.as_u64() != Some(u64::from(FORMAT_VERSION)) {
        return Err(ParseError::Version {
            path: "$.version".to_string(),
            found: version.to_string(),
            expected: FORMAT_VERSION,
        });
    }

    timestamp_field(obj, "exportedAt", "$")?;
    check_exporter(object_field(obj, "exporter", "$")?)?;
    check_hashes(object_field(obj, "hashes", "$")?)?;
    let project_id = check_project(object_field(obj, "project", "$")?)?;

    let canvases = obj
        .get_mut("canvases")
        .ok_or_else(|| missing("$.canvases"))?
        .as_array_mut()
        .ok_or_else(|| wrong_type("$.canvases", "array"))?;
    if canvases.is_empty() {
        return Err(invalid("$.canvases", "a project needs at least one canvas"));
    }
    for (idx, canvas) in canvases.iter_mut().enumerate() {
        check_canvas(canvas, &index("$.canvases", idx), &project_id)?;
    }

    let assets = array_field(obj, "assets", "$")?;
    for (idx, asset) in assets.iter().enumerate() {
        check_asset(asset, &index("$.assets", idx))?;
    }
    Ok(())
}

fn check_exporter(exporter: &Object) -> Result<(), ParseError> {
    for key in [
        "toolVersion",
        "buildInfo",
        "engineVersion",
        "engineContractVersion",
    ] {
        str_field(exporter, key, "$.exporter")?;
    }
    Ok(())
}

fn check_hashes(hashes: &Object) -> Result<(), ParseError> {
    let path = "$.hashes";
    str_field(hashes, "projectHash", path)?;

    let canvases_path = join(path, "canvases");
    for (idx, entry) in array_field(hashes, "canvases", path)?.iter().enumerate() {
        let entry_path = index(&canvases_path, idx);
        let entry = as_object(entry, &entry_path)?;
        str_field(entry, "id", &entry_path)?;
        str_field(entry, "hash", &entry_path)?;
    }

    let assets_path = join(path, "assets");
    for (idx, entry) in array_field(hashes, "assets", path)?.iter().enumerate() {
        let entry_path = index(&assets_path, idx);
        let entry = as_object(entry, &entry_path)?;
        str_field(entry, "name", &entry_path)?;
        optional_str_field(entry, "sha256", &entry_path)?;
        u64_field(entry, "byteCount", &entry_path)?;
    }
    Ok(())
}

/// Returns the project id so canvases can be checked against it.
fn check_project(project: &Object) -> Result<String, ParseError> {
    let path = "$.project";
    let id = str_field(project, "id", path)?.to_string();
    str_field(project, "name", path)?;
    str_field(project, "description", path)?;
    optional_str_field(project, "activeCanvasId", path)?;
    timestamp_field(project, "createdAt", path)?;
    timestamp_field(project, "updatedAt", path)?;

    let variables_path = join(path, "variables");
    for (key, variable) in object_field(project, "variables", path)? {
        let var_path = join(&variables_path, key);
        let variable = as_object(variable, &var_path)?;
        let var_id = str_field(variable, "id", &var_path)?;
        if var_id != key {
            return Err(invalid(
                join(&var_path, "id"),
                format!("variable id `{var_id}` does not match its key `{key}`"),
            ));
        }
        str_field(variable, "name", &var_path)?;
        number_field(variable, "value", &var_path)?;
        optional_str_field(variable, "description", &var_path)?;
    }
    Ok(id)
}

fn check_canvas(canvas: &mut Value, path: &str, project_id: &str) -> Result<(), ParseError> {
    let canvas = canvas
        .as_object_mut()
        .ok_or_else(|| wrong_type(path, "object"))?;
    let id = str_field(canvas, "id", path)?.to_string();
    str_field(canvas, "name", path)?;
    i64_field(canvas, "position", path)?;

    let graph_path = join(path, "graph");
    let graph = canvas
        .get_mut("graph")
        .ok_or_else(|| missing(graph_path.clone()))?;
    if !graph.is_object() {
        return Err(wrong_type(graph_path, "object"));
    }
    if needs_migration(graph) {
        let lifted = migrate(graph, &id, project_id);
        tracing::info!(canvas_id = %id, "lifted legacy graph to schema v{GRAPH_SCHEMA_VERSION}");
        *graph = serde_json::to_value(lifted).map_err(|e| invalid(graph_path.clone(), e.to_string()))?;
    }
    check_graph(graph, &graph_path)
}

fn check_graph(graph: &Value, path: &str) -> Result<(), ParseError> {
    let graph = as_object(graph, path)?;
    let version = field(graph, "schemaVersion", path)?;
    if version.as_u64() != Some(u64::from(GRAPH_SCHEMA_VERSION)) {
        return Err(ParseError::Version {
            path: join(path, "schemaVersion"),
            found: version.to_string(),
            expected: GRAPH_SCHEMA_VERSION,
        });
    }
    str_field(graph, "canvasId", path)?;
    str_field(graph, "projectId", path)?;
    array_field(graph, "nodes", path)?;
    array_field(graph, "edges", path)?;
    array_field(graph, "datasetRefs", path)?;
    Ok(())
}

fn check_asset(asset: &Value, path: &str) -> Result<(), ParseError> {
    let asset = as_object(asset, path)?;
    let encoding = str_field(asset, "encoding", path)?;
    str_field(asset, "name", path)?;
    str_field(asset, "mimeType", path)?;
    u64_field(asset, "sizeBytes", path)?;
    match encoding {
        "base64" => {
            str_field(asset, "data", path)?;
            str_field(asset, "sha256", path)?;
        }
        "reference" => {
            str_field(asset, "pointer", path)?;
            optional_str_field(asset, "sha256", path)?;
        }
        other => {
            return Err(invalid(
                join(path, "encoding"),
                format!("unknown asset encoding `{other}`"),
            ));
        }
    }
    Ok(())
}

// ── Field helpers ──

fn join(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

fn index(path: &str, idx: usize) -> String {
    format!("{path}[{idx}]")
}

fn missing(path: impl Into<String>) -> ParseError {
    ParseError::Missing { path: path.into() }
}

fn wrong_type(path: impl Into<String>, expected: &'static str) -> ParseError {
    ParseError::WrongType {
        path: path.into(),
        expected,
    }
}

fn invalid(path: impl Into<String>, message: impl Into<String>) -> ParseError {
    ParseError::Invalid {
        path: path.into(),
        message: message.into(),
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Object, ParseError> {
    value.as_object().ok_or_else(|| wrong_type(path, "object"))
}

fn field<'a>(obj: &'a Object, key: &str, path: &str) -> Result<&'a Value, ParseError> {
    obj.get(key).ok_or_else(|| missing(join(path, key)))
}

fn object_field<'a>(obj: &'a Object, key: &str, path: &str) -> Result<&'a Object, ParseError> {
    as_object(field(obj, key, path)?, &join(path, key))
}

fn array_field<'a>(obj: &'a Object, key: &str, path: &str) -> Result<&'a Vec<Value>, ParseError> {
    field(obj, key, path)?
        .as_array()
        .ok_or_else(|| wrong_type(join(path, key), "array"))
}

fn str_field<'a>(obj: &'a Object, key: &str, path: &str) -> Result<&'a str, ParseError> {
    field(obj, key, path)?
        .as_str()
        .ok_or_else(|| wrong_type(join(path, key), "string"))
}

/// Absent and `null` both read as `None`.
fn optional_str_field<'a>(
    obj: &'a Object,
    key: &str,
    path: &str,
) -> Result<Option<&'a str>, ParseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(wrong_type(join(path, key), "string or null")),
    }
}

fn u64_field(obj: &Object, key: &str, path: &str) -> Result<u64, ParseError> {
    field(obj, key, path)?
        .as_u64()
        .ok_or_else(|| wrong_type(join(path, key), "non-negative integer"))
}

fn i64_field(obj: &Object, key: &str, path: &str) -> Result<i64, ParseError> {
    field(obj, key, path)?
        .as_i64()
        .ok_or_else(|| wrong_type(join(path, key), "integer"))
}

fn number_field(obj: &Object, key: &str, path: &str) -> Result<f64, ParseError> {
    field(obj, key, path)?
        .as_f64()
        .ok_or_else(|| wrong_type(join(path, key), "number"))
}

fn timestamp_field(obj: &Object, key: &str, path: &str) -> Result<(), ParseError> {
    let raw = str_field(obj, key, path)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|e| invalid(join(path, key), format!("not an RFC 3339 timestamp: {e}")))
}
