//! Legacy graph upgrade.
//!
//! Older exports stored a canvas as `{graph: {nodes, edges}}` (or bare
//! `{nodes, edges}`) with no schema version. `migrate` lifts any such shape
//! into the current `GraphDocument`. It is total and idempotent: current
//! input comes back unchanged, and nothing is ever rejected.

use canvasport_kernel::{GRAPH_SCHEMA_VERSION, GraphDocument};
use serde_json::Value;

/// Whether `raw` already declares the current schema version.
pub fn is_current(raw: &Value) -> bool {
    raw.get("schemaVersion").and_then(Value::as_u64) == Some(u64::from(GRAPH_SCHEMA_VERSION))
}

/// Whether `raw` predates the current schema (absent or lower version).
///
/// A version above the current one is schema drift, not legacy, and is
/// left for strict parsing to reject.
pub fn needs_migration(raw: &Value) -> bool {
    match raw.get("schemaVersion") {
        None | Some(Value::Null) => true,
        Some(version) => version
            .as_u64()
            .is_some_and(|v| v < u64::from(GRAPH_SCHEMA_VERSION)),
    }
}

/// Upgrade `raw` into the current graph shape, stamping the supplied ids
/// when lifting a legacy payload.
pub fn migrate(raw: &Value, target_canvas_id: &str, target_project_id: &str) -> GraphDocument {
    if is_current(raw)
        && let Ok(graph) = serde_json::from_value::<GraphDocument>(raw.clone())
    {
        return graph;
    }

    let source = raw
        .get("graph")
        .filter(|inner| inner.is_object())
        .unwrap_or(raw);

    let dataset_refs = match array_or_empty(raw, "datasetRefs") {
        refs if refs.is_empty() => array_or_empty(source, "datasetRefs"),
        refs => refs,
    };

    GraphDocument {
        schema_version: GRAPH_SCHEMA_VERSION,
        canvas_id: target_canvas_id.to_string(),
        project_id: target_project_id.to_string(),
        nodes: array_or_empty(source, "nodes"),
        edges: array_or_empty(source, "edges"),
        dataset_refs,
    }
}

fn array_or_empty(value: &Value, key: &str) -> Vec<Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
