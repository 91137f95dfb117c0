//! SHA-256 digests over canonicalized payloads.
//!
//! Two levels:
//! - canvas hash: `{nodes, edges, variablesSnapshot}` of one canvas
//! - project hash: project metadata, position-sorted canvas essentials, and
//!   the sorted asset manifest
//!
//! Identical logical input always yields the identical digest. Canvas
//! positions are hashed content, so a real reorder changes the project hash.

use crate::canonical::canonicalize;
use crate::error::HashError;
use crate::model::{
    AssetEntry, AssetManifestEntry, CanvasEntry, GraphDocument, ProjectMeta, VariablesMap,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("{hash:x}")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanvasHashMaterial<'a> {
    nodes: &'a [Value],
    edges: &'a [Value],
    variables_snapshot: &'a VariablesMap,
}

/// Digest of one canvas's content together with the project variables.
pub fn hash_canvas(graph: &GraphDocument, variables: &VariablesMap) -> Result<String, HashError> {
    ensure_finite_variables(variables)?;
    let material = CanvasHashMaterial {
        nodes: &graph.nodes,
        edges: &graph.edges,
        variables_snapshot: variables,
    };
    Ok(sha256_hex(&canonicalize(&material)?))
}

/// Inputs to the aggregate project digest.
#[derive(Debug, Clone, Copy)]
pub struct ProjectHashInput<'a> {
    pub project: &'a ProjectMeta,
    pub canvases: &'a [CanvasEntry],
    pub assets: &'a [AssetEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphEssentials<'a> {
    schema_version: u32,
    nodes: &'a [Value],
    edges: &'a [Value],
    dataset_refs: &'a [Value],
}

#[derive(Serialize)]
struct CanvasEssentials<'a> {
    id: &'a str,
    name: &'a str,
    position: i64,
    graph: GraphEssentials<'a>,
}

#[derive(Serialize)]
struct ProjectHashMaterial<'a> {
    project: &'a ProjectMeta,
    canvases: Vec<CanvasEssentials<'a>>,
    assets: Vec<AssetManifestEntry>,
}

/// Aggregate digest over the whole project.
///
/// Canvases are reduced to their essentials and ordered by `(position, id)`;
/// graph back-references are not content and are left out.
pub fn hash_project(input: ProjectHashInput<'_>) -> Result<String, HashError> {
    ensure_finite_variables(&input.project.variables)?;

    let mut canvases: Vec<&CanvasEntry> = input.canvases.iter().collect();
    canvases.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));

    let material = ProjectHashMaterial {
        project: input.project,
        canvases: canvases
            .into_iter()
            .map(|canvas| CanvasEssentials {
                id: &canvas.id,
                name: &canvas.name,
                position: canvas.position,
                graph: GraphEssentials {
                    schema_version: canvas.graph.schema_version,
                    nodes: &canvas.graph.nodes,
                    edges: &canvas.graph.edges,
                    dataset_refs: &canvas.graph.dataset_refs,
                },
            })
            .collect(),
        assets: asset_manifest(input.assets),
    };
    Ok(sha256_hex(&canonicalize(&material)?))
}

/// Manifest entries for `assets`, sorted by `(name, pointer)`.
pub fn asset_manifest(assets: &[AssetEntry]) -> Vec<AssetManifestEntry> {
    let mut sorted: Vec<&AssetEntry> = assets.iter().collect();
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    sorted.into_iter().map(AssetEntry::manifest_entry).collect()
}

/// Reject NaN and infinities before they can be silently coerced to `null`.
pub fn ensure_finite_variables(variables: &VariablesMap) -> Result<(), HashError> {
    match variables.iter().find(|(_, var)| !var.value.is_finite()) {
        Some((id, _)) => Err(HashError::NonFinite {
            path: format!("project.variables.{id}.value"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variable;
    use serde_json::json;

    fn variables() -> VariablesMap {
        let mut vars = VariablesMap::new();
        vars.insert("rate".into(), Variable::new("rate", "Rate", 0.5));
        vars.insert("count".into(), Variable::new("count", "Count", 3.0));
        vars
    }

    fn graph() -> GraphDocument {
        let mut graph = GraphDocument::empty("c1", "p1");
        graph.nodes = vec![json!({"id": "n1", "type": "source", "data": {"k": 1}})];
        graph.edges = vec![json!({"id": "e1", "source": "n1", "target": "n2"})];
        graph
    }

    fn project() -> ProjectMeta {
        ProjectMeta {
            id: "p1".into(),
            name: "Demo".into(),
            description: String::new(),
            active_canvas_id: Some("c1".into()),
            variables: variables(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
        }
    }

    #[test]
    fn known_digest_for_hello_world() {
        assert_eq!(
            sha256_hex(b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn canvas_hash_is_stable() {
        let a = hash_canvas(&graph(), &variables()).unwrap();
        let b = hash_canvas(&graph(), &variables()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn canvas_hash_ignores_back_references() {
        let mut moved = graph();
        moved.canvas_id = "other".into();
        moved.project_id = "other".into();
        assert_eq!(
            hash_canvas(&graph(), &variables()).unwrap(),
            hash_canvas(&moved, &variables()).unwrap()
        );
    }

    #[test]
    fn single_field_mutations_change_canvas_hash() {
        let base = hash_canvas(&graph(), &variables()).unwrap();

        let mut node_changed = graph();
        node_changed.nodes[0]["data"]["k"] = json!(2);
        assert_ne!(base, hash_canvas(&node_changed, &variables()).unwrap());

        let mut edge_changed = graph();
        edge_changed.edges[0]["target"] = json!("n3");
        assert_ne!(base, hash_canvas(&edge_changed, &variables()).unwrap());

        let mut vars = variables();
        if let Some(var) = vars.get_mut("rate") {
            var.value = 0.5000001;
        }
        assert_ne!(base, hash_canvas(&graph(), &vars).unwrap());
    }

    #[test]
    fn non_finite_variable_is_rejected() {
        let mut vars = variables();
        vars.insert("bad".into(), Variable::new("bad", "Bad", f64::NAN));
        let err = hash_canvas(&graph(), &vars).unwrap_err();
        assert!(matches!(
            err,
            HashError::NonFinite { ref path } if path == "project.variables.bad.value"
        ));

        vars.insert("bad".into(), Variable::new("bad", "Bad", f64::INFINITY));
        assert!(hash_canvas(&graph(), &vars).is_err());
    }

    #[test]
    fn project_hash_tracks_canvas_positions() {
        let project = project();
        let canvases = vec![
            CanvasEntry {
                id: "c1".into(),
                name: "One".into(),
                position: 0,
                graph: graph(),
            },
            CanvasEntry {
                id: "c2".into(),
                name: "Two".into(),
                position: 1,
                graph: GraphDocument::empty("c2", "p1"),
            },
        ];
        let base = hash_project(ProjectHashInput {
            project: &project,
            canvases: &canvases,
            assets: &[],
        })
        .unwrap();

        // Same data listed in a different order hashes identically.
        let reversed: Vec<CanvasEntry> = canvases.iter().rev().cloned().collect();
        let same = hash_project(ProjectHashInput {
            project: &project,
            canvases: &reversed,
            assets: &[],
        })
        .unwrap();
        assert_eq!(base, same);

        // A true reorder changes the digest.
        let mut swapped = canvases.clone();
        swapped[0].position = 1;
        swapped[1].position = 0;
        let reordered = hash_project(ProjectHashInput {
            project: &project,
            canvases: &swapped,
            assets: &[],
        })
        .unwrap();
        assert_ne!(base, reordered);
    }
}
