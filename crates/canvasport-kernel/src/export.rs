//! Pure export assembly: live project snapshot -> `ProjectDocument`.
//!
//! Order of operations:
//! 1. sort canvases by position
//! 2. hash every canvas (in parallel; results keep position order)
//! 3. sort assets by `(name, pointer)` and derive the asset manifest
//! 4. hash the project over the sorted data
//! 5. assemble the document
//!
//! No I/O happens here. Hash failures propagate.

use crate::canonical::canonicalize_pretty;
use crate::error::{ExportError, HashError};
use crate::hash::{
    ProjectHashInput, asset_manifest, ensure_finite_variables, hash_canvas, hash_project,
};
use crate::model::{
    AssetEntry, CanvasEntry, CanvasHash, ExporterInfo, FORMAT_TAG, FORMAT_VERSION, HashManifest,
    ProjectDocument, ProjectMeta,
};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Everything export needs from the live project.
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub project: ProjectMeta,
    pub canvases: Vec<CanvasEntry>,
    pub assets: Vec<AssetEntry>,
    pub exporter: ExporterInfo,
    /// RFC 3339 timestamp, supplied by the caller so export stays pure.
    pub exported_at: String,
}

/// Assemble a complete, self-describing document.
pub fn build_export(args: &ExportArgs) -> Result<ProjectDocument, ExportError> {
    let mut seen = BTreeSet::new();
    for canvas in &args.canvases {
        if !seen.insert(canvas.id.as_str()) {
            return Err(ExportError::DuplicateCanvasId(canvas.id.clone()));
        }
    }

    let mut canvases = args.canvases.clone();
    canvases.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
    for canvas in &mut canvases {
        canvas.graph.canvas_id = canvas.id.clone();
        canvas.graph.project_id = args.project.id.clone();
    }

    let variables = &args.project.variables;
    let canvas_hashes = canvases
        .par_iter()
        .map(|canvas| {
            hash_canvas(&canvas.graph, variables).map(|hash| CanvasHash {
                id: canvas.id.clone(),
                hash,
            })
        })
        .collect::<Result<Vec<_>, HashError>>()?;

    let mut assets = args.assets.clone();
    assets.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let asset_entries = asset_manifest(&assets);

    let project_hash = hash_project(ProjectHashInput {
        project: &args.project,
        canvases: &canvases,
        assets: &assets,
    })?;

    tracing::debug!(
        project_id = %args.project.id,
        canvases = canvases.len(),
        assets = assets.len(),
        project_hash = %project_hash,
        "export assembled"
    );

    Ok(ProjectDocument {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        exported_at: args.exported_at.clone(),
        exporter: args.exporter.clone(),
        hash_manifest: HashManifest {
            project_hash,
            canvases: canvas_hashes,
            assets: asset_entries,
        },
        project: args.project.clone(),
        canvases,
        assets,
    })
}

/// On-disk bytes for a document: canonical, pretty-printed.
///
/// Non-finite variables are rejected rather than written as `null`.
pub fn serialize_document(document: &ProjectDocument) -> Result<Vec<u8>, ExportError> {
    ensure_finite_variables(&document.project.variables)?;
    Ok(canonicalize_pretty(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{embed, reference};
    use crate::model::{GraphDocument, Variable, VariablesMap};
    use serde_json::json;

    fn args() -> ExportArgs {
        let mut variables = VariablesMap::new();
        variables.insert("gain".into(), Variable::new("gain", "Gain", 1.25));
        variables.insert("offset".into(), Variable::new("offset", "Offset", -4.0));

        let mut first = GraphDocument::empty("c-a", "p1");
        first.nodes = vec![json!({"id": "n1", "kind": "input"})];
        let mut second = GraphDocument::empty("c-b", "p1");
        second.nodes = vec![json!({"id": "n2", "kind": "output"})];
        second.edges = vec![json!({"from": "n2", "to": "n2"})];

        ExportArgs {
            project: ProjectMeta {
                id: "p1".into(),
                name: "Signal chain".into(),
                description: "two canvases".into(),
                active_canvas_id: Some("c-b".into()),
                variables,
                created_at: "2024-03-01T10:00:00Z".into(),
                updated_at: "2024-03-02T10:00:00Z".into(),
            },
            canvases: vec![
                CanvasEntry {
                    id: "c-b".into(),
                    name: "Second".into(),
                    position: 5,
                    graph: second,
                },
                CanvasEntry {
                    id: "c-a".into(),
                    name: "First".into(),
                    position: 1,
                    graph: first,
                },
            ],
            assets: vec![
                AssetEntry::Referenced(reference(
                    "video.mp4",
                    "video/mp4",
                    1024,
                    "s3://media/video.mp4",
                    None,
                )),
                AssetEntry::Embedded(embed("data.csv", "text/csv", b"a,b\n1,2\n")),
            ],
            exporter: ExporterInfo {
                tool_version: "0.1.0".into(),
                build_info: "test".into(),
                engine_version: "3.2.0".into(),
                engine_contract_version: "2".into(),
            },
            exported_at: "2024-03-03T00:00:00Z".into(),
        }
    }

    #[test]
    fn double_export_is_byte_identical() {
        let a = build_export(&args()).unwrap();
        let b = build_export(&args()).unwrap();
        assert_eq!(a.hash_manifest.project_hash, b.hash_manifest.project_hash);
        assert_eq!(serialize_document(&a).unwrap(), serialize_document(&b).unwrap());
    }

    #[test]
    fn two_canvas_golden_shape() {
        let doc = build_export(&args()).unwrap();
        assert_eq!(doc.hash_manifest.canvases.len(), 2);
        let hash = &doc.hash_manifest.project_hash;
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn canvases_and_manifest_follow_position_order() {
        let doc = build_export(&args()).unwrap();
        let ids: Vec<&str> = doc.canvases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-a", "c-b"]);
        let manifest_ids: Vec<&str> = doc
            .hash_manifest
            .canvases
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(manifest_ids, ids);
    }

    #[test]
    fn assets_are_sorted_by_name_then_pointer() {
        let doc = build_export(&args()).unwrap();
        let names: Vec<&str> = doc.assets.iter().map(AssetEntry::name).collect();
        assert_eq!(names, vec!["data.csv", "video.mp4"]);
        assert_eq!(doc.hash_manifest.assets[1].name, "s3://media/video.mp4");
        assert_eq!(doc.hash_manifest.assets[1].sha256, None);
    }

    #[test]
    fn back_references_are_stamped() {
        let mut input = args();
        input.canvases[0].graph.canvas_id = "stale".into();
        let doc = build_export(&input).unwrap();
        for canvas in &doc.canvases {
            assert_eq!(canvas.graph.canvas_id, canvas.id);
            assert_eq!(canvas.graph.project_id, "p1");
        }
    }

    #[test]
    fn input_order_does_not_affect_output() {
        let mut reversed = args();
        reversed.canvases.reverse();
        reversed.assets.reverse();
        assert_eq!(
            serialize_document(&build_export(&args()).unwrap()).unwrap(),
            serialize_document(&build_export(&reversed).unwrap()).unwrap()
        );
    }

    #[test]
    fn non_finite_variable_fails_export() {
        let mut input = args();
        input
            .project
            .variables
            .insert("nan".into(), Variable::new("nan", "NaN", f64::NAN));
        assert!(matches!(
            build_export(&input),
            Err(ExportError::Hash(HashError::NonFinite { .. }))
        ));
    }

    #[test]
    fn duplicate_canvas_ids_are_rejected() {
        let mut input = args();
        input.canvases[1].id = "c-b".into();
        assert!(matches!(
            build_export(&input),
            Err(ExportError::DuplicateCanvasId(id)) if id == "c-b"
        ));
    }
}
