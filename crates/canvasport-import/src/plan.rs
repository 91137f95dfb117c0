//! Pure import planning: fresh identifiers, compacted positions, rewritten
//! back-references. Nothing here touches persistence.

use crate::ids::IdGenerator;
use canvasport_kernel::{AssetEntry, GraphDocument, ProjectDocument, ProjectMeta};
use serde::Serialize;
use std::collections::BTreeMap;

/// Old → new identifiers for one import attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRemap {
    pub project: Option<(String, String)>,
    pub canvases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCanvas {
    pub original_id: String,
    pub id: String,
    pub name: String,
    pub position: i64,
    pub graph: GraphDocument,
}

impl PlannedCanvas {
    pub fn blob_key(&self) -> String {
        format!(
            "projects/{}/canvases/{}.json",
            self.graph.project_id, self.id
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImportPlan {
    /// Project metadata carrying the fresh id and resolved active canvas.
    pub project: ProjectMeta,
    pub remap: IdRemap,
    pub canvases: Vec<PlannedCanvas>,
    pub assets: Vec<AssetEntry>,
}

impl NormalizedImportPlan {
    pub fn project_id(&self) -> &str {
        &self.project.id
    }
}

/// Build the plan for importing `document` under fresh identifiers.
pub fn plan(document: &ProjectDocument, ids: &mut dyn IdGenerator) -> NormalizedImportPlan {
    let project_id = ids.next_id();

    let mut ordered: Vec<_> = document.canvases.iter().collect();
    ordered.sort_by_key(|canvas| canvas.position);

    let mut canvas_ids = BTreeMap::new();
    let mut canvases = Vec::with_capacity(ordered.len());
    for (index, canvas) in ordered.into_iter().enumerate() {
        let id = ids.next_id();
        canvas_ids.insert(canvas.id.clone(), id.clone());

        let mut graph = canvas.graph.clone();
        graph.canvas_id = id.clone();
        graph.project_id = project_id.clone();

        canvases.push(PlannedCanvas {
            original_id: canvas.id.clone(),
            id,
            name: canvas.name.clone(),
            position: index as i64,
            graph,
        });
    }

    let active_canvas_id = document
        .project
        .active_canvas_id
        .as_ref()
        .and_then(|old| canvas_ids.get(old))
        .or_else(|| canvases.first().map(|canvas| &canvas.id))
        .cloned();

    let project = ProjectMeta {
        id: project_id.clone(),
        active_canvas_id,
        ..document.project.clone()
    };

    tracing::debug!(
        project_id = %project_id,
        canvases = canvases.len(),
        "import plan built"
    );

    NormalizedImportPlan {
        project,
        remap: IdRemap {
            project: Some((document.project.id.clone(), project_id)),
            canvases: canvas_ids,
        },
        canvases,
        assets: document.assets.clone(),
    }
}
