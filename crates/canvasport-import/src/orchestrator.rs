//! Compensating import run.
//!
//! Steps 1 (project row) and 2 (canvas blobs + rows) are all-or-nothing:
//! any failure or observed cancellation deletes what was written, in reverse
//! dependency order. Step 3 (assets) isolates failures per asset.

use crate::cancel::CancellationFlag;
use crate::error::ImportError;
use crate::ids::IdGenerator;
use crate::plan::{IdRemap, NormalizedImportPlan, plan};
use crate::progress::{ImportPhase, ProgressEvent, ProgressSink};
use canvasport_coherence::{ImportIssue, IssueCode, ValidationResult};
use canvasport_kernel::asset::decode_verified;
use canvasport_kernel::{AssetEntry, ProjectDocument, canonicalize};
use canvasport_store::{AssetStorage, AssetUpload, CanvasRecord, ProjectRecord, ProjectStore};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Default)]
pub struct ImportOptions {
    pub cancel: CancellationFlag,
    pub progress: Option<ProgressSink>,
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ImportOptions {
    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.progress {
            sink(event);
        }
    }

    fn checkpoint(&self) -> Result<(), ImportError> {
        if self.cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }
}

/// One persistence action taken (or undone) during an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    CreateProject { id: String },
    PutObject { key: String },
    CreateCanvas { id: String },
    UploadAsset { name: String, pointer: String },
    SkipAsset { name: String, reason: String },
    DeleteObject { key: String },
    DeleteCanvas { id: String },
    DeleteProject { id: String },
    CleanupFailed { target: String, message: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateProject { id } => write!(f, "create project {id}"),
            Self::PutObject { key } => write!(f, "put object {key}"),
            Self::CreateCanvas { id } => write!(f, "create canvas {id}"),
            Self::UploadAsset { name, pointer } => write!(f, "upload asset {name} -> {pointer}"),
            Self::SkipAsset { name, reason } => write!(f, "skip asset {name}: {reason}"),
            Self::DeleteObject { key } => write!(f, "delete object {key}"),
            Self::DeleteCanvas { id } => write!(f, "delete canvas {id}"),
            Self::DeleteProject { id } => write!(f, "delete project {id}"),
            Self::CleanupFailed { target, message } => {
                write!(f, "cleanup of {target} failed: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub ok: bool,
    pub project_id: Option<String>,
    pub canvases_imported: usize,
    pub assets_uploaded: usize,
    pub unreferenced_assets: Vec<String>,
    pub id_remap: IdRemap,
    pub errors: Vec<ImportIssue>,
    pub operations: Vec<Operation>,
}

impl ImportResult {
    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }
}

/// What steps 1–2 managed to write, for compensation.
#[derive(Debug, Default)]
struct Journal {
    project: Option<String>,
    canvases: Vec<String>,
    objects: Vec<String>,
    operations: Vec<Operation>,
}

enum AssetOutcome {
    Uploaded { name: String, pointer: String },
    Unreferenced { name: String, reason: String },
}

/// Import `document` into `store` and `assets` under fresh identifiers.
///
/// Never fails: every outcome, including rejection and rollback, comes back
/// as an `ImportResult`.
pub async fn run_import(
    document: &ProjectDocument,
    validation: &ValidationResult,
    store: &dyn ProjectStore,
    assets: &dyn AssetStorage,
    ids: &mut (dyn IdGenerator + Send),
    options: &ImportOptions,
) -> ImportResult {
    options.emit(ProgressEvent::phase(ImportPhase::Validating));
    if !validation.ok {
        tracing::warn!(
            errors = validation.errors.len(),
            "import refused: document failed validation"
        );
        options.emit(ProgressEvent::phase(ImportPhase::Failed));
        return ImportResult {
            errors: validation.errors.clone(),
            ..ImportResult::default()
        };
    }

    let plan = plan(document, ids);
    let mut journal = Journal::default();

    // Cancellation is honored up to the start of step 3.
    let structural = match persist_structure(&plan, store, options, &mut journal).await {
        Ok(()) => options.checkpoint(),
        Err(error) => Err(error),
    };
    if let Err(error) = structural {
        tracing::warn!(project_id = %plan.project_id(), error = %error, "import rolled back");
        compensate(store, &mut journal).await;
        options.emit(ProgressEvent::phase(ImportPhase::Failed));
        return ImportResult {
            id_remap: plan.remap,
            errors: vec![ImportIssue::new(error.code(), error.to_string())],
            operations: journal.operations,
            ..ImportResult::default()
        };
    }

    let outcomes = upload_assets(&plan, assets, options).await;
    let mut operations = journal.operations;
    let mut assets_uploaded = 0;
    let mut unreferenced_assets = Vec::new();
    for outcome in outcomes {
        match outcome {
            AssetOutcome::Uploaded { name, pointer } => {
                assets_uploaded += 1;
                operations.push(Operation::UploadAsset { name, pointer });
            }
            AssetOutcome::Unreferenced { name, reason } => {
                unreferenced_assets.push(name.clone());
                operations.push(Operation::SkipAsset { name, reason });
            }
        }
    }

    options.emit(ProgressEvent::phase(ImportPhase::Done));
    tracing::info!(
        project_id = %plan.project_id(),
        canvases = plan.canvases.len(),
        assets_uploaded,
        unreferenced = unreferenced_assets.len(),
        "import complete"
    );

    ImportResult {
        ok: true,
        project_id: Some(plan.project_id().to_string()),
        canvases_imported: plan.canvases.len(),
        assets_uploaded,
        unreferenced_assets,
        id_remap: plan.remap,
        errors: Vec::new(),
        operations,
    }
}

async fn persist_structure(
    plan: &NormalizedImportPlan,
    store: &dyn ProjectStore,
    options: &ImportOptions,
    journal: &mut Journal,
) -> Result<(), ImportError> {
    options.checkpoint()?;
    options.emit(ProgressEvent::phase(ImportPhase::Creating));
    let project = &plan.project;
    store
        .create_project(&ProjectRecord {
            id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
            active_canvas_id: project.active_canvas_id.clone(),
            variables: project.variables.clone(),
            created_at: project.created_at.clone(),
            updated_at: project.updated_at.clone(),
        })
        .await?;
    journal.project = Some(project.id.clone());
    journal.operations.push(Operation::CreateProject {
        id: project.id.clone(),
    });

    let total = plan.canvases.len();
    for (index, canvas) in plan.canvases.iter().enumerate() {
        options.checkpoint()?;
        let key = canvas.blob_key();
        let bytes = canonicalize(&canvas.graph)?;
        store.put_object(&key, &bytes).await?;
        journal.objects.push(key.clone());
        journal
            .operations
            .push(Operation::PutObject { key: key.clone() });

        store
            .create_canvas(&CanvasRecord {
                id: canvas.id.clone(),
                project_id: project.id.clone(),
                name: canvas.name.clone(),
                position: canvas.position,
                blob_key: key,
                schema_version: canvas.graph.schema_version,
            })
            .await?;
        journal.canvases.push(canvas.id.clone());
        journal.operations.push(Operation::CreateCanvas {
            id: canvas.id.clone(),
        });
        options.emit(ProgressEvent::step(ImportPhase::Canvases, index + 1, total));
    }
    Ok(())
}

/// Best-effort undo: blobs, then canvas rows, then the project row.
async fn compensate(store: &dyn ProjectStore, journal: &mut Journal) {
    for key in std::mem::take(&mut journal.objects) {
        match store.delete_object(&key).await {
            Ok(()) => journal.operations.push(Operation::DeleteObject { key }),
            Err(error) => cleanup_failed(journal, key, error.to_string()),
        }
    }
    for id in std::mem::take(&mut journal.canvases) {
        match store.delete_canvas(&id).await {
            Ok(()) => journal.operations.push(Operation::DeleteCanvas { id }),
            Err(error) => cleanup_failed(journal, id, error.to_string()),
        }
    }
    if let Some(id) = journal.project.take() {
        match store.delete_project(&id).await {
            Ok(()) => journal.operations.push(Operation::DeleteProject { id }),
            Err(error) => cleanup_failed(journal, id, error.to_string()),
        }
    }
}

fn cleanup_failed(journal: &mut Journal, target: String, message: String) {
    tracing::warn!(resource = %target, error = %message, "compensating delete failed");
    journal
        .operations
        .push(Operation::CleanupFailed { target, message });
}

async fn upload_assets(
    plan: &NormalizedImportPlan,
    storage: &dyn AssetStorage,
    options: &ImportOptions,
) -> Vec<AssetOutcome> {
    let total = plan.assets.len();
    let project_id = plan.project_id();
    let mut pending: FuturesUnordered<_> = plan
        .assets
        .iter()
        .enumerate()
        .map(|(idx, asset)| async move { (idx, upload_one(asset, project_id, storage).await) })
        .collect();

    let mut outcomes = Vec::with_capacity(total);
    while let Some(finished) = pending.next().await {
        outcomes.push(finished);
        options.emit(ProgressEvent::step(
            ImportPhase::Assets,
            outcomes.len(),
            total,
        ));
    }
    // Report in document order regardless of completion order.
    outcomes.sort_by_key(|(idx, _)| *idx);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn upload_one(
    asset: &AssetEntry,
    project_id: &str,
    storage: &dyn AssetStorage,
) -> AssetOutcome {
    let embedded = match asset {
        AssetEntry::Embedded(embedded) => embedded,
        AssetEntry::Referenced(referenced) => {
            return AssetOutcome::Unreferenced {
                name: referenced.name.clone(),
                reason: format!("bytes live outside the document at {}", referenced.pointer),
            };
        }
    };

    let bytes = match decode_verified(embedded) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(asset = %embedded.name, error = %error, "asset skipped");
            return AssetOutcome::Unreferenced {
                name: embedded.name.clone(),
                reason: error.to_string(),
            };
        }
    };

    let upload = AssetUpload {
        project_id: project_id.to_string(),
        name: embedded.name.clone(),
        mime_type: embedded.mime_type.clone(),
        size_bytes: bytes.len() as u64,
        sha256: embedded.sha256.clone(),
    };
    match storage.upload(&upload, &bytes).await {
        Ok(pointer) => AssetOutcome::Uploaded {
            name: embedded.name.clone(),
            pointer,
        },
        Err(error) => {
            tracing::warn!(asset = %embedded.name, error = %error, "asset upload failed");
            AssetOutcome::Unreferenced {
                name: embedded.name.clone(),
                reason: error.to_string(),
            }
        }
    }
}
