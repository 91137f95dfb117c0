//! Import runs against the in-memory backend, including rollback paths.

use canvasport_coherence::{IssueCode, ValidationResult, validate_document};
use canvasport_import::{
    CancellationFlag, ImportOptions, ImportPhase, Operation, ProgressEvent, ProgressSink,
    SequentialIds, run_import,
};
use canvasport_kernel::asset::embed;
use canvasport_kernel::{
    AssetEntry, CanvasEntry, ExportArgs, ExporterInfo, GraphDocument, ProjectDocument,
    ProjectMeta, ReferencedAsset, Variable, VariablesMap, build_export,
};
use canvasport_store::{FaultPlan, MemoryStore};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

fn exported() -> ProjectDocument {
    let mut variables = VariablesMap::new();
    variables.insert("k".into(), Variable::new("k", "K", 2.0));

    let canvases = (0..3)
        .map(|i| {
            let id = format!("old-c{i}");
            let mut graph = GraphDocument::empty(&id, "old-p");
            graph.nodes = vec![json!({"id": format!("n{i}"), "data": {"i": i}})];
            CanvasEntry {
                id,
                name: format!("Canvas {i}"),
                position: i64::from(i) * 10,
                graph,
            }
        })
        .collect();

    build_export(&ExportArgs {
        project: ProjectMeta {
            id: "old-p".into(),
            name: "Imported".into(),
            description: String::new(),
            active_canvas_id: Some("old-c1".into()),
            variables,
            created_at: "2024-02-01T00:00:00Z".into(),
            updated_at: "2024-02-02T00:00:00Z".into(),
        },
        canvases,
        assets: vec![
            AssetEntry::Embedded(embed("a.csv", "text/csv", b"a,1\n")),
            AssetEntry::Embedded(embed("b.csv", "text/csv", b"b,2\n")),
            AssetEntry::Referenced(ReferencedAsset {
                name: "clip.mp4".into(),
                mime_type: "video/mp4".into(),
                size_bytes: 1 << 30,
                pointer: "https://cdn.example.test/clip.mp4".into(),
                sha256: None,
            }),
        ],
        exporter: ExporterInfo::default(),
        exported_at: "2024-02-03T00:00:00Z".into(),
    })
    .expect("export should succeed")
}

fn validated(document: &ProjectDocument) -> ValidationResult {
    let validation = validate_document(document);
    assert!(validation.ok, "{:?}", validation.errors);
    validation
}

fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let sink: ProgressSink = Arc::new(move |event: ProgressEvent| {
        sink_events.lock().expect("events lock").push(event);
    });
    (sink, events)
}

fn cancel_on(flag: CancellationFlag, phase: ImportPhase, current: usize) -> ProgressSink {
    Arc::new(move |event: ProgressEvent| {
        if event.phase == phase && event.current == Some(current) {
            flag.cancel();
        }
    })
}

#[tokio::test]
async fn successful_import_persists_everything() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::new();
    let (sink, events) = recording_sink();
    let options = ImportOptions {
        progress: Some(sink),
        ..ImportOptions::default()
    };

    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &options,
    )
    .await;

    assert!(result.ok, "{:?}", result.errors);
    assert_eq!(result.project_id.as_deref(), Some("new-1"));
    assert_eq!(result.canvases_imported, 3);
    assert_eq!(result.assets_uploaded, 2);
    assert_eq!(result.unreferenced_assets, vec!["clip.mp4"]);
    assert_eq!(result.id_remap.canvases["old-c1"], "new-3");

    assert_eq!(store.canvas_count(), 3);
    assert_eq!(store.object_count(), 3);
    assert_eq!(store.asset_names(), vec!["a.csv", "b.csv"]);
    let project = store.project("new-1").expect("project row");
    assert_eq!(project.active_canvas_id.as_deref(), Some("new-3"));
    assert_eq!(project.variables["k"].value, 2.0);

    let positions: Vec<i64> = store.canvases().iter().map(|c| c.position).collect();
    assert_eq!(
        positions.iter().copied().collect::<BTreeSet<_>>(),
        BTreeSet::from([0, 1, 2])
    );

    let blob = store
        .object("projects/new-1/canvases/new-2.json")
        .expect("first canvas blob");
    let graph: Value = serde_json::from_slice(&blob).expect("blob is JSON");
    assert_eq!(graph["canvasId"], "new-2");
    assert_eq!(graph["projectId"], "new-1");
    assert_eq!(graph["nodes"][0]["id"], "n0");

    let events = events.lock().expect("events lock");
    assert_eq!(
        events.first().map(|e| e.phase),
        Some(ImportPhase::Validating)
    );
    assert_eq!(events.last().map(|e| e.phase), Some(ImportPhase::Done));
    assert!(events.contains(&ProgressEvent::step(ImportPhase::Canvases, 3, 3)));
}

#[tokio::test]
async fn corrupted_asset_is_isolated() {
    let mut document = exported();
    for asset in &mut document.assets {
        if let AssetEntry::Embedded(embedded) = asset
            && embedded.name == "b.csv"
        {
            embedded.data = embed("b.csv", "text/csv", b"b,9\n").data;
        }
    }
    let validation = validated(&document);
    assert!(validation.has_warning(IssueCode::AssetHashMismatch));

    let store = MemoryStore::new();
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(result.ok);
    assert_eq!(result.assets_uploaded, 1);
    assert!(result.unreferenced_assets.contains(&"b.csv".to_string()));
    assert!(result.unreferenced_assets.contains(&"clip.mp4".to_string()));
    assert_eq!(store.asset_names(), vec!["a.csv"]);
}

#[tokio::test]
async fn failed_upload_is_isolated() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::with_faults(FaultPlan {
        fail_assets: BTreeSet::from(["a.csv".to_string()]),
        ..FaultPlan::default()
    });
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(result.ok);
    assert_eq!(store.asset_names(), vec!["b.csv"]);
    assert!(
        result
            .operations
            .iter()
            .any(|op| matches!(op, Operation::SkipAsset { name, .. } if name == "a.csv"))
    );
}

#[tokio::test]
async fn canvas_failure_rolls_back_everything() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::with_faults(FaultPlan {
        fail_canvas_after: Some(2),
        ..FaultPlan::default()
    });
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(!result.ok);
    assert!(result.has_error(IssueCode::ImportFailed));
    assert_eq!(result.project_id, None);
    assert!(store.is_empty(), "rollback left data behind");

    let deletes: Vec<&Operation> = result
        .operations
        .iter()
        .filter(|op| {
            matches!(
                op,
                Operation::DeleteObject { .. }
                    | Operation::DeleteCanvas { .. }
                    | Operation::DeleteProject { .. }
            )
        })
        .collect();
    // Three blobs (the third was written before its row failed), two rows, one project.
    assert_eq!(deletes.len(), 6);
    assert!(matches!(
        deletes.last(),
        Some(Operation::DeleteProject { id }) if id == "new-1"
    ));
}

#[tokio::test]
async fn cleanup_failures_are_swallowed() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::with_faults(FaultPlan {
        fail_canvas_after: Some(1),
        fail_deletes: true,
        ..FaultPlan::default()
    });
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(!result.ok);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].code, IssueCode::ImportFailed);
    assert!(
        result
            .operations
            .iter()
            .any(|op| matches!(op, Operation::CleanupFailed { .. }))
    );
}

#[tokio::test]
async fn cancellation_mid_canvases_aborts_and_cleans_up() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::new();
    let flag = CancellationFlag::new();
    let options = ImportOptions {
        cancel: flag.clone(),
        progress: Some(cancel_on(flag, ImportPhase::Canvases, 1)),
    };
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &options,
    )
    .await;

    assert!(!result.ok);
    assert!(result.has_error(IssueCode::Aborted));
    assert!(store.is_empty());
}

#[tokio::test]
async fn cancellation_before_assets_still_rolls_back() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::new();
    let flag = CancellationFlag::new();
    let options = ImportOptions {
        cancel: flag.clone(),
        progress: Some(cancel_on(flag, ImportPhase::Canvases, 3)),
    };
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &options,
    )
    .await;

    assert!(result.has_error(IssueCode::Aborted));
    assert!(store.is_empty());
    assert!(store.asset_names().is_empty());
}

#[tokio::test]
async fn failed_validation_touches_nothing() {
    let document = exported();
    let mut validation = validated(&document);
    validation.ok = false;
    validation.errors.push(canvasport_coherence::ImportIssue::new(
        IssueCode::SecretDetected,
        "sensitive field `token` must not be exported",
    ));
    let store = MemoryStore::new();
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(!result.ok);
    assert!(result.has_error(IssueCode::SecretDetected));
    assert!(result.operations.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn project_row_failure_reports_import_failed() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::with_faults(FaultPlan {
        fail_project: true,
        ..FaultPlan::default()
    });
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;

    assert!(result.has_error(IssueCode::ImportFailed));
    assert!(result.operations.is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn stale_back_reference_is_corrected_on_import() {
    let mut document = exported();
    document.canvases[0].graph.canvas_id = "someone-else".into();
    let validation = validate_document(&document);
    assert!(validation.ok);
    assert!(validation.has_warning(IssueCode::CanvasIdMismatch));

    let store = MemoryStore::new();
    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &ImportOptions::default(),
    )
    .await;
    assert!(result.ok);

    let blob = store
        .object("projects/new-1/canvases/new-2.json")
        .expect("first canvas blob");
    let graph: Value = serde_json::from_slice(&blob).expect("blob is JSON");
    assert_eq!(graph["canvasId"], "new-2");
}

#[tokio::test]
async fn asset_progress_counts_each_completed_upload() {
    let document = exported();
    let validation = validated(&document);
    let store = MemoryStore::new();
    let (sink, events) = recording_sink();
    let options = ImportOptions {
        progress: Some(sink),
        ..ImportOptions::default()
    };

    let result = run_import(
        &document,
        &validation,
        &store,
        &store,
        &mut SequentialIds::new("new"),
        &options,
    )
    .await;
    assert!(result.ok, "{:?}", result.errors);

    let events = events.lock().expect("events lock");
    let asset_steps: Vec<(Option<usize>, Option<usize>)> = events
        .iter()
        .filter(|event| event.phase == ImportPhase::Assets)
        .map(|event| (event.current, event.total))
        .collect();
    let total = document.assets.len();
    let expected: Vec<_> = (1..=total).map(|n| (Some(n), Some(total))).collect();
    assert_eq!(asset_steps, expected);

    let names: Vec<&str> = result
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::UploadAsset { name, .. } | Operation::SkipAsset { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        })
        .collect();
    let document_order: Vec<&str> = document.assets.iter().map(AssetEntry::name).collect();
    assert_eq!(names, document_order);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_runs_on_a_spawned_task() {
    let document = exported();
    let validation = validated(&document);
    let store = Arc::new(MemoryStore::new());
    let task_store = Arc::clone(&store);

    let handle = tokio::spawn(async move {
        let mut ids = SequentialIds::new("spawned");
        run_import(
            &document,
            &validation,
            task_store.as_ref(),
            task_store.as_ref(),
            &mut ids,
            &ImportOptions::default(),
        )
        .await
    });
    let result = handle.await.expect("import task should not panic");

    assert!(result.ok, "{:?}", result.errors);
    assert_eq!(result.project_id.as_deref(), Some("spawned-1"));
    assert_eq!(store.canvas_count(), 3);
}
