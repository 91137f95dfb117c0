use crate::config::Config;
use crate::support::{pre_import_or_exit, print_json, runtime_or_exit, write_file_or_exit};
use canvasport_import::{
    CancellationFlag, ImportOptions, ImportReport, ProgressEvent, ProgressSink, UuidIds,
    run_import,
};
use canvasport_store::FsStore;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

pub fn run(
    config: &Config,
    file: String,
    store: Option<String>,
    report: Option<String>,
    json_output: bool,
) {
    let pre = pre_import_or_exit(&file);
    let root = store
        .map(PathBuf::from)
        .unwrap_or_else(|| config.store.root.clone());
    let fs_store = FsStore::new(root);

    let cancel = CancellationFlag::new();
    let progress: ProgressSink = Arc::new(|event: ProgressEvent| {
        tracing::info!(
            phase = event.phase.as_str(),
            current = event.current,
            total = event.total,
            "import progress"
        );
    });
    let options = ImportOptions {
        cancel: cancel.clone(),
        progress: Some(progress),
    };

    let runtime = runtime_or_exit();
    let result = runtime.block_on(async move {
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling import");
                cancel.cancel();
            }
        });
        let mut ids = UuidIds;
        let result = run_import(
            &pre.document,
            &pre.validation,
            &fs_store,
            &fs_store,
            &mut ids,
            &options,
        )
        .await;
        watcher.abort();
        (pre.summary, pre.validation, result)
    });
    let (summary, validation, result) = result;
    let ok = result.ok;
    let import_report = ImportReport::new(summary, validation, result);

    if let Some(path) = report {
        let rendered = if path.ends_with(".json") {
            import_report.to_json().unwrap_or_else(|e| {
                eprintln!("error: failed to render report: {e}");
                process::exit(1);
            })
        } else {
            import_report.render_text()
        };
        write_file_or_exit(Path::new(&path), rendered.as_bytes());
        tracing::info!(report = %path, "import report written");
    }

    if json_output {
        print_json(&import_report);
    } else {
        print!("{}", import_report.render_text());
    }

    if !ok {
        process::exit(1);
    }
}
