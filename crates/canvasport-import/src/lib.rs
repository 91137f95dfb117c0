//! # Canvasport Import
//!
//! Turns a validated `ProjectDocument` into persisted rows, blobs and
//! assets under fresh identifiers.
//!
//! ```text
//! plan          ← pure: new ids, compacted positions, rewritten references
//! orchestrator  ← project row → canvas blobs + rows → assets
//!                 (rolls back on failure or cancellation before assets)
//! report        ← JSON / text audit record of the attempt
//! ```

pub mod cancel;
pub mod error;
pub mod ids;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod report;

pub use cancel::CancellationFlag;
pub use error::ImportError;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use orchestrator::{ImportOptions, ImportResult, Operation, run_import};
pub use plan::{IdRemap, NormalizedImportPlan, PlannedCanvas, plan};
pub use progress::{ImportPhase, ProgressEvent, ProgressSink};
pub use report::{ImportReport, ImportStatus};
