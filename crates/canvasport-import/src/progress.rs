use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    Validating,
    Creating,
    Canvases,
    Assets,
    Done,
    Failed,
}

impl ImportPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Creating => "creating",
            Self::Canvases => "canvases",
            Self::Assets => "assets",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ImportPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl ProgressEvent {
    pub fn phase(phase: ImportPhase) -> Self {
        Self {
            phase,
            current: None,
            total: None,
        }
    }

    pub fn step(phase: ImportPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current: Some(current),
            total: Some(total),
        }
    }
}

/// Receives progress events; must be cheap and must not block.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
