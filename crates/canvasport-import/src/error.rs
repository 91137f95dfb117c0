use canvasport_coherence::IssueCode;
use canvasport_kernel::CanonicalError;
use canvasport_store::StoreError;

/// Failure of a structural import step. Folded into the report, never
/// returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("graph serialization failed: {0}")]
    Serialize(#[from] CanonicalError),
}

impl ImportError {
    pub fn code(&self) -> IssueCode {
        match self {
            Self::Cancelled => IssueCode::Aborted,
            Self::Store(_) | Self::Serialize(_) => IssueCode::ImportFailed,
        }
    }
}
