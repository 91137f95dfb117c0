//! Findings emitted by validation, integrity checks and import.
//!
//! Findings are data, never errors: a caller collects the complete list and
//! decides whether to commit.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // ── Validation ──
    SecretDetected,
    EmailDetected,
    InvalidNumber,
    SchemaVersion,
    DuplicateCanvasId,
    AssetTooLarge,
    AssetSizeMismatch,
    AssetHashMismatch,
    AssetDecodeFailed,
    CanvasIdMismatch,
    ProjectIdMismatch,

    // ── Integrity ──
    MissingCanvasHash,
    CanvasHashMismatch,
    ProjectHashMismatch,
    AssetManifestMismatch,
    HashComputationFailed,

    // ── Import ──
    Aborted,
    ImportFailed,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecretDetected => "SECRET_DETECTED",
            Self::EmailDetected => "EMAIL_DETECTED",
            Self::InvalidNumber => "INVALID_NUMBER",
            Self::SchemaVersion => "SCHEMA_VERSION",
            Self::DuplicateCanvasId => "DUPLICATE_CANVAS_ID",
            Self::AssetTooLarge => "ASSET_TOO_LARGE",
            Self::AssetSizeMismatch => "ASSET_SIZE_MISMATCH",
            Self::AssetHashMismatch => "ASSET_HASH_MISMATCH",
            Self::AssetDecodeFailed => "ASSET_DECODE_FAILED",
            Self::CanvasIdMismatch => "CANVAS_ID_MISMATCH",
            Self::ProjectIdMismatch => "PROJECT_ID_MISMATCH",
            Self::MissingCanvasHash => "MISSING_CANVAS_HASH",
            Self::CanvasHashMismatch => "CANVAS_HASH_MISMATCH",
            Self::ProjectHashMismatch => "PROJECT_HASH_MISMATCH",
            Self::AssetManifestMismatch => "ASSET_MANIFEST_MISMATCH",
            Self::HashComputationFailed => "HASH_COMPUTATION_FAILED",
            Self::Aborted => "ABORTED",
            Self::ImportFailed => "IMPORT_FAILED",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding: a code, a human message, and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ImportIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn at(code: IssueCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {} ({path})", self.code, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Outcome of validation + integrity verification.
///
/// `ok` holds exactly when `errors` is empty; warnings never block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
    /// Sensitive field names discovered by the forbidden-field scan.
    #[serde(default)]
    pub found: Vec<String>,
}

impl ValidationResult {
    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }

    pub fn has_warning(&self, code: IssueCode) -> bool {
        self.warnings.iter().any(|issue| issue.code == code)
    }

    pub fn error_count(&self, code: IssueCode) -> usize {
        self.errors.iter().filter(|issue| issue.code == code).count()
    }

    pub(crate) fn settle(&mut self) {
        self.ok = self.errors.is_empty();
    }
}
