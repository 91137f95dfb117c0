//! # Canvasport Coherence
//!
//! Everything that happens to an export file before anything is written:
//!
//! ```text
//! bytes ── parse ──▶ ProjectDocument ── security::scan ──▶ findings
//!            │                               │
//!         migrate                    verify_integrity
//!     (legacy graphs)              (only when still clean)
//! ```
//!
//! `pre_import` runs the whole chain and returns the parsed document, a
//! preview summary and the validation outcome.

pub mod integrity;
pub mod issue;
pub mod migrate;
pub mod parse;
pub mod security;
pub mod summary;

pub use integrity::verify_integrity;
pub use issue::{ImportIssue, IssueCode, ValidationResult};
pub use migrate::{is_current, migrate, needs_migration};
pub use parse::{ParseError, parse_document};
pub use security::{SENSITIVE_FIELD_NAMES, is_sensitive_field, scan};
pub use summary::ImportSummary;

use canvasport_kernel::ProjectDocument;

/// Security scan followed by integrity verification.
pub fn validate_document(document: &ProjectDocument) -> ValidationResult {
    let mut result = scan(document);
    verify_integrity(document, &mut result.errors);
    result.settle();
    tracing::debug!(
        ok = result.ok,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "document validated"
    );
    result
}

/// Parsed, previewed and validated document ready for planning.
#[derive(Debug, Clone)]
pub struct PreImport {
    pub document: ProjectDocument,
    pub summary: ImportSummary,
    pub validation: ValidationResult,
}

/// Parse `bytes` and run the full validation chain.
///
/// Only malformed input is an `Err`; findings travel in `validation`.
pub fn pre_import(bytes: &[u8]) -> Result<PreImport, ParseError> {
    let document = parse_document(bytes)?;
    let summary = ImportSummary::from_document(&document);
    let validation = validate_document(&document);
    Ok(PreImport {
        document,
        summary,
        validation,
    })
}
