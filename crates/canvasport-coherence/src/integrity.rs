//! Recompute every digest and compare against the embedded manifest.

use crate::issue::{ImportIssue, IssueCode};
use canvasport_kernel::{ProjectDocument, ProjectHashInput, asset_manifest, hash_canvas, hash_project};

const DIGEST_PREFIX_LEN: usize = 12;

fn prefix(digest: &str) -> &str {
    digest.get(..DIGEST_PREFIX_LEN).unwrap_or(digest)
}

/// Append integrity findings to `errors`.
///
/// Runs only when `errors` is still empty: a document that already failed
/// validation is not worth hashing.
pub fn verify_integrity(document: &ProjectDocument, errors: &mut Vec<ImportIssue>) {
    if !errors.is_empty() {
        return;
    }

    for (idx, canvas) in document.canvases.iter().enumerate() {
        let path = format!("$.canvases[{idx}]");
        let Some(expected) = document.hash_manifest.canvas_hash(&canvas.id) else {
            errors.push(ImportIssue::at(
                IssueCode::MissingCanvasHash,
                format!("no manifest hash recorded for canvas `{}`", canvas.id),
                path,
            ));
            continue;
        };
        match hash_canvas(&canvas.graph, &document.project.variables) {
            Ok(computed) if computed == expected => {}
            Ok(computed) => errors.push(ImportIssue::at(
                IssueCode::CanvasHashMismatch,
                format!(
                    "canvas `{}` hash mismatch: expected {}…, computed {}…",
                    canvas.id,
                    prefix(expected),
                    prefix(&computed)
                ),
                path,
            )),
            Err(e) => errors.push(ImportIssue::at(
                IssueCode::HashComputationFailed,
                format!("canvas `{}` could not be hashed: {e}", canvas.id),
                path,
            )),
        }
    }

    let recomputed = asset_manifest(&document.assets);
    if recomputed != document.hash_manifest.assets {
        let message = match recomputed
            .iter()
            .zip(&document.hash_manifest.assets)
            .find(|(actual, recorded)| actual != recorded)
        {
            Some((actual, _)) => format!(
                "asset manifest disagrees with asset `{}` as shipped",
                actual.name
            ),
            None => format!(
                "asset manifest lists {} entries but {} assets are shipped",
                document.hash_manifest.assets.len(),
                recomputed.len()
            ),
        };
        errors.push(ImportIssue::at(
            IssueCode::AssetManifestMismatch,
            message,
            "$.hashes.assets",
        ));
    }

    let input = ProjectHashInput {
        project: &document.project,
        canvases: &document.canvases,
        assets: &document.assets,
    };
    let expected = document.hash_manifest.project_hash.as_str();
    match hash_project(input) {
        Ok(computed) if computed == expected => {}
        Ok(computed) => errors.push(ImportIssue::at(
            IssueCode::ProjectHashMismatch,
            format!(
                "project hash mismatch: expected {}…, computed {}…",
                prefix(expected),
                prefix(&computed)
            ),
            "$.hashes.projectHash",
        )),
        Err(e) => errors.push(ImportIssue::at(
            IssueCode::HashComputationFailed,
            format!("project could not be hashed: {e}"),
            "$.hashes.projectHash",
        )),
    }

    if !errors.is_empty() {
        tracing::warn!(findings = errors.len(), "integrity verification failed");
    }
}
