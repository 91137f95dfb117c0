//! Asset encoding: embed inline as base64, or reference an external pointer.
//!
//! Embedded payloads carry a digest of the raw bytes. Decoding does not
//! trust that digest on its own; callers that use the bytes go through
//! [`decode_verified`].

use crate::error::AssetError;
use crate::hash::sha256_hex;
use crate::model::{EmbeddedAsset, MAX_EMBED_BYTES, ReferencedAsset};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Encode raw bytes as an embedded asset.
///
/// No size check happens here; the validator rejects oversized embeds.
/// Use [`embed_checked`] to refuse them eagerly.
pub fn embed(
    name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: &[u8],
) -> EmbeddedAsset {
    EmbeddedAsset {
        name: name.into(),
        mime_type: mime_type.into(),
        size_bytes: bytes.len() as u64,
        data: STANDARD.encode(bytes),
        sha256: sha256_hex(bytes),
    }
}

/// Like [`embed`], but refuses payloads above [`MAX_EMBED_BYTES`].
pub fn embed_checked(
    name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: &[u8],
) -> Result<EmbeddedAsset, AssetError> {
    let name = name.into();
    let size = bytes.len() as u64;
    if size > MAX_EMBED_BYTES {
        return Err(AssetError::TooLarge {
            name,
            size,
            limit: MAX_EMBED_BYTES,
        });
    }
    Ok(embed(name, mime_type, bytes))
}

/// Describe an asset whose bytes live elsewhere.
pub fn reference(
    name: impl Into<String>,
    mime_type: impl Into<String>,
    size_bytes: u64,
    pointer: impl Into<String>,
    sha256: Option<String>,
) -> ReferencedAsset {
    ReferencedAsset {
        name: name.into(),
        mime_type: mime_type.into(),
        size_bytes,
        pointer: pointer.into(),
        sha256,
    }
}

/// Base64-decode an embedded payload without checking its digest.
pub fn decode(asset: &EmbeddedAsset) -> Result<Vec<u8>, AssetError> {
    STANDARD
        .decode(asset.data.as_bytes())
        .map_err(|e| AssetError::Decode {
            name: asset.name.clone(),
            message: e.to_string(),
        })
}

/// Decode and re-verify the payload against its declared sha256.
pub fn decode_verified(asset: &EmbeddedAsset) -> Result<Vec<u8>, AssetError> {
    let bytes = decode(asset)?;
    let actual = sha256_hex(&bytes);
    if !actual.eq_ignore_ascii_case(&asset.sha256) {
        return Err(AssetError::HashMismatch {
            name: asset.name.clone(),
            expected: asset.sha256.clone(),
            actual,
        });
    }
    Ok(bytes)
}

/// Upper bound on the decoded size of a base64 payload, computed without
/// decoding it.
pub fn decoded_len_upper_bound(data: &str) -> u64 {
    (data.len() as u64).div_ceil(4) * 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    const CSV: &[u8] = b"id,label,weight\n1,alpha,0.25\n2,beta,0.75\n3,gamma,1.5\n";

    #[test]
    fn csv_round_trips_and_digest_matches_independent_hash() {
        let asset = embed("weights.csv", "text/csv", CSV);
        assert_eq!(asset.size_bytes, CSV.len() as u64);
        assert_eq!(decode(&asset).unwrap(), CSV);

        let independent = Sha256::digest(CSV)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();
        assert_eq!(asset.sha256, independent);
    }

    #[test]
    fn empty_payload_round_trips() {
        let asset = embed("empty.bin", "application/octet-stream", b"");
        assert_eq!(asset.size_bytes, 0);
        assert_eq!(asset.data, "");
        assert_eq!(decode_verified(&asset).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn decode_verified_rejects_tampered_payload() {
        let mut asset = embed("weights.csv", "text/csv", CSV);
        asset.data = STANDARD.encode(b"id,label\n1,tampered\n");
        let err = decode_verified(&asset).unwrap_err();
        assert!(matches!(err, AssetError::HashMismatch { .. }));
    }

    #[test]
    fn decode_rejects_non_base64() {
        let mut asset = embed("weights.csv", "text/csv", CSV);
        asset.data = "***not base64***".into();
        assert!(matches!(decode(&asset), Err(AssetError::Decode { .. })));
    }

    #[test]
    fn embed_checked_refuses_oversized_payload() {
        let big = vec![0u8; (MAX_EMBED_BYTES + 1) as usize];
        let err = embed_checked("big.bin", "application/octet-stream", &big).unwrap_err();
        assert!(matches!(err, AssetError::TooLarge { size, .. } if size == MAX_EMBED_BYTES + 1));
    }

    #[test]
    fn decoded_len_bound_covers_actual_length() {
        for len in [0usize, 1, 2, 3, 4, 5, 99, 100] {
            let bytes = vec![7u8; len];
            let asset = embed("x", "application/octet-stream", &bytes);
            assert!(decoded_len_upper_bound(&asset.data) >= len as u64);
        }
    }
}
