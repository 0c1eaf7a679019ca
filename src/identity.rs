//! Content digests and layer chain identifiers.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

const SHORT_DIGEST_LEN: usize = 12;

/// Computes the chain ID of an ordered list of layer diff IDs.
///
/// The first layer's chain ID is its diff ID; every following layer is
/// folded in as `sha256(parent_chain + " " + diff_id)`. The result is the
/// snapshot key containerd uses for the unpacked top layer.
pub fn chain_id<S: AsRef<str>>(diff_ids: &[S]) -> Result<String> {
    let (first, rest) = diff_ids
        .split_first()
        .ok_or_else(|| anyhow!("image has no layers to derive a chain ID from"))?;

    let mut chain = first.as_ref().to_string();
    for diff_id in rest {
        let hash = Sha256::digest(format!("{} {}", chain, diff_id.as_ref()).as_bytes());
        chain = format!("sha256:{}", hex::encode(hash));
    }
    Ok(chain)
}

/// Returns the first 12 characters of the hex part of `algo:hex`.
/// Digests without an algorithm prefix are truncated as-is.
pub fn short_digest(digest: &str) -> &str {
    let encoded = digest.split_once(':').map_or(digest, |(_, hex)| hex);
    match encoded.char_indices().nth(SHORT_DIGEST_LEN) {
        Some((end, _)) => &encoded[..end],
        None => encoded,
    }
}

/// The digest as shown in listings.
pub fn display_digest(digest: &str, no_trunc: bool) -> &str {
    if no_trunc {
        digest
    } else {
        short_digest(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER_A: &str = "sha256:a3ed95caeb02ffe68cdd9fd84406680ae93d633cb16422d00e8a7c22955b46d4";
    const LAYER_B: &str = "sha256:5f70bf18a086007016e948b04aed3b82103a36bea41755b6cddfaf10ace3c6ef";

    #[test]
    fn test_chain_id_single_layer_is_diff_id() {
        assert_eq!(chain_id(&[LAYER_A]).unwrap(), LAYER_A);
    }

    #[test]
    fn test_chain_id_folds_layers_in_order() {
        let expected = format!(
            "sha256:{}",
            hex::encode(Sha256::digest(format!("{} {}", LAYER_A, LAYER_B).as_bytes()))
        );
        assert_eq!(chain_id(&[LAYER_A, LAYER_B]).unwrap(), expected);
        assert_ne!(
            chain_id(&[LAYER_A, LAYER_B]).unwrap(),
            chain_id(&[LAYER_B, LAYER_A]).unwrap()
        );

        let three = chain_id(&[LAYER_A, LAYER_B, LAYER_A]).unwrap();
        let folded = format!(
            "sha256:{}",
            hex::encode(Sha256::digest(format!("{} {}", expected, LAYER_A).as_bytes()))
        );
        assert_eq!(three, folded);
    }

    #[test]
    fn test_chain_id_empty_is_error() {
        let empty: [&str; 0] = [];
        assert!(chain_id(&empty).is_err());
    }

    #[test]
    fn test_short_digest() {
        assert_eq!(short_digest(LAYER_A), "a3ed95caeb02");
        assert_eq!(short_digest("sha256:abcdef0123456789"), "abcdef012345");
        assert_eq!(short_digest("sha256:abc"), "abc");
        assert_eq!(short_digest("abcdef0123456789"), "abcdef012345");
    }

    #[test]
    fn test_display_digest() {
        assert_eq!(display_digest(LAYER_A, false), "a3ed95caeb02");
        assert_eq!(display_digest(LAYER_A, true), LAYER_A);
    }
}
