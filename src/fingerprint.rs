//! Content-addressed job identity.
//!
//! A fingerprint ties a run to its progress record and lock file across
//! process restarts: normalize the source the same way every time, hash it,
//! and any two runs over the same logical content land on the same key.

use sha2::{Digest, Sha256};

/// Normalize newlines and strip the separator convention the Progress Store
/// writes, so that a source file re-fingerprints identically whether or not
/// it still carries a trailing blank-line artifact from a prior partial run.
pub fn normalize(text: &str) -> String {
    let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    while normalized.ends_with("\n\n") {
        normalized.pop();
    }
    normalized
}

/// Fast content-addressed hash of the normalized source text.
pub fn fingerprint(text: &str) -> String {
    let normalized = normalize(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, digest)
}
