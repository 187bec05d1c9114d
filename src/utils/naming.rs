use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("identifier regex must compile"));

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    NON_IDENTIFIER.replace_all(raw, "_").into_owned()
}

/// First `len` hex chars of the SHA-256 of `raw`; identical across runs and platforms.
pub fn stable_hash(raw: &str, len: usize) -> String {
    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    digest[..len.min(digest.len())].to_string()
}
