use std::fmt::Write;

use sha2::{Digest, Sha256};

use super::model::RelabelRule;

/// Canonical fingerprint of a relabel rule: lowercase hex SHA-256 over its
/// YAML serialization.
///
/// There is no structural equality for rules; two rules are "the same rule"
/// iff their fingerprints match. The serialization is canonical because
/// struct fields serialize in declaration order, absent fields are skipped,
/// and catch-all fields live in a sorted map, so a rule re-read from storage
/// fingerprints identically to the rule as generated.
pub fn fingerprint(rule: &RelabelRule) -> Result<String, serde_yaml::Error> {
    let canonical = serde_yaml::to_string(rule)?;
    let digest = Sha256::digest(canonical.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}
