//! exact.rs - Exact normalized-hash deduplication (§4.2).
//!
//! Normalization: lowercase, whitespace collapse, trim. Hash: SHA-256 of the
//! normalized text. First occurrence of a hash is kept; subsequent
//! documents with the same hash are marked dropped. `content_hash` is the
//! full hex digest; `dedup_cluster_id` is its first 16 hex chars.

use curationgym_ngram::hashing::sha256_hex;
use std::collections::HashMap;

use crate::document::Document;

pub fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn content_hash(text: &str) -> String {
    sha256_hex(normalize(text).as_bytes())
}

/// Assigns `content_hash` / `dedup_cluster_id` metadata to `doc` without
/// deciding keep/drop. Used both by the streaming deduper (which decides
/// immediately) and by the cluster-buffering path (§4.2, Open Question (2))
/// which defers the keep decision until a cluster is fully known.
pub fn assign_cluster_id(doc: &mut Document) -> String {
    let hash = content_hash(&doc.text);
    let cluster_id = hash[..16].to_string();
    doc.metadata.known.content_hash = Some(hash);
    doc.metadata.known.dedup_cluster_id = Some(cluster_id.clone());
    doc.metadata.known.dedup_method = Some("exact".to_string());
    cluster_id
}

/// Open-addressing hash table keyed by 64-bit-collapsed content hash, per
/// the spec's design notes: the full hash is retained as the map key here
/// (a `HashMap<String, _>` over the 16-hex-char cluster id) since the exact
/// match set in the literal test corpora is small; see `MinHashDeduper` for
/// the 64-bit-key realization used at LSH-bucket scale.
pub struct ExactDeduper {
    first_seen: HashMap<String, ()>,
}

impl ExactDeduper {
    pub fn new() -> Self {
        Self {
            first_seen: HashMap::new(),
        }
    }

    pub(crate) fn contains(&self, cluster_id: &str) -> bool {
        self.first_seen.contains_key(cluster_id)
    }

    pub(crate) fn record(&mut self, cluster_id: &str) {
        self.first_seen.entry(cluster_id.to_string()).or_insert(());
    }

    /// Streaming, zero-buffer decision: `true` if this document is the
    /// first with this content hash (kept), `false` if it is a later
    /// duplicate (dropped).
    pub fn process(&mut self, doc: &mut Document) -> bool {
        let cluster_id = assign_cluster_id(doc);
        if self.first_seen.contains_key(&cluster_id) {
            let reason = format!("duplicate_of_cluster:{}", cluster_id);
            doc.metadata.known.dedup_dropped = Some(true);
            doc.metadata.known.dedup_drop_reason = Some(reason.clone());
            doc.metadata.mark_dropped("dedup_exact", reason);
            false
        } else {
            self.first_seen.insert(cluster_id, ());
            doc.metadata.known.dedup_dropped = Some(false);
            true
        }
    }
}

impl Default for ExactDeduper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_collapses_and_trims() {
        assert_eq!(normalize("  Hello   World  "), "hello world");
    }

    #[test]
    fn first_occurrence_is_kept_subsequent_dropped() {
        let mut dd = ExactDeduper::new();
        let mut a = Document::new("a", "Hello world");
        let mut b = Document::new("b", "hello   world");
        let mut c = Document::new("c", "Different");

        assert!(dd.process(&mut a));
        assert!(!dd.process(&mut b));
        assert!(dd.process(&mut c));

        assert_eq!(a.metadata.known.dedup_cluster_id, b.metadata.known.dedup_cluster_id);
        assert_eq!(b.metadata.known.dedup_dropped, Some(true));
        assert_eq!(c.metadata.known.dedup_dropped, Some(false));
    }
}
