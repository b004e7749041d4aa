//! dedup - Deduplication (§4.2): exact hashing, MinHash-LSH, scoping, and
//! keep-rule resolution for clusters that require buffering.

pub mod exact;
pub mod keep_rule;
pub mod minhash;
pub mod scope;

use std::collections::HashMap;

use crate::document::Document;
use crate::policy::{DedupConfig, KeepRule};
use scope::ScopedDeduper;

/// Outcome of running the whole input batch through dedup under a
/// buffering keep rule (§4.2, Open Question (2)): every document is
/// assigned a cluster id up front, then for each cluster a single winner is
/// picked by `keep_rule` and every other member is marked dropped.
///
/// This necessarily holds the full document set (post earlier pipeline
/// stages) in memory for the duration of the scope being finalized; the
/// bounded-memory `first` keep rule is the only one that can stream.
pub fn resolve_buffered(docs: &mut [Document], cfg: &DedupConfig) {
    assert!(cfg.keep_rule.requires_buffering(), "use ScopedDeduper::process for `first`");

    let mut engine = ScopedDeduper::new(cfg.clone());
    let mut clusters: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, doc) in docs.iter_mut().enumerate() {
        let (cluster_id, _is_first) = engine.assign_cluster(doc);
        clusters.entry(cluster_id).or_default().push(i);
    }

    for indices in clusters.values() {
        let winner = keep_rule::pick_winner(indices, docs, cfg.keep_rule);
        for &i in indices {
            if i == winner {
                docs[i].metadata.known.dedup_dropped = Some(false);
                docs[i].metadata.known.dedup_drop_reason = None;
            } else {
                let reason = format!("duplicate_of_cluster:{}", docs[i].metadata.known.dedup_cluster_id.clone().unwrap_or_default());
                docs[i].metadata.known.dedup_dropped = Some(true);
                docs[i].metadata.known.dedup_drop_reason = Some(reason.clone());
                docs[i].metadata.mark_dropped("dedup", reason);
            }
        }
    }
}

/// True if `doc` survived dedup (or has not been run through it yet).
pub fn is_kept(doc: &Document) -> bool {
    doc.metadata.known.dedup_dropped != Some(true)
}

/// Runs the appropriate dedup strategy for `cfg.keep_rule`:
/// streaming single-pass for `first`, or full buffering otherwise.
pub enum DedupStage {
    Streaming(ScopedDeduper),
    Buffered { cfg: DedupConfig, pending: Vec<Document> },
}

impl DedupStage {
    pub fn new(cfg: DedupConfig) -> Self {
        if cfg.keep_rule.requires_buffering() {
            DedupStage::Buffered { cfg, pending: Vec::new() }
        } else {
            DedupStage::Streaming(ScopedDeduper::new(cfg))
        }
    }

    /// Feeds a document into the stage. In streaming mode the keep
    /// decision is returned immediately with the document. In buffered
    /// mode documents are accumulated and `None` is returned; call
    /// `finalize` once the scope (end of input stream) is reached.
    pub fn feed(&mut self, mut doc: Document) -> Option<(Document, bool)> {
        match self {
            DedupStage::Streaming(engine) => {
                let kept = engine.process(&mut doc);
                Some((doc, kept))
            }
            DedupStage::Buffered { pending, .. } => {
                pending.push(doc);
                None
            }
        }
    }

    /// Drains any buffered documents, resolving cluster winners. Returns
    /// `(document, kept)` pairs in original insertion order. No-op (empty)
    /// in streaming mode, since every document was already emitted by
    /// `feed`.
    pub fn finalize(self) -> Vec<(Document, bool)> {
        match self {
            DedupStage::Streaming(_) => Vec::new(),
            DedupStage::Buffered { cfg, mut pending } => {
                resolve_buffered(&mut pending, &cfg);
                pending.into_iter().map(|d| { let kept = is_kept(&d); (d, kept) }).collect()
            }
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, DedupStage::Buffered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DedupMethod, DedupScope};

    fn cfg(keep_rule: KeepRule) -> DedupConfig {
        DedupConfig {
            method: DedupMethod::Exact,
            scope: DedupScope::Global,
            keep_rule,
            ..Default::default()
        }
    }

    #[test]
    fn buffered_longest_keeps_longest_cluster_member() {
        let mut docs = vec![
            Document::new("a", "dup text"),
            Document::new("b", "dup text but this one is much longer overall"),
        ];
        resolve_buffered(&mut docs, &cfg(KeepRule::Longest));
        assert_eq!(docs[0].metadata.known.dedup_dropped, Some(true));
        assert_eq!(docs[1].metadata.known.dedup_dropped, Some(false));
    }

    #[test]
    fn stage_streaming_mode_emits_immediately() {
        let mut stage = DedupStage::new(cfg(KeepRule::First));
        let result = stage.feed(Document::new("a", "hello"));
        assert!(result.is_some());
    }

    #[test]
    fn stage_buffered_mode_defers_until_finalize() {
        let mut stage = DedupStage::new(cfg(KeepRule::Longest));
        assert!(stage.feed(Document::new("a", "hello world")).is_none());
        assert!(stage.feed(Document::new("b", "hello world but longer")).is_none());
        let resolved = stage.finalize();
        assert_eq!(resolved.len(), 2);
    }
}
