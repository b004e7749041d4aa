//! scope.rs - Dedup scope handling (§4.2): `global` runs a single deduper
//! over the whole stream; `per_dump` lazily creates one deduper per distinct
//! value of `metadata.dump`.

use std::collections::HashMap;

use crate::dedup::exact::ExactDeduper;
use crate::dedup::minhash::MinHashDeduper;
use crate::document::Document;
use crate::policy::{DedupConfig, DedupMethod, DedupScope};

enum Deduper {
    Exact(ExactDeduper),
    MinHash(MinHashDeduper),
}

impl Deduper {
    fn new(cfg: &DedupConfig) -> Self {
        match cfg.method {
            DedupMethod::Exact => Deduper::Exact(ExactDeduper::new()),
            DedupMethod::Minhash => Deduper::MinHash(MinHashDeduper::new(&cfg.minhash)),
        }
    }

    /// Returns `(cluster_id, is_first)` without deciding drop, for callers
    /// that defer the keep decision to a buffered keep-rule resolution.
    fn assign_cluster(&mut self, doc: &mut Document) -> (String, bool) {
        match self {
            Deduper::Exact(d) => {
                let cluster_id = crate::dedup::exact::assign_cluster_id(doc);
                let is_first = !d_contains(d, &cluster_id);
                d_record(d, &cluster_id);
                (cluster_id, is_first)
            }
            Deduper::MinHash(d) => d.assign_cluster(doc),
        }
    }

    fn process_streaming(&mut self, doc: &mut Document) -> bool {
        match self {
            Deduper::Exact(d) => d.process(doc),
            Deduper::MinHash(d) => d.process(doc),
        }
    }
}

// ExactDeduper keeps its `first_seen` map private; these two helpers exist
// only so `assign_cluster` can reuse the same table the streaming path uses,
// without exposing the map itself outside the module.
fn d_contains(d: &ExactDeduper, cluster_id: &str) -> bool {
    d.contains(cluster_id)
}
fn d_record(d: &mut ExactDeduper, cluster_id: &str) {
    d.record(cluster_id);
}

/// Scoped dedup engine: one or many underlying deduper instances depending
/// on `DedupConfig::scope`.
pub struct ScopedDeduper {
    cfg: DedupConfig,
    global: Option<Deduper>,
    per_dump: HashMap<String, Deduper>,
}

impl ScopedDeduper {
    pub fn new(cfg: DedupConfig) -> Self {
        let global = match cfg.scope {
            DedupScope::Global => Some(Deduper::new(&cfg)),
            DedupScope::PerDump => None,
        };
        Self {
            cfg,
            global,
            per_dump: HashMap::new(),
        }
    }

    fn scope_name(&self) -> &'static str {
        match self.cfg.scope {
            DedupScope::Global => "global",
            DedupScope::PerDump => "per_dump",
        }
    }

    fn deduper_for(&mut self, doc: &Document) -> &mut Deduper {
        match self.cfg.scope {
            DedupScope::Global => self.global.as_mut().expect("global deduper always present"),
            DedupScope::PerDump => {
                let key = doc.metadata.known.dump.clone().unwrap_or_default();
                self.per_dump.entry(key).or_insert_with(|| Deduper::new(&self.cfg))
            }
        }
    }

    /// Streaming decision under the `first` keep rule: `true` to keep.
    pub fn process(&mut self, doc: &mut Document) -> bool {
        let scope = self.scope_name();
        doc.metadata.known.dedup_scope = Some(scope.to_string());
        self.deduper_for(doc).process_streaming(doc)
    }

    /// Assigns a cluster id without deciding drop, for the buffered keep
    /// rules: every document, kept or not, needs a cluster id before the
    /// keep rule can pick a per-cluster representative.
    pub fn assign_cluster(&mut self, doc: &mut Document) -> (String, bool) {
        let scope = self.scope_name();
        doc.metadata.known.dedup_scope = Some(scope.to_string());
        self.deduper_for(doc).assign_cluster(doc)
    }
}
