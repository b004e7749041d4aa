//! minhash.rs - MinHash-LSH approximate deduplication (§4.2).
//!
//! Wraps `curationgym_ngram::minhash`: each document's signature is banded
//! into `num_bands` bucket keys; the first document to land in a bucket
//! claims it for its cluster id (its own document id). Any later document
//! sharing a bucket with an existing cluster joins that cluster and is
//! dropped under the `first` keep rule.

use curationgym_ngram::minhash::{band_keys, signature, MinHashConfig};
use std::collections::HashMap;

use crate::document::Document;
use crate::policy::MinHashParams;

fn to_ngram_config(params: &MinHashParams) -> MinHashConfig {
    MinHashConfig {
        num_bands: params.num_bands,
        rows_per_band: params.rows_per_band,
        ngram_size: params.ngram_size,
    }
}

pub struct MinHashDeduper {
    cfg: MinHashConfig,
    buckets: Vec<HashMap<u64, String>>,
}

impl MinHashDeduper {
    pub fn new(params: &MinHashParams) -> Self {
        let cfg = to_ngram_config(params);
        let buckets = vec![HashMap::new(); cfg.num_bands];
        Self { cfg, buckets }
    }

    /// Returns the (possibly newly-claimed) cluster id for `doc` and
    /// whether `doc` is the first member of that cluster, without yet
    /// deciding to drop it. Used directly for streaming `first` keep-rule
    /// decisions, and also for assigning cluster ids in the buffered path
    /// where every document (kept or not) needs a cluster id before the
    /// keep rule can pick a representative.
    pub fn assign_cluster(&mut self, doc: &mut Document) -> (String, bool) {
        let sig = signature(&doc.text, &self.cfg);
        let keys = band_keys(&sig, &self.cfg);

        let existing = keys.iter().find_map(|k| self.buckets_get(k));
        let is_first = existing.is_none();
        let cluster_id = existing.unwrap_or_else(|| doc.id.clone());

        for k in &keys {
            self.claim(*k, &cluster_id);
        }

        doc.metadata.known.dedup_cluster_id = Some(cluster_id.clone());
        doc.metadata.known.dedup_method = Some("minhash".to_string());
        (cluster_id, is_first)
    }

    fn buckets_get(&self, key: &u64) -> Option<String> {
        self.buckets.iter().find_map(|band| band.get(key).cloned())
    }

    fn claim(&mut self, key: u64, cluster_id: &str) {
        for band in &mut self.buckets {
            band.entry(key).or_insert_with(|| cluster_id.to_string());
        }
    }

    /// Streaming, zero-buffer decision under the `first` keep rule.
    pub fn process(&mut self, doc: &mut Document) -> bool {
        let (cluster_id, is_first) = self.assign_cluster(doc);
        if !is_first {
            let reason = format!("duplicate_of_cluster:{}", cluster_id);
            doc.metadata.known.dedup_dropped = Some(true);
            doc.metadata.known.dedup_drop_reason = Some(reason.clone());
            doc.metadata.mark_dropped("dedup_minhash", reason);
        } else {
            doc.metadata.known.dedup_dropped = Some(false);
        }
        is_first
    }
}
