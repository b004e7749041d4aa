//! manifest.rs - The dataset manifest and slice-stats serialization, per §3
//! and §6 of the spec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::policy::Policy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardEntry {
    pub path: String,
    pub checksum: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestStats {
    pub total_docs: u64,
    pub total_tokens: u64,
    pub dedup_dropped: u64,
    pub decontam_dropped: u64,
    pub filter_rejected: u64,
}

/// Produced once per run; fully self-describing and reloadable (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub dataset_id: String,
    pub created_at: DateTime<Utc>,
    pub input_signature: String,
    pub policy: Policy,
    pub policy_hash: String,
    pub code_version: String,
    pub code_dirty: bool,
    pub seed: u64,
    pub output_format: String,
    pub shards: Vec<ShardEntry>,
    pub stats: ManifestStats,
}

impl Manifest {
    pub fn total_doc_count(&self) -> u64 {
        self.shards.iter().map(|s| s.doc_count).sum()
    }
}

/// `slice_stats.json`: per-slice and aggregate counters (§4.4, §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceCounters {
    pub doc_count: u64,
    pub token_count: u64,
    pub avg_quality_score: f64,
    pub dedup_drop_rate: f64,
    pub decontam_drop_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceStatsReport {
    pub total: SliceCounters,
    pub by_slice: BTreeMap<String, SliceCounters>,
}

/// `decontam_report.json`: audit summary plus flagged entries (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminationAuditEntry {
    pub doc_id: String,
    pub source: Option<String>,
    pub overlap_score: f64,
    pub matched_ngrams_preview: Vec<String>,
    pub action: String,
    pub text_preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContaminationSummary {
    pub docs_checked: u64,
    pub docs_contaminated: u64,
    pub by_eval_source: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecontamReport {
    pub summary: ContaminationSummary,
    pub entries: Vec<ContaminationAuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    fn sample_manifest() -> Manifest {
        Manifest {
            dataset_id: "ds-1".to_string(),
            created_at: Utc::now(),
            input_signature: "sig".to_string(),
            policy: Policy::default(),
            policy_hash: "abc".to_string(),
            code_version: "0.1.0".to_string(),
            code_dirty: false,
            seed: 0,
            output_format: "jsonl".to_string(),
            shards: vec![ShardEntry {
                path: "shards/000.jsonl".to_string(),
                checksum: "deadbeef".to_string(),
                doc_count: 3,
            }],
            stats: ManifestStats::default(),
        }
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let m = sample_manifest();
        let json = serde_json::to_string(&m).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn total_doc_count_sums_shards() {
        let m = sample_manifest();
        assert_eq!(m.total_doc_count(), 3);
    }
}
