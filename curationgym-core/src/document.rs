//! document.rs - The `Document` type: the unit of flow through the curation
//! pipeline, per §3 of the spec.
//!
//! Per the spec's design notes, per-document metadata is an open
//! string-to-value mapping in the original tool. This reimplementation
//! defines a small fixed record for the well-known keys (`language`,
//! `token_count`, `slice_tags`, `dedup_cluster_id`, ...) flattened alongside
//! an auxiliary open map for everything else, so an output shard line always
//! round-trips unknown keys exactly as it received them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Mapping from a quality rule's name to its score.
pub type QualityScores = BTreeMap<String, f64>;

/// Attribution for a document flagged as overlapping an evaluation
/// benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminationFlags {
    pub contaminated: bool,
    pub source: Option<String>,
    pub overlap_score: f64,
}

/// The well-known metadata fields named in §3. Every field is optional: a
/// document only carries the keys the operators that have run on it have
/// set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct KnownFields {
    pub source: Option<String>,
    pub dump: Option<String>,
    pub url: Option<String>,
    pub language: Option<String>,
    pub language_score: Option<f64>,
    pub token_count: Option<u64>,
    pub quality_scores: Option<QualityScores>,
    pub dedup_cluster_id: Option<String>,
    pub dedup_dropped: Option<bool>,
    pub dedup_drop_reason: Option<String>,
    pub dedup_method: Option<String>,
    pub dedup_scope: Option<String>,
    pub contamination_flags: Option<ContaminationFlags>,
    pub decontam_dropped: Option<bool>,
    pub slice_tags: Option<Vec<String>>,
    pub slice_code_version: Option<String>,
    pub sample_weight: Option<f64>,
    pub content_hash: Option<String>,
    pub text_rewritten: Option<bool>,
    pub reject_reason: Option<String>,
    pub reject_stage: Option<String>,
    pub original_html_length: Option<usize>,
    pub extracted_text_length: Option<usize>,
    pub extraction_ratio: Option<f64>,
    pub pii_masked_count: Option<u64>,
}

/// The open metadata map: well-known fields flattened alongside any other
/// caller- or reader-supplied key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(flatten)]
    pub known: KnownFields,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    /// Reads an arbitrary extra key as an `f64`, used by slice extractors
    /// that consume externally-scored fields (e.g. `toxicity_score`) that
    /// are not part of the fixed record.
    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(|v| v.as_f64())
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn mean_quality_score(&self) -> Option<f64> {
        let scores = self.known.quality_scores.as_ref()?;
        if scores.is_empty() {
            return None;
        }
        Some(scores.values().sum::<f64>() / scores.len() as f64)
    }

    pub fn mark_dropped(&mut self, stage: &str, reason: impl Into<String>) {
        self.known.reject_stage = Some(stage.to_string());
        self.known.reject_reason = Some(reason.into());
    }
}

/// The unit of flow through the pipeline.
///
/// Invariants (per §3): `id` never changes once assigned; operators extend
/// `metadata`, they never rewrite `id`; a rewrite of `text` (PII masking,
/// contamination redaction) always sets `metadata.text_rewritten`. A
/// document dropped by dedup or decontam still carries its reason metadata
/// so downstream stats can attribute the drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::default(),
        }
    }

    /// Rewrites `text`, recording that the transform happened. Used by PII
    /// masking and contamination redaction, the two transformer-shaped
    /// operators that may modify `text` in place.
    pub fn rewrite_text(&mut self, new_text: impl Into<String>) {
        self.text = new_text.into();
        self.metadata.known.text_rewritten = Some(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unknown_metadata_keys() {
        let mut doc = Document::new("doc-1", "hello world");
        doc.metadata.set_extra("custom_key", "custom_value");
        doc.metadata.known.language = Some("en".to_string());

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();

        assert_eq!(back.metadata.extra_str("custom_key"), Some("custom_value"));
        assert_eq!(back.metadata.known.language.as_deref(), Some("en"));
    }

    #[test]
    fn id_and_text_survive_metadata_extension() {
        let mut doc = Document::new("doc-2", "text");
        doc.metadata.known.token_count = Some(2);
        assert_eq!(doc.id, "doc-2");
        assert_eq!(doc.text, "text");
    }

    #[test]
    fn rewrite_text_marks_flag() {
        let mut doc = Document::new("doc-3", "a@b.com");
        doc.rewrite_text("[EMAIL]");
        assert_eq!(doc.text, "[EMAIL]");
        assert_eq!(doc.metadata.known.text_rewritten, Some(true));
    }

    #[test]
    fn mean_quality_score_averages_rule_scores() {
        let mut doc = Document::new("doc-4", "text");
        let mut scores = QualityScores::new();
        scores.insert("repetition".to_string(), 1.0);
        scores.insert("length".to_string(), 0.5);
        doc.metadata.known.quality_scores = Some(scores);
        assert_eq!(doc.metadata.mean_quality_score(), Some(0.75));
    }
}
