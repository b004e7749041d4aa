//! decontam - Contamination guard against evaluation benchmarks (§4.3).
//!
//! An index of word-level n-gram hashes built from benchmark reference
//! texts; each input document's overlap against that index decides whether
//! it is contaminated, and the configured `DecontamMode` decides the
//! resulting action.

use curationgym_ngram::hashing::hash64;
use curationgym_ngram::ngram::word_ngrams;
use std::collections::HashMap;

use crate::document::{ContaminationFlags, Document};
use crate::manifest::{ContaminationAuditEntry, ContaminationSummary};
use crate::policy::{DecontamConfig, DecontamMode};

const REDACTION_PLACEHOLDER: &str = "[CONTAMINATED]";

/// Word-n-gram hash index built once from the benchmark corpus. `Clone` is
/// derived so the resumable executor can hand each shard task its own copy
/// of the conceptually-shared, read-only index (§5) without introducing a
/// shared-lock realization for what is never mutated after construction.
#[derive(Clone)]
pub struct DecontamIndex {
    ngram_size: usize,
    hashes: std::collections::HashSet<u64>,
    first_source: HashMap<u64, String>,
}

impl DecontamIndex {
    pub fn new(ngram_size: usize) -> Self {
        Self {
            ngram_size,
            hashes: std::collections::HashSet::new(),
            first_source: HashMap::new(),
        }
    }

    /// Ingests benchmark reference texts under `source`, per the contract
    /// `add_eval_data(texts, source)`.
    pub fn add_eval_data(&mut self, texts: &[String], source: &str) {
        for text in texts {
            for gram in word_ngrams(text, self.ngram_size) {
                let h = hash64(gram.as_bytes());
                self.hashes.insert(h);
                self.first_source.entry(h).or_insert_with(|| source.to_string());
            }
        }
    }

    /// Computes overlap against a document's text: `(overlap_score,
    /// matched_source, matched_ngram_texts)`. `matched_source` is the first
    /// source attributed to any matched n-gram; empty input yields a score
    /// of 0 and no source.
    pub fn overlap(&self, text: &str) -> (f64, Option<String>, Vec<String>) {
        let grams = word_ngrams(text, self.ngram_size);
        if grams.is_empty() {
            return (0.0, None, Vec::new());
        }

        let mut matched = 0usize;
        let mut source: Option<String> = None;
        let mut matched_texts = Vec::new();
        for gram in &grams {
            let h = hash64(gram.as_bytes());
            if self.hashes.contains(&h) {
                matched += 1;
                if source.is_none() {
                    source = self.first_source.get(&h).cloned();
                }
                matched_texts.push(gram.clone());
            }
        }
        let score = matched as f64 / grams.len() as f64;
        (score, source, matched_texts)
    }

}

/// Result of running one document through the decontam stage.
pub enum DecontamOutcome {
    /// Document passes through unmodified (never contaminated, or mode is
    /// not `drop` and no text rewrite applied).
    Keep(Document),
    /// Document is dropped under `mode = drop`.
    Drop { doc: Document, entry: ContaminationAuditEntry },
}

pub struct DecontamStage {
    index: DecontamIndex,
    cfg: DecontamConfig,
    contaminated_count: u64,
    total_count: u64,
    by_source: HashMap<String, u64>,
    audit: Vec<ContaminationAuditEntry>,
}

impl DecontamStage {
    pub fn new(index: DecontamIndex, cfg: DecontamConfig) -> Self {
        Self {
            index,
            cfg,
            contaminated_count: 0,
            total_count: 0,
            by_source: HashMap::new(),
            audit: Vec::new(),
        }
    }

    pub fn apply(&mut self, mut doc: Document) -> DecontamOutcome {
        self.total_count += 1;
        let (score, source, matched) = self.index.overlap(&doc.text);
        let contaminated = score >= self.cfg.threshold;

        if !contaminated {
            return DecontamOutcome::Keep(doc);
        }

        self.contaminated_count += 1;
        if let Some(src) = &source {
            *self.by_source.entry(src.clone()).or_insert(0) += 1;
        }

        doc.metadata.known.contamination_flags = Some(ContaminationFlags {
            contaminated: true,
            source: source.clone(),
            overlap_score: score,
        });

        let bounded_matches: Vec<String> = matched.into_iter().take(self.cfg.max_stored_ngrams).collect();
        let preview: String = doc.text.chars().take(self.cfg.preview_chars).collect();

        match self.cfg.mode {
            DecontamMode::Tag => DecontamOutcome::Keep(doc),
            DecontamMode::Downweight => {
                doc.metadata.known.sample_weight = Some((1.0 - score).max(0.1));
                DecontamOutcome::Keep(doc)
            }
            DecontamMode::Redact => {
                let text = curationgym_ngram::redact::redact_matches(&doc.text, &bounded_matches, REDACTION_PLACEHOLDER);
                doc.rewrite_text(text);
                DecontamOutcome::Keep(doc)
            }
            DecontamMode::Drop => {
                doc.metadata.known.decontam_dropped = Some(true);
                doc.metadata
                    .mark_dropped("decontam", format!("contaminated_by:{}", source.clone().unwrap_or_default()));
                let entry = ContaminationAuditEntry {
                    doc_id: doc.id.clone(),
                    source: source.clone(),
                    overlap_score: score,
                    matched_ngrams_preview: bounded_matches,
                    action: "drop".to_string(),
                    text_preview: preview,
                };
                self.audit.push(entry.clone());
                DecontamOutcome::Drop { doc, entry }
            }
        }
    }

    pub fn summary(&self) -> ContaminationSummary {
        ContaminationSummary {
            docs_checked: self.total_count,
            docs_contaminated: self.contaminated_count,
            by_eval_source: self.by_source.clone().into_iter().collect(),
        }
    }

    pub fn audit_entries(&self) -> &[ContaminationAuditEntry] {
        &self.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_index() -> DecontamIndex {
        let mut idx = DecontamIndex::new(5);
        idx.add_eval_data(&["the answer is forty two".to_string()], "bench-a");
        idx
    }

    #[test]
    fn overlap_score_is_one_for_exact_ngram_match() {
        let idx = make_index();
        let (score, source, _) = idx.overlap("the answer is forty two");
        assert_eq!(score, 1.0);
        assert_eq!(source.as_deref(), Some("bench-a"));
    }

    #[test]
    fn overlap_score_is_zero_for_empty_text() {
        let idx = make_index();
        let (score, source, matched) = idx.overlap("");
        assert_eq!(score, 0.0);
        assert!(source.is_none());
        assert!(matched.is_empty());
    }

    #[test]
    fn drop_mode_removes_contaminated_document_and_records_audit() {
        let idx = make_index();
        let cfg = DecontamConfig {
            enabled: true,
            mode: DecontamMode::Drop,
            ngram_size: 5,
            threshold: 0.5,
            ..Default::default()
        };
        let mut stage = DecontamStage::new(idx, cfg);

        let a = Document::new("a", "the answer is forty two exactly");
        let b = Document::new("b", "completely unrelated content here");

        let result_a = stage.apply(a);
        let result_b = stage.apply(b);

        assert!(matches!(result_a, DecontamOutcome::Drop { .. }));
        assert!(matches!(result_b, DecontamOutcome::Keep(_)));

        let summary = stage.summary();
        assert_eq!(summary.docs_contaminated, 1);
        assert_eq!(summary.by_eval_source.get("bench-a"), Some(&1));
    }

    #[test]
    fn downweight_mode_sets_sample_weight_floor() {
        let idx = make_index();
        let cfg = DecontamConfig {
            enabled: true,
            mode: DecontamMode::Downweight,
            ngram_size: 5,
            threshold: 0.1,
            ..Default::default()
        };
        let mut stage = DecontamStage::new(idx, cfg);
        let doc = Document::new("a", "the answer is forty two");
        match stage.apply(doc) {
            DecontamOutcome::Keep(d) => {
                let w = d.metadata.known.sample_weight.unwrap();
                assert!(w >= 0.1);
            }
            DecontamOutcome::Drop { .. } => panic!("downweight must not drop"),
        }
    }

    #[test]
    fn tag_mode_passes_through_with_flags_set() {
        let idx = make_index();
        let cfg = DecontamConfig {
            enabled: true,
            mode: DecontamMode::Tag,
            ngram_size: 5,
            threshold: 0.5,
            ..Default::default()
        };
        let mut stage = DecontamStage::new(idx, cfg);
        let doc = Document::new("a", "the answer is forty two");
        match stage.apply(doc) {
            DecontamOutcome::Keep(d) => {
                assert!(d.metadata.known.contamination_flags.unwrap().contaminated);
            }
            DecontamOutcome::Drop { .. } => panic!("tag must not drop"),
        }
    }
}
