//! policy.rs - The curation policy schema, canonicalization, and hashing,
//! per §3 of the spec.
//!
//! A policy's canonical form is a JSON string with lexicographically sorted
//! keys and no insignificant whitespace. `serde_json::Value`'s default
//! object representation (a `BTreeMap` under the hood, since this crate does
//! not enable the `preserve_order` feature) already sorts keys on
//! serialization, so `to_canonical_json` gets that property for free:
//! any two policies that are `==` once deserialized into the same
//! `serde_json::Value` tree serialize to byte-identical canonical JSON,
//! independent of the key order they were written in on disk.

use curationgym_ngram::hashing::sha256_hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{CurationError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMethod {
    Exact,
    Minhash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    Global,
    PerDump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepRule {
    First,
    Longest,
    MostTokens,
    HighestQuality,
    LowestToxicity,
    MostRecent,
}

impl KeepRule {
    /// Only `First` can be realized in pure streaming mode with zero
    /// buffering; the others require cluster-collection and deferred emit
    /// (§4.2, Open Question (2)).
    pub fn requires_buffering(&self) -> bool {
        !matches!(self, KeepRule::First)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecontamMode {
    Drop,
    Tag,
    Downweight,
    Redact,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct MinHashParams {
    pub num_bands: usize,
    pub rows_per_band: usize,
    pub ngram_size: usize,
}

impl Default for MinHashParams {
    fn default() -> Self {
        Self {
            num_bands: 14,
            rows_per_band: 8,
            ngram_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct LanguageConfig {
    pub target: String,
    pub min_score: f64,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            target: "en".to_string(),
            min_score: 0.0,
        }
    }
}

/// Thresholds for the heuristic quality rule bank (§4.1). Every field has a
/// conservative default chosen so that the rule it gates is effectively
/// disabled unless the rule's name also appears in `enabled_rules`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct QualityThresholds {
    pub max_most_common_word_ratio: f64,
    pub max_duplicate_line_ratio: f64,
    pub max_char_run_ratio: f64,
    pub min_words: usize,
    pub max_words: usize,
    pub min_avg_word_length: f64,
    pub max_avg_word_length: f64,
    pub min_terminal_punct_ratio: f64,
    pub max_ellipsis_line_ratio: f64,
    pub max_bullet_line_ratio: f64,
    pub max_curly_brace_ratio: f64,
    pub max_digit_ratio: f64,
    pub min_alpha_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_most_common_word_ratio: 0.3,
            max_duplicate_line_ratio: 0.3,
            max_char_run_ratio: 0.1,
            min_words: 5,
            max_words: 100_000,
            min_avg_word_length: 2.0,
            max_avg_word_length: 12.0,
            min_terminal_punct_ratio: 0.0,
            max_ellipsis_line_ratio: 1.0,
            max_bullet_line_ratio: 1.0,
            max_curly_brace_ratio: 0.1,
            max_digit_ratio: 0.3,
            min_alpha_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct QualityConfig {
    pub enabled_rules: Vec<String>,
    pub thresholds: QualityThresholds,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled_rules: Vec::new(),
            thresholds: QualityThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DedupConfig {
    pub method: DedupMethod,
    pub scope: DedupScope,
    pub minhash: MinHashParams,
    pub keep_rule: KeepRule,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            method: DedupMethod::Exact,
            scope: DedupScope::Global,
            minhash: MinHashParams::default(),
            keep_rule: KeepRule::First,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DecontamConfig {
    pub enabled: bool,
    pub mode: DecontamMode,
    pub ngram_size: usize,
    pub threshold: f64,
    pub benchmark_targets: Vec<String>,
    /// Per Open Question (3): bounded audit parameters, logging-only.
    pub max_stored_ngrams: usize,
    pub preview_chars: usize,
}

impl Default for DecontamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: DecontamMode::Tag,
            ngram_size: 13,
            threshold: 0.8,
            benchmark_targets: Vec::new(),
            max_stored_ngrams: 10,
            preview_chars: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct MixingConfig {
    pub weights: BTreeMap<String, f64>,
    pub max_tokens_per_slice: BTreeMap<String, u64>,
    pub temperature: f64,
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            max_tokens_per_slice: BTreeMap::new(),
            temperature: 1.0,
        }
    }
}

/// The fully-ordered, canonicalizable curation policy (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Policy {
    pub name: String,
    pub version: String,
    pub seed: u64,
    pub language: LanguageConfig,
    pub quality: QualityConfig,
    pub dedup: DedupConfig,
    pub decontam: DecontamConfig,
    pub mixing: MixingConfig,
    pub max_tokens: Option<u64>,
    pub batch_size: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            name: "unnamed-policy".to_string(),
            version: "0.1.0".to_string(),
            seed: 0,
            language: LanguageConfig::default(),
            quality: QualityConfig::default(),
            dedup: DedupConfig::default(),
            decontam: DecontamConfig::default(),
            mixing: MixingConfig::default(),
            max_tokens: None,
            batch_size: 10_000,
        }
    }
}

impl Policy {
    /// The canonical JSON form used for hashing: sorted keys, no
    /// insignificant whitespace.
    pub fn to_canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&value).map_err(CurationError::from)
    }

    /// First 16 hex chars of SHA-256 over the canonical JSON form.
    pub fn policy_hash(&self) -> Result<String> {
        let canon = self.to_canonical_json()?;
        Ok(sha256_hex(canon.as_bytes())[..16].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_hash_is_stable_for_identical_policy() {
        let p = Policy::default();
        assert_eq!(p.policy_hash().unwrap(), p.policy_hash().unwrap());
    }

    #[test]
    fn policy_hash_is_insensitive_to_mixing_key_order() {
        let mut p1 = Policy::default();
        p1.mixing.weights.insert("a".to_string(), 0.5);
        p1.mixing.weights.insert("b".to_string(), 0.5);

        let mut p2 = Policy::default();
        p2.mixing.weights.insert("b".to_string(), 0.5);
        p2.mixing.weights.insert("a".to_string(), 0.5);

        assert_eq!(p1.policy_hash().unwrap(), p2.policy_hash().unwrap());
    }

    #[test]
    fn policy_hash_changes_with_semantic_difference() {
        let p1 = Policy::default();
        let mut p2 = Policy::default();
        p2.seed = 1;
        assert_ne!(p1.policy_hash().unwrap(), p2.policy_hash().unwrap());
    }

    #[test]
    fn policy_hash_is_16_hex_chars() {
        let h = Policy::default().policy_hash().unwrap();
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
