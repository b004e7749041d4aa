//! quality.rs - The heuristic quality rule bank (§4.1).
//!
//! Each rule is independent, returns `(passes, score)`, and is always
//! scored even when not enabled; the filter rejects only if an *enabled*
//! rule fails. Empty or too-short inputs pass vacuously (score 1.0), per
//! the spec.

use std::collections::BTreeMap;

use crate::document::Document;
use crate::operators::OperatorOutcome;
use crate::policy::QualityConfig;

/// All rule names in the bank, used both for the `enabled_rules` policy
/// field and for the `quality_scores` metadata key.
pub const RULE_NAMES: &[&str] = &[
    "repetition_most_common_word",
    "repetition_duplicate_lines",
    "repetition_char_runs",
    "length_words",
    "length_avg_word",
    "formatting_terminal_punct",
    "formatting_ellipsis",
    "formatting_bullets",
    "composition_curly_braces",
    "composition_digits",
    "composition_alphabetic",
];

struct RuleResult {
    name: &'static str,
    passes: bool,
    score: f64,
}

fn words_of(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn lines_of(text: &str) -> Vec<&str> {
    text.lines().collect()
}

fn rule_repetition_most_common_word(text: &str, max_ratio: f64) -> RuleResult {
    let words = words_of(text);
    if words.is_empty() {
        return RuleResult {
            name: "repetition_most_common_word",
            passes: true,
            score: 1.0,
        };
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for w in &words {
        *counts.entry(*w).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    let ratio = max_count as f64 / words.len() as f64;
    RuleResult {
        name: "repetition_most_common_word",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_repetition_duplicate_lines(text: &str, max_ratio: f64) -> RuleResult {
    let lines = lines_of(text);
    if lines.len() < 2 {
        return RuleResult {
            name: "repetition_duplicate_lines",
            passes: true,
            score: 1.0,
        };
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for l in &lines {
        *counts.entry(*l).or_insert(0) += 1;
    }
    let duplicates: usize = counts.values().filter(|&&c| c > 1).map(|c| c - 1).sum();
    let ratio = duplicates as f64 / lines.len() as f64;
    RuleResult {
        name: "repetition_duplicate_lines",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_repetition_char_runs(text: &str, max_ratio: f64) -> RuleResult {
    if text.is_empty() {
        return RuleResult {
            name: "repetition_char_runs",
            passes: true,
            score: 1.0,
        };
    }
    let chars: Vec<char> = text.chars().collect();
    let mut run_chars = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let mut j = i + 1;
        while j < chars.len() && chars[j] == chars[i] {
            j += 1;
        }
        let run_len = j - i;
        if run_len >= 10 {
            run_chars += run_len;
        }
        i = j;
    }
    let ratio = run_chars as f64 / chars.len() as f64;
    RuleResult {
        name: "repetition_char_runs",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_length_words(text: &str, min_words: usize, max_words: usize) -> RuleResult {
    let count = words_of(text).len();
    let passes = count >= min_words && count <= max_words;
    let score = if max_words == 0 {
        1.0
    } else {
        (count as f64 / max_words.max(1) as f64).min(1.0)
    };
    RuleResult {
        name: "length_words",
        passes,
        score,
    }
}

fn rule_length_avg_word(text: &str, min_len: f64, max_len: f64) -> RuleResult {
    let words = words_of(text);
    if words.is_empty() {
        return RuleResult {
            name: "length_avg_word",
            passes: true,
            score: 1.0,
        };
    }
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg = total_chars as f64 / words.len() as f64;
    let passes = avg >= min_len && avg <= max_len;
    let mid = (min_len + max_len) / 2.0;
    let spread = (max_len - min_len).max(1.0) / 2.0;
    let score = (1.0 - (avg - mid).abs() / spread).clamp(0.0, 1.0);
    RuleResult {
        name: "length_avg_word",
        passes,
        score,
    }
}

fn rule_formatting_terminal_punct(text: &str, min_ratio: f64) -> RuleResult {
    let lines: Vec<&str> = lines_of(text).into_iter().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return RuleResult {
            name: "formatting_terminal_punct",
            passes: true,
            score: 1.0,
        };
    }
    let ending = lines
        .iter()
        .filter(|l| l.trim_end().ends_with(['.', '!', '?', '"', '\'']))
        .count();
    let ratio = ending as f64 / lines.len() as f64;
    RuleResult {
        name: "formatting_terminal_punct",
        passes: ratio >= min_ratio,
        score: ratio,
    }
}

fn rule_formatting_ellipsis(text: &str, max_ratio: f64) -> RuleResult {
    let lines = lines_of(text);
    if lines.is_empty() {
        return RuleResult {
            name: "formatting_ellipsis",
            passes: true,
            score: 1.0,
        };
    }
    let with_ellipsis = lines.iter().filter(|l| l.contains("...") || l.contains('…')).count();
    let ratio = with_ellipsis as f64 / lines.len() as f64;
    RuleResult {
        name: "formatting_ellipsis",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_formatting_bullets(text: &str, max_ratio: f64) -> RuleResult {
    let lines = lines_of(text);
    if lines.is_empty() {
        return RuleResult {
            name: "formatting_bullets",
            passes: true,
            score: 1.0,
        };
    }
    let bulleted = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with('-') || t.starts_with('*') || t.starts_with('•')
        })
        .count();
    let ratio = bulleted as f64 / lines.len() as f64;
    RuleResult {
        name: "formatting_bullets",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_composition_curly_braces(text: &str, max_ratio: f64) -> RuleResult {
    if text.is_empty() {
        return RuleResult {
            name: "composition_curly_braces",
            passes: true,
            score: 1.0,
        };
    }
    let count = text.chars().filter(|c| *c == '{' || *c == '}').count();
    let ratio = count as f64 / text.chars().count() as f64;
    RuleResult {
        name: "composition_curly_braces",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_composition_digits(text: &str, max_ratio: f64) -> RuleResult {
    if text.is_empty() {
        return RuleResult {
            name: "composition_digits",
            passes: true,
            score: 1.0,
        };
    }
    let count = text.chars().filter(|c| c.is_ascii_digit()).count();
    let ratio = count as f64 / text.chars().count() as f64;
    RuleResult {
        name: "composition_digits",
        passes: ratio <= max_ratio,
        score: 1.0 - ratio,
    }
}

fn rule_composition_alphabetic(text: &str, min_ratio: f64) -> RuleResult {
    if text.is_empty() {
        return RuleResult {
            name: "composition_alphabetic",
            passes: true,
            score: 1.0,
        };
    }
    let count = text.chars().filter(|c| c.is_alphabetic()).count();
    let ratio = count as f64 / text.chars().count() as f64;
    RuleResult {
        name: "composition_alphabetic",
        passes: ratio >= min_ratio,
        score: ratio,
    }
}

/// Runs the whole rule bank, returning `(overall_pass, scores, failed_rules)`.
/// The overall result fails iff a rule named in `cfg.enabled_rules` fails;
/// scores are reported for every rule regardless of whether it is enabled.
pub fn evaluate(text: &str, cfg: &QualityConfig) -> (bool, BTreeMap<String, f64>, Vec<String>) {
    let t = &cfg.thresholds;
    let results = [
        rule_repetition_most_common_word(text, t.max_most_common_word_ratio),
        rule_repetition_duplicate_lines(text, t.max_duplicate_line_ratio),
        rule_repetition_char_runs(text, t.max_char_run_ratio),
        rule_length_words(text, t.min_words, t.max_words),
        rule_length_avg_word(text, t.min_avg_word_length, t.max_avg_word_length),
        rule_formatting_terminal_punct(text, t.min_terminal_punct_ratio),
        rule_formatting_ellipsis(text, t.max_ellipsis_line_ratio),
        rule_formatting_bullets(text, t.max_bullet_line_ratio),
        rule_composition_curly_braces(text, t.max_curly_brace_ratio),
        rule_composition_digits(text, t.max_digit_ratio),
        rule_composition_alphabetic(text, t.min_alpha_ratio),
    ];

    let mut scores = BTreeMap::new();
    let mut failed_rules = Vec::new();
    for r in &results {
        scores.insert(r.name.to_string(), r.score);
        if !r.passes && cfg.enabled_rules.iter().any(|n| n == r.name) {
            failed_rules.push(r.name.to_string());
        }
    }
    (failed_rules.is_empty(), scores, failed_rules)
}

pub struct QualityOperator {
    cfg: QualityConfig,
}

impl QualityOperator {
    pub fn new(cfg: QualityConfig) -> Self {
        Self { cfg }
    }

    pub fn apply(&self, mut doc: Document) -> OperatorOutcome {
        let (passes, scores, failed_rules) = evaluate(&doc.text, &self.cfg);
        doc.metadata.known.quality_scores = Some(scores);
        if !passes {
            let reason = format!("quality_rule_failed: {:?}", failed_rules);
            doc.metadata.mark_dropped("quality", reason.clone());
            return OperatorOutcome::Reject { doc, reason };
        }
        OperatorOutcome::Keep(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::QualityThresholds;

    fn cfg(enabled: &[&str]) -> QualityConfig {
        QualityConfig {
            enabled_rules: enabled.iter().map(|s| s.to_string()).collect(),
            thresholds: QualityThresholds::default(),
        }
    }

    #[test]
    fn empty_text_passes_vacuously() {
        let (pass, scores, failed) = evaluate("", &cfg(RULE_NAMES));
        assert!(pass);
        assert!(failed.is_empty());
        assert_eq!(scores.len(), RULE_NAMES.len());
    }

    #[test]
    fn scores_always_emitted_even_when_rule_disabled() {
        let (_, scores, _) = evaluate("aaaaaaaaaaaaaaaaaaaa", &cfg(&[]));
        assert!(scores.contains_key("repetition_char_runs"));
    }

    #[test]
    fn rejects_when_enabled_rule_fails() {
        let text = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let (pass, _, failed) = evaluate(text, &cfg(&["repetition_char_runs"]));
        assert!(!pass);
        assert_eq!(failed, vec!["repetition_char_runs".to_string()]);
    }

    #[test]
    fn passes_when_failing_rule_is_not_enabled() {
        let text = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let (pass, _, _) = evaluate(text, &cfg(&["length_words"]));
        assert!(pass);
    }

    #[test]
    fn operator_rejects_and_marks_metadata() {
        let op = QualityOperator::new(cfg(&["length_words"]));
        let doc = Document::new("d1", "too short");
        match op.apply(doc) {
            OperatorOutcome::Reject { doc, .. } => {
                assert_eq!(doc.metadata.known.reject_stage.as_deref(), Some("quality"));
            }
            OperatorOutcome::Keep(_) => panic!("expected rejection"),
        }
    }
}
