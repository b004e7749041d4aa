//! keep_rule.rs - Picks a cluster's surviving representative under a
//! buffered `KeepRule` (§4.2). `First` never reaches this module: it is
//! resolved by the streaming deduper without buffering.

use std::cmp::Ordering;

use crate::document::Document;
use crate::policy::KeepRule;

fn mean_quality(doc: &Document) -> f64 {
    doc.metadata.mean_quality_score().unwrap_or(0.0)
}

fn toxicity(doc: &Document) -> f64 {
    doc.metadata.extra_f64("toxicity_score").unwrap_or(1.0)
}

fn recency(doc: &Document) -> f64 {
    doc.metadata.extra_f64("timestamp").unwrap_or(0.0)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Picks the winning index among `indices` (all indexing into `docs`)
/// under `rule`. Ties are broken by lowest index, so the result is
/// deterministic for a fixed document order.
pub fn pick_winner(indices: &[usize], docs: &[Document], rule: KeepRule) -> usize {
    assert!(!indices.is_empty(), "cluster must have at least one member");
    match rule {
        KeepRule::First => indices[0],
        KeepRule::Longest => *indices
            .iter()
            .max_by(|&&a, &&b| {
                docs[a]
                    .text
                    .chars()
                    .count()
                    .cmp(&docs[b].text.chars().count())
                    .then(b.cmp(&a))
            })
            .unwrap(),
        KeepRule::MostTokens => *indices
            .iter()
            .max_by(|&&a, &&b| {
                docs[a]
                    .metadata
                    .known
                    .token_count
                    .unwrap_or(0)
                    .cmp(&docs[b].metadata.known.token_count.unwrap_or(0))
                    .then(b.cmp(&a))
            })
            .unwrap(),
        KeepRule::HighestQuality => *indices
            .iter()
            .max_by(|&&a, &&b| cmp_f64(mean_quality(&docs[a]), mean_quality(&docs[b])).then(b.cmp(&a)))
            .unwrap(),
        KeepRule::LowestToxicity => *indices
            .iter()
            .min_by(|&&a, &&b| cmp_f64(toxicity(&docs[a]), toxicity(&docs[b])).then(a.cmp(&b)))
            .unwrap(),
        KeepRule::MostRecent => *indices
            .iter()
            .max_by(|&&a, &&b| cmp_f64(recency(&docs[a]), recency(&docs[b])).then(b.cmp(&a)))
            .unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn longest_picks_document_with_most_characters() {
        let docs = vec![
            Document::new("a", "short"),
            Document::new("b", "a much longer document body here"),
            Document::new("c", "mid length one"),
        ];
        let winner = pick_winner(&[0, 1, 2], &docs, KeepRule::Longest);
        assert_eq!(winner, 1);
    }

    #[test]
    fn most_tokens_uses_token_count_field() {
        let mut docs = vec![Document::new("a", "x"), Document::new("b", "y")];
        docs[0].metadata.known.token_count = Some(5);
        docs[1].metadata.known.token_count = Some(50);
        let winner = pick_winner(&[0, 1], &docs, KeepRule::MostTokens);
        assert_eq!(winner, 1);
    }

    #[test]
    fn lowest_toxicity_prefers_unset_score_over_scored() {
        let mut docs = vec![Document::new("a", "x"), Document::new("b", "y")];
        docs[1].metadata.set_extra("toxicity_score", json!(0.9));
        let winner = pick_winner(&[0, 1], &docs, KeepRule::LowestToxicity);
        assert_eq!(winner, 1, "explicit low score should beat the unset default of 1.0");
    }

    #[test]
    fn ties_break_toward_lowest_index() {
        let docs = vec![Document::new("a", "same"), Document::new("b", "same")];
        let winner = pick_winner(&[0, 1], &docs, KeepRule::Longest);
        assert_eq!(winner, 0);
    }

    #[test]
    fn most_recent_uses_timestamp_extra_field() {
        let mut docs = vec![Document::new("a", "x"), Document::new("b", "y")];
        docs[0].metadata.set_extra("timestamp", json!(100.0));
        docs[1].metadata.set_extra("timestamp", json!(200.0));
        let winner = pick_winner(&[0, 1], &docs, KeepRule::MostRecent);
        assert_eq!(winner, 1);
    }
}
