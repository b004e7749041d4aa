//! slices - Slice assignment and aggregate statistics (§4.4).
//!
//! Slice extractors are pure functions of a document's declared fields.
//! Assignment returns a sorted, deduplicated list of `name=value` tags
//! embedded into `metadata.slice_tags`, alongside a build-time
//! `slice_code_version` so stats collected under a different extractor
//! build are never confused with the current one.

pub mod stats;

use crate::document::Document;
use crate::version::slice_code_version;

fn domain_of(url: &str) -> Option<String> {
    let without_scheme = url.split("://").last().unwrap_or(url);
    let host = without_scheme.split(['/', '?', '#']).next().unwrap_or(without_scheme);
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

fn domain_category(domain: &str) -> &'static str {
    if domain.ends_with(".edu") {
        "edu"
    } else if domain.ends_with(".gov") {
        "gov"
    } else {
        "other"
    }
}

fn token_length_bin(token_count: u64) -> &'static str {
    if token_count < 128 {
        "tiny"
    } else if token_count < 512 {
        "small"
    } else if token_count < 2048 {
        "medium"
    } else {
        "large"
    }
}

fn quality_bin(mean_score: f64) -> &'static str {
    if mean_score < 0.5 {
        "low"
    } else if mean_score < 0.8 {
        "medium"
    } else {
        "high"
    }
}

fn language_score_bin(score: f64) -> &'static str {
    if score >= 0.95 {
        "very_high"
    } else if score >= 0.85 {
        "high"
    } else if score >= 0.7 {
        "medium"
    } else {
        "low"
    }
}

fn toxicity_bin(score: f64) -> &'static str {
    if score < 0.1 {
        "safe"
    } else if score < 0.3 {
        "low_risk"
    } else if score < 0.5 {
        "medium_risk"
    } else {
        "high_risk"
    }
}

/// Computes the sorted, deduplicated list of `name=value` slice tags for
/// `doc` and embeds them, along with `slice_code_version`, into its
/// metadata.
pub fn assign_slices(doc: &mut Document) {
    let mut tags: Vec<String> = Vec::new();

    if let Some(dump) = &doc.metadata.known.dump {
        tags.push(format!("dump={}", dump));
    }
    if let Some(url) = &doc.metadata.known.url {
        if let Some(domain) = domain_of(url) {
            tags.push(format!("url_domain={}", domain));
            tags.push(format!("url_category={}", domain_category(&domain)));
        }
    }
    if let Some(lang) = &doc.metadata.known.language {
        tags.push(format!("language={}", lang));
    }
    if let Some(tc) = doc.metadata.known.token_count {
        tags.push(format!("token_length_bin={}", token_length_bin(tc)));
    }
    if let Some(mean) = doc.metadata.mean_quality_score() {
        tags.push(format!("quality_bin={}", quality_bin(mean)));
    }
    if let Some(score) = doc.metadata.known.language_score {
        tags.push(format!("language_score_bin={}", language_score_bin(score)));
    }
    if let Some(tox) = doc.metadata.extra_f64("toxicity_score") {
        tags.push(format!("toxicity_bin={}", toxicity_bin(tox)));
    }

    tags.sort();
    tags.dedup();

    doc.metadata.known.slice_tags = Some(tags);
    doc.metadata.known.slice_code_version = Some(slice_code_version());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::QualityScores;

    #[test]
    fn assigns_dump_and_language_tags() {
        let mut doc = Document::new("d1", "text");
        doc.metadata.known.dump = Some("CC-MAIN-2024-10".to_string());
        doc.metadata.known.language = Some("en".to_string());
        assign_slices(&mut doc);
        let tags = doc.metadata.known.slice_tags.unwrap();
        assert!(tags.contains(&"dump=CC-MAIN-2024-10".to_string()));
        assert!(tags.contains(&"language=en".to_string()));
    }

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let mut doc = Document::new("d1", "text");
        doc.metadata.known.dump = Some("z-dump".to_string());
        doc.metadata.known.language = Some("en".to_string());
        assign_slices(&mut doc);
        let tags = doc.metadata.known.slice_tags.unwrap();
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }

    #[test]
    fn url_domain_categorizes_edu_and_gov() {
        let mut doc = Document::new("d1", "text");
        doc.metadata.known.url = Some("https://cs.university.edu/paper".to_string());
        assign_slices(&mut doc);
        let tags = doc.metadata.known.slice_tags.unwrap();
        assert!(tags.iter().any(|t| t == "url_category=edu"));
    }

    #[test]
    fn quality_bin_uses_mean_of_quality_scores() {
        let mut doc = Document::new("d1", "text");
        let mut scores = QualityScores::new();
        scores.insert("a".to_string(), 0.9);
        scores.insert("b".to_string(), 0.9);
        doc.metadata.known.quality_scores = Some(scores);
        assign_slices(&mut doc);
        let tags = doc.metadata.known.slice_tags.unwrap();
        assert!(tags.iter().any(|t| t == "quality_bin=high"));
    }

    #[test]
    fn toxicity_bin_only_present_when_score_supplied() {
        let mut doc = Document::new("d1", "text");
        assign_slices(&mut doc);
        let tags = doc.metadata.known.slice_tags.unwrap();
        assert!(!tags.iter().any(|t| t.starts_with("toxicity_bin=")));
    }

    #[test]
    fn slice_code_version_is_always_embedded() {
        let mut doc = Document::new("d1", "text");
        assign_slices(&mut doc);
        assert!(doc.metadata.known.slice_code_version.is_some());
    }
}
