//! url_filter.rs - URL blocklist/pattern filter (§4.1, §6).
//!
//! Rejects a document whose `metadata.url` registrable domain (or any
//! parent domain) appears in a configured blocklist, or whose URL matches
//! any configured regex pattern. Blocklists are loaded once at operator
//! construction time: "one domain per line; `#` comments ignored" (§6).

use once_cell::sync::Lazy;
use regex::RegexSet;
use std::collections::HashSet;

use crate::document::Document;
use crate::operators::OperatorOutcome;

/// Lexical markers covering the spec's "adult/gambling/piracy" default
/// category; deliberately coarse substring markers, not a curated list of
/// real sites.
static DEFAULT_PATTERNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        r"(?i)\bporn\b",
        r"(?i)\bxxx\b",
        r"(?i)\bcasino\b",
        r"(?i)\bgambl(e|ing)\b",
        r"(?i)\btorrent\b",
        r"(?i)\bwarez\b",
    ]
});

pub struct UrlFilterOperator {
    blocklist: HashSet<String>,
    patterns: RegexSet,
}

/// Parses a blocklist file's contents: one domain per line, `#` comments
/// ignored, blank lines skipped.
pub fn parse_blocklist(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_lowercase())
        .collect()
}

fn registrable_and_parent_domains(host: &str) -> Vec<String> {
    let labels: Vec<&str> = host.split('.').collect();
    let mut domains = Vec::new();
    for i in 0..labels.len().saturating_sub(1) {
        domains.push(labels[i..].join("."));
    }
    if domains.is_empty() && !host.is_empty() {
        domains.push(host.to_string());
    }
    domains
}

fn extract_host(url: &str) -> Option<String> {
    let without_scheme = url.split("://").last().unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = host.rsplit('@').next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

impl UrlFilterOperator {
    pub fn new(blocklist: HashSet<String>, extra_patterns: &[String]) -> Self {
        let mut all_patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect();
        all_patterns.extend(extra_patterns.iter().cloned());
        let patterns = RegexSet::new(&all_patterns).expect("valid url filter patterns");
        Self { blocklist, patterns }
    }

    pub fn with_default_patterns(blocklist: HashSet<String>) -> Self {
        Self::new(blocklist, &[])
    }

    pub fn apply(&self, mut doc: Document) -> OperatorOutcome {
        let Some(url) = doc.metadata.known.url.clone() else {
            return OperatorOutcome::Keep(doc);
        };

        if self.patterns.is_match(&url) {
            let reason = "url_pattern_blocked".to_string();
            doc.metadata.mark_dropped("url_filter", reason.clone());
            return OperatorOutcome::Reject { doc, reason };
        }

        if let Some(host) = extract_host(&url) {
            for domain in registrable_and_parent_domains(&host) {
                if self.blocklist.contains(&domain) {
                    let reason = format!("url_domain_blocked:{}", domain);
                    doc.metadata.mark_dropped("url_filter", reason.clone());
                    return OperatorOutcome::Reject { doc, reason };
                }
            }
        }

        OperatorOutcome::Keep(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_blocklist_strips_comments_and_blanks() {
        let parsed = parse_blocklist("# comment\nexample.com\n\nspam.net # trailing comment\n");
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains("example.com"));
        assert!(parsed.contains("spam.net"));
    }

    #[test]
    fn rejects_blocklisted_domain() {
        let mut bl = HashSet::new();
        bl.insert("bad.example".to_string());
        let op = UrlFilterOperator::with_default_patterns(bl);

        let mut doc = Document::new("d1", "text");
        doc.metadata.known.url = Some("https://sub.bad.example/page".to_string());
        match op.apply(doc) {
            OperatorOutcome::Reject { .. } => {}
            OperatorOutcome::Keep(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn keeps_unblocklisted_domain() {
        let op = UrlFilterOperator::with_default_patterns(HashSet::new());
        let mut doc = Document::new("d1", "text");
        doc.metadata.known.url = Some("https://example.org/page".to_string());
        match op.apply(doc) {
            OperatorOutcome::Keep(_) => {}
            OperatorOutcome::Reject { .. } => panic!("expected keep"),
        }
    }

    #[test]
    fn rejects_default_lexical_pattern() {
        let op = UrlFilterOperator::with_default_patterns(HashSet::new());
        let mut doc = Document::new("d1", "text");
        doc.metadata.known.url = Some("https://example.com/casino-bonus".to_string());
        match op.apply(doc) {
            OperatorOutcome::Reject { .. } => {}
            OperatorOutcome::Keep(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn document_without_url_passes_through() {
        let op = UrlFilterOperator::with_default_patterns(HashSet::new());
        let doc = Document::new("d1", "text");
        match op.apply(doc) {
            OperatorOutcome::Keep(_) => {}
            OperatorOutcome::Reject { .. } => panic!("expected keep"),
        }
    }
}
