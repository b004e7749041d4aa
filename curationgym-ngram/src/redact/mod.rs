//! Multi-pattern substring redaction, backed by `daachorse`'s Aho-Corasick
//! automaton. Used by the decontamination guard's `redact` mode (§4.3) to
//! replace matching evaluation n-grams with a fixed placeholder.

use daachorse::DoubleArrayAhoCorasick;

/// Replaces every non-overlapping, leftmost occurrence of any string in
/// `patterns` within `text` with `placeholder`. Matching is performed on a
/// lowercased copy of `text` (patterns are already-lowercased n-grams); when
/// case-folding changes the byte length of `text` the match offsets would no
/// longer line up with the original bytes, so in that case the text is
/// returned unmodified rather than corrupted.
pub fn redact_matches(text: &str, patterns: &[String], placeholder: &str) -> String {
    if patterns.is_empty() || text.is_empty() {
        return text.to_string();
    }
    let lower = text.to_lowercase();
    if lower.len() != text.len() {
        return text.to_string();
    }

    let pma = match DoubleArrayAhoCorasick::<u32>::new(patterns) {
        Ok(pma) => pma,
        Err(_) => return text.to_string(),
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    for m in pma.find_overlapping_iter(&lower) {
        let (start, end) = (m.start(), m.end());
        if start < last {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(placeholder);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_matched_ngram() {
        let out = redact_matches(
            "the answer is forty two exactly",
            &["the answer is forty two".to_string()],
            "[REDACTED]",
        );
        assert_eq!(out, "[REDACTED] exactly");
    }

    #[test]
    fn leaves_unmatched_text_alone() {
        let out = redact_matches("completely unrelated content", &["nope".to_string()], "[X]");
        assert_eq!(out, "completely unrelated content");
    }

    #[test]
    fn empty_patterns_is_noop() {
        assert_eq!(redact_matches("hello", &[], "[X]"), "hello");
    }
}
