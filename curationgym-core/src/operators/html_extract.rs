//! html_extract.rs - HTML-to-text extraction (§4.1).
//!
//! No HTML-parsing crate is available in the teacher's dependency stack, so
//! this reimplements a conservative tag-stripping extractor, grounded on
//! the teacher's ANSI-stripping index-mapping approach (`strip-ansi-escapes`
//! is used elsewhere in the stack to remove control sequences while tracking
//! byte offsets): `<script>`/`<style>` blocks are stripped wholesale, then
//! remaining tags are stripped and whitespace is collapsed. Already-extracted
//! plain text (no `<` byte at all) is treated as a pass-through special case,
//! matching WET-style pre-extracted input.

use crate::document::Document;
use crate::operators::OperatorOutcome;

fn looks_like_html(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

fn strip_blocks(html: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    loop {
        match rest.to_lowercase().find(&open) {
            Some(start) => {
                out.push_str(&rest[..start]);
                match rest[start..].to_lowercase().find(&close) {
                    Some(end_rel) => {
                        rest = &rest[start + end_rel + close.len()..];
                    }
                    None => {
                        rest = "";
                        break;
                    }
                }
            }
            None => {
                out.push_str(rest);
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts plain text from `html`, stripping `<script>`/`<style>` blocks
/// before stripping remaining tags and collapsing whitespace.
pub fn extract_text(html: &str) -> String {
    if !looks_like_html(html) {
        return html.to_string();
    }
    let no_script = strip_blocks(html, "script");
    let no_style = strip_blocks(&no_script, "style");
    let stripped = strip_tags(&no_style);
    collapse_whitespace(&stripped)
}

pub struct HtmlExtractOperator {
    pub min_extracted_size: usize,
}

impl HtmlExtractOperator {
    pub fn apply(&self, mut doc: Document) -> OperatorOutcome {
        let original_len = doc.text.len();
        let extracted = extract_text(&doc.text);
        let extracted_len = extracted.len();
        let ratio = if original_len == 0 {
            0.0
        } else {
            extracted_len as f64 / original_len as f64
        };

        doc.metadata.known.original_html_length = Some(original_len);
        doc.metadata.known.extracted_text_length = Some(extracted_len);
        doc.metadata.known.extraction_ratio = Some(ratio);

        if extracted_len < self.min_extracted_size {
            let reason = format!(
                "extracted_text_too_short: {} < {}",
                extracted_len, self.min_extracted_size
            );
            doc.metadata.mark_dropped("html_extract", reason.clone());
            return OperatorOutcome::Reject { doc, reason };
        }

        doc.rewrite_text(extracted);
        OperatorOutcome::Keep(doc)
    }
}
