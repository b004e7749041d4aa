//! pii_mask.rs - PII masking transformer (§4.1).
//!
//! Regex substitution for emails and public IPv4 addresses (RFC1918 and
//! loopback ranges excluded). Grounded on the teacher's `regex`-driven rule
//! compilation idiom: patterns are compiled once (via `once_cell::Lazy`) and
//! reused across every document in a run, so they are part of the
//! operator's fixed configuration fingerprint rather than recompiled
//! per-call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Document;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b").expect("valid email regex")
});

static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").expect("valid ipv4 regex")
});

fn is_public_ipv4(a: u8, b: u8, c: u8, _d: u8) -> bool {
    if a == 127 {
        return false; // loopback
    }
    if a == 10 {
        return false; // RFC1918 10.0.0.0/8
    }
    if a == 172 && (16..=31).contains(&b) {
        return false; // RFC1918 172.16.0.0/12
    }
    if a == 192 && b == 168 {
        return false; // RFC1918 192.168.0.0/16
    }
    true
}

pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
pub const IP_PLACEHOLDER: &str = "[IP]";

/// Masks emails and public IPv4 addresses in `text`, returning the masked
/// text and the number of substitutions made.
pub fn mask(text: &str) -> (String, u64) {
    let mut masked_count = 0u64;

    let after_email = EMAIL_RE.replace_all(text, |_caps: &regex::Captures| {
        masked_count += 1;
        EMAIL_PLACEHOLDER
    });

    let after_ip = IPV4_RE.replace_all(&after_email, |caps: &regex::Captures| {
        let octets: Vec<u8> = (1..=4)
            .map(|i| caps.get(i).unwrap().as_str().parse::<u16>().unwrap_or(256).min(255) as u8)
            .collect();
        if is_public_ipv4(octets[0], octets[1], octets[2], octets[3]) {
            masked_count += 1;
            IP_PLACEHOLDER.to_string()
        } else {
            caps.get(0).unwrap().as_str().to_string()
        }
    });

    (after_ip.into_owned(), masked_count)
}

pub struct PiiMaskOperator;

impl PiiMaskOperator {
    pub fn apply(&self, doc: &mut Document) {
        let (masked, count) = mask(&doc.text);
        if count > 0 {
            doc.rewrite_text(masked);
        }
        doc.metadata.known.pii_masked_count = Some(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_addresses() {
        let (out, count) = mask("contact me at test@example.com please");
        assert_eq!(out, "contact me at [EMAIL] please");
        assert_eq!(count, 1);
    }

    #[test]
    fn masks_public_ipv4() {
        let (out, count) = mask("the server is at 203.0.113.5 today");
        assert_eq!(out, "the server is at [IP] today");
        assert_eq!(count, 1);
    }

    #[test]
    fn does_not_mask_rfc1918_or_loopback() {
        let (out, count) = mask("internal hosts: 10.0.0.1 192.168.1.1 172.16.0.5 127.0.0.1");
        assert_eq!(count, 0);
        assert!(out.contains("10.0.0.1"));
        assert!(out.contains("127.0.0.1"));
    }

    #[test]
    fn operator_sets_rewritten_flag_only_when_masking_happened() {
        let mut doc = Document::new("d1", "nothing sensitive here");
        PiiMaskOperator.apply(&mut doc);
        assert_eq!(doc.metadata.known.pii_masked_count, Some(0));
        assert_eq!(doc.metadata.known.text_rewritten, None);

        let mut doc2 = Document::new("d2", "email me at a@b.com");
        PiiMaskOperator.apply(&mut doc2);
        assert_eq!(doc2.metadata.known.text_rewritten, Some(true));
    }
}
