//! warc.rs - WARC / WET reader (§6).
//!
//! A WARC (or WET) file is a sequence of records: a `WARC/1.x` version
//! line, a block of `Key: Value` header lines, a blank-line separator, then
//! the record body, repeated until the next `WARC/` line or end of file.
//! This reader extracts `WARC-Target-URI` (-> `metadata.url`) and
//! `WARC-Record-ID` (-> the document id) from the headers and takes
//! everything between the separator and the next record boundary as the
//! body.
//!
//! WARC bodies are raw HTTP response payloads (HTML, typically) and are
//! expected to pass through `operators::html_extract` downstream; WET
//! bodies are already plain-text extractions and skip that stage. This
//! reader does not distinguish the two cases itself — both call the same
//! parser — the distinction lives entirely in which pipeline stage the
//! caller routes the output through.

use log::warn;

use crate::document::Document;

pub fn read_warc(raw: &str, source: &str) -> Vec<Document> {
    parse_records(raw, source)
}

pub fn read_wet(raw: &str, source: &str) -> Vec<Document> {
    parse_records(raw, source)
}

fn parse_records(raw: &str, source: &str) -> Vec<Document> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut docs = Vec::new();
    let mut i = 0usize;
    let mut record_ordinal = 0usize;

    while i < lines.len() {
        if !lines[i].starts_with("WARC/") {
            i += 1;
            continue;
        }
        record_ordinal += 1;
        i += 1;

        let mut headers: Vec<(String, String)> = Vec::new();
        let mut malformed = false;
        while i < lines.len() && !lines[i].is_empty() {
            if lines[i].starts_with("WARC/") {
                malformed = true;
                break;
            }
            if let Some((k, v)) = lines[i].split_once(':') {
                headers.push((k.trim().to_string(), v.trim().to_string()));
            }
            i += 1;
        }

        if malformed {
            warn!("warc record {record_ordinal}: no header/body separator before next record, skipping");
            continue;
        }
        if i >= lines.len() {
            warn!("warc record {record_ordinal}: truncated before its body, skipping");
            break;
        }
        i += 1; // past the blank separator line

        let body_start = i;
        while i < lines.len() && !lines[i].starts_with("WARC/") {
            i += 1;
        }
        let body = lines[body_start..i].join("\n").trim_end().to_string();

        let record_id = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("WARC-Record-ID"))
            .map(|(_, v)| v.trim_matches(|c| c == '<' || c == '>').to_string());
        let Some(record_id) = record_id else {
            warn!("warc record {record_ordinal}: missing WARC-Record-ID, skipping");
            continue;
        };

        let target_uri = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("WARC-Target-URI"))
            .map(|(_, v)| v.clone());

        let mut doc = Document::new(record_id, body);
        doc.metadata.known.source = Some(source.to_string());
        doc.metadata.known.url = target_uri;
        docs.push(doc);
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_well_formed_record() {
        let raw = "WARC/1.0\r\nWARC-Type: response\r\nWARC-Record-ID: <urn:uuid:abc>\r\nWARC-Target-URI: https://example.com/page\r\n\r\n<html><body>hi</body></html>\r\n";
        let docs = read_warc(raw, "cc-2024-10");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "urn:uuid:abc");
        assert_eq!(docs[0].metadata.known.url.as_deref(), Some("https://example.com/page"));
        assert_eq!(docs[0].metadata.known.source.as_deref(), Some("cc-2024-10"));
        assert!(docs[0].text.contains("<html>"));
    }

    #[test]
    fn parses_multiple_consecutive_records() {
        let raw = "\
WARC/1.0
WARC-Record-ID: <id-1>
WARC-Target-URI: https://a.example/

body one

WARC/1.0
WARC-Record-ID: <id-2>
WARC-Target-URI: https://b.example/

body two
";
        let docs = read_warc(raw, "dump");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "id-1");
        assert_eq!(docs[1].id, "id-2");
        assert!(docs[0].text.contains("body one"));
        assert!(docs[1].text.contains("body two"));
    }

    #[test]
    fn skips_record_missing_record_id_but_keeps_others() {
        let raw = "\
WARC/1.0
WARC-Target-URI: https://a.example/

no id here

WARC/1.0
WARC-Record-ID: <id-2>

body two
";
        let docs = read_warc(raw, "dump");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "id-2");
    }

    #[test]
    fn wet_records_parse_identically_to_warc() {
        let raw = "WARC/1.0\nWARC-Record-ID: <wet-1>\n\nplain extracted text\n";
        let docs = read_wet(raw, "wet-dump");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "plain extracted text");
    }

    #[test]
    fn empty_input_yields_no_documents() {
        assert!(read_warc("", "dump").is_empty());
    }
}
