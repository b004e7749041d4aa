//! tabular.rs - Tabular / dataset reader (§6).
//!
//! Reads newline-delimited JSON rows (the on-disk shape most tabular
//! dataset exports use once flattened). The `text` column becomes
//! `Document::text`; `id`, if present, becomes `Document::id` (otherwise one
//! is synthesized from `source` and the row's ordinal); every other column
//! is projected into `metadata.extra` verbatim. `source` is always set from
//! the caller-supplied dataset/file identifier, never read from the row.

use log::warn;

use crate::document::Document;

pub fn read_jsonl(raw: &str, source: &str) -> Vec<Document> {
    let mut docs = Vec::new();

    for (ordinal, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let row: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("tabular reader: row {ordinal} in '{source}' is malformed JSON ({e}), skipping");
                continue;
            }
        };

        let Some(obj) = row.as_object() else {
            warn!("tabular reader: row {ordinal} in '{source}' is not a JSON object, skipping");
            continue;
        };

        let Some(text) = obj.get("text").and_then(|v| v.as_str()) else {
            warn!("tabular reader: row {ordinal} in '{source}' has no 'text' field, skipping");
            continue;
        };

        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{source}-{ordinal}"));

        let mut doc = Document::new(id, text.to_string());
        doc.metadata.known.source = Some(source.to_string());
        for (key, value) in obj {
            if key == "text" || key == "id" {
                continue;
            }
            doc.metadata.set_extra(key.clone(), value.clone());
        }
        docs.push(doc);
    }

    docs
}
