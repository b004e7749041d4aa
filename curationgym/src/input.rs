// src/input.rs
//! Input-directory discovery: turns a directory of crawl/dataset files into
//! the [`ShardTask`]s the resumable executor drives, and derives the
//! `input_signature` component of the artifact key from the same listing.

use anyhow::{Context, Result};
use curationgym_ngram::hashing::sha256_hex;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use curationgym_core::decontam::DecontamIndex;
use curationgym_core::document::Document;
use curationgym_core::executor::ShardTask;
use curationgym_core::operators::html_extract::HtmlExtractOperator;
use curationgym_core::operators::url_filter::{parse_blocklist, UrlFilterOperator};
use curationgym_core::operators::OperatorOutcome;
use curationgym_core::policy::Policy;
use curationgym_core::readers;

/// One discovered input file and the reader its extension selects.
struct InputFile {
    path: PathBuf,
    task_id: String,
}

fn discover(input_dir: &Path) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir).with_context(|| format!("reading input directory {}", input_dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !matches!(ext, "jsonl" | "warc" | "wet") {
            warn!("input: skipping '{}', unrecognized extension", path.display());
            continue;
        }
        let task_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("shard")
            .to_string();
        files.push(InputFile { path, task_id });
    }
    files.sort_by(|a, b| a.task_id.cmp(&b.task_id));
    Ok(files)
}

/// Reader-side preprocessing run ahead of the policy pipeline (§4.1's
/// design note: HTML extraction and URL filtering are not part of the
/// fixed §4.6 execution order, so they are applied here, once per input
/// file, rather than as `Pipeline` stages).
struct ReaderPreprocess {
    html_extract: HtmlExtractOperator,
    url_filter: UrlFilterOperator,
}

impl ReaderPreprocess {
    fn new(min_extracted_size: usize, url_blocklist: HashSet<String>) -> Self {
        Self {
            html_extract: HtmlExtractOperator { min_extracted_size },
            url_filter: UrlFilterOperator::with_default_patterns(url_blocklist),
        }
    }

    /// Runs `doc` through the URL filter (always) and, for `.warc` bodies
    /// only, HTML-to-text extraction; `.wet`/`.jsonl` bodies are already
    /// plain text and skip extraction. Returns `None` if either stage
    /// rejects the document.
    fn apply(&self, doc: Document, needs_html_extract: bool) -> Option<Document> {
        let doc = match self.url_filter.apply(doc) {
            OperatorOutcome::Keep(d) => d,
            OperatorOutcome::Reject { doc, reason } => {
                debug!("input: dropping '{}' at reader stage: {}", doc.id, reason);
                return None;
            }
        };

        if !needs_html_extract {
            return Some(doc);
        }

        match self.html_extract.apply(doc) {
            OperatorOutcome::Keep(d) => Some(d),
            OperatorOutcome::Reject { doc, reason } => {
                debug!("input: dropping '{}' at reader stage: {}", doc.id, reason);
                None
            }
        }
    }
}

/// Reads every recognized file under `input_dir` into a [`ShardTask`], one
/// task per file, so the executor's `task_id` is stable across runs with
/// the same input directory (needed for resumability, §4.8). Every
/// document passes through [`ReaderPreprocess`] (URL filtering, plus HTML
/// extraction for `.warc` bodies) before it ever reaches the policy
/// pipeline.
pub fn build_shard_tasks(
    input_dir: &Path,
    min_extracted_size: usize,
    url_blocklist_path: Option<&Path>,
) -> Result<Vec<ShardTask>> {
    let blocklist = match url_blocklist_path {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading url blocklist {}", path.display()))?;
            parse_blocklist(&raw)
        }
        None => HashSet::new(),
    };
    let preprocess = ReaderPreprocess::new(min_extracted_size, blocklist);

    let files = discover(input_dir)?;
    let mut tasks = Vec::with_capacity(files.len());

    for file in files {
        let raw = fs::read_to_string(&file.path)
            .with_context(|| format!("reading input file {}", file.path.display()))?;
        let source = file.task_id.clone();
        let ext = file.path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let needs_html_extract = ext == "warc";

        let docs: Vec<Document> = match ext {
            "jsonl" => readers::read_jsonl(&raw, &source),
            "warc" => readers::read_warc(&raw, &source),
            "wet" => readers::read_wet(&raw, &source),
            _ => unreachable!("discover() only returns recognized extensions"),
        };

        let before = docs.len();
        let docs: Vec<Document> = docs
            .into_iter()
            .filter_map(|d| preprocess.apply(d, needs_html_extract))
            .collect();
        if docs.len() < before {
            info!(
                "input: '{}' dropped {} of {} document(s) at the reader stage",
                file.path.display(),
                before - docs.len(),
                before
            );
        }

        info!("input: '{}' contributed {} document(s)", file.path.display(), docs.len());
        tasks.push(ShardTask::new(file.task_id, move || Box::new(docs.clone().into_iter())));
    }

    Ok(tasks)
}

/// A content signature for an input directory: SHA-256 over the sorted
/// list of `(relative file name, byte length)` pairs. Two directories with
/// byte-identical files under the same names hash the same regardless of
/// the order `read_dir` happens to return them in.
pub fn input_signature(input_dir: &Path) -> Result<String> {
    let mut files = discover(input_dir)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut entries = Vec::with_capacity(files.len());
    for file in &files {
        let len = fs::metadata(&file.path)?.len();
        let name = file.path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        entries.push(format!("{name}:{len}"));
    }
    let joined = entries.join("\n");
    Ok(sha256_hex(joined.as_bytes())[..16].to_string())
}

/// Builds a [`DecontamIndex`] from `policy.decontam.benchmark_targets`: each
/// target is a path to a plain-text file, one evaluation reference per
/// line, attributed to a source name derived from the file stem. Returns
/// `None` if decontam is disabled or no targets are configured.
pub fn build_decontam_index(policy: &Policy) -> Result<Option<DecontamIndex>> {
    if !policy.decontam.enabled || policy.decontam.benchmark_targets.is_empty() {
        return Ok(None);
    }

    let mut index = DecontamIndex::new(policy.decontam.ngram_size);
    for target in &policy.decontam.benchmark_targets {
        let path = Path::new(target);
        let raw = fs::read_to_string(path).with_context(|| format!("reading benchmark target {}", path.display()))?;
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(target)
            .to_string();
        let lines: Vec<String> = raw.lines().map(|l| l.to_string()).filter(|l| !l.is_empty()).collect();
        index.add_eval_data(&lines, &source);
    }
    Ok(Some(index))
}
