// src/cli.rs
//! Command-line interface definition for `curationgym`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CurationGym: reproducible, compute-budget-aware data curation over large
/// text corpora.
#[derive(Parser, Debug)]
#[command(name = "curationgym", author, version, about, arg_required_else_help = true)]
pub struct Cli {
    /// Suppress informational logging.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose debug logging.
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs a policy over an input directory through the resumable executor.
    Curate(CurateArgs),
    /// Resumes a previously interrupted run by its run id.
    Resume(ResumeArgs),
    /// Prints the manifest and slice stats for a produced artifact.
    Inspect(InspectArgs),
    /// Deletes an artifact from a content-addressed store.
    Purge(PurgeArgs),
}

#[derive(Args, Debug)]
pub struct CurateArgs {
    /// Path to the curation policy (YAML or JSON).
    #[arg(long)]
    pub policy: PathBuf,

    /// Directory of input files (`.jsonl`, `.warc`, `.wet`).
    #[arg(long)]
    pub input: PathBuf,

    /// Directory shard files, the manifest, and the execution state are written to.
    #[arg(long)]
    pub output: PathBuf,

    /// Run id used for checkpointing; a new one is generated if omitted.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Number of worker threads driving the shard executor.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Domain blocklist file (one domain per line, `#` comments ignored)
    /// applied as a reader-side preprocessing step ahead of the policy
    /// pipeline, alongside the default adult/gambling/piracy lexical patterns.
    #[arg(long)]
    pub url_blocklist: Option<PathBuf>,

    /// Minimum extracted-text length `.warc` records must reach after
    /// HTML-to-text extraction to be admitted into the pipeline; `.wet` and
    /// `.jsonl` input is already plain text and skips this check.
    #[arg(long, default_value_t = 1)]
    pub min_extracted_size: usize,
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// The output directory of the run being resumed.
    #[arg(long)]
    pub output: PathBuf,

    /// Run id to resume; must match the one stamped in `execution_state.json`.
    #[arg(long)]
    pub run_id: String,

    /// Policy path, required only if the output directory has no manifest
    /// from a prior run that reached the manifest-write step.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// The same input directory the original `curate` invocation used. A
    /// `failed` task has produced no shard output yet, so retrying it means
    /// re-reading its producer from the input files.
    #[arg(long)]
    pub input: PathBuf,

    /// Number of worker threads driving the shard executor.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Domain blocklist file, same contract as `curate --url-blocklist`;
    /// must match what the original `curate` invocation used for a retried
    /// task to reproduce the same reader-side filtering.
    #[arg(long)]
    pub url_blocklist: Option<PathBuf>,

    /// Minimum extracted-text length, same contract as `curate --min-extracted-size`.
    #[arg(long, default_value_t = 1)]
    pub min_extracted_size: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Directory of one artifact (containing `manifest.json`).
    #[arg(long)]
    pub artifact: PathBuf,

    /// URL of another instance's manifest to diff against.
    #[arg(long)]
    pub remote: Option<String>,
}

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Root directory of the content-addressed artifact store.
    #[arg(long)]
    pub store: PathBuf,

    /// Artifact hash to delete.
    #[arg(long)]
    pub hash: String,
}
