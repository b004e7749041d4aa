//! curate.rs - Drives a fresh (or continuable) run of the resumable
//! executor over an input directory and writes the manifest, slice stats,
//! decontam report, and run stamp once it finishes.

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;

use curationgym_core::artifact_store::artifact_hash;
use curationgym_core::config::load_policy_from_path;
use curationgym_core::executor::ResumableExecutor;
use curationgym_core::manifest::Manifest;
use curationgym_core::run_stamp::RunStamp;
use curationgym_core::version::code_version;

use crate::cli::CurateArgs;
use crate::commands::write_json_atomic;
use crate::input;

pub async fn run(args: CurateArgs) -> Result<()> {
    let policy = load_policy_from_path(&args.policy)
        .with_context(|| format!("loading policy from {}", args.policy.display()))?;
    let policy_hash = policy.policy_hash()?;

    let run_id = args.run_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let input_sig = input::input_signature(&args.input)?;
    let code_version = code_version();
    let hash = artifact_hash(&policy_hash, &code_version, &input_sig)?;

    info!("curate: run '{}', policy '{}' ({}), artifact {}", run_id, policy.name, policy_hash, hash);

    let tasks = input::build_shard_tasks(&args.input, args.min_extracted_size, args.url_blocklist.as_deref())?;
    let decontam_index = input::build_decontam_index(&policy)?;

    let executor = ResumableExecutor::new(run_id.clone(), &args.output, args.workers);
    let outcome = executor.execute(tasks, &policy, decontam_index.as_ref())?;

    let run_stamp = RunStamp::capture(run_id.clone(), "curate", &std::env::current_dir()?);

    let manifest = Manifest {
        dataset_id: format!("{}-{}", policy.name, &hash),
        created_at: Utc::now(),
        input_signature: input_sig,
        policy: policy.clone(),
        policy_hash,
        code_version,
        code_dirty: run_stamp.code_dirty,
        seed: policy.seed,
        output_format: "jsonl".to_string(),
        shards: outcome.shards,
        stats: outcome.manifest_stats,
    };

    write_json_atomic(&args.output.join("manifest.json"), &manifest)?;
    write_json_atomic(&args.output.join("slice_stats.json"), &outcome.slice_stats)?;
    if let Some(summary) = &outcome.decontam_summary {
        let report = curationgym_core::manifest::DecontamReport {
            summary: summary.clone(),
            entries: outcome.decontam_entries,
        };
        write_json_atomic(&args.output.join("decontam_report.json"), &report)?;
    }
    write_json_atomic(&args.output.join("run_stamp.json"), &run_stamp)?;

    if !outcome.state.is_complete() {
        println!(
            "curate: {} of {} task(s) completed; {} failed and are retriable with `curationgym resume --output {} --run-id {}`",
            outcome.state.completed_count(),
            outcome.state.tasks.len(),
            outcome.state.failed_count(),
            args.output.display(),
            run_id
        );
    } else {
        println!(
            "curate: artifact {} complete, {} doc(s), {} token(s)",
            hash, manifest.stats.total_docs, manifest.stats.total_tokens
        );
    }

    Ok(())
}
