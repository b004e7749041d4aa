//! resume.rs - Re-invokes the resumable executor against an existing
//! `output_dir`, retrying failed tasks and skipping completed ones.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;

use curationgym_core::artifact_store::artifact_hash;
use curationgym_core::config::load_policy_from_path;
use curationgym_core::executor::ResumableExecutor;
use curationgym_core::manifest::Manifest;
use curationgym_core::policy::Policy;
use curationgym_core::run_stamp::RunStamp;
use curationgym_core::version::code_version;

use crate::cli::ResumeArgs;
use crate::commands::write_json_atomic;
use crate::input;

fn load_existing_manifest(output: &std::path::Path) -> Result<Option<Manifest>> {
    let path = output.join("manifest.json");
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn resolve_policy(args: &ResumeArgs, existing: &Option<Manifest>) -> Result<Policy> {
    match (&args.policy, existing) {
        (Some(path), Some(manifest)) => {
            let policy = load_policy_from_path(path)?;
            let hash = policy.policy_hash()?;
            if hash != manifest.policy_hash {
                bail!(
                    "policy at '{}' (hash {}) does not match the policy_hash ({}) recorded in {}'s manifest",
                    path.display(),
                    hash,
                    manifest.policy_hash,
                    args.output.display()
                );
            }
            Ok(policy)
        }
        (Some(path), None) => load_policy_from_path(path),
        (None, Some(manifest)) => Ok(manifest.policy.clone()),
        (None, None) => bail!(
            "'{}' has no manifest.json from a prior run; --policy is required to resume",
            args.output.display()
        ),
    }
}

pub async fn run(args: ResumeArgs) -> Result<()> {
    let existing_manifest = load_existing_manifest(&args.output)?;
    let policy = resolve_policy(&args, &existing_manifest)?;
    let policy_hash = policy.policy_hash()?;

    let tasks = input::build_shard_tasks(&args.input, args.min_extracted_size, args.url_blocklist.as_deref())?;
    let decontam_index = input::build_decontam_index(&policy)?;

    let executor = ResumableExecutor::new(args.run_id.clone(), &args.output, args.workers);
    let outcome = executor.execute(tasks, &policy, decontam_index.as_ref())?;

    let input_sig = input::input_signature(&args.input)?;
    let code_version = code_version();
    let hash = artifact_hash(&policy_hash, &code_version, &input_sig)?;
    let run_stamp = RunStamp::capture(args.run_id.clone(), "resume", &std::env::current_dir()?);

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

    println!(
        "resume: run '{}', {} of {} task(s) completed ({} failed)",
        args.run_id,
        outcome.state.completed_count(),
        outcome.state.tasks.len(),
        outcome.state.failed_count()
    );

    Ok(())
}
