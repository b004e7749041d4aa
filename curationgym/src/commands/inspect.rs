//! inspect.rs - Prints a produced artifact's manifest and slice stats, and
//! optionally diffs it against a manifest fetched from another instance.

use anyhow::{Context, Result};
use std::fs;

use curationgym_core::artifact_store::fetch_remote_manifest;
use curationgym_core::manifest::{Manifest, SliceStatsReport};

use crate::cli::InspectArgs;

fn read_manifest(artifact: &std::path::Path) -> Result<Manifest> {
    let path = artifact.join("manifest.json");
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_slice_stats(artifact: &std::path::Path) -> Option<SliceStatsReport> {
    let path = artifact.join("slice_stats.json");
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn print_manifest(manifest: &Manifest) {
    println!("dataset_id:      {}", manifest.dataset_id);
    println!("created_at:      {}", manifest.created_at);
    println!("policy:          {} (hash {})", manifest.policy.name, manifest.policy_hash);
    println!("code_version:    {}{}", manifest.code_version, if manifest.code_dirty { " (dirty)" } else { "" });
    println!("input_signature: {}", manifest.input_signature);
    println!("seed:            {}", manifest.seed);
    println!("shards:          {}", manifest.shards.len());
    println!("total_docs:      {}", manifest.stats.total_docs);
    println!("total_tokens:    {}", manifest.stats.total_tokens);
    println!("dedup_dropped:   {}", manifest.stats.dedup_dropped);
    println!("decontam_dropped:{}", manifest.stats.decontam_dropped);
    println!("filter_rejected: {}", manifest.stats.filter_rejected);
}

fn print_slice_stats(stats: &SliceStatsReport) {
    println!();
    println!("slice stats (aggregate):");
    println!(
        "  total: docs={} tokens={} avg_quality={:.3} dedup_drop_rate={:.3} decontam_drop_rate={:.3}",
        stats.total.doc_count,
        stats.total.token_count,
        stats.total.avg_quality_score,
        stats.total.dedup_drop_rate,
        stats.total.decontam_drop_rate
    );
    for (slice, counters) in &stats.by_slice {
        println!(
            "  {slice}: docs={} tokens={} avg_quality={:.3} dedup_drop_rate={:.3} decontam_drop_rate={:.3}",
            counters.doc_count, counters.token_count, counters.avg_quality_score, counters.dedup_drop_rate, counters.decontam_drop_rate
        );
    }
}

pub async fn run(args: InspectArgs) -> Result<()> {
    let manifest = read_manifest(&args.artifact)?;
    print_manifest(&manifest);
    if let Some(stats) = read_slice_stats(&args.artifact) {
        print_slice_stats(&stats);
    }

    if let Some(url) = &args.remote {
        let remote = fetch_remote_manifest(url).await.with_context(|| format!("fetching remote manifest from {url}"))?;
        println!();
        println!("remote manifest at {url}:");
        println!("  policy_hash:  local={} remote={}", manifest.policy_hash, remote.policy_hash);
        println!("  code_version: local={} remote={}", manifest.code_version, remote.code_version);
        println!(
            "  total_docs:   local={} remote={}",
            manifest.total_doc_count(),
            remote.total_doc_count()
        );
        if manifest.policy_hash != remote.policy_hash {
            println!("  note: policy_hash differs, these artifacts are not reproductions of each other");
        }
    }

    Ok(())
}
