//! executor - The resumable, multi-worker shard executor (§4.8).
//!
//! The teacher's own concurrent subsystem (`remediation::orchestrator`)
//! dispatches async work over a `tokio::mpsc` channel, because its workers
//! are I/O-bound (network remediation calls). Shard processing here is
//! CPU-bound, so the worker pool is realized with plain OS threads via
//! `std::thread::scope` instead: no runtime, no `Send + 'static` bound on
//! the policy or decontam index, and a work queue is just a
//! `Mutex<VecDeque<ShardTask>>` shared by reference across the scope.
//!
//! Every shard task gets its own independent `Pipeline` (own dedup buckets,
//! own sampler counters), regardless of worker count, so a run's observable
//! output does not depend on how many workers processed it (§5's
//! determinism requirement). The one place that would otherwise diverge —
//! exact, global-scope dedup, where two different shard tasks might each
//! keep a document the other should have dropped as a duplicate — is
//! reconciled by [`execute`]'s post-pass, which walks completed shards in
//! task order and retroactively drops any later repeat of an
//! already-emitted `dedup_cluster_id`. MinHash dedup and `per_dump` scope
//! are not merged this way (see the warning emitted when that combination
//! spans more than one task); DESIGN.md records this as a deliberate,
//! bounded-scope limitation rather than an oversight.

mod state;

pub use state::{ExecutionState, TaskState, TaskStatus};

use log::{info, warn};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::decontam::DecontamIndex;
use crate::document::Document;
use crate::errors::Result;
use crate::manifest::{ContaminationAuditEntry, ContaminationSummary, ManifestStats, ShardEntry};
use crate::pipeline::Pipeline;
use crate::policy::{DedupMethod, DedupScope, Policy};
use crate::slices::stats::StatsCollector;

/// One unit of dispatchable work: a task id (used both for checkpointing
/// and as the task's own shard subdirectory name) and a zero-argument
/// producer that yields that task's documents. `Send + Sync` so a producer
/// can be handed to whichever worker thread picks it up next.
pub struct ShardTask {
    pub task_id: String,
    pub produce: Box<dyn Fn() -> Box<dyn Iterator<Item = Document>> + Send + Sync>,
}

impl ShardTask {
    pub fn new(
        task_id: impl Into<String>,
        produce: impl Fn() -> Box<dyn Iterator<Item = Document>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            produce: Box::new(produce),
        }
    }
}

/// The aggregate result of a full (possibly resumed) execution.
pub struct ExecutionOutcome {
    pub state: ExecutionState,
    pub shards: Vec<ShardEntry>,
    pub manifest_stats: ManifestStats,
    pub slice_stats: crate::manifest::SliceStatsReport,
    pub decontam_summary: Option<ContaminationSummary>,
    pub decontam_entries: Vec<ContaminationAuditEntry>,
}

struct TaskOutcome {
    task_id: String,
    shards: Vec<ShardEntry>,
    manifest_stats: ManifestStats,
    stats: StatsCollector,
    decontam_summary: Option<ContaminationSummary>,
    decontam_entries: Vec<ContaminationAuditEntry>,
    error: Option<String>,
}

/// A fixed-size pool of OS threads that drives a set of [`ShardTask`]s to
/// completion, checkpointing progress to `execution_state.json` under
/// `output_dir` so a later run with the same `run_id` picks up only the
/// tasks that have not yet completed.
pub struct ResumableExecutor {
    run_id: String,
    num_workers: usize,
    output_dir: PathBuf,
}

impl ResumableExecutor {
    pub fn new(run_id: impl Into<String>, output_dir: impl Into<PathBuf>, num_workers: usize) -> Self {
        Self {
            run_id: run_id.into(),
            num_workers: num_workers.max(1),
            output_dir: output_dir.into(),
        }
    }

    fn state_path(&self) -> PathBuf {
        self.output_dir.join("execution_state.json")
    }

    /// Runs every task in `tasks` that is not already `Completed` in the
    /// checkpoint, across `num_workers` threads, and returns the merged
    /// result. Safe to call again with the same `run_id` and the same
    /// `tasks` after a prior call was interrupted: completed tasks are
    /// skipped, failed ones are retried.
    pub fn execute(
        &self,
        tasks: Vec<ShardTask>,
        policy: &Policy,
        decontam_index: Option<&DecontamIndex>,
    ) -> Result<ExecutionOutcome> {
        let task_ids: Vec<String> = tasks.iter().map(|t| t.task_id.clone()).collect();
        let state_path = self.state_path();
        let state = ExecutionState::load_or_fresh(&state_path, &self.run_id, &task_ids);
        state.save_atomic(&state_path)?;

        if policy.dedup.method == DedupMethod::Minhash
            && policy.dedup.scope == DedupScope::Global
            && task_ids.len() > 1
        {
            warn!(
                "minhash dedup with global scope only dedups within each of the {} shard task(s); \
                 cross-task near-duplicates are not merged",
                task_ids.len()
            );
        }

        let runnable_ids: HashSet<String> = state.runnable_task_ids().into_iter().collect();
        let runnable: VecDeque<ShardTask> = tasks.into_iter().filter(|t| runnable_ids.contains(&t.task_id)).collect();

        info!(
            "executor: run '{}', {} task(s) runnable out of {}, {} worker(s)",
            self.run_id,
            runnable.len(),
            task_ids.len(),
            self.num_workers
        );

        let queue = Mutex::new(runnable);
        let state_lock = Mutex::new(state);
        let outcomes = Mutex::new(Vec::<TaskOutcome>::new());

        std::thread::scope(|scope| {
            for _ in 0..self.num_workers {
                scope.spawn(|| {
                    loop {
                        let task = {
                            let mut q = queue.lock().expect("shard task queue poisoned");
                            q.pop_front()
                        };
                        let Some(task) = task else { break };

                        mark_running(&state_lock, &state_path, &task.task_id);

                        let shard_dir = self.output_dir.join("task-shards").join(&task.task_id);
                        let mut pipeline = Pipeline::new(policy.clone(), decontam_index.cloned(), shard_dir);
                        let outcome = match pipeline.run((task.produce)()) {
                            Ok(result) => {
                                // Pipeline writes shard paths relative to its own
                                // per-task directory; rewrite them relative to the
                                // executor's output_dir, since that's what every
                                // downstream consumer (merge pass, manifest) resolves against.
                                let shards = result
                                    .shards
                                    .into_iter()
                                    .map(|mut shard| {
                                        shard.path = format!("task-shards/{}/{}", task.task_id, shard.path);
                                        shard
                                    })
                                    .collect();
                                TaskOutcome {
                                    task_id: task.task_id.clone(),
                                    shards,
                                    manifest_stats: result.manifest_stats,
                                    stats: result.stats,
                                    decontam_summary: result.decontam_summary,
                                    decontam_entries: result.decontam_entries,
                                    error: None,
                                }
                            }
                            Err(e) => TaskOutcome {
                                task_id: task.task_id.clone(),
                                shards: Vec::new(),
                                manifest_stats: ManifestStats::default(),
                                stats: StatsCollector::new(),
                                decontam_summary: None,
                                decontam_entries: Vec::new(),
                                error: Some(e.to_string()),
                            },
                        };

                        mark_finished(&state_lock, &state_path, &outcome);
                        outcomes.lock().expect("task outcomes mutex poisoned").push(outcome);
                    }
                });
            }
        });

        let mut outcomes = outcomes.into_inner().expect("task outcomes mutex poisoned");
        outcomes.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        let mut manifest_stats = ManifestStats::default();
        let mut stats = StatsCollector::new();
        let mut decontam_summary: Option<ContaminationSummary> = None;
        let mut decontam_entries = Vec::new();
        let mut shard_entries: Vec<ShardEntry> = Vec::new();

        for outcome in outcomes {
            manifest_stats.total_docs += outcome.manifest_stats.total_docs;
            manifest_stats.total_tokens += outcome.manifest_stats.total_tokens;
            manifest_stats.dedup_dropped += outcome.manifest_stats.dedup_dropped;
            manifest_stats.decontam_dropped += outcome.manifest_stats.decontam_dropped;
            manifest_stats.filter_rejected += outcome.manifest_stats.filter_rejected;
            stats.merge(outcome.stats);

            if let Some(summary) = outcome.decontam_summary {
                let acc = decontam_summary.get_or_insert_with(ContaminationSummary::default);
                acc.docs_checked += summary.docs_checked;
                acc.docs_contaminated += summary.docs_contaminated;
                for (src, count) in summary.by_eval_source {
                    *acc.by_eval_source.entry(src).or_insert(0) += count;
                }
            }
            decontam_entries.extend(outcome.decontam_entries);
            shard_entries.extend(outcome.shards);
        }

        if policy.dedup.method == DedupMethod::Exact && policy.dedup.scope == DedupScope::Global {
            let removed = merge_exact_global_duplicates(&mut shard_entries, &self.output_dir, &mut stats, &mut manifest_stats)?;
            if removed > 0 {
                info!("executor: cross-shard exact-dedup merge removed {removed} duplicate(s)");
            }
        }

        let final_state = state_lock.into_inner().expect("execution state mutex poisoned");
        Ok(ExecutionOutcome {
            state: final_state,
            shards: shard_entries,
            manifest_stats,
            slice_stats: stats.report(),
            decontam_summary,
            decontam_entries,
        })
    }
}

fn mark_running(state_lock: &Mutex<ExecutionState>, state_path: &Path, task_id: &str) {
    let mut state = state_lock.lock().expect("execution state mutex poisoned");
    if let Some(t) = state.tasks.get_mut(task_id) {
        t.status = TaskStatus::Running;
    }
    let _ = state.save_atomic(state_path);
}

fn mark_finished(state_lock: &Mutex<ExecutionState>, state_path: &Path, outcome: &TaskOutcome) {
    let mut state = state_lock.lock().expect("execution state mutex poisoned");
    if let Some(t) = state.tasks.get_mut(&outcome.task_id) {
        match &outcome.error {
            Some(message) => {
                t.status = TaskStatus::Failed;
                t.error = Some(message.clone());
            }
            None => {
                t.status = TaskStatus::Completed;
                t.docs_processed = outcome.manifest_stats.total_docs;
                t.error = None;
            }
        }
    }
    let _ = state.save_atomic(state_path);
}

/// Walks completed shard files in task order and drops the second and later
/// occurrence of any `dedup_cluster_id` that appears in more than one shard
/// task's output. Each shard task's own `Pipeline` only dedups within its
/// own stream, so this is the one place global-scope exact dedup is made
/// whole again across task boundaries.
fn merge_exact_global_duplicates(
    shard_entries: &mut [ShardEntry],
    output_dir: &Path,
    stats: &mut StatsCollector,
    manifest_stats: &mut ManifestStats,
) -> Result<u64> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut removed_total = 0u64;

    for entry in shard_entries.iter_mut() {
        let path = output_dir.join(&entry.path);
        let raw = std::fs::read_to_string(&path)?;
        let mut kept_lines: Vec<String> = Vec::new();

        for line in raw.lines() {
            if line.is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(line)?;
            let is_duplicate = match &doc.metadata.known.dedup_cluster_id {
                Some(cluster_id) => !seen.insert(cluster_id.clone()),
                None => false,
            };

            if is_duplicate {
                stats.reclassify_as_dedup_dropped(&doc);
                manifest_stats.total_docs = manifest_stats.total_docs.saturating_sub(1);
                manifest_stats.total_tokens = manifest_stats
                    .total_tokens
                    .saturating_sub(doc.metadata.known.token_count.unwrap_or(0));
                manifest_stats.dedup_dropped += 1;
                removed_total += 1;
            } else {
                kept_lines.push(line.to_string());
            }
        }

        if removed_total > 0 {
            let mut contents = kept_lines.join("\n");
            if !contents.is_empty() {
                contents.push('\n');
            }
            std::fs::write(&path, contents.as_bytes())?;
            entry.doc_count = kept_lines.len() as u64;
            entry.checksum = curationgym_ngram::hashing::sha256_hex(contents.as_bytes());
        }
    }

    Ok(removed_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DedupConfig, DedupMethod, KeepRule, LanguageConfig};

    fn base_policy() -> Policy {
        Policy {
            language: LanguageConfig {
                target: "en".to_string(),
                min_score: 0.0,
            },
            dedup: DedupConfig {
                method: DedupMethod::Exact,
                keep_rule: KeepRule::First,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn task(id: &str, docs: Vec<Document>) -> ShardTask {
        ShardTask::new(id, move || Box::new(docs.clone().into_iter()))
    }

    #[test]
    fn executes_all_tasks_and_aggregates_counts() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ResumableExecutor::new("run-1", dir.path(), 2);
        let tasks = vec![
            task("t1", vec![Document::new("a", "a perfectly ordinary English sentence about one topic")]),
            task("t2", vec![Document::new("b", "a perfectly ordinary English sentence about another topic")]),
        ];
        let outcome = executor.execute(tasks, &base_policy(), None).unwrap();
        assert_eq!(outcome.manifest_stats.total_docs, 2);
        assert!(outcome.state.is_complete());
    }

    #[test]
    fn resuming_skips_already_completed_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ResumableExecutor::new("run-1", dir.path(), 1);
        let policy = base_policy();

        let tasks = vec![task(
            "t1",
            vec![Document::new("a", "a perfectly ordinary English sentence about one topic")],
        )];
        let first = executor.execute(tasks, &policy, None).unwrap();
        assert_eq!(first.state.completed_count(), 1);

        // Re-running with the same run_id and task set should find nothing
        // left to do: the checkpoint already marks "t1" completed.
        let tasks_again = vec![task("t1", vec![Document::new("a", "should not be reprocessed")])];
        let second = executor.execute(tasks_again, &policy, None).unwrap();
        assert_eq!(second.manifest_stats.total_docs, 0);
        assert_eq!(second.state.completed_count(), 1);
    }

    #[test]
    fn cross_shard_exact_duplicates_are_merged_away() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ResumableExecutor::new("run-1", dir.path(), 1);
        let text = "Hello world, this is a fine sentence repeated across shards.";
        let tasks = vec![
            task("t1", vec![Document::new("a", text)]),
            task("t2", vec![Document::new("b", text)]),
        ];
        let outcome = executor.execute(tasks, &base_policy(), None).unwrap();
        assert_eq!(outcome.manifest_stats.total_docs, 1);
        assert_eq!(outcome.manifest_stats.dedup_dropped, 1);
    }
}
