//! pipeline.rs - The fixed policy-execution loop (§4.6).
//!
//! Composes the operators in the spec's fixed order: language id, token
//! count, quality, PII mask, slice assignment, dedup, decontam, budget
//! check, sampler admission, stats collection, shard write. The fixed order
//! is a concrete struct with typed stage fields, not a generic operator
//! list, per the spec's design note distinguishing the ad hoc `OperatorKind`
//! bank from this pipeline driver.

use log::{debug, info};
use std::path::PathBuf;

use crate::decontam::{DecontamIndex, DecontamOutcome, DecontamStage};
use crate::dedup::DedupStage;
use crate::document::Document;
use crate::manifest::{ManifestStats, ShardEntry};
use crate::operators::lang_id::LangIdOperator;
use crate::operators::pii_mask::PiiMaskOperator;
use crate::operators::quality::QualityOperator;
use crate::operators::token_count::TokenCountOperator;
use crate::operators::OperatorOutcome;
use crate::policy::Policy;
use crate::sampler::SlicedSampler;
use crate::slices::assign_slices;
use crate::slices::stats::StatsCollector;

/// The fixed-order document pipeline for a single run. Owns all per-run
/// state: dedup buckets/buffer, the decontam index (if enabled), the
/// sampler's admission counters, and the stats collector. Not `Clone`;
/// shard-parallel execution constructs one `Pipeline` per worker and
/// merges global dedup state per the spec's §5 concurrency notes.
pub struct Pipeline {
    policy: Policy,
    lang_id: LangIdOperator,
    token_count: TokenCountOperator,
    quality: QualityOperator,
    pii_mask: PiiMaskOperator,
    dedup: DedupStage,
    decontam: Option<DecontamStage>,
    sampler: SlicedSampler,
    stats: StatsCollector,

    tokens_emitted: u64,
    budget_exhausted: bool,
    dedup_dropped_count: u64,
    decontam_dropped_count: u64,
    filter_rejected_count: u64,

    batch: Vec<Document>,
    shards: Vec<ShardEntry>,
    shard_counter: usize,
    output_dir: PathBuf,
}

/// Result of running the pipeline to completion over an input stream. Carries
/// the raw `StatsCollector` rather than its finalized `SliceStatsReport` so
/// the resumable executor can merge several shard tasks' collectors exactly
/// (derived rates like `dedup_drop_rate` can't be recombined from their
/// finalized ratios alone) before producing one run-wide report.
pub struct PipelineResult {
    pub stats: StatsCollector,
    pub manifest_stats: ManifestStats,
    pub shards: Vec<ShardEntry>,
    pub decontam_summary: Option<crate::manifest::ContaminationSummary>,
    pub decontam_entries: Vec<crate::manifest::ContaminationAuditEntry>,
}

impl Pipeline {
    pub fn new(policy: Policy, decontam_index: Option<DecontamIndex>, output_dir: PathBuf) -> Self {
        let decontam = if policy.decontam.enabled {
            decontam_index.map(|idx| DecontamStage::new(idx, policy.decontam.clone()))
        } else {
            None
        };

        Self {
            lang_id: LangIdOperator::new(policy.language.clone()),
            token_count: TokenCountOperator,
            quality: QualityOperator::new(policy.quality.clone()),
            pii_mask: PiiMaskOperator,
            dedup: DedupStage::new(policy.dedup.clone()),
            decontam,
            sampler: SlicedSampler::new(&policy.mixing, policy.seed),
            stats: StatsCollector::new(),
            tokens_emitted: 0,
            budget_exhausted: false,
            dedup_dropped_count: 0,
            decontam_dropped_count: 0,
            filter_rejected_count: 0,
            batch: Vec::new(),
            shards: Vec::new(),
            shard_counter: 0,
            output_dir,
            policy,
        }
    }

    /// Runs the full fixed-order pipeline over `input`, writing shard files
    /// into `output_dir` as batches fill, and returns the final aggregate
    /// state needed to write the manifest.
    pub fn run<I: IntoIterator<Item = Document>>(&mut self, input: I) -> crate::errors::Result<PipelineResult> {
        info!("pipeline run starting for policy '{}'", self.policy.name);

        for doc in input {
            if self.budget_exhausted {
                break;
            }
            let Some(doc) = self.run_pre_dedup(doc) else {
                continue;
            };

            if let Some((doc, kept)) = self.dedup.feed(doc) {
                self.finish_post_dedup(doc, kept)?;
            }
        }

        if self.dedup.is_buffered() {
            let finished = std::mem::replace(&mut self.dedup, DedupStage::new(self.policy.dedup.clone()));
            for (doc, kept) in finished.finalize() {
                self.finish_post_dedup(doc, kept)?;
            }
        }

        self.flush_batch()?;
        info!(
            "pipeline run finished: {} shard(s), {} token(s) emitted",
            self.shards.len(),
            self.tokens_emitted
        );

        let (decontam_summary, decontam_entries) = match &self.decontam {
            Some(stage) => (Some(stage.summary()), stage.audit_entries().to_vec()),
            None => (None, Vec::new()),
        };

        let manifest_stats = self.manifest_stats();
        Ok(PipelineResult {
            stats: std::mem::take(&mut self.stats),
            manifest_stats,
            shards: std::mem::take(&mut self.shards),
            decontam_summary,
            decontam_entries,
        })
    }

    /// Runs one document through the pre-dedup stages (1-5). Returns
    /// `None` if the document was rejected by an earlier filter; the
    /// rejected document has already been folded into stats.
    fn run_pre_dedup(&mut self, doc: Document) -> Option<Document> {
        let doc = match self.lang_id.apply(doc) {
            OperatorOutcome::Keep(d) => d,
            OperatorOutcome::Reject { doc, .. } => {
                self.filter_rejected_count += 1;
                self.stats.record(&doc);
                return None;
            }
        };

        let mut doc = doc;
        self.token_count.apply(&mut doc);

        let doc = match self.quality.apply(doc) {
            OperatorOutcome::Keep(d) => d,
            OperatorOutcome::Reject { doc, .. } => {
                self.filter_rejected_count += 1;
                self.stats.record(&doc);
                return None;
            }
        };

        let mut doc = doc;
        self.pii_mask.apply(&mut doc);
        assign_slices(&mut doc);
        Some(doc)
    }

    fn finish_post_dedup(&mut self, doc: Document, kept: bool) -> crate::errors::Result<()> {
        if !kept {
            self.dedup_dropped_count += 1;
            self.stats.record(&doc);
            return Ok(());
        }

        let doc = if let Some(decontam) = self.decontam.as_mut() {
            match decontam.apply(doc) {
                DecontamOutcome::Keep(d) => d,
                DecontamOutcome::Drop { doc, .. } => {
                    self.decontam_dropped_count += 1;
                    self.stats.record(&doc);
                    return Ok(());
                }
            }
        } else {
            doc
        };

        let tokens = doc.metadata.known.token_count.unwrap_or(0);
        if let Some(max_tokens) = self.policy.max_tokens {
            if self.tokens_emitted + tokens > max_tokens {
                debug!("token budget of {} would be exceeded; stopping run", max_tokens);
                self.budget_exhausted = true;
                return Ok(());
            }
        }

        let tags = doc.metadata.known.slice_tags.clone().unwrap_or_default();
        let doc = match self.sampler.try_admit_tokens(&tags, tokens) {
            Ok(()) => doc,
            Err(failing_tag) => {
                let mut doc = doc;
                doc.metadata
                    .mark_dropped("sampler_admission", format!("slice_cap_reached:{}", failing_tag));
                self.stats.record(&doc);
                return Ok(());
            }
        };

        self.tokens_emitted += tokens;
        self.stats.record(&doc);
        self.batch.push(doc);
        if self.batch.len() >= self.policy.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> crate::errors::Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(self.output_dir.join("shards"))?;
        let file_name = format!("shard-{:05}.jsonl", self.shard_counter);
        self.shard_counter += 1;
        let path = self.output_dir.join("shards").join(&file_name);

        let mut contents = String::new();
        for doc in &self.batch {
            contents.push_str(&serde_json::to_string(doc)?);
            contents.push('\n');
        }
        std::fs::write(&path, contents.as_bytes())?;
        let checksum = curationgym_ngram::hashing::sha256_hex(contents.as_bytes());

        self.shards.push(ShardEntry {
            path: format!("shards/{}", file_name),
            checksum,
            doc_count: self.batch.len() as u64,
        });
        self.batch.clear();
        Ok(())
    }

    fn manifest_stats(&self) -> ManifestStats {
        let report = self.stats.report();
        ManifestStats {
            total_docs: report.total.doc_count,
            total_tokens: report.total.token_count,
            dedup_dropped: self.dedup_dropped_count,
            decontam_dropped: self.decontam_dropped_count,
            filter_rejected: self.filter_rejected_count,
        }
    }
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

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, text)
    }

    #[test]
    fn exact_duplicate_removal_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(base_policy(), None, dir.path().to_path_buf());

        let docs = vec![
            doc("a", "Hello world, this is a fine sentence to keep around."),
            doc("b", "Hello world, this is a fine sentence to keep around."),
            doc("c", "Something totally different goes here instead friend."),
        ];

        let result = pipeline.run(docs).unwrap();
        assert_eq!(result.manifest_stats.total_docs, 2);
    }

    #[test]
    fn token_budget_stops_run_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = base_policy();
        policy.max_tokens = Some(5);
        let mut pipeline = Pipeline::new(policy, None, dir.path().to_path_buf());

        let docs = vec![
            doc("a", "one two three four"),
            doc("b", "five six seven eight nine ten eleven twelve"),
        ];
        let result = pipeline.run(docs).unwrap();
        assert!(result.manifest_stats.total_tokens <= 5);
    }

    #[test]
    fn writes_shard_file_with_kept_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(base_policy(), None, dir.path().to_path_buf());
        let docs = vec![doc("a", "a perfectly ordinary English sentence about nothing much at all")];
        let result = pipeline.run(docs).unwrap();
        assert_eq!(result.shards.len(), 1);
        let shard_path = dir.path().join(&result.shards[0].path);
        assert!(shard_path.exists());
    }
}
