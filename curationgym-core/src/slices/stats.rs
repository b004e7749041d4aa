//! stats.rs - Per-slice and global aggregate counters (§4.4, §6).

use std::collections::BTreeMap;

use crate::document::Document;
use crate::manifest::{SliceCounters, SliceStatsReport};

#[derive(Debug, Default, Clone)]
struct Accumulator {
    doc_count: u64,
    token_count: u64,
    quality_sum: f64,
    quality_n: u64,
    dedup_dropped: u64,
    decontam_dropped: u64,
    docs_seen: u64,
}

impl Accumulator {
    fn merge(&mut self, other: &Accumulator) {
        self.doc_count += other.doc_count;
        self.token_count += other.token_count;
        self.quality_sum += other.quality_sum;
        self.quality_n += other.quality_n;
        self.dedup_dropped += other.dedup_dropped;
        self.decontam_dropped += other.decontam_dropped;
        self.docs_seen += other.docs_seen;
    }

    fn finalize(&self) -> SliceCounters {
        let avg_quality = if self.quality_n > 0 {
            self.quality_sum / self.quality_n as f64
        } else {
            0.0
        };
        let denom = self.docs_seen.max(1) as f64;
        SliceCounters {
            doc_count: self.doc_count,
            token_count: self.token_count,
            avg_quality_score: avg_quality,
            dedup_drop_rate: self.dedup_dropped as f64 / denom,
            decontam_drop_rate: self.decontam_dropped as f64 / denom,
        }
    }
}

/// Collects per-slice and global counters across every document the
/// pipeline has observed, whether kept or dropped.
#[derive(Debug, Default)]
pub struct StatsCollector {
    total: Accumulator,
    by_slice: BTreeMap<String, Accumulator>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one document's contribution to the aggregate. Called for
    /// every document the pipeline sees, kept or dropped (§4.6 step 10).
    pub fn record(&mut self, doc: &Document) {
        let kept = doc.metadata.known.reject_stage.is_none();
        let dedup_dropped = doc.metadata.known.dedup_dropped == Some(true);
        let decontam_dropped = doc.metadata.known.decontam_dropped == Some(true);
        let tokens = doc.metadata.known.token_count.unwrap_or(0);
        let quality = doc.metadata.mean_quality_score();

        self.total.docs_seen += 1;
        if dedup_dropped {
            self.total.dedup_dropped += 1;
        }
        if decontam_dropped {
            self.total.decontam_dropped += 1;
        }
        if kept {
            self.total.doc_count += 1;
            self.total.token_count += tokens;
            if let Some(q) = quality {
                self.total.quality_sum += q;
                self.total.quality_n += 1;
            }
        }

        if let Some(tags) = &doc.metadata.known.slice_tags {
            for tag in tags {
                let acc = self.by_slice.entry(tag.clone()).or_default();
                acc.docs_seen += 1;
                if dedup_dropped {
                    acc.dedup_dropped += 1;
                }
                if decontam_dropped {
                    acc.decontam_dropped += 1;
                }
                if kept {
                    acc.doc_count += 1;
                    acc.token_count += tokens;
                    if let Some(q) = quality {
                        acc.quality_sum += q;
                        acc.quality_n += 1;
                    }
                }
            }
        }
    }

    pub fn report(&self) -> SliceStatsReport {
        SliceStatsReport {
            total: self.total.finalize(),
            by_slice: self.by_slice.iter().map(|(k, v)| (k.clone(), v.finalize())).collect(),
        }
    }

    /// Folds another collector's raw counters into this one. Used by the
    /// resumable executor to combine per-shard-task collectors into one
    /// run-wide report; exact because it operates on the pre-finalize sums
    /// rather than trying to recombine already-divided rates.
    pub fn merge(&mut self, other: StatsCollector) {
        self.total.merge(&other.total);
        for (tag, acc) in other.by_slice {
            self.by_slice.entry(tag).or_default().merge(&acc);
        }
    }

    /// Retroactively reclassifies a document this collector already recorded
    /// as kept into a dedup-dropped one. Used only by the executor's
    /// cross-shard exact-dedup merge pass (§4.8), which can only discover a
    /// duplicate after the owning shard task's local stats already recorded
    /// it as kept.
    pub fn reclassify_as_dedup_dropped(&mut self, doc: &Document) {
        let tokens = doc.metadata.known.token_count.unwrap_or(0);
        let quality = doc.metadata.mean_quality_score();

        self.total.doc_count = self.total.doc_count.saturating_sub(1);
        self.total.token_count = self.total.token_count.saturating_sub(tokens);
        if let Some(q) = quality {
            self.total.quality_sum -= q;
            self.total.quality_n = self.total.quality_n.saturating_sub(1);
        }
        self.total.dedup_dropped += 1;

        if let Some(tags) = &doc.metadata.known.slice_tags {
            for tag in tags {
                if let Some(acc) = self.by_slice.get_mut(tag) {
                    acc.doc_count = acc.doc_count.saturating_sub(1);
                    acc.token_count = acc.token_count.saturating_sub(tokens);
                    if let Some(q) = quality {
                        acc.quality_sum -= q;
                        acc.quality_n = acc.quality_n.saturating_sub(1);
                    }
                    acc.dedup_dropped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kept_document_contributes_to_total_and_its_slices() {
        let mut collector = StatsCollector::new();
        let mut doc = Document::new("a", "text");
        doc.metadata.known.token_count = Some(10);
        doc.metadata.known.slice_tags = Some(vec!["language=en".to_string()]);
        collector.record(&doc);

        let report = collector.report();
        assert_eq!(report.total.doc_count, 1);
        assert_eq!(report.total.token_count, 10);
        assert_eq!(report.by_slice["language=en"].doc_count, 1);
    }

    #[test]
    fn dedup_dropped_document_counts_toward_drop_rate_not_kept_count() {
        let mut collector = StatsCollector::new();
        let mut doc = Document::new("a", "text");
        doc.metadata.known.dedup_dropped = Some(true);
        doc.metadata.mark_dropped("dedup_exact", "duplicate");
        collector.record(&doc);

        let report = collector.report();
        assert_eq!(report.total.doc_count, 0);
        assert_eq!(report.total.dedup_drop_rate, 1.0);
    }

    #[test]
    fn total_doc_count_equals_sum_over_a_partitioning_slice_family() {
        let mut collector = StatsCollector::new();
        for lang in ["en", "en", "es"] {
            let mut doc = Document::new("d", "text");
            doc.metadata.known.slice_tags = Some(vec![format!("language={}", lang)]);
            collector.record(&doc);
        }
        let report = collector.report();
        let sum: u64 = report
            .by_slice
            .iter()
            .filter(|(k, _)| k.starts_with("language="))
            .map(|(_, v)| v.doc_count)
            .sum();
        assert_eq!(sum, report.total.doc_count);
    }

    #[test]
    fn merge_combines_two_collectors_additively() {
        let mut a = StatsCollector::new();
        let mut doc_a = Document::new("a", "text");
        doc_a.metadata.known.token_count = Some(10);
        doc_a.metadata.known.slice_tags = Some(vec!["language=en".to_string()]);
        a.record(&doc_a);

        let mut b = StatsCollector::new();
        let mut doc_b = Document::new("b", "text");
        doc_b.metadata.known.token_count = Some(5);
        doc_b.metadata.known.slice_tags = Some(vec!["language=en".to_string()]);
        b.record(&doc_b);

        a.merge(b);
        let report = a.report();
        assert_eq!(report.total.doc_count, 2);
        assert_eq!(report.total.token_count, 15);
        assert_eq!(report.by_slice["language=en"].doc_count, 2);
    }

    #[test]
    fn reclassify_as_dedup_dropped_removes_kept_contribution() {
        let mut collector = StatsCollector::new();
        let mut doc = Document::new("a", "text");
        doc.metadata.known.token_count = Some(10);
        doc.metadata.known.slice_tags = Some(vec!["language=en".to_string()]);
        collector.record(&doc);

        collector.reclassify_as_dedup_dropped(&doc);
        let report = collector.report();
        assert_eq!(report.total.doc_count, 0);
        assert_eq!(report.total.token_count, 0);
        assert_eq!(report.by_slice["language=en"].doc_count, 0);
    }
}
