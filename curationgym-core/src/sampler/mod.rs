//! sampler - Slice-weighted, admission-controlled sampler (§4.5).
//!
//! Admission rejects a document the moment any of its slice tags is already
//! at its configured token cap; accepted documents are tallied into every
//! tag's bucket. The weighted draw is an Efraimidis-Spirakis
//! weighted-without-replacement selection: each admitted document gets a
//! deterministic uniform draw key via HMAC-SHA256 keyed from a run seed
//! derived from `policy.seed` (never wall-clock or process id), mirroring
//! the teacher's `compute_run_seed`/`sample_score_bytes` two-stage HMAC
//! derivation in `profiles.rs` (a fixed internal salt keys the outer HMAC,
//! the resulting run seed keys the per-item HMAC). Keys are raised to
//! `1/weight` and the top `n` keys are taken, which is equivalent to
//! weighted sampling without replacement.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::document::Document;
use crate::policy::MixingConfig;

type HmacSha256 = Hmac<Sha256>;

/// Fixed, code-internal salt. Never a caller-supplied or dynamic key; only
/// `policy.seed` and call-site identifiers ever vary the derived output.
const SAMPLER_SEED_SALT: &[u8] = b"curationgym-sampler-seed-salt-v1";

fn derive_run_seed(policy_seed: u64) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(SAMPLER_SEED_SALT).expect("hmac accepts any key length");
    mac.update(&policy_seed.to_le_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn uniform_draw(run_seed: &[u8], doc_id: &str, draw_counter: u64) -> f64 {
    let mut mac = HmacSha256::new_from_slice(run_seed).expect("hmac accepts any key length");
    mac.update(doc_id.as_bytes());
    mac.update(&draw_counter.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    let as_u64 = u64::from_le_bytes(buf);
    (as_u64 as f64) / (u64::MAX as f64)
}

/// Admission-controlled, per-slice token-budgeted sampler.
pub struct SlicedSampler {
    caps: BTreeMap<String, u64>,
    weights: BTreeMap<String, f64>,
    temperature: f64,
    seed: u64,
    run_seed: Vec<u8>,
    tag_tokens: BTreeMap<String, u64>,
    docs: Vec<Document>,
    draw_counter: u64,
}

impl SlicedSampler {
    pub fn new(mixing: &MixingConfig, seed: u64) -> Self {
        Self {
            caps: mixing.max_tokens_per_slice.clone(),
            weights: mixing.weights.clone(),
            temperature: if mixing.temperature > 0.0 { mixing.temperature } else { 1.0 },
            seed,
            run_seed: derive_run_seed(seed),
            tag_tokens: BTreeMap::new(),
            docs: Vec::new(),
            draw_counter: 0,
        }
    }

    /// Checks every tag's cap and, if all pass, accumulates `tokens` into
    /// each tag's running total. Does not retain the document itself, so
    /// the streaming pipeline can use this for bounded-memory admission
    /// without holding every admitted document for a later batch draw.
    pub fn try_admit_tokens(&mut self, tags: &[String], tokens: u64) -> Result<(), String> {
        for tag in tags {
            if let Some(&cap) = self.caps.get(tag) {
                if self.tag_tokens.get(tag).copied().unwrap_or(0) >= cap {
                    return Err(tag.clone());
                }
            }
        }
        for tag in tags {
            *self.tag_tokens.entry(tag.clone()).or_insert(0) += tokens;
        }
        Ok(())
    }

    /// Admits `doc` if none of its slice tags are already at their cap,
    /// retaining it for a later weighted `draw`. Returns `Err(doc)` with the
    /// rejected document otherwise.
    pub fn admit(&mut self, mut doc: Document) -> Result<(), Document> {
        let tags = doc.metadata.known.slice_tags.clone().unwrap_or_default();
        let tokens = doc.metadata.known.token_count.unwrap_or(0);

        match self.try_admit_tokens(&tags, tokens) {
            Ok(()) => {
                self.docs.push(doc);
                Ok(())
            }
            Err(failing_tag) => {
                doc.mark_sampler_rejected(failing_tag);
                Err(doc)
            }
        }
    }

    fn dominant_weight(&self, doc: &Document) -> f64 {
        let tags = doc.metadata.known.slice_tags.as_deref().unwrap_or(&[]);
        tags.iter()
            .map(|t| self.weights.get(t).copied().unwrap_or(1.0))
            .fold(1.0_f64, f64::max)
            .powf(1.0 / self.temperature)
    }

    /// Weighted draw without replacement of up to `n` admitted documents.
    pub fn draw(&mut self, n: usize) -> Vec<Document> {
        let mut keyed: Vec<(f64, usize)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                self.draw_counter += 1;
                let u = uniform_draw(&self.run_seed, &doc.id, self.draw_counter).max(f64::MIN_POSITIVE);
                let weight = self.dominant_weight(doc).max(1e-9);
                (u.powf(1.0 / weight), i)
            })
            .collect();

        keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let take = n.min(keyed.len());
        let mut chosen_indices: Vec<usize> = keyed.into_iter().take(take).map(|(_, i)| i).collect();
        chosen_indices.sort_unstable_by(|a, b| b.cmp(a));

        let mut out = Vec::with_capacity(take);
        for idx in chosen_indices {
            out.push(self.docs.remove(idx));
        }
        out
    }

    pub fn admitted_count(&self) -> usize {
        self.docs.len()
    }

    pub fn tag_tokens(&self) -> &BTreeMap<String, u64> {
        &self.tag_tokens
    }
}

trait MarkSamplerRejected {
    fn mark_sampler_rejected(&mut self, tag: String);
}

impl MarkSamplerRejected for Document {
    fn mark_sampler_rejected(&mut self, tag: String) {
        self.metadata
            .mark_dropped("sampler_admission", format!("slice_cap_reached:{}", tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixing(caps: &[(&str, u64)], weights: &[(&str, f64)], temperature: f64) -> MixingConfig {
        MixingConfig {
            weights: weights.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            max_tokens_per_slice: caps.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            temperature,
        }
    }

    fn doc_with_tag(id: &str, tag: &str, tokens: u64) -> Document {
        let mut d = Document::new(id, "text");
        d.metadata.known.slice_tags = Some(vec![tag.to_string()]);
        d.metadata.known.token_count = Some(tokens);
        d
    }

    #[test]
    fn admission_rejects_once_tag_token_cap_is_reached() {
        let cfg = mixing(&[("wiki", 100)], &[], 1.0);
        let mut sampler = SlicedSampler::new(&cfg, 42);

        assert!(sampler.admit(doc_with_tag("a", "wiki", 100)).is_ok());
        let rejected = sampler.admit(doc_with_tag("b", "wiki", 10));
        assert!(rejected.is_err());
    }

    #[test]
    fn draw_is_deterministic_for_fixed_seed() {
        let cfg = mixing(&[], &[], 1.0);
        let mut s1 = SlicedSampler::new(&cfg, 7);
        let mut s2 = SlicedSampler::new(&cfg, 7);
        for i in 0..10 {
            s1.admit(doc_with_tag(&format!("d{i}"), "wiki", 1)).unwrap();
            s2.admit(doc_with_tag(&format!("d{i}"), "wiki", 1)).unwrap();
        }
        let drawn1: Vec<String> = s1.draw(5).into_iter().map(|d| d.id).collect();
        let drawn2: Vec<String> = s2.draw(5).into_iter().map(|d| d.id).collect();
        assert_eq!(drawn1, drawn2);
    }

    #[test]
    fn draw_never_returns_more_than_admitted() {
        let cfg = mixing(&[], &[], 1.0);
        let mut sampler = SlicedSampler::new(&cfg, 1);
        sampler.admit(doc_with_tag("a", "wiki", 1)).unwrap();
        let drawn = sampler.draw(5);
        assert_eq!(drawn.len(), 1);
    }

    #[test]
    fn higher_weighted_tag_is_favored_over_many_draws() {
        let cfg = mixing(&[], &[("wiki", 10.0), ("news", 0.1)], 1.0);
        let mut sampler = SlicedSampler::new(&cfg, 3);
        for i in 0..50 {
            sampler.admit(doc_with_tag(&format!("w{i}"), "wiki", 1)).unwrap();
        }
        for i in 0..50 {
            sampler.admit(doc_with_tag(&format!("n{i}"), "news", 1)).unwrap();
        }
        let drawn = sampler.draw(20);
        let wiki_count = drawn.iter().filter(|d| d.id.starts_with('w')).count();
        assert!(wiki_count > 10, "expected heavily-weighted slice to dominate the draw");
    }
}
