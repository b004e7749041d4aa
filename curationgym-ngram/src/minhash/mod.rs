//! MinHash signatures and LSH banding, per §4.2 of the curation spec.
//!
//! A signature has `num_bands * rows_per_band` components; component `i` is
//! the minimum, over the document's character n-grams, of `H(i ∥ ngram)`.
//! Banding groups consecutive runs of `rows_per_band` components and hashes
//! each run to a single bucket key.

use crate::hashing::hash64_seeded;
use crate::ngram::char_ngrams;

/// Bands x rows configuration. Default 14 bands x 8 rows = 112 hash
/// functions, matching the spec's stated default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinHashConfig {
    pub num_bands: usize,
    pub rows_per_band: usize,
    pub ngram_size: usize,
}

impl Default for MinHashConfig {
    fn default() -> Self {
        Self {
            num_bands: 14,
            rows_per_band: 8,
            ngram_size: 5,
        }
    }
}

impl MinHashConfig {
    pub fn num_hashes(&self) -> usize {
        self.num_bands * self.rows_per_band
    }

    /// The approximate similarity threshold realized by this band/row
    /// configuration: `(1/b)^(1/r)`.
    pub fn approx_threshold(&self) -> f64 {
        (1.0 / self.num_bands as f64).powf(1.0 / self.rows_per_band as f64)
    }
}

/// Computes the MinHash signature for `text` under `cfg`.
pub fn signature(text: &str, cfg: &MinHashConfig) -> Vec<u64> {
    let grams = char_ngrams(text, cfg.ngram_size);
    let mut sig = Vec::with_capacity(cfg.num_hashes());
    for i in 0..cfg.num_hashes() as u64 {
        let min = grams
            .iter()
            .map(|g| hash64_seeded(i, g.as_bytes()))
            .min()
            .unwrap_or(u64::MAX);
        sig.push(min);
    }
    sig
}

/// Splits a signature into `cfg.num_bands` bucket keys, one per band. Each
/// key is a hash of the band's row slice, collapsed to 64 bits so bucket
/// maps never need generic string keys (per the spec's design notes).
pub fn band_keys(sig: &[u64], cfg: &MinHashConfig) -> Vec<u64> {
    assert_eq!(sig.len(), cfg.num_hashes(), "signature length must match config");
    let mut keys = Vec::with_capacity(cfg.num_bands);
    for b in 0..cfg.num_bands {
        let start = b * cfg.rows_per_band;
        let end = start + cfg.rows_per_band;
        let mut bytes = Vec::with_capacity(cfg.rows_per_band * 8 + 8);
        bytes.extend_from_slice(&(b as u64).to_le_bytes());
        for v in &sig[start..end] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        keys.push(hash64_seeded(BAND_TUPLE_HASH_SEED, &bytes));
    }
    keys
}

/// Domain separator so band tuple-hashes never collide with the per-row
/// MinHash hash family, which is seeded `0..num_hashes()`.
const BAND_TUPLE_HASH_SEED: u64 = 0xBA_7D_0001;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_has_expected_length() {
        let cfg = MinHashConfig::default();
        let sig = signature("the quick brown fox jumps over the lazy dog", &cfg);
        assert_eq!(sig.len(), cfg.num_hashes());
        assert_eq!(cfg.num_hashes(), 112);
    }

    #[test]
    fn identical_text_has_identical_signature() {
        let cfg = MinHashConfig::default();
        let a = signature("the quick brown fox", &cfg);
        let b = signature("the quick brown fox", &cfg);
        assert_eq!(a, b);
    }

    #[test]
    fn near_duplicate_texts_share_at_least_one_band() {
        let cfg = MinHashConfig::default();
        let a = signature("the quick brown fox jumps over the lazy dog", &cfg);
        let b = signature("the quick brown fox jumps over the lazy cat", &cfg);
        let ka = band_keys(&a, &cfg);
        let kb = band_keys(&b, &cfg);
        assert!(ka.iter().any(|k| kb.contains(k)));
    }

    #[test]
    fn unrelated_texts_usually_share_no_band() {
        let cfg = MinHashConfig::default();
        let a = signature("lorem ipsum dolor sit amet consectetur", &cfg);
        let b = signature("completely different content about gardening", &cfg);
        let ka = band_keys(&a, &cfg);
        let kb = band_keys(&b, &cfg);
        assert!(ka.iter().filter(|k| kb.contains(k)).count() <= 1);
    }
}
