// curationgym-ngram/src/lib.rs
//! N-gram extraction, 64-bit hashing primitives, MinHash sketches, and
//! multi-pattern substring redaction.
//!
//! This crate is the low-level, allocation-conscious counterpart to
//! `curationgym-core`'s dedup and decontamination subsystems: it owns the
//! character/word n-gram extractors, the `H(i ∥ ngram)` hash family used by
//! MinHash signatures, and the Aho-Corasick-backed substring redactor used
//! when a contamination match is replaced rather than dropped.
//!
//! License: MIT OR Apache-2.0

pub mod hashing;
pub mod minhash;
pub mod ngram;
pub mod redact;

pub use hashing::hash64;
pub use minhash::{signature, MinHashConfig};
pub use ngram::{char_ngrams, word_ngrams};
pub use redact::redact_matches;
