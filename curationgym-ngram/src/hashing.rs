//! A single 64-bit hash family used across n-gram hashing, MinHash row
//! functions, and decontamination indexing.
//!
//! Every hash in this module is truncated SHA-256; this keeps the whole
//! engine free of a second hashing dependency and guarantees the same
//! output across platforms and process runs, which the policy-hash and
//! dedup-cluster-id invariants both depend on.

use sha2::{Digest, Sha256};

/// `H(seed ∥ bytes)` truncated to the low 8 bytes, interpreted little-endian.
pub fn hash64_seeded(seed: u64, bytes: &[u8]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(bytes);
    let out = hasher.finalize();
    u64::from_le_bytes(out[0..8].try_into().expect("sha256 digest >= 8 bytes"))
}

/// `H(bytes)` truncated to the low 8 bytes. Used for decontam n-gram indexing
/// and bucket keys where there is no per-call seed.
pub fn hash64(bytes: &[u8]) -> u64 {
    hash64_seeded(0, bytes)
}

/// Hashes a full SHA-256 digest of `bytes`, returned as a lowercase hex
/// string. Used for exact-dedup content hashes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(HEX[(b >> 4) as usize] as char);
        s.push(HEX[(b & 0x0f) as usize] as char);
    }
    s
}
