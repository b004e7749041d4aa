//! Build-time code version, used as the `code_version` component of the
//! manifest, the run stamp, and the artifact hash.
//!
//! Per Open Question (1) (§9 of the spec): the original tool derives a code
//! version by hashing the running source text of its slice registry. A
//! static Rust build cannot reproduce that identically, so this
//! reimplementation substitutes a build-time constant instead: the crate's
//! semver plus an optional compile-time override, which still participates
//! in `artifact_hash` and the run stamp exactly as a source-derived version
//! would.

/// The code version embedded into manifests, run stamps, and slice tags.
pub fn code_version() -> String {
    match option_env!("CURATIONGYM_BUILD_REV") {
        Some(rev) if !rev.is_empty() => format!("{}+{}", env!("CARGO_PKG_VERSION"), rev),
        _ => env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// The slice code version embedded into `metadata.slice_code_version`. It is
/// the same build-time constant as `code_version()`: a different build of
/// the slice registry always yields a different code version, so stats
/// collected across builds are never silently mixed.
pub fn slice_code_version() -> String {
    code_version()
}
