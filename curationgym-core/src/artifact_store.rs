//! artifact_store.rs - Content-addressed artifact store (§4.7).
//!
//! An artifact is keyed by `artifact_hash(policy_hash, code_version,
//! input_signature)` (§3), a short hash derived the same way a policy hash
//! is: canonical JSON over the three inputs, first 16 hex characters of
//! SHA-256. Manifests are written with the same temp-file-then-rename
//! discipline the run driver uses for shard files, so a reader never
//! observes a partially-written `manifest.json`.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CurationError, Result};
use crate::manifest::Manifest;

/// Computes the content-addressed key for an artifact from its three
/// identity inputs (§3's artifact key: `policy_hash + code_version +
/// input_signature`).
pub fn artifact_hash(policy_hash: &str, code_version: &str, input_signature: &str) -> Result<String> {
    let canon = serde_json::json!({
        "policy_hash": policy_hash,
        "code_version": code_version,
        "input_signature": input_signature,
    });
    let s = serde_json::to_string(&canon)?;
    Ok(curationgym_ngram::hashing::sha256_hex(s.as_bytes())[..16].to_string())
}

/// A directory tree of content-addressed artifacts, one subdirectory per
/// `artifact_hash`, each holding `manifest.json`, a `shards/` directory, and
/// a `logs/` directory.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory an artifact's files live under, whether or not it has
    /// been created yet.
    pub fn artifact_dir(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    fn manifest_path(&self, hash: &str) -> PathBuf {
        self.artifact_dir(hash).join("manifest.json")
    }

    /// True iff a readable, parseable manifest exists for `hash`. A
    /// directory left behind by an interrupted write (no manifest, or one
    /// truncated mid-write) reports `false` here so a caller treats it as
    /// not yet produced, matching the atomic-rename contract in
    /// `save_manifest`.
    pub fn exists(&self, hash: &str) -> bool {
        matches!(self.get_manifest(hash), Ok(Some(_)))
    }

    /// Creates (idempotently) the directory layout for `hash` and returns
    /// its root.
    pub fn create_artifact_dir(&self, hash: &str) -> Result<PathBuf> {
        let dir = self.artifact_dir(hash);
        fs::create_dir_all(dir.join("shards"))?;
        fs::create_dir_all(dir.join("logs"))?;
        Ok(dir)
    }

    /// Writes `manifest.json` atomically: serialize to a sibling `.tmp`
    /// file, `fsync`-free rename into place. A reader can never observe a
    /// half-written manifest.
    pub fn save_manifest(&self, hash: &str, manifest: &Manifest) -> Result<()> {
        self.create_artifact_dir(hash)?;
        let final_path = self.manifest_path(hash);
        let tmp_path = final_path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &final_path)
            .map_err(|e| CurationError::Storage(format!("atomic manifest rename failed: {e}")))?;

        info!("saved manifest for artifact {hash}");
        Ok(())
    }

    /// Loads the manifest for `hash`, or `None` if the artifact has not
    /// been produced yet.
    pub fn get_manifest(&self, hash: &str) -> Result<Option<Manifest>> {
        let path = self.manifest_path(hash);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&raw)?;
        Ok(Some(manifest))
    }

    /// Removes an artifact's entire directory tree. A no-op if it does not
    /// exist.
    pub fn delete_artifact(&self, hash: &str) -> Result<()> {
        let dir = self.artifact_dir(hash);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            debug!("deleted artifact {hash}");
        }
        Ok(())
    }

    /// Lists every artifact hash with a valid manifest, sorted.
    pub fn list_artifacts(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.manifest_path(&name).is_file() {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Fetches a manifest published by another curationgym instance over HTTP.
/// No path in `curate`, `resume`, `inspect`, or `purge` depends on this —
/// transport to external dataset hubs is explicitly out of scope (§1
/// Non-goals) — but `inspect --remote <url>` can use it to compare a local
/// artifact against one mirrored elsewhere. Async so it rides the CLI's
/// existing `tokio` runtime rather than pulling in a second async stack.
pub async fn fetch_remote_manifest(url: &str) -> Result<Manifest> {
    let resp = reqwest::get(url)
        .await
        .map_err(|e| CurationError::Storage(format!("remote manifest fetch failed: {e}")))?;
    let manifest = resp
        .json::<Manifest>()
        .await
        .map_err(|e| CurationError::Storage(format!("remote manifest was not valid JSON: {e}")))?;
    Ok(manifest)
}
