//! commands - Thin per-subcommand drivers (`XxxArgs` in, `anyhow::Result<()>`
//! out) that load a policy, build shard tasks, and delegate to
//! `curationgym-core`. All curation logic lives in the library; these
//! modules only wire CLI input to it and print results.

pub mod curate;
pub mod inspect;
pub mod purge;
pub mod resume;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serializes `value` to `path` via a sibling temp file then a rename, the
/// same discipline `ArtifactStore::save_manifest` and the executor's
/// checkpoint use, so a reader never observes a half-written file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, json).with_context(|| format!("writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}
