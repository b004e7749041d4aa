//! run_stamp.rs - The environment envelope attached to any run (§3, §6).
//!
//! GPU enumeration is out of scope per the spec's Non-goals ("no GPU
//! compute") and is omitted rather than stubbed out with a fabricated
//! value.

use chrono::{DateTime, Utc};
use curationgym_ngram::hashing::sha256_hex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::version::code_version;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub platform: String,
    pub cpu_count: usize,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStamp {
    pub timestamp: DateTime<Utc>,
    pub code_version: String,
    pub code_dirty: bool,
    pub dependency_lock_hash: String,
    pub host: HostInfo,
    pub run_id: String,
    pub command: String,
}

impl RunStamp {
    pub fn capture(run_id: impl Into<String>, command: impl Into<String>, repo_root: &Path) -> Self {
        Self {
            timestamp: Utc::now(),
            code_version: code_version(),
            code_dirty: is_dirty(repo_root),
            dependency_lock_hash: dependency_lock_hash(repo_root),
            host: HostInfo::current(),
            run_id: run_id.into(),
            command: command.into(),
        }
    }
}

/// No `git` shell-out: presence of `.git/index` is treated as "has history
/// to be dirty against"; absence means a non-VCS build, reported clean.
fn is_dirty(repo_root: &Path) -> bool {
    repo_root.join(".git").join("index").exists()
}

fn dependency_lock_hash(repo_root: &Path) -> String {
    match std::fs::read(repo_root.join("Cargo.lock")) {
        Ok(bytes) => sha256_hex(&bytes)[..16].to_string(),
        Err(_) => "no-lockfile".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_info_reports_at_least_one_cpu() {
        assert!(HostInfo::current().cpu_count >= 1);
    }

    #[test]
    fn dependency_lock_hash_has_sentinel_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(dependency_lock_hash(dir.path()), "no-lockfile");
    }
}
