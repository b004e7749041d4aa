//! config.rs - Policy loading: candidate search paths, YAML/JSON parsing,
//! and layered defaults.
//!
//! Mirrors the teacher's profile-loading idiom (`profile_candidate_paths` /
//! `load_profile_by_name`): a bare name is resolved against a fixed list of
//! conventional directories before falling back to treating it as a literal
//! path, and the file is round-tripped through serde_yml so on-disk policies
//! may be written in YAML while `to_canonical_json` still drives hashing.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CurationError, Result};
use crate::policy::Policy;

/// Conventional directories searched, in order, for `<name>.yaml` when
/// `load_policy_by_name` is given a bare name rather than a path.
pub fn policy_candidate_paths(name: &str) -> Vec<PathBuf> {
    let base_dirs = [
        dirs::home_dir().map(|p| p.join(".curationgym").join("policies")),
        dirs::config_dir().map(|p| p.join("curationgym").join("policies")),
        Some(PathBuf::from("/etc/curationgym/policies")),
        Some(PathBuf::from("./policies")),
        Some(PathBuf::from("../policies")),
    ];

    base_dirs
        .into_iter()
        .flatten()
        .map(|dir| dir.join(format!("{}.yaml", name)))
        .collect()
}

/// Loads a policy either from a literal path (YAML or JSON, by extension) or
/// by searching the conventional candidate directories for `<name>.yaml`.
pub fn load_policy_by_name(name_or_path: &str) -> Result<Policy> {
    debug!("resolving policy from '{}'", name_or_path);

    let path = Path::new(name_or_path);
    let resolved = if path.exists() && path.is_file() {
        path.to_path_buf()
    } else {
        policy_candidate_paths(name_or_path)
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                CurationError::InvalidPolicy(format!(
                    "policy '{}' is not a file and was not found in any candidate directory",
                    name_or_path
                ))
            })?
    };

    load_policy_from_path(&resolved)
}

pub fn load_policy_from_path(path: &Path) -> Result<Policy> {
    let raw = fs::read_to_string(path)?;
    parse_policy(&raw, path.extension().and_then(|e| e.to_str()))
}

fn parse_policy(raw: &str, extension: Option<&str>) -> Result<Policy> {
    match extension {
        Some("json") => serde_json::from_str(raw).map_err(CurationError::from),
        _ => serde_yml::from_str(raw).map_err(|e| CurationError::YamlParse(e.to_string())),
    }
}
