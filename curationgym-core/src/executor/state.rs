//! executor/state.rs - The resumable executor's on-disk checkpoint (§4.8).
//!
//! `execution_state.json` is the source of truth for which shard tasks have
//! already completed. It is rewritten atomically (temp file + rename, the
//! same discipline the artifact store and the shard writer use) every time
//! a task's status changes, so a process killed mid-run leaves behind a
//! consistent snapshot rather than a torn one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: String,
    pub status: TaskStatus,
    pub docs_processed: u64,
    pub error: Option<String>,
}

impl TaskState {
    fn pending(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            docs_processed: 0,
            error: None,
        }
    }
}

/// The full checkpoint for one run. Keyed by `run_id`: loading a state file
/// stamped with a different `run_id` is treated as belonging to an
/// unrelated run and a fresh state is built instead (§4.8, "resumable by
/// matching run_id").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_id: String,
    pub tasks: BTreeMap<String, TaskState>,
}

impl ExecutionState {
    pub fn fresh(run_id: impl Into<String>, task_ids: &[String]) -> Self {
        Self {
            run_id: run_id.into(),
            tasks: task_ids.iter().map(|id| (id.clone(), TaskState::pending(id))).collect(),
        }
    }

    /// Loads `path` if it exists, parses, and belongs to `run_id`; otherwise
    /// builds a fresh state for `task_ids`. A corrupt or foreign state file
    /// is never fatal — it just means this run starts from scratch.
    pub fn load_or_fresh(path: &Path, run_id: &str, task_ids: &[String]) -> Self {
        if let Ok(raw) = fs::read_to_string(path) {
            if let Ok(state) = serde_json::from_str::<ExecutionState>(&raw) {
                if state.run_id == run_id {
                    return state;
                }
            }
        }
        Self::fresh(run_id, task_ids)
    }

    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Task ids still eligible to run: never attempted, or previously
    /// failed and therefore retriable. Completed tasks are never re-run.
    pub fn runnable_task_ids(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Failed))
            .map(|t| t.task_id.clone())
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.values().filter(|t| t.status == TaskStatus::Completed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tasks.values().filter(|t| t.status == TaskStatus::Failed).count()
    }

    pub fn is_complete(&self) -> bool {
        self.tasks.values().all(|t| t.status == TaskStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_marks_every_task_pending() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let state = ExecutionState::fresh("run-1", &ids);
        assert_eq!(state.runnable_task_ids().len(), 2);
        assert!(!state.is_complete());
    }

    #[test]
    fn load_or_fresh_rejects_a_state_file_from_a_different_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_state.json");
        let ids = vec!["a".to_string()];
        let state = ExecutionState::fresh("run-1", &ids);
        state.save_atomic(&path).unwrap();

        let reloaded = ExecutionState::load_or_fresh(&path, "run-2", &ids);
        assert_eq!(reloaded.run_id, "run-2");
        assert_eq!(reloaded.runnable_task_ids().len(), 1);
    }

    #[test]
    fn load_or_fresh_resumes_a_matching_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("execution_state.json");
        let ids = vec!["a".to_string(), "b".to_string()];
        let mut state = ExecutionState::fresh("run-1", &ids);
        state.tasks.get_mut("a").unwrap().status = TaskStatus::Completed;
        state.save_atomic(&path).unwrap();

        let reloaded = ExecutionState::load_or_fresh(&path, "run-1", &ids);
        assert_eq!(reloaded.completed_count(), 1);
        assert_eq!(reloaded.runnable_task_ids(), vec!["b".to_string()]);
    }

    #[test]
    fn failed_tasks_are_retriable_completed_tasks_are_not() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut state = ExecutionState::fresh("run-1", &ids);
        state.tasks.get_mut("a").unwrap().status = TaskStatus::Completed;
        state.tasks.get_mut("b").unwrap().status = TaskStatus::Failed;
        let mut runnable = state.runnable_task_ids();
        runnable.sort();
        assert_eq!(runnable, vec!["b".to_string(), "c".to_string()]);
    }
}
