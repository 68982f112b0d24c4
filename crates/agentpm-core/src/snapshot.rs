//! Composition and persistence of the global workspace snapshot.
//!
//! One snapshot is written per scan to two sinks: the canonical JSON state
//! file and a script file assigning the same payload to
//! `window.LUMI_DATA` for the dashboard. Both are replaced wholesale.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::WorkspacePaths;
use crate::dialogue::load_dialogue;
use crate::jobs::{JobError, JobSource};
use crate::now_rfc3339;
use crate::scan::{scan_workspace, ProjectMap};

pub const SCRIPT_GLOBAL: &str = "window.LUMI_DATA";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Another scan is writing the snapshot ({0})")]
    Locked(PathBuf),
    #[error("Script file does not wrap a snapshot: {0}")]
    Script(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSnapshot {
    pub last_scan: String,
    pub projects_count: usize,
    pub is_thinking: bool,
    pub dialogue: Vec<Value>,
    pub cron_jobs: Vec<Value>,
    pub projects: ProjectMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub state_path: String,
    pub script_path: String,
    pub projects: usize,
    pub dialogue: usize,
    pub cron_jobs: usize,
    pub is_thinking: bool,
}

pub fn is_busy(paths: &WorkspacePaths) -> bool {
    paths.busy_lock_path.exists()
}

/// Gathers the run-time signals around `projects`. Unavailable dialogue or
/// jobs degrade to empty lists.
pub fn compose_snapshot(
    paths: &WorkspacePaths,
    projects: ProjectMap,
    jobs: &dyn JobSource,
) -> GlobalSnapshot {
    let dialogue = match load_dialogue(&paths.dialogue_path) {
        Ok(log) => {
            if log.skipped > 0 {
                tracing::warn!(skipped = log.skipped, "dialogue log has malformed lines");
            }
            log.entries
        }
        Err(err) => {
            tracing::warn!(path = %paths.dialogue_path.display(), error = %err, "dialogue log unreadable");
            Vec::new()
        }
    };

    let cron_jobs = match jobs.list_jobs() {
        Ok(jobs) => jobs,
        Err(JobError::NotInstalled(program)) => {
            tracing::debug!(%program, "job tool not installed");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, "job list unavailable");
            Vec::new()
        }
    };

    GlobalSnapshot {
        last_scan: now_rfc3339(),
        projects_count: projects.len(),
        is_thinking: is_busy(paths),
        dialogue,
        cron_jobs,
        projects,
    }
}

pub fn render_json(snapshot: &GlobalSnapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn render_script(snapshot: &GlobalSnapshot) -> Result<String, SnapshotError> {
    Ok(format!("{} = {};", SCRIPT_GLOBAL, render_json(snapshot)?))
}

pub fn write_snapshot(
    paths: &WorkspacePaths,
    snapshot: &GlobalSnapshot,
) -> Result<SnapshotSummary, SnapshotError> {
    let json = render_json(snapshot)?;
    let script = render_script(snapshot)?;

    let _guard = WriteLock::acquire(&paths.write_lock_path)?;
    replace_file(&paths.state_path, &json)?;
    replace_file(&paths.script_path, &script)?;

    Ok(SnapshotSummary {
        state_path: paths.state_path.to_string_lossy().to_string(),
        script_path: paths.script_path.to_string_lossy().to_string(),
        projects: snapshot.projects_count,
        dialogue: snapshot.dialogue.len(),
        cron_jobs: snapshot.cron_jobs.len(),
        is_thinking: snapshot.is_thinking,
    })
}

/// Scans the workspace and persists the resulting snapshot.
///
/// The outputs live inside the workspace, so the next run's file tree of an
/// enclosing project (usually the root) lists the previous `data.js` and
/// `global_state.json`. Only the first scan of a fresh tree omits them.
pub fn run_scan(
    paths: &WorkspacePaths,
    max_depth: usize,
    jobs: &dyn JobSource,
) -> Result<SnapshotSummary, SnapshotError> {
    let projects = scan_workspace(&paths.root, max_depth);
    let snapshot = compose_snapshot(paths, projects, jobs);
    let summary = write_snapshot(paths, &snapshot)?;
    tracing::info!(
        projects = summary.projects,
        dialogue = summary.dialogue,
        cron_jobs = summary.cron_jobs,
        "snapshot written"
    );
    Ok(summary)
}

pub fn read_snapshot(path: &Path) -> Result<GlobalSnapshot, SnapshotError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn read_script_snapshot(path: &Path) -> Result<GlobalSnapshot, SnapshotError> {
    let text = fs::read_to_string(path)?;
    let payload = text
        .trim()
        .strip_prefix(SCRIPT_GLOBAL)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('='))
        .and_then(|rest| rest.trim_end().strip_suffix(';'))
        .ok_or_else(|| SnapshotError::Script(path.to_path_buf()))?;
    Ok(serde_json::from_str(payload.trim())?)
}

/// Writes `content` beside `path` and renames it into place.
fn replace_file(path: &Path, content: &str) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Exclusive advisory lock held while both sinks are replaced.
struct WriteLock {
    file: File,
}

impl WriteLock {
    fn acquire(path: &Path) -> Result<Self, SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| SnapshotError::Locked(path.to_path_buf()))?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
