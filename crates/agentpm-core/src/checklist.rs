use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PHASE: &str = "General";

const PHASE_PREFIX: &str = "## ";
const ITEM_PREFIX: &str = "- [";
const DONE_TOKEN: &str = "[x]";
// "- [ ] " and "- [x] " are both six characters wide.
const CHECKBOX_WIDTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Done,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub status: TaskStatus,
    pub phase: String,
}

impl TaskRecord {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub done: usize,
    pub total: usize,
}

impl TaskCounts {
    pub fn from_tasks(tasks: &[TaskRecord]) -> Self {
        Self {
            done: tasks.iter().filter(|task| task.is_done()).count(),
            total: tasks.len(),
        }
    }

    /// `"<done>/<total>"`, or `None` when there is nothing to count.
    pub fn progress_label(&self) -> Option<String> {
        if self.total == 0 {
            return None;
        }
        Some(format!("{}/{}", self.done, self.total))
    }

    pub fn all_done(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

pub fn parse_checklist(text: &str) -> Vec<TaskRecord> {
    let mut tasks = Vec::new();
    let mut current_phase = DEFAULT_PHASE.to_string();
    for raw in text.lines() {
        let line = raw.trim();
        if let Some(heading) = line.strip_prefix(PHASE_PREFIX) {
            current_phase = heading.replace(PHASE_PREFIX, "").trim().to_string();
        } else if line.starts_with(ITEM_PREFIX) {
            let status = if line.to_lowercase().contains(DONE_TOKEN) {
                TaskStatus::Done
            } else {
                TaskStatus::Todo
            };
            let title: String = line.chars().skip(CHECKBOX_WIDTH).collect();
            tasks.push(TaskRecord {
                title: title.trim().to_string(),
                status,
                phase: current_phase.clone(),
            });
        }
    }
    tasks
}

/// Missing or unreadable files yield no tasks.
pub fn parse_checklist_file(path: &Path) -> Vec<TaskRecord> {
    match fs::read(path) {
        Ok(bytes) => parse_checklist(&String::from_utf8_lossy(&bytes)),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "checklist unreadable");
            Vec::new()
        }
    }
}
