use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::checklist::{parse_checklist_file, TaskCounts, TaskRecord};
use crate::files::{relative_slash_path, scan_files, FileEntry};

pub const GIT_MARKER: &str = ".git";
pub const AGENTS_MARKER: &str = "AGENTS.md";
pub const PACKAGE_MARKER: &str = "package.json";
pub const README_MARKER: &str = "README.md";
pub const TODO_MARKER: &str = "todo.md";

pub const PROJECT_MARKERS: [&str; 5] = [
    GIT_MARKER,
    AGENTS_MARKER,
    PACKAGE_MARKER,
    README_MARKER,
    TODO_MARKER,
];

pub const ROOT_PROJECT_NAME: &str = "workspace-root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Stable,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub path: String,
    pub rel_path: String,
    pub markers: Vec<String>,
    pub has_readme: bool,
    pub has_todo: bool,
    pub has_agents_info: bool,
    pub last_updated: String,
    pub status: ProjectStatus,
    pub tasks: Vec<TaskRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    pub files: Vec<FileEntry>,
}

/// Marker names present among `entry_names`, in sorted order.
pub fn find_markers<'a, I>(entry_names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    entry_names
        .into_iter()
        .filter(|name| PROJECT_MARKERS.contains(name))
        .map(|name| name.to_string())
        .collect()
}

/// Name shown for the directory at `rel_path`.
pub fn project_name(path: &Path, rel_path: &str) -> String {
    if rel_path == "." {
        return ROOT_PROJECT_NAME.to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string())
}

pub fn classify_project(
    workspace_root: &Path,
    path: &Path,
    markers: &BTreeSet<String>,
) -> ProjectRecord {
    let rel_path = relative_slash_path(path, workspace_root);
    let has_todo = markers.contains(TODO_MARKER);

    let mut status = if has_todo {
        ProjectStatus::Active
    } else {
        ProjectStatus::Stable
    };
    let mut tasks = Vec::new();
    let mut progress = None;

    let todo_path = path.join(TODO_MARKER);
    if todo_path.exists() {
        tasks = parse_checklist_file(&todo_path);
        let counts = TaskCounts::from_tasks(&tasks);
        progress = counts.progress_label();
        if counts.all_done() {
            status = ProjectStatus::Completed;
        }
    }

    ProjectRecord {
        name: project_name(path, &rel_path),
        path: canonical_string(path),
        markers: markers.iter().cloned().collect(),
        has_readme: markers.contains(README_MARKER),
        has_todo,
        has_agents_info: markers.contains(AGENTS_MARKER),
        last_updated: modified_rfc3339(path),
        status,
        tasks,
        progress,
        files: scan_files(path),
        rel_path,
    }
}

fn canonical_string(path: &Path) -> String {
    let canonical: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().to_string()
}

fn modified_rfc3339(path: &Path) -> String {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(modified).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::TaskStatus;
    use tempfile::TempDir;

    fn markers(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn find_markers_intersects_known_names() {
        let found = find_markers(["src", "README.md", "todo.md", "Cargo.toml", ".git"]);
        assert_eq!(found, markers(&[".git", "README.md", "todo.md"]));
        assert!(find_markers(["src", "docs"]).is_empty());
    }

    #[test]
    fn flags_follow_markers() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join("alpha");
        fs::create_dir_all(&dir).expect("dir");
        fs::write(dir.join("README.md"), "# Alpha").expect("readme");
        fs::write(dir.join("AGENTS.md"), "agents").expect("agents");

        let record = classify_project(temp.path(), &dir, &markers(&["AGENTS.md", "README.md"]));
        assert_eq!(record.name, "alpha");
        assert_eq!(record.rel_path, "alpha");
        assert!(record.has_readme);
        assert!(record.has_agents_info);
        assert!(!record.has_todo);
        assert_eq!(record.status, ProjectStatus::Stable);
        assert!(record.tasks.is_empty());
        assert_eq!(record.progress, None);
        assert_eq!(record.files.len(), 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&record.last_updated).is_ok());
    }

    #[test]
    fn todo_drives_progress_and_status() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join("todo.md"),
            "## Phase 1\n- [x] a\n- [x] b\n- [x] c\n## Phase 2\n- [ ] d\n- [ ] e\n",
        )
        .expect("todo");

        let record = classify_project(temp.path(), temp.path(), &markers(&["todo.md"]));
        assert_eq!(record.name, ROOT_PROJECT_NAME);
        assert_eq!(record.rel_path, ".");
        assert_eq!(record.status, ProjectStatus::Active);
        assert_eq!(record.progress.as_deref(), Some("3/5"));
        assert_eq!(record.tasks.len(), 5);
        assert_eq!(record.tasks[3].phase, "Phase 2");
        assert_eq!(record.tasks[3].status, TaskStatus::Todo);
    }

    #[test]
    fn all_done_marks_project_completed() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("todo.md"), "- [x] a\n- [X] b\n").expect("todo");
        let record = classify_project(temp.path(), temp.path(), &markers(&["todo.md"]));
        assert_eq!(record.status, ProjectStatus::Completed);
        assert_eq!(record.progress.as_deref(), Some("2/2"));
    }

    #[test]
    fn empty_todo_keeps_active_without_progress() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("todo.md"), "# Nothing yet\n").expect("todo");
        let record = classify_project(temp.path(), temp.path(), &markers(&["todo.md"]));
        assert_eq!(record.status, ProjectStatus::Active);
        assert_eq!(record.progress, None);
    }

    #[test]
    fn progress_is_omitted_from_json_when_absent() {
        let temp = TempDir::new().expect("tempdir");
        let record = classify_project(temp.path(), temp.path(), &markers(&["README.md"]));
        let value = serde_json::to_value(&record).expect("json");
        assert!(value.get("progress").is_none());
        assert_eq!(value["status"], "stable");
    }
}
