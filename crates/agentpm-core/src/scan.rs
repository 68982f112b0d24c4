//! Depth-bounded discovery of projects below a workspace root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::files::relative_slash_path;
use crate::project::{classify_project, find_markers, ProjectRecord};

pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Directory names never descended into while looking for projects.
pub const SKIPPED_DIRS: [&str; 6] = [
    ".git",
    "node_modules",
    "venv",
    "__pycache__",
    ".openclaw",
    "data",
];

pub type ProjectMap = BTreeMap<String, ProjectRecord>;

pub fn is_skipped_dir(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name)
}

/// Walks `root` depth-first (the root is depth 0) and classifies every
/// directory carrying at least one project marker. Nested projects are
/// discovered too. Unreadable directories are skipped and symlinked
/// directories are never followed.
pub fn scan_workspace(root: &Path, max_depth: usize) -> ProjectMap {
    let mut projects = ProjectMap::new();
    let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];

    while let Some((dir, depth)) = pending.pop() {
        if depth > max_depth {
            continue;
        }
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };
        let mut children: Vec<fs::DirEntry> = listing.filter_map(Result::ok).collect();
        children.sort_by_key(|entry| entry.file_name());

        let names: Vec<String> = children
            .iter()
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        let markers = find_markers(names.iter().map(String::as_str));
        if !markers.is_empty() {
            let record = classify_project(root, &dir, &markers);
            tracing::debug!(project = %record.rel_path, markers = markers.len(), "project found");
            projects.insert(relative_slash_path(&dir, root), record);
        }

        if depth == max_depth {
            continue;
        }
        let subdirs: Vec<PathBuf> = children
            .iter()
            .zip(names.iter())
            .filter(|(entry, name)| {
                !is_skipped_dir(name)
                    && entry
                        .file_type()
                        .map(|file_type| file_type.is_dir())
                        .unwrap_or(false)
            })
            .map(|(entry, _)| entry.path())
            .collect();
        for subdir in subdirs.into_iter().rev() {
            pending.push((subdir, depth + 1));
        }
    }
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(path, "").expect("write");
    }

    fn keys(projects: &ProjectMap) -> Vec<&str> {
        projects.keys().map(String::as_str).collect()
    }

    #[test]
    fn root_with_markers_is_workspace_root() {
        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("AGENTS.md"));
        let projects = scan_workspace(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(keys(&projects), vec!["."]);
        assert_eq!(projects["."].name, "workspace-root");
    }

    #[test]
    fn nested_projects_are_discovered() {
        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("outer/package.json"));
        touch(&temp.path().join("outer/packages/inner/README.md"));
        touch(&temp.path().join("plain/notes.txt"));

        let projects = scan_workspace(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(keys(&projects), vec!["outer", "outer/packages/inner"]);
        assert_eq!(projects["outer/packages/inner"].name, "inner");
    }

    #[test]
    fn depth_limit_stops_descent() {
        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("a/README.md"));
        touch(&temp.path().join("a/b/README.md"));
        touch(&temp.path().join("a/b/c/README.md"));
        touch(&temp.path().join("a/b/c/d/README.md"));

        let projects = scan_workspace(temp.path(), 3);
        assert_eq!(keys(&projects), vec!["a", "a/b", "a/b/c"]);

        let shallow = scan_workspace(temp.path(), 0);
        assert!(shallow.is_empty());
    }

    #[test]
    fn skipped_directories_are_not_entered() {
        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("node_modules/dep/package.json"));
        touch(&temp.path().join("data/cache/README.md"));
        touch(&temp.path().join(".openclaw/agent/AGENTS.md"));
        touch(&temp.path().join("venv/lib/README.md"));
        touch(&temp.path().join("app/__pycache__/README.md"));
        touch(&temp.path().join("app/todo.md"));

        let projects = scan_workspace(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(keys(&projects), vec!["app"]);
    }

    #[test]
    fn git_directory_counts_as_marker() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("repo/.git/objects")).expect("git dir");
        touch(&temp.path().join("repo/.git/objects/README.md"));

        let projects = scan_workspace(temp.path(), DEFAULT_MAX_DEPTH);
        assert_eq!(keys(&projects), vec!["repo"]);
        assert_eq!(projects["repo"].markers, vec![".git".to_string()]);
        assert!(projects["repo"].files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_does_not_stop_the_scan() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("alpha/README.md"));
        touch(&temp.path().join("locked/inner/README.md"));
        touch(&temp.path().join("zeta/todo.md"));
        let locked = temp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
        if fs::read_dir(&locked).is_ok() {
            // Privileged users bypass directory modes.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("restore");
            return;
        }

        let projects = scan_workspace(temp.path(), DEFAULT_MAX_DEPTH);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("restore");

        assert_eq!(keys(&projects), vec!["alpha", "zeta"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let temp = TempDir::new().expect("tempdir");
        touch(&temp.path().join("real/README.md"));
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("alias"))
            .expect("symlink");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("real/loop")).expect("loop");

        let projects = scan_workspace(temp.path(), 10);
        assert_eq!(keys(&projects), vec!["real"]);
    }
}
