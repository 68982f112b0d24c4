//! Small-file snapshots of a project subtree.
//!
//! Every file whose extension is on [`ALLOWED_EXTENSIONS`] is listed. Files
//! smaller than [`CONTENT_SIZE_LIMIT`] carry their text; larger files are
//! listed with empty content.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub const CONTENT_SIZE_LIMIT: u64 = 50_000;
pub const READ_ERROR_PLACEHOLDER: &str = "[Error reading file]";

pub const PRUNED_DIRS: [&str; 5] = [".git", "node_modules", "venv", "__pycache__", ".openclaw"];

pub const ALLOWED_EXTENSIONS: [&str; 10] = [
    ".md", ".py", ".js", ".json", ".css", ".html", ".txt", ".sh", ".yml", ".yaml",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub rel_path: String,
    pub ext: String,
    pub content: String,
}

pub fn is_pruned_dir(name: &str) -> bool {
    PRUNED_DIRS.contains(&name)
}

/// Lowercased extension with its leading dot, or `""` when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext)
}

/// Joins the components of `path` below `base` with `/`.
pub fn relative_slash_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|part| part.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

pub fn scan_files(project_root: &Path) -> Vec<FileEntry> {
    let walker = WalkDir::new(project_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && is_pruned_dir(&entry.file_name().to_string_lossy()))
        });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        // Symlinks count only when they resolve to a regular file.
        let is_file = entry.file_type().is_file()
            || (entry.file_type().is_symlink() && path.is_file());
        if !is_file {
            continue;
        }
        let ext = extension_of(path);
        if !is_allowed_extension(&ext) {
            continue;
        }
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            rel_path: relative_slash_path(path, project_root),
            content: capture_content(path),
            ext,
        });
    }
    entries
}

fn capture_content(path: &Path) -> String {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return READ_ERROR_PLACEHOLDER.to_string(),
    };
    if size >= CONTENT_SIZE_LIMIT {
        return String::new();
    }
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "file content unreadable");
            READ_ERROR_PLACEHOLDER.to_string()
        }
    }
}
