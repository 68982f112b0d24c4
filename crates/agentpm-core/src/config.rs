use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_APP_DIR: &str = "projects/agent-pm-system";
pub const DEFAULT_JOBS_COMMAND: &str = "openclaw cron list --json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Workspace root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentpmConfig {
    /// Directory holding data/, web/ and schema/, relative to the workspace root.
    pub app_dir: Option<String>,
    pub max_depth: Option<usize>,
    /// Command line printing `{"jobs": [...]}` on stdout.
    pub jobs_command: Option<String>,
}

pub fn config_filename_candidates() -> [&'static str; 2] {
    [".agentpm.toml", ".agentpmrc"]
}

pub fn load_config(workspace_root: &Path) -> Option<AgentpmConfig> {
    for name in config_filename_candidates() {
        let path = workspace_root.join(name);
        if path.is_file() {
            if let Ok(text) = fs::read_to_string(&path) {
                match toml::from_str::<AgentpmConfig>(&text) {
                    Ok(config) => return Some(config),
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                    }
                }
            }
        }
    }
    None
}

/// Every location the scanner and the decomposition flow read or write,
/// derived once from the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub app_dir: PathBuf,
    pub data_dir: PathBuf,
    pub web_dir: PathBuf,
    pub state_path: PathBuf,
    pub script_path: PathBuf,
    pub dialogue_path: PathBuf,
    pub busy_lock_path: PathBuf,
    pub write_lock_path: PathBuf,
    pub schema_path: PathBuf,
    pub tasks_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: &Path) -> Self {
        Self::with_app_dir(root, DEFAULT_APP_DIR)
    }

    pub fn with_app_dir(root: &Path, app_dir: &str) -> Self {
        let root = root.to_path_buf();
        let app_dir = root.join(app_dir.trim());
        let data_dir = app_dir.join("data");
        let web_dir = app_dir.join("web");
        Self {
            state_path: data_dir.join("global_state.json"),
            script_path: web_dir.join("data.js"),
            dialogue_path: data_dir.join("dialogue.jsonl"),
            busy_lock_path: data_dir.join("thinking.lock"),
            write_lock_path: data_dir.join(".snapshot.lock"),
            schema_path: app_dir.join("schema").join("task.json"),
            tasks_dir: data_dir.join("tasks"),
            root,
            app_dir,
            data_dir,
            web_dir,
        }
    }

    pub fn from_config(root: &Path, config: Option<&AgentpmConfig>) -> Self {
        let app_dir = config
            .and_then(|config| config.app_dir.as_deref())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_APP_DIR);
        Self::with_app_dir(root, app_dir)
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub paths: WorkspacePaths,
    pub max_depth: usize,
    pub jobs_command: String,
}

impl Workspace {
    pub fn open(root: &Path) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize()?;
        let config = load_config(&root);
        let paths = WorkspacePaths::from_config(&root, config.as_ref());
        let max_depth = config
            .as_ref()
            .and_then(|config| config.max_depth)
            .unwrap_or(crate::scan::DEFAULT_MAX_DEPTH);
        let jobs_command = config
            .and_then(|config| config.jobs_command)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_JOBS_COMMAND.to_string());
        Ok(Self {
            paths,
            max_depth,
            jobs_command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_paths_live_under_app_dir() {
        let paths = WorkspacePaths::new(Path::new("/ws"));
        assert_eq!(paths.app_dir, Path::new("/ws/projects/agent-pm-system"));
        assert_eq!(
            paths.state_path,
            Path::new("/ws/projects/agent-pm-system/data/global_state.json")
        );
        assert_eq!(
            paths.script_path,
            Path::new("/ws/projects/agent-pm-system/web/data.js")
        );
        assert_eq!(
            paths.busy_lock_path,
            Path::new("/ws/projects/agent-pm-system/data/thinking.lock")
        );
        assert_eq!(
            paths.schema_path,
            Path::new("/ws/projects/agent-pm-system/schema/task.json")
        );
    }

    #[test]
    fn load_config_reads_toml() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(".agentpm.toml"),
            "app_dir = \"tools/pm\"\nmax_depth = 5\njobs_command = \"echo {}\"\n",
        )
        .expect("config");
        let loaded = load_config(temp.path()).expect("load config");
        assert_eq!(loaded.app_dir.as_deref(), Some("tools/pm"));
        assert_eq!(loaded.max_depth, Some(5));
        assert_eq!(loaded.jobs_command.as_deref(), Some("echo {}"));
    }

    #[test]
    fn workspace_applies_config_overrides() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join(".agentpmrc"),
            "app_dir = \"pm\"\nmax_depth = 1\n",
        )
        .expect("config");
        let workspace = Workspace::open(temp.path()).expect("open");
        let root = temp.path().canonicalize().expect("canonical");
        assert_eq!(workspace.paths.app_dir, root.join("pm"));
        assert_eq!(workspace.max_depth, 1);
        assert_eq!(workspace.jobs_command, DEFAULT_JOBS_COMMAND);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join(".agentpm.toml"), "max_depth = \"deep\"\n").expect("config");
        let workspace = Workspace::open(temp.path()).expect("open");
        assert_eq!(workspace.max_depth, crate::scan::DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn open_rejects_missing_root() {
        let temp = TempDir::new().expect("tempdir");
        let err = Workspace::open(&temp.path().join("missing")).expect_err("missing root");
        assert!(matches!(err, ConfigError::NotADirectory(_)));
    }
}
