use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid job command: {0}")]
    InvalidCommand(String),
    #[error("Job tool not installed: {0}")]
    NotInstalled(String),
    #[error("Failed to run job tool: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Job tool exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("Failed to parse job list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of the scheduled job list embedded in the snapshot.
pub trait JobSource {
    fn list_jobs(&self) -> Result<Vec<Value>, JobError>;
}

/// Runs an external command whose stdout is `{"jobs": [...]}`.
#[derive(Debug, Clone)]
pub struct CommandJobSource {
    program: String,
    args: Vec<String>,
}

impl CommandJobSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_command_line(command_line: &str) -> Result<Self, JobError> {
        let mut words = shell_words::split(command_line)
            .map_err(|err| JobError::InvalidCommand(err.to_string()))?;
        if words.is_empty() {
            return Err(JobError::InvalidCommand(command_line.to_string()));
        }
        let program = words.remove(0);
        Ok(Self::new(program, words))
    }

    fn resolve_program(&self) -> Result<PathBuf, JobError> {
        which::which(&self.program).map_err(|_| JobError::NotInstalled(self.program.clone()))
    }
}

impl JobSource for CommandJobSource {
    fn list_jobs(&self) -> Result<Vec<Value>, JobError> {
        let program = self.resolve_program()?;
        let output = Command::new(program).args(&self.args).output()?;
        if !output.status.success() {
            return Err(JobError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_job_list(&output.stdout)
    }
}

/// A source that never reports jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJobs;

impl JobSource for NoJobs {
    fn list_jobs(&self) -> Result<Vec<Value>, JobError> {
        Ok(Vec::new())
    }
}

pub fn parse_job_list(stdout: &[u8]) -> Result<Vec<Value>, JobError> {
    let payload: Value = serde_json::from_slice(stdout)?;
    match payload.get("jobs") {
        Some(Value::Array(jobs)) => Ok(jobs.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(_) => Err(JobError::Parse(serde::de::Error::custom(
            "\"jobs\" is not an array",
        ))),
    }
}
