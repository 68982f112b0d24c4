//! Persists structured tasks produced from a free-text objective.
//!
//! Unlike the scan, this flow is not best-effort: a missing schema or task
//! directory is an error.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use ulid::Ulid;

use crate::config::WorkspacePaths;
use crate::now_rfc3339;

pub const DEFAULT_TASK_STATUS: &str = "todo";
const SHORT_ID_LEN: usize = 8;
const SYSTEM_FIELDS: [&str; 4] = ["id", "status", "created_at", "updated_at"];

#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("Decomposition IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task list must be a JSON array of objects")]
    NotATaskList,
    #[error("Task id contains invalid characters: {0}")]
    InvalidId(String),
    #[error("Task {index} is missing required field '{field}'")]
    MissingField { index: usize, field: String },
}

#[derive(Debug)]
pub struct Decomposer<'a> {
    paths: &'a WorkspacePaths,
}

impl<'a> Decomposer<'a> {
    pub fn new(paths: &'a WorkspacePaths) -> Self {
        Self { paths }
    }

    pub fn schema_path(&self) -> &Path {
        &self.paths.schema_path
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.paths.tasks_dir
    }

    pub fn load_schema(&self) -> Result<Value, DecomposeError> {
        let path = self.schema_path();
        let text = fs::read_to_string(path).map_err(|source| DecomposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Assigns system fields to `task` and writes it to `<tasks_dir>/<id>.json`.
    pub fn save_task(&self, mut task: Map<String, Value>) -> Result<String, DecomposeError> {
        let id = match task.get("id").and_then(Value::as_str) {
            Some(id) => {
                validate_task_id(id)?;
                id.to_string()
            }
            None => new_short_id(),
        };
        let now = now_rfc3339();
        task.insert("id".to_string(), Value::String(id.clone()));
        task.entry("status".to_string())
            .or_insert_with(|| Value::String(DEFAULT_TASK_STATUS.to_string()));
        task.insert("created_at".to_string(), Value::String(now.clone()));
        task.insert("updated_at".to_string(), Value::String(now));

        let path = self.tasks_dir().join(format!("{id}.json"));
        let body = serde_json::to_string_pretty(&Value::Object(task))?;
        fs::write(&path, body).map_err(|source| DecomposeError::Io { path, source })?;
        Ok(id)
    }

    /// Validates `raw_tasks` against the schema's `required` list and saves
    /// each task, returning ids in input order.
    pub fn decompose(&self, objective: &str, raw_tasks: &str) -> Result<Vec<String>, DecomposeError> {
        let schema = self.load_schema()?;
        let tasks = parse_task_list(raw_tasks)?;
        let required = required_fields(&schema);
        for (index, task) in tasks.iter().enumerate() {
            for field in &required {
                if !task.contains_key(field) {
                    return Err(DecomposeError::MissingField {
                        index,
                        field: field.clone(),
                    });
                }
            }
            if let Some(id) = task.get("id").and_then(Value::as_str) {
                validate_task_id(id)?;
            }
        }

        tracing::info!(objective, tasks = tasks.len(), "decomposing objective");
        tasks.into_iter().map(|task| self.save_task(task)).collect()
    }
}

pub fn parse_task_list(raw_tasks: &str) -> Result<Vec<Map<String, Value>>, DecomposeError> {
    let value: Value = serde_json::from_str(raw_tasks)?;
    let Value::Array(items) = value else {
        return Err(DecomposeError::NotATaskList);
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(DecomposeError::NotATaskList),
        })
        .collect()
}

/// Schema `required` entries the caller must supply.
pub fn required_fields(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .filter(|field| !SYSTEM_FIELDS.contains(field))
                .map(|field| field.to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn validate_task_id(id: &str) -> Result<(), DecomposeError> {
    let re = Regex::new(r"^[A-Za-z0-9_-]+$").expect("regex");
    if re.is_match(id) {
        Ok(())
    } else {
        Err(DecomposeError::InvalidId(id.to_string()))
    }
}

/// Eight lowercase characters from the random half of a ULID.
pub fn new_short_id() -> String {
    let ulid = Ulid::new().to_string().to_lowercase();
    ulid[ulid.len() - SHORT_ID_LEN..].to_string()
}
