use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueLog {
    pub entries: Vec<Value>,
    /// Lines that were not valid JSON.
    pub skipped: usize,
}

/// Reads the line-delimited dialogue log. A missing file is an empty log.
pub fn load_dialogue(path: &Path) -> Result<DialogueLog, std::io::Error> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(DialogueLog::default()),
        Err(err) => return Err(err),
    };
    let reader = BufReader::new(file);
    let mut log = DialogueLog::default();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(entry) => log.entries.push(entry),
            Err(err) => {
                tracing::debug!(line = idx + 1, error = %err, "skipping malformed dialogue line");
                log.skipped += 1;
            }
        }
    }
    Ok(log)
}
