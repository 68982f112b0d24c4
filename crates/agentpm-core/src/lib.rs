//! Workspace scanning and snapshot engine for agentpm.

pub mod checklist;
pub mod config;
pub mod decompose;
pub mod dialogue;
pub mod files;
pub mod jobs;
pub mod project;
pub mod scan;
pub mod snapshot;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}
