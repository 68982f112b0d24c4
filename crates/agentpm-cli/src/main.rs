use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agentpm_core::config::Workspace;
use agentpm_core::decompose::Decomposer;
use agentpm_core::jobs::{CommandJobSource, JobSource, NoJobs};
use agentpm_core::snapshot::run_scan;

const LOG_ENV: &str = "AGENTPM_LOG";

#[derive(Parser)]
#[command(name = "agentpm", version, about = "Workspace project scanner and snapshot writer")]
struct Cli {
    /// Workspace root (defaults to $AGENTPM_WORKSPACE, then the current directory)
    #[arg(long, global = true, env = "AGENTPM_WORKSPACE")]
    root: Option<PathBuf>,
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the workspace and write the global snapshot
    Scan {
        /// Maximum directory depth below the root
        #[arg(long)]
        max_depth: Option<usize>,
        /// Skip the external job listing
        #[arg(long)]
        no_jobs: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist structured tasks for an objective
    #[command(group(ArgGroup::new("input").required(true).args(["tasks", "tasks_file"])))]
    Decompose {
        objective: String,
        /// JSON array of task objects
        #[arg(long)]
        tasks: Option<String>,
        /// File containing a JSON array of task objects
        #[arg(long)]
        tasks_file: Option<PathBuf>,
        /// Print created ids as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Scan {
            max_depth,
            no_jobs,
            json,
        }) => {
            let workspace = open_workspace(cli.root)?;
            let max_depth = max_depth.unwrap_or(workspace.max_depth);
            let jobs: Box<dyn JobSource> = if no_jobs {
                Box::new(NoJobs)
            } else {
                Box::new(
                    CommandJobSource::from_command_line(&workspace.jobs_command)
                        .context("invalid jobs_command")?,
                )
            };
            let summary = run_scan(&workspace.paths, max_depth, jobs.as_ref())
                .context("write snapshot")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Scanned {} projects across {}. Global state saved to: {}",
                    summary.projects,
                    workspace.paths.root.display(),
                    summary.state_path
                );
            }
        }
        Some(Command::Decompose {
            objective,
            tasks,
            tasks_file,
            json,
        }) => {
            let workspace = open_workspace(cli.root)?;
            let raw = match (tasks, tasks_file) {
                (Some(raw), _) => raw,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?,
                (None, None) => return Err(anyhow!("--tasks or --tasks-file is required")),
            };
            let ids = Decomposer::new(&workspace.paths)
                .decompose(&objective, &raw)
                .context("decompose objective")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Some(Command::Version) => {
            println!("agentpm {}", agentpm_core::version());
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn open_workspace(root: Option<PathBuf>) -> Result<Workspace> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("resolve current directory; pass --root")?,
    };
    let workspace =
        Workspace::open(&root).with_context(|| format!("open workspace {}", root.display()))?;
    tracing::debug!(root = %workspace.paths.root.display(), "workspace opened");
    Ok(workspace)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
