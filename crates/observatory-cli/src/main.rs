use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_core::MoralLabelMatch;
use observatory_api::{serve, ObservatoryConfig, RunCatalog};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse, import and serve simulation run checkpoints", long_about = None)]
struct Cli {
    /// SQLite database path (overrides OBSERVATORY_SQLITE_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// How agent types are matched against "moral": exact or case_insensitive
    #[arg(long, global = true)]
    moral_label_match: Option<MoralLabelMatch>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API until Ctrl-C
    Serve {
        /// Bind address (overrides OBSERVATORY_ADDR)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// List visible runs, or hidden revisions with --hidden
    Runs {
        #[arg(long)]
        hidden: bool,
    },
    /// Checkpoint count and time span of a run
    Checkpoints { run_id: String },
    /// Print the earliest checkpoint of a run
    First { run_id: String },
    /// Store checkpoint JSON files as a new revision of a run
    Import {
        run_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Metrics for one checkpoint, or the population history of the run
    Metrics { run_id: String, time_step: Option<i64> },
    /// Hide every revision of a run
    Hide { run_id: String },
    /// Make every revision of a run visible again
    Restore { run_id: String },
    /// Permanently delete a run and its checkpoints
    Purge { run_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ObservatoryConfig::from_env().context("invalid observatory environment")?;
    if let Some(db) = cli.db {
        config.sqlite_path = db;
    }
    if let Some(policy) = cli.moral_label_match {
        config.metrics.moral_label_match = policy;
    }

    let mut catalog = RunCatalog::open(&config)
        .with_context(|| format!("failed to open run store {}", config.sqlite_path.display()))?;

    if let Command::Serve { addr } = cli.command {
        let addr = addr.unwrap_or(config.bind_addr);
        serve(catalog, addr).await?;
        return Ok(());
    }

    let outcome = run_command(&mut catalog, cli.command);
    catalog.close().context("failed to close run store")?;
    outcome
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(catalog: &mut RunCatalog, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve { .. } => Ok(()),
        Command::Runs { hidden } => {
            let runs = if hidden {
                catalog.list_hidden_runs()?
            } else {
                catalog.list_runs()?
            };
            print_json(&runs)
        }
        Command::Checkpoints { run_id } => print_json(&catalog.run_summary(&run_id)?),
        Command::First { run_id } => match catalog.first_checkpoint(&run_id)? {
            Some(record) => print_json(&record),
            None => {
                tracing::warn!(run_id = %run_id, "run has no checkpoints");
                Ok(())
            }
        },
        Command::Import {
            run_id,
            files,
            description,
        } => import(catalog, &run_id, &files, description.as_deref()),
        Command::Metrics {
            run_id,
            time_step: Some(time_step),
        } => print_json(&catalog.checkpoint_metrics(&run_id, time_step)?),
        Command::Metrics {
            run_id,
            time_step: None,
        } => print_json(&catalog.agent_history(&run_id)?),
        Command::Hide { run_id } => {
            let hidden = catalog.hide_run(&run_id)?;
            println!("hid {hidden} revision(s) of {run_id}");
            Ok(())
        }
        Command::Restore { run_id } => print_json(&catalog.restore_run(&run_id)?),
        Command::Purge { run_id } => {
            let purged = catalog.purge_run(&run_id)?;
            println!("purged {purged} revision(s) of {run_id}");
            Ok(())
        }
    }
}

fn import(
    catalog: &mut RunCatalog,
    run_id: &str,
    files: &[PathBuf],
    description: Option<&str>,
) -> anyhow::Result<()> {
    let run_id = run_id.trim();
    let mut checkpoints = Vec::with_capacity(files.len());
    let mut steps = BTreeSet::new();

    for (index, path) in files.iter().enumerate() {
        let payload = read_checkpoint(path)?;
        // Files without a recorded step are numbered by position.
        let time_step = payload
            .pointer("/metadata/current_time_step")
            .and_then(Value::as_i64)
            .unwrap_or(index as i64);
        if !steps.insert(time_step) {
            anyhow::bail!("{} repeats time step {time_step}", path.display());
        }
        checkpoints.push((time_step, payload));
    }

    let detail = catalog
        .import_run(run_id, description, &checkpoints)
        .with_context(|| format!("failed to import {run_id}"))?;
    tracing::info!(run_id, revision = detail.run.id, files = files.len(), "import complete");
    print_json(&detail)
}

fn read_checkpoint(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
