//! planforge - interactive planning orchestrator
//!
//! CLI entry point for running, inspecting, and revising planning
//! sessions.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use planforge::cli::{Cli, Command, OutputFormat};
use planforge::config::Config;
use planforge::domain::PhaseId;
use planforge::driver::{CollaboratorError, DriverError, LoggingExecutor, Orchestrator, StdinDialogue};
use planforge::machine::{PhaseMachine, PhaseState};
use planforge::state::{SessionStore, StoreError};

type Driver = Orchestrator<StdinDialogue, LoggingExecutor>;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("planforge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Run { context_budget }) => cmd_run(&config, context_budget).await,
        Some(Command::Status { format }) => cmd_status(&config, format),
        Some(Command::Revise { phase, context_budget }) => cmd_revise(&config, &phase, context_budget).await,
        Some(Command::Reset { yes }) => cmd_reset(&config, yes),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Open the session store for the current project root
fn project_store(config: &Config) -> Result<SessionStore> {
    let cwd = std::env::current_dir().context("Failed to determine project root")?;
    let dir = config.storage.project_dir(&cwd);
    Ok(SessionStore::open(dir)?)
}

/// Ask a yes/no question on stdout/stdin
fn confirm(question: &str) -> Result<bool> {
    print!("{} (yes/no) ", question);
    io::stdout().flush()?;
    let answer = io::stdin().lock().lines().next().transpose()?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Build the orchestrator, surfacing corruption and offering a fresh
/// start instead of silently discarding history
fn build_orchestrator(config: &Config, context_budget: Option<f64>) -> Result<Option<Driver>> {
    let mut orch_config = config.orchestration.clone();
    if let Some(budget) = context_budget {
        orch_config.context_budget = budget.clamp(0.0, 1.0);
    }

    let store = project_store(config)?;
    match Orchestrator::resume_or_start(store, StdinDialogue, LoggingExecutor::default(), orch_config.clone()) {
        Ok(orchestrator) => Ok(Some(orchestrator)),
        Err(StoreError::Corrupt(reason)) => {
            eprintln!("{} {}", "Session record is corrupt:".red().bold(), reason);
            if confirm("Discard it and start a fresh session?")? {
                let store = project_store(config)?;
                store.delete()?;
                let store = project_store(config)?;
                let orchestrator =
                    Orchestrator::resume_or_start(store, StdinDialogue, LoggingExecutor::default(), orch_config)?;
                Ok(Some(orchestrator))
            } else {
                println!("Keeping the record untouched.");
                Ok(None)
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Drive the orchestrator to completion, treating user cancellation as a
/// pause rather than a failure
async fn drive(orchestrator: &mut Driver) -> Result<()> {
    match orchestrator.run().await {
        Ok(()) => {
            let dispatched = orchestrator.executor().dispatched.len();
            println!("\n{}", "Planning run complete.".green().bold());
            println!("{} dispatch instruction(s) emitted.", dispatched);
            Ok(())
        }
        Err(DriverError::Collaborator(CollaboratorError::Cancelled)) => {
            println!("\nSession paused. Resume anytime with {}.", "pf run".bold());
            Ok(())
        }
        Err(e) => Err(e).context("Planning run failed"),
    }
}

async fn cmd_run(config: &Config, context_budget: Option<f64>) -> Result<()> {
    let Some(mut orchestrator) = build_orchestrator(config, context_budget)? else {
        return Ok(());
    };

    if orchestrator.current() == PhaseState::Complete {
        println!("Planning for this project is already complete.");
        if confirm("Run another adaptation pass?")? {
            orchestrator.reopen()?;
        } else {
            return Ok(());
        }
    }

    drive(&mut orchestrator).await
}

async fn cmd_revise(config: &Config, phase: &str, context_budget: Option<f64>) -> Result<()> {
    let target: PhaseId = phase.parse().map_err(|e: String| eyre::eyre!(e))?;

    let Some(mut orchestrator) = build_orchestrator(config, context_budget)? else {
        return Ok(());
    };

    orchestrator
        .revise(target)
        .context(format!("Cannot revise to {}", target))?;

    drive(&mut orchestrator).await
}

fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let store = project_store(config)?;
    let context = match store.load() {
        Ok(context) => context,
        Err(StoreError::NotFound) => {
            println!("No planning session for this project. Start one with {}.", "pf run".bold());
            return Ok(());
        }
        Err(StoreError::Corrupt(reason)) => {
            eprintln!("{} {}", "Session record is corrupt:".red().bold(), reason);
            eprintln!("Start over with {}.", "pf reset".bold());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let machine = PhaseMachine::resume(&context.session_history);

    match format {
        OutputFormat::Json => {
            let status = serde_json::json!({
                "projectType": context.project_type,
                "primaryGoal": context.primary_goal,
                "position": machine.current().to_string(),
                "events": context.session_history,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Text => {
            println!("{}: {}", "Project".bold(), context.project_type);
            println!("{}: {}", "Goal".bold(), context.primary_goal);
            println!("{}: {}", "Position".bold(), machine.current().to_string().cyan());
            println!("\n{}", "Recorded phase steps:".bold());
            for event in &context.session_history {
                println!(
                    "  {} {} ({} decision(s))",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.phase.to_string().cyan(),
                    event.decisions.len()
                );
            }
        }
    }
    Ok(())
}

fn cmd_reset(config: &Config, yes: bool) -> Result<()> {
    let store = project_store(config)?;
    if !store.exists() {
        println!("No planning session for this project.");
        return Ok(());
    }

    if !yes && !confirm("Discard the session record for this project?")? {
        println!("Keeping the record untouched.");
        return Ok(());
    }

    store.delete()?;
    println!("Session record discarded. Start over with {}.", "pf run".bold());
    Ok(())
}
