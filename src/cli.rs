//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// planforge - interactive planning orchestrator
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Interactive planning orchestrator with complexity-scored agent allocation",
    version,
    after_help = "Logs are written to: ~/.local/share/planforge/logs/planforge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Resume the planning session for this project, or start a new one
    Run {
        /// Override the remaining context budget fraction (0.0 to 1.0)
        #[arg(long, value_name = "FRACTION")]
        context_budget: Option<f64>,
    },

    /// Show session phase and recorded history
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Re-enter an earlier phase and continue from there
    Revise {
        /// Phase to re-enter (context, orchestration-setup, doc-scaffold,
        /// research, plan-generation, implementation-planning, adaptation)
        phase: String,

        /// Override the remaining context budget fraction (0.0 to 1.0)
        #[arg(long, value_name = "FRACTION")]
        context_budget: Option<f64>,
    },

    /// Discard the session record and start over
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Output format for the status command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["pf"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["pf", "run"]);
        assert!(matches!(cli.command, Some(Command::Run { context_budget: None })));
    }

    #[test]
    fn test_cli_parse_run_with_budget() {
        let cli = Cli::parse_from(["pf", "run", "--context-budget", "0.2"]);
        match cli.command {
            Some(Command::Run { context_budget }) => assert_eq!(context_budget, Some(0.2)),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_parse_revise() {
        let cli = Cli::parse_from(["pf", "revise", "research"]);
        match cli.command {
            Some(Command::Revise { phase, .. }) => assert_eq!(phase, "research"),
            _ => panic!("expected revise command"),
        }
    }

    #[test]
    fn test_cli_parse_reset_yes() {
        let cli = Cli::parse_from(["pf", "reset", "--yes"]);
        assert!(matches!(cli.command, Some(Command::Reset { yes: true })));
    }

    #[test]
    fn test_output_format_parse() {
        assert!(matches!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
