//! CLI argument definitions using clap
//!
//! Commands:
//! - ixexplain check [--config <path>] [--classic]
//! - ixexplain explain [--config <path>] [--classic] [--verbosity <v>]
//! - ixexplain stages --input <path|-> --stage <kind> [--section plan|execution]
//! - ixexplain verify --input <path|-> [--stage ixseek] --index <name>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ixexplain - verify index identity in query explain output
#[derive(Parser, Debug)]
#[command(name = "ixexplain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(
        long,
        global = true,
        env = "IXEXPLAIN_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Explain document section to search
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// `queryPlanner.winningPlan`
    Plan,
    /// `executionStats.executionStages`
    Execution,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the index-name check against the in-process engine
    Check {
        /// Scenario file (built-in scenario when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run the engine in classic mode
        #[arg(long)]
        classic: bool,
    },

    /// Print the explain document of the scenario query
    Explain {
        /// Scenario file (built-in scenario when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run the engine in classic mode
        #[arg(long)]
        classic: bool,

        /// queryPlanner, executionStats or allPlansExecution
        #[arg(long, default_value = "executionStats")]
        verbosity: String,
    },

    /// Print the stages of a captured explain document
    Stages {
        /// Explain document file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,

        /// Stage kind to collect
        #[arg(long)]
        stage: String,

        #[arg(long, value_enum, default_value_t = Section::Execution)]
        section: Section,
    },

    /// Verify index names in a captured explain document
    Verify {
        /// Explain document file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,

        /// Stage kind to verify
        #[arg(long, default_value = "ixseek")]
        stage: String,

        /// Expected index name
        #[arg(long)]
        index: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
