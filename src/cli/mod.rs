//! CLI module for ixexplain
//!
//! Provides command-line interface for:
//! - check: seed the in-process engine and run the index-name check
//! - explain: print the scenario's explain document
//! - stages: list stages of a captured explain document
//! - verify: check index names in a captured explain document

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, LogFormat, Section};
pub use commands::{check, explain, run, run_command, stages, verify};
pub use config::{parse_verbosity, ScenarioConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_response};
