//! CLI command implementations
//!
//! `check` and `explain` seed an in-process engine from a scenario and run
//! against it. `stages` and `verify` read a captured explain document and
//! never touch an engine.

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use crate::check::CheckReport;
use crate::engine::Engine;
use crate::explain::ExplainDocument;
use crate::stages::get_plan_stages;
use crate::verifier::IndexNameVerifier;

use super::args::{Cli, Command, Section};
use super::config::{parse_verbosity, ScenarioConfig};
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_response};

/// Main CLI entry point
pub fn run(cli: Cli) -> CliResult<()> {
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config, classic } => check(config.as_deref(), classic),
        Command::Explain {
            config,
            classic,
            verbosity,
        } => explain(config.as_deref(), classic, &verbosity),
        Command::Stages {
            input,
            stage,
            section,
        } => stages(&input, &stage, section),
        Command::Verify {
            input,
            stage,
            index,
        } => verify(&input, &stage, &index),
    }
}

/// Seeds an engine for the scenario in `config`
fn seeded_engine(config: &ScenarioConfig, classic: bool) -> CliResult<Engine> {
    let mut engine = Engine::new(config.engine_config(classic));
    config.scenario.seed(&mut engine)?;
    Ok(engine)
}

/// Runs the index-name check and prints its report.
///
/// A skipped check succeeds. A failed check prints the report and then
/// returns an error.
pub fn check(config_path: Option<&Path>, classic: bool) -> CliResult<()> {
    let config = ScenarioConfig::load_or_default(config_path)?;
    let mut engine = seeded_engine(&config, classic)?;

    let check = config.scenario.check()?;
    let result = check.run(&mut engine);
    let report = CheckReport::from_result(&check, &result);
    write_response(&report)?;

    result?;
    Ok(())
}

/// Prints the explain document of the scenario query
pub fn explain(config_path: Option<&Path>, classic: bool, verbosity: &str) -> CliResult<()> {
    let verbosity = parse_verbosity(verbosity)?;
    let config = ScenarioConfig::load_or_default(config_path)?;
    let engine = seeded_engine(&config, classic)?;

    let request = config.scenario.request()?.with_verbosity(verbosity);
    let document = engine.explain(&request)?;
    write_response(document.as_value())
}

/// Prints the matching stages of a captured document as a JSON array
pub fn stages(input: &Path, stage: &str, section: Section) -> CliResult<()> {
    let document = ExplainDocument::from_value(read_input(input)?)?;
    let root = section_root(&document, section)?;

    let matched = get_plan_stages(root, stage);
    info!(event = "STAGES_COLLECTED", stage, count = matched.len());
    write_response(&matched)
}

/// Verifies index names in a captured document
pub fn verify(input: &Path, stage: &str, index: &str) -> CliResult<()> {
    let document = ExplainDocument::from_value(read_input(input)?)?;
    let root = document.execution_stages()?;
    let matched = get_plan_stages(root, stage);

    match IndexNameVerifier::new(index, stage).verify(&matched) {
        Ok(count) => write_response(&json!({
            "status": "passed",
            "stage": stage,
            "index": index,
            "stages_verified": count,
        })),
        Err(e) => {
            write_response(&json!({
                "status": "failed",
                "stage": stage,
                "index": index,
                "code": e.code(),
                "message": e.to_string(),
                "offending_node": e.offending_node().cloned().unwrap_or(Value::Null),
            }))?;
            Err(CliError::check_failed(format!("{}: {}", e.code(), e)))
        }
    }
}

fn section_root(document: &ExplainDocument, section: Section) -> CliResult<&Value> {
    match section {
        Section::Plan => Ok(document.winning_plan()),
        Section::Execution => Ok(document.execution_stages()?),
    }
}
