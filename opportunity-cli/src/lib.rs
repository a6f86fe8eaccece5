//! Command-line interface for offline opportunity scoring.
//!
//! Three subcommands wire the library crates to JSON files:
//! - `consolidate` joins source tables into a region dataset.
//! - `score` ranks a dataset for one budget, unit size, and weight vector.
//! - `boundaries` dissolves region geometry into county outlines.
//!
//! Each subcommand layers defaults, configuration files, `OPPORTUNITY_*`
//! environment variables, and flags through `ortho_config`.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod boundaries;
mod consolidate;
mod error;
mod fs;
mod output;
mod score;

pub use error::CliError;

use boundaries::BoundariesArgs;
use consolidate::ConsolidateArgs;
use score::ScoreArgs;

const ARG_SOURCE: &str = "source";
const ARG_OUTPUT: &str = "output";
const ARG_DATASET: &str = "dataset";
const ARG_CRITERIA: &str = "criteria";
const ARG_BUDGET: &str = "budget";
const ARG_UNIT_SIZE: &str = "unit-size";
const ARG_WEIGHT: &str = "weight";
const ARG_GROUP_BY: &str = "group-by";
const ENV_CONSOLIDATE_SOURCE: &str = "OPPORTUNITY_CMDS_CONSOLIDATE_SOURCES";
const ENV_SCORE_DATASET: &str = "OPPORTUNITY_CMDS_SCORE_DATASET";
const ENV_SCORE_BUDGET: &str = "OPPORTUNITY_CMDS_SCORE_BUDGET";
const ENV_SCORE_UNIT_SIZE: &str = "OPPORTUNITY_CMDS_SCORE_UNIT_SIZE";
const ENV_BOUNDARIES_DATASET: &str = "OPPORTUNITY_CMDS_BOUNDARIES_DATASET";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] when arguments, configuration, inputs, or the
/// requested operation fail.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli, &mut stdout)
}

fn run_with(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Command::Consolidate(args) => consolidate::run_consolidate(args, writer),
        Command::Score(args) => score::run_score(args, writer),
        Command::Boundaries(args) => boundaries::run_boundaries(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "opportunity",
    about = "Consolidate regional datasets and rank ZIP codes by opportunity",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Join source tables into one region dataset.
    Consolidate(ConsolidateArgs),
    /// Rank regions for a budget, unit size, and weights.
    Score(ScoreArgs),
    /// Dissolve region geometry into group outlines.
    Boundaries(BoundariesArgs),
}

#[cfg(test)]
mod tests;
