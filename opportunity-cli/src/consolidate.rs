//! Consolidate command implementation.

use std::io::{BufWriter, Write};

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use opportunity_core::{Region, RegionTable};
use opportunity_data::{SourceTable, consolidate};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::{create_utf8_file, require_file};
use crate::output::{read_json, write_json};
use crate::{ARG_OUTPUT, ARG_SOURCE, CliError, ENV_CONSOLIDATE_SOURCE};

/// CLI arguments for the `consolidate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Join source tables into one region dataset. Each source is \
                 a JSON-encoded SourceTable; the dataset is written as a JSON \
                 array of regions to --output or standard output.",
    about = "Consolidate source tables into a region dataset"
)]
#[ortho_config(prefix = "OPPORTUNITY")]
pub(crate) struct ConsolidateArgs {
    /// Path to a JSON-encoded source table. Repeat for each source.
    #[arg(long = ARG_SOURCE, value_name = "path")]
    #[serde(default)]
    pub(crate) sources: Vec<Utf8PathBuf>,
    /// Where to write the dataset; standard output when omitted.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl ConsolidateArgs {
    fn into_config(self) -> Result<ConsolidateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ConsolidateConfig::try_from(merged)
    }
}

/// Resolved `consolidate` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConsolidateConfig {
    /// Source table documents in application order.
    pub(crate) sources: Vec<Utf8PathBuf>,
    /// Output path, if any.
    pub(crate) output: Option<Utf8PathBuf>,
}

impl ConsolidateConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        self.sources
            .iter()
            .try_for_each(|path| require_file(path, ARG_SOURCE))
    }
}

impl TryFrom<ConsolidateArgs> for ConsolidateConfig {
    type Error = CliError;

    fn try_from(args: ConsolidateArgs) -> Result<Self, Self::Error> {
        if args.sources.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_SOURCE,
                env: ENV_CONSOLIDATE_SOURCE,
            });
        }
        Ok(Self {
            sources: args.sources,
            output: args.output,
        })
    }
}

pub(crate) fn run_consolidate(args: ConsolidateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    execute_consolidate(&config, writer)
}

pub(crate) fn execute_consolidate(
    config: &ConsolidateConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let table = load_and_consolidate(config)?;
    let regions: Vec<&Region> = table.iter().collect();
    match &config.output {
        Some(path) => {
            let file = create_utf8_file(path).map_err(|source| CliError::CreateOutput {
                path: path.clone(),
                source,
            })?;
            let mut file = BufWriter::new(file);
            write_json(&mut file, &regions)?;
            file.flush().map_err(CliError::WriteOutput)?;
            info!("wrote {} regions to {path}", regions.len());
            Ok(())
        }
        None => write_json(writer, &regions),
    }
}

fn load_and_consolidate(config: &ConsolidateConfig) -> Result<RegionTable, CliError> {
    let sources = config
        .sources
        .iter()
        .map(|path| read_json::<SourceTable>(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(consolidate(&sources)?)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ConsolidateConfig, CliError> {
    let merged = ConsolidateArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ConsolidateConfig::try_from(merged)
}
