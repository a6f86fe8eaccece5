//! Boundaries command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use opportunity_core::{DissolveOptions, GroupKey, dissolve_by_group};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::require_file;
use crate::output::{load_dataset, write_json};
use crate::{ARG_DATASET, ARG_GROUP_BY, CliError, ENV_BOUNDARIES_DATASET};

/// CLI arguments for the `boundaries` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Dissolve the ZIP geometries of a consolidated dataset into \
                 one outline per county (or post-office name) and print the \
                 outlines as JSON with WKT geometry.",
    about = "Dissolve region geometry into group outlines"
)]
#[ortho_config(prefix = "OPPORTUNITY")]
pub(crate) struct BoundariesArgs {
    /// Path to a dataset written by `consolidate`.
    #[arg(long = ARG_DATASET, value_name = "path")]
    #[serde(default)]
    pub(crate) dataset: Option<Utf8PathBuf>,
    /// Attribute to group by: `county` (default) or `place_name`.
    #[arg(long = ARG_GROUP_BY, value_name = "attribute")]
    #[serde(default)]
    pub(crate) group_by: Option<String>,
    /// Label collecting regions without a group value; they are dropped
    /// when omitted.
    #[arg(long, value_name = "label")]
    #[serde(default)]
    pub(crate) unknown_group: Option<String>,
}

impl BoundariesArgs {
    fn into_config(self) -> Result<BoundariesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BoundariesConfig::try_from(merged)
    }
}

/// Resolved `boundaries` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundariesConfig {
    pub(crate) dataset: Utf8PathBuf,
    pub(crate) options: DissolveOptions,
}

impl TryFrom<BoundariesArgs> for BoundariesConfig {
    type Error = CliError;

    fn try_from(args: BoundariesArgs) -> Result<Self, Self::Error> {
        let dataset = args.dataset.ok_or(CliError::MissingArgument {
            field: ARG_DATASET,
            env: ENV_BOUNDARIES_DATASET,
        })?;
        let key = args
            .group_by
            .as_deref()
            .map_or(Ok(GroupKey::County), parse_group_key)?;
        let options = DissolveOptions {
            key,
            unknown_group: args.unknown_group,
        };
        Ok(Self { dataset, options })
    }
}

fn parse_group_key(raw: &str) -> Result<GroupKey, CliError> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "county" => Ok(GroupKey::County),
        "place_name" | "place" => Ok(GroupKey::PlaceName),
        _ => Err(CliError::InvalidArgument {
            field: ARG_GROUP_BY,
            value: raw.to_owned(),
            reason: "expected county or place_name".to_owned(),
        }),
    }
}

pub(crate) fn run_boundaries(args: BoundariesArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_file(&config.dataset, ARG_DATASET)?;
    execute_boundaries(&config, writer)
}

pub(crate) fn execute_boundaries(
    config: &BoundariesConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let regions = load_dataset(&config.dataset)?;
    let boundaries = dissolve_by_group(&regions, &config.options);
    write_json(writer, &boundaries)
}
