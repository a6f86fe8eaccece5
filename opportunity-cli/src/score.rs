//! Score command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use opportunity_core::{CriterionSet, UnitSize, WeightVector};
use opportunity_scorer::{DatasetSnapshot, ScoreRequest, ScoringConfig, score};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::require_file;
use crate::output::{load_dataset, read_json, write_json};
use crate::{
    ARG_BUDGET, ARG_CRITERIA, ARG_DATASET, ARG_UNIT_SIZE, ARG_WEIGHT, CliError, ENV_SCORE_BUDGET,
    ENV_SCORE_DATASET, ENV_SCORE_UNIT_SIZE,
};

/// Number of results printed when `--limit` is not given.
pub(crate) const DEFAULT_LIMIT: usize = 10;

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Rank the regions of a consolidated dataset for one visitor. \
                 Regions renting above the budget times the slack are left \
                 out; the rest are scored from the weighted criteria and \
                 printed best first as JSON.",
    about = "Rank regions for a budget and weights"
)]
#[ortho_config(prefix = "OPPORTUNITY")]
pub(crate) struct ScoreArgs {
    /// Path to a dataset written by `consolidate`.
    #[arg(long = ARG_DATASET, value_name = "path")]
    #[serde(default)]
    pub(crate) dataset: Option<Utf8PathBuf>,
    /// Path to a JSON criterion set; the built-in criteria when omitted.
    #[arg(long = ARG_CRITERIA, value_name = "path")]
    #[serde(default)]
    pub(crate) criteria: Option<Utf8PathBuf>,
    /// Monthly rent budget.
    #[arg(long = ARG_BUDGET, value_name = "amount")]
    #[serde(default)]
    pub(crate) budget: Option<f64>,
    /// Unit size code (`studio`, `1bd` .. `4bd`).
    #[arg(long = ARG_UNIT_SIZE, value_name = "code")]
    #[serde(default)]
    pub(crate) unit_size: Option<String>,
    /// Slider weight as `name=value`. Repeat per criterion; the default
    /// slider positions for the loaded criteria apply when none are given.
    #[arg(long = ARG_WEIGHT, value_name = "name=value")]
    #[serde(default)]
    pub(crate) weights: Vec<String>,
    /// Budget tolerance factor, finite and positive.
    #[arg(long, value_name = "factor")]
    #[serde(default)]
    pub(crate) slack: Option<f64>,
    /// Maximum number of results to print.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

impl ScoreArgs {
    fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreConfig {
    pub(crate) dataset: Utf8PathBuf,
    pub(crate) criteria: Option<Utf8PathBuf>,
    pub(crate) budget: f64,
    pub(crate) unit_size: UnitSize,
    /// Explicit weights; `None` means the default sliders for the loaded
    /// criterion set.
    pub(crate) weights: Option<WeightVector>,
    pub(crate) scoring: ScoringConfig,
    pub(crate) limit: usize,
}

impl ScoreConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_file(&self.dataset, ARG_DATASET)?;
        if let Some(criteria) = &self.criteria {
            require_file(criteria, ARG_CRITERIA)?;
        }
        Ok(())
    }
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let dataset = args.dataset.ok_or(CliError::MissingArgument {
            field: ARG_DATASET,
            env: ENV_SCORE_DATASET,
        })?;
        let budget = args.budget.ok_or(CliError::MissingArgument {
            field: ARG_BUDGET,
            env: ENV_SCORE_BUDGET,
        })?;
        let raw_unit = args.unit_size.ok_or(CliError::MissingArgument {
            field: ARG_UNIT_SIZE,
            env: ENV_SCORE_UNIT_SIZE,
        })?;
        let unit_size = raw_unit
            .parse::<UnitSize>()
            .map_err(|reason| CliError::InvalidArgument {
                field: ARG_UNIT_SIZE,
                value: raw_unit.clone(),
                reason,
            })?;
        let weights = if args.weights.is_empty() {
            None
        } else {
            Some(parse_weights(&args.weights)?)
        };
        let scoring = args
            .slack
            .map_or_else(ScoringConfig::default, ScoringConfig::with_budget_slack);
        Ok(Self {
            dataset,
            criteria: args.criteria,
            budget,
            unit_size,
            weights,
            scoring,
            limit: args.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Parse `name=value` slider assignments.
pub(crate) fn parse_weights(raw: &[String]) -> Result<WeightVector, CliError> {
    raw.iter().try_fold(WeightVector::new(), |weights, entry| {
        let invalid = |reason: &str| CliError::InvalidArgument {
            field: ARG_WEIGHT,
            value: entry.clone(),
            reason: reason.to_owned(),
        };
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected name=value"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("criterion name is empty"));
        }
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("weight is not a number"))?;
        Ok(weights.with_weight(name, value))
    })
}

pub(crate) fn run_score(args: ScoreArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    execute_score(&config, writer)
}

pub(crate) fn execute_score(config: &ScoreConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let regions = load_dataset(&config.dataset)?;
    let criteria = match &config.criteria {
        Some(path) => read_json::<CriterionSet>(path)?,
        None => CriterionSet::default(),
    };
    let weights = config
        .weights
        .clone()
        .unwrap_or_else(|| WeightVector::default_sliders_for(&criteria));
    let snapshot = DatasetSnapshot::build(regions, criteria);
    let request = ScoreRequest::new(config.budget, config.unit_size, weights);
    let results = score(&snapshot, &request, &config.scoring)?;
    let shown = results.top(config.limit);
    info!(
        "showing {} of {} ranked regions",
        shown.len(),
        results.len()
    );
    write_json(writer, shown)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}
