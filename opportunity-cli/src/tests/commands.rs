//! End-to-end command tests over files in a scratch directory.

use super::helpers::{DATASET, INCOME_SOURCE, RENT_SOURCE, Workspace};
use super::*;
use clap::Parser;
use opportunity_core::{GroupBoundary, Region, ScoreResult};
use rstest::rstest;

fn run_args(args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("opportunity").chain(args.iter().copied()))?;
    let mut output = Vec::new();
    run_with(cli, &mut output)?;
    Ok(String::from_utf8(output).expect("utf-8 output"))
}

#[rstest]
fn consolidate_writes_the_joined_dataset() {
    let workspace = Workspace::new();
    let rent = workspace.write("rent.json", RENT_SOURCE);
    let income = workspace.write("income.json", INCOME_SOURCE);
    let output = workspace.path("out/dataset.json");

    let printed = run_args(&[
        "consolidate",
        "--source",
        rent.as_str(),
        "--source",
        income.as_str(),
        "--output",
        output.as_str(),
    ])
    .expect("consolidate should succeed");
    assert!(printed.is_empty());

    let written = std::fs::read_to_string(output.as_std_path()).expect("read dataset");
    let regions: Vec<Region> = serde_json::from_str(&written).expect("dataset JSON");
    let ids: Vec<&str> = regions.iter().map(|region| region.id.as_str()).collect();
    assert_eq!(ids, ["94110", "94112", "94601"]);
    assert_eq!(regions[0].income, Some(95_000.0));
    assert!(regions[2].rent.is_empty());
}

#[rstest]
fn consolidate_prints_to_stdout_without_output() {
    let workspace = Workspace::new();
    let rent = workspace.write("rent.json", RENT_SOURCE);

    let printed = run_args(&["consolidate", "--source", rent.as_str()])
        .expect("consolidate should succeed");
    let regions: Vec<Region> = serde_json::from_str(&printed).expect("dataset JSON");
    assert_eq!(regions.len(), 2);
}

#[rstest]
fn consolidate_surfaces_schema_mismatches() {
    let workspace = Workspace::new();
    let broken = RENT_SOURCE.replace("\"RENT_1BD\"]", "\"RENT\"]");
    let rent = workspace.write("rent.json", &broken);

    let err = run_args(&["consolidate", "--source", rent.as_str()])
        .expect_err("missing column should fail");
    assert!(matches!(err, CliError::Consolidate(_)), "found {err:?}");
}

#[rstest]
fn consolidate_reports_unparsable_sources() {
    let workspace = Workspace::new();
    let rent = workspace.write("rent.json", "{ not json");

    let err = run_args(&["consolidate", "--source", rent.as_str()])
        .expect_err("invalid JSON should fail");
    match err {
        CliError::ParseInput { path, .. } => assert_eq!(path, rent),
        other => panic!("expected ParseInput, found {other:?}"),
    }
}

#[rstest]
fn score_prints_ranked_results_within_the_slack() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);

    let printed = run_args(&[
        "score",
        "--dataset",
        dataset.as_str(),
        "--budget",
        "3500",
        "--unit-size",
        "1bd",
        "--weight",
        "rent=10",
    ])
    .expect("score should succeed");
    let results: Vec<ScoreResult> = serde_json::from_str(&printed).expect("results JSON");
    let ids: Vec<&str> = results.iter().map(|result| result.region_id.as_str()).collect();
    assert_eq!(ids, ["94110", "94112"]);
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].composite_score, 100.0);
    assert_eq!(results[0].display.county.as_deref(), Some("San Francisco"));
}

#[rstest]
fn score_honours_the_limit() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);

    let printed = run_args(&[
        "score",
        "--dataset",
        dataset.as_str(),
        "--budget",
        "9000",
        "--unit-size",
        "1bd",
        "--limit",
        "1",
    ])
    .expect("score should succeed");
    let results: Vec<ScoreResult> = serde_json::from_str(&printed).expect("results JSON");
    assert_eq!(results.len(), 1);
}

#[rstest]
fn score_rejects_weights_for_unknown_criteria() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);

    let err = run_args(&[
        "score",
        "--dataset",
        dataset.as_str(),
        "--budget",
        "3500",
        "--unit-size",
        "1bd",
        "--weight",
        "parking=3",
    ])
    .expect_err("unknown criterion should fail");
    assert!(matches!(err, CliError::Score(_)), "found {err:?}");
}

#[rstest]
fn score_loads_custom_criteria() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);
    let criteria = workspace.write(
        "criteria.json",
        r#"{"version": 2, "criteria": [
            {"name": "people", "metric": {"kind": "population"},
             "max_weight": 1.0, "orientation": "higher_better"}
        ]}"#,
    );

    let printed = run_args(&[
        "score",
        "--dataset",
        dataset.as_str(),
        "--criteria",
        criteria.as_str(),
        "--budget",
        "9000",
        "--unit-size",
        "1bd",
        "--weight",
        "people=1",
    ])
    .expect("score should succeed");
    let results: Vec<ScoreResult> = serde_json::from_str(&printed).expect("results JSON");
    let ids: Vec<&str> = results.iter().map(|result| result.region_id.as_str()).collect();
    assert_eq!(ids, ["94112", "94110", "94601"]);
}

#[rstest]
fn score_custom_criteria_without_weights_uses_matching_sliders() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);
    let criteria = workspace.write(
        "criteria.json",
        r#"{"version": 2, "criteria": [
            {"name": "rent", "metric": {"kind": "selected_rent"},
             "max_weight": 10.0, "orientation": "lower_better"},
            {"name": "income", "metric": {"kind": "income"},
             "max_weight": 10.0, "orientation": "higher_better"}
        ]}"#,
    );

    let printed = run_args(&[
        "score",
        "--dataset",
        dataset.as_str(),
        "--criteria",
        criteria.as_str(),
        "--budget",
        "3500",
        "--unit-size",
        "1bd",
    ])
    .expect("score should succeed without explicit weights");
    let results: Vec<ScoreResult> = serde_json::from_str(&printed).expect("results JSON");
    let ids: Vec<&str> = results.iter().map(|result| result.region_id.as_str()).collect();
    assert_eq!(ids, ["94110", "94112"]);
    assert!(results[0].composite_score > results[1].composite_score);
}

#[rstest]
fn boundaries_dissolve_counties_with_geometry() {
    let workspace = Workspace::new();
    let dataset = workspace.write("dataset.json", DATASET);

    let printed = run_args(&["boundaries", "--dataset", dataset.as_str()])
        .expect("boundaries should succeed");
    let boundaries: Vec<GroupBoundary> = serde_json::from_str(&printed).expect("boundaries JSON");
    assert_eq!(boundaries.len(), 1);
    assert_eq!(boundaries[0].group, "San Francisco");
    assert_eq!(boundaries[0].member_ids.len(), 2);
    assert_eq!(boundaries[0].population, Some(150_000));
}

#[rstest]
fn boundaries_require_a_dataset() {
    let workspace = Workspace::new();
    let missing = workspace.path("absent.json");

    let err = run_args(&["boundaries", "--dataset", missing.as_str()])
        .expect_err("missing dataset should fail");
    match err {
        CliError::MissingSourceFile { field, .. } => assert_eq!(field, ARG_DATASET),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}
