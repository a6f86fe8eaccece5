//! Facade crate for the opportunity engine.
//!
//! This crate re-exports the domain types, the ingestion pipeline, and the
//! scorer so callers can depend on a single crate. Less common items
//! live in the member crates.

#![forbid(unsafe_code)]

pub use opportunity_core::{
    CrimeCategory, CriterionError, CriterionSet, CriterionSpec, DisplayAttributes,
    DissolveOptions, GeometryError, GroupBoundary, GroupKey, MetricKey, MetricSelector,
    Orientation, Region, RegionId, RegionIdError, RegionTable, RegionTableError, ScoreResult,
    TransitMode, UnitSize, WeightError, WeightVector, dissolve_by_group,
};
pub use opportunity_data::{
    CountyCrimeFile, CountyLabels, CrimeTableError, SchemaMismatch, SourceTable,
    combine_county_crime_tables, consolidate, pivot_by_county,
};
pub use opportunity_scorer::{
    DatasetSnapshot, NormalizedTable, ScoreRequest, ScoreRequestError, ScoreResults,
    ScoringConfig, SnapshotError, SnapshotStore, score,
};

