//! Data ingestion and consolidation for the opportunity engine.
//!
//! Responsibilities:
//! - Describe per-category source tables and how their columns map onto
//!   [`Region`](opportunity_core::Region) fields.
//! - Canonicalise inconsistent region keys and outer-join every source into a
//!   single [`RegionTable`](opportunity_core::RegionTable).
//! - Combine per-county crime tables and pivot them into a county-keyed
//!   source.
//!
//! Boundaries:
//! - No file or network I/O; callers hand over decoded tables.
//! - No scoring rules (those live in `opportunity-scorer`).
//!
//! Invariants:
//! - Ambiguous input (duplicate keys, conflicting values) aborts the pass with
//!   a [`SchemaMismatch`] naming the source and column; nothing is averaged or
//!   overwritten.
//! - Missing cells stay absent; they are never read as zero.

#![forbid(unsafe_code)]

mod consolidate;
mod crime;
mod error;
mod labels;
mod source;

pub use consolidate::consolidate;
pub use crime::{
    COUNTY_COLUMN, CRIME_CATEGORY_COLUMN, CountyCrimeFile, CrimeTableError,
    combine_county_crime_tables, pivot_by_county,
};
pub use error::SchemaMismatch;
pub use labels::{CountyLabelError, CountyLabels, legacy_county_token};
pub use source::{
    CellValue, ColumnBinding, Extracted, FieldTarget, FieldValue, KeyKind, RawRecord, RawTable,
    RecordKey, SourceTable,
};
