//! Core domain types for the opportunity engine.
//!
//! The crate models ZIP-level regions, the metrics they carry, the criteria a
//! visitor can weight, and the records produced for presentation layers.
//! Constructors validate their input and return `Result` so malformed data is
//! rejected at load time rather than surfacing as a bad score later.
//!
//! The geometry aggregator lives here too: it only needs the region table and
//! never touches scoring state.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod criterion;
pub mod dissolve;
pub mod geometry;
pub mod metric;
pub mod region;
mod result;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use criterion::{CriterionError, CriterionSet, CriterionSpec, WeightError, WeightVector};
pub use dissolve::{DissolveOptions, GroupBoundary, GroupKey, dissolve_by_group};
pub use geometry::GeometryError;
pub use metric::{CrimeCategory, MetricKey, MetricSelector, Orientation, TransitMode, UnitSize};
pub use region::{CrimeStats, Region, RegionId, RegionIdError, RegionTable, RegionTableError};
pub use result::{DisplayAttributes, ScoreResult};
