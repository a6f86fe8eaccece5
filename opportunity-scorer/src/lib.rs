//! Normalisation and composite scoring for consolidated regions.
//!
//! The crate covers the request path of the engine:
//! - **Normalisation** rescales each raw metric column onto `0.0..=1.0`,
//!   oriented so that higher is always better. Columns are computed once per
//!   dataset load over every region, not per request.
//! - **Snapshots** bundle the region table, the criteria, and the normalised
//!   columns into an immutable value. A [`SnapshotStore`] hands out shared
//!   references and swaps in a fresh snapshot on reload without disturbing
//!   readers.
//! - **Scoring** filters regions by budget, blends normalised metrics with
//!   the visitor's slider weights, and returns results ranked best first.
//!
//! # Examples
//!
//! ```
//! use opportunity_core::{CriterionSet, Region, RegionId, RegionTable, UnitSize, WeightVector};
//! use opportunity_scorer::{DatasetSnapshot, ScoreRequest, ScoringConfig, SnapshotStore, score};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let regions = RegionTable::from_regions([
//!     Region::new(RegionId::parse("94110")?).with_rent(UnitSize::Studio, 2100.0),
//!     Region::new(RegionId::parse("94112")?).with_rent(UnitSize::Studio, 1800.0),
//! ])?;
//! let store = SnapshotStore::new(DatasetSnapshot::build(regions, CriterionSet::default()));
//! let request = ScoreRequest::new(2000.0, UnitSize::Studio, WeightVector::default_sliders());
//! let ranked = score(&store.current(), &request, &ScoringConfig::default())?;
//! assert_eq!(ranked.len(), 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod composite;
mod normalise;
mod snapshot;

pub use composite::{
    DEFAULT_BUDGET_SLACK, ScoreRequest, ScoreRequestError, ScoreResults, ScoringConfig,
    compare_scores, score,
};
pub use normalise::{NEUTRAL_SCORE, NormalizedMetric, NormalizedTable, normalise};
pub use snapshot::{DatasetSnapshot, SnapshotError, SnapshotStore};
