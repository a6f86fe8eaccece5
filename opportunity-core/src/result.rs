//! Per-request scoring output handed to presentation layers.

use crate::{RegionId, metric::UnitSize};

/// Attributes shown next to a score in tables and lists.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayAttributes {
    /// Post-office name.
    pub place_name: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// Unit size the rent figure refers to.
    pub unit_size: Option<UnitSize>,
    /// Median rent for the requested unit size.
    pub rent: Option<f64>,
    /// Current violent crime rate.
    pub violent_crime_rate: Option<f64>,
    /// Stops summed over every transit mode.
    pub transit_stops: Option<u32>,
}

/// One ranked region.
///
/// Scores are on a `0.0..=100.0` scale rounded to one decimal place; ranks
/// start at 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreResult {
    /// Scored region.
    pub region_id: RegionId,
    /// Composite opportunity score.
    pub composite_score: f64,
    /// Position in the ranking, starting at 1.
    pub rank: usize,
    /// Attributes for display.
    pub display: DisplayAttributes,
}
