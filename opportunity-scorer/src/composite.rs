//! Budget filter, weighted composite, and ranking.

use std::cmp::Ordering;

use log::{debug, info};
use opportunity_core::{
    CrimeCategory, CriterionSet, DisplayAttributes, MetricKey, Region, ScoreResult, UnitSize,
    WeightError, WeightVector,
};
use thiserror::Error;

use crate::DatasetSnapshot;

/// Default tolerance applied to the budget filter.
///
/// Medians understate the spread of asking rents, so regions slightly above
/// budget are admitted.
pub const DEFAULT_BUDGET_SLACK: f64 = 1.2;

/// Tunable scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScoringConfig {
    /// Multiplier applied to the budget before filtering; finite and positive.
    pub budget_slack: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            budget_slack: DEFAULT_BUDGET_SLACK,
        }
    }
}

impl ScoringConfig {
    /// Configuration with the given slack.
    #[must_use]
    pub const fn with_budget_slack(budget_slack: f64) -> Self {
        Self { budget_slack }
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns [`ScoreRequestError::InvalidSlack`] when the slack is not a
    /// finite, positive value.
    pub fn validate(self) -> Result<Self, ScoreRequestError> {
        if self.budget_slack.is_finite() && self.budget_slack > 0.0 {
            Ok(self)
        } else {
            Err(ScoreRequestError::InvalidSlack {
                slack: self.budget_slack,
            })
        }
    }
}

/// Errors raised for a scoring request that cannot be evaluated.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreRequestError {
    /// The budget was negative or not finite.
    #[error("budget {budget} must be a finite, non-negative amount")]
    InvalidBudget {
        /// Supplied budget.
        budget: f64,
    },
    /// The slack factor was not positive or not finite.
    #[error("budget slack {slack} must be a finite, positive value")]
    InvalidSlack {
        /// Supplied slack.
        slack: f64,
    },
    /// A weight did not fit the criterion set.
    #[error(transparent)]
    Weights(#[from] WeightError),
}

/// Per-request filter and weights.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreRequest {
    /// Monthly budget compared against the selected rent.
    pub budget: f64,
    /// Unit size whose rent is filtered and scored.
    pub unit_size: UnitSize,
    /// Raw weight per criterion.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: WeightVector,
}

impl ScoreRequest {
    /// Construct a request.
    #[must_use]
    pub const fn new(budget: f64, unit_size: UnitSize, weights: WeightVector) -> Self {
        Self {
            budget,
            unit_size,
            weights,
        }
    }

    /// Check the request against a criterion set.
    ///
    /// # Errors
    /// Returns [`ScoreRequestError`] for an unusable budget or weights.
    pub fn validate(&self, criteria: &CriterionSet) -> Result<(), ScoreRequestError> {
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(ScoreRequestError::InvalidBudget {
                budget: self.budget,
            });
        }
        self.weights.validate(criteria)?;
        Ok(())
    }
}

/// Ranked scoring output, best first.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ScoreResults {
    results: Vec<ScoreResult>,
}

impl ScoreResults {
    /// The `n` best-ranked results.
    #[must_use]
    pub fn top(&self, n: usize) -> &[ScoreResult] {
        self.results.get(..n).unwrap_or(&self.results)
    }

    /// Iterate in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoreResult> {
        self.results.iter()
    }

    /// Number of ranked regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Report whether no region passed the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Borrow the results as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ScoreResult] {
        &self.results
    }

    /// Consume the wrapper and return the ranked vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<ScoreResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a ScoreResults {
    type Item = &'a ScoreResult;
    type IntoIter = std::slice::Iter<'a, ScoreResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Criterion resolved for one request.
struct Term {
    key: MetricKey,
    weight: f64,
}

/// Filter, score, and rank the regions of a snapshot.
///
/// Regions lacking rent for the requested unit size, or whose rent exceeds
/// `budget * slack`, are left out. Each remaining region scores
/// `Σ(w_i · n_i) / Σ(w_i) · 100`, where `w_i` is the raw weight divided by
/// the criterion's maximum and `n_i` the normalised metric (0 when the region
/// does not report it). When every weight is zero the denominator is 1 and
/// every score is 0. Scores are rounded to one decimal place, half to even.
/// Ties are broken by ascending region identifier.
///
/// An empty result is not an error.
///
/// # Errors
/// Returns [`ScoreRequestError`] when the budget, slack, or weights are
/// unusable.
///
/// # Examples
/// ```
/// use opportunity_core::{CriterionSet, RegionTable, Region, RegionId, UnitSize, WeightVector};
/// use opportunity_scorer::{DatasetSnapshot, ScoreRequest, ScoringConfig, score};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let regions = RegionTable::from_regions([
///     Region::new(RegionId::parse("94110")?).with_rent(UnitSize::OneBedroom, 3000.0),
///     Region::new(RegionId::parse("94112")?).with_rent(UnitSize::OneBedroom, 2500.0),
///     Region::new(RegionId::parse("94114")?).with_rent(UnitSize::OneBedroom, 4300.0),
/// ])?;
/// let snapshot = DatasetSnapshot::build(regions, CriterionSet::default());
/// let request = ScoreRequest::new(
///     3500.0,
///     UnitSize::OneBedroom,
///     WeightVector::new().with_weight("rent", 10.0),
/// );
/// let ranked = score(&snapshot, &request, &ScoringConfig::default())?;
/// assert_eq!(ranked.len(), 2);
/// assert_eq!(ranked.top(1)[0].region_id.as_str(), "94112");
/// assert_eq!(ranked.top(1)[0].composite_score, 100.0);
/// # Ok(())
/// # }
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "the budget threshold and weight rescaling are floating-point"
)]
pub fn score(
    snapshot: &DatasetSnapshot,
    request: &ScoreRequest,
    config: &ScoringConfig,
) -> Result<ScoreResults, ScoreRequestError> {
    let config = config.validate()?;
    request.validate(snapshot.criteria())?;

    let threshold = request.budget * config.budget_slack;
    let terms: Vec<Term> = snapshot
        .criteria()
        .iter()
        .map(|spec| Term {
            key: spec.metric().resolve(request.unit_size),
            weight: request.weights.weight(spec.name()) / spec.max_weight(),
        })
        .collect();
    let total: f64 = terms.iter().map(|term| term.weight).sum();
    let denominator = if total > 0.0 { total } else { 1.0 };

    let rent_key = MetricKey::Rent(request.unit_size);
    let mut results: Vec<ScoreResult> = snapshot
        .regions()
        .iter()
        .filter_map(|region| {
            let rent = rent_key.value(region)?;
            (rent <= threshold).then_some((rent, region))
        })
        .map(|(rent, region)| ScoreResult {
            region_id: region.id.clone(),
            composite_score: round_score(weighted_sum(snapshot, region, &terms) / denominator),
            rank: 0,
            display: display_attributes(region, request.unit_size, rent),
        })
        .collect();
    results.sort_by(compare_scores);
    for (index, result) in results.iter_mut().enumerate() {
        result.rank = index.saturating_add(1);
    }

    if results.is_empty() {
        info!(
            "no regions with {} rent within {threshold:.0}",
            request.unit_size
        );
    } else {
        debug!("ranked {} regions within {threshold:.0}", results.len());
    }
    Ok(ScoreResults { results })
}

#[expect(clippy::float_arithmetic, reason = "weighted sum of normalised values")]
fn weighted_sum(snapshot: &DatasetSnapshot, region: &Region, terms: &[Term]) -> f64 {
    terms
        .iter()
        .filter(|term| term.weight > 0.0)
        .map(|term| {
            let value = snapshot.normalized().get(term.key, &region.id).unwrap_or(0.0);
            term.weight * value
        })
        .sum()
}

/// Scale a `0..=1` fraction to `0..=100` with one decimal place.
#[expect(clippy::float_arithmetic, reason = "scaling and decimal rounding")]
fn round_score(fraction: f64) -> f64 {
    ((fraction * 1000.0).round_ties_even() / 10.0).clamp(0.0, 100.0)
}

fn display_attributes(region: &Region, unit_size: UnitSize, rent: f64) -> DisplayAttributes {
    DisplayAttributes {
        place_name: region.place_name.clone(),
        county: region.county.clone(),
        unit_size: Some(unit_size),
        rent: Some(rent),
        violent_crime_rate: MetricKey::CrimeRate(CrimeCategory::Violent).value(region),
        transit_stops: region.transit_total(),
    }
}

/// Order two scores best first.
#[must_use]
pub fn compare_scores(left: &ScoreResult, right: &ScoreResult) -> Ordering {
    right
        .composite_score
        .total_cmp(&left.composite_score)
        .then_with(|| left.region_id.cmp(&right.region_id))
}
