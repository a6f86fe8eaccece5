//! Min-max normalisation of raw region metrics.

use std::collections::BTreeMap;

use log::debug;
use opportunity_core::{MetricKey, Orientation, RegionId, RegionTable};

/// Value assigned to every present entry of a column with a single distinct
/// value.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Scale one metric column onto `0.0..=1.0`, oriented so that higher is
/// better.
///
/// Missing and non-finite values are left out of both the min/max scan and
/// the result. A degenerate column (`min == max`) maps every present entry to
/// [`NEUTRAL_SCORE`].
///
/// # Examples
/// ```
/// use opportunity_core::{Orientation, RegionId};
/// use opportunity_scorer::normalise;
///
/// # fn main() -> Result<(), opportunity_core::RegionIdError> {
/// let column = vec![
///     (RegionId::parse("94110")?, Some(2000.0)),
///     (RegionId::parse("94112")?, Some(3000.0)),
///     (RegionId::parse("94134")?, None),
/// ];
/// let scaled = normalise(column, Orientation::LowerBetter);
/// assert_eq!(scaled.get(&RegionId::parse("94110")?), Some(&1.0));
/// assert_eq!(scaled.get(&RegionId::parse("94112")?), Some(&0.0));
/// assert!(!scaled.contains_key(&RegionId::parse("94134")?));
/// # Ok(())
/// # }
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "min-max scaling subtracts and divides raw values"
)]
pub fn normalise<I>(column: I, orientation: Orientation) -> BTreeMap<RegionId, f64>
where
    I: IntoIterator<Item = (RegionId, Option<f64>)>,
{
    let present: Vec<(RegionId, f64)> = column
        .into_iter()
        .filter_map(|(id, value)| value.filter(|v| v.is_finite()).map(|v| (id, v)))
        .collect();
    let Some((min, max)) = bounds(present.iter().map(|(_, value)| *value)) else {
        return BTreeMap::new();
    };
    let span = max - min;
    if span <= 0.0 {
        return present
            .into_iter()
            .map(|(id, _)| (id, NEUTRAL_SCORE))
            .collect();
    }
    present
        .into_iter()
        .map(|(id, value)| {
            let scaled = (value - min) / span;
            let oriented = match orientation {
                Orientation::HigherBetter => scaled,
                Orientation::LowerBetter => 1.0 - scaled,
            };
            (id, oriented.clamp(0.0, 1.0))
        })
        .collect()
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// One normalised value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMetric<'a> {
    /// Region the value belongs to.
    pub region_id: &'a RegionId,
    /// Metric the value was derived from.
    pub metric: MetricKey,
    /// Oriented value in `0.0..=1.0`.
    pub value: f64,
}

/// Every normalised column of a dataset.
///
/// Built once per dataset load and never patched; a reload builds a new
/// table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTable {
    columns: BTreeMap<MetricKey, BTreeMap<RegionId, f64>>,
}

impl NormalizedTable {
    /// Normalise each planned metric over every region of `regions`.
    #[must_use]
    pub fn build(regions: &RegionTable, plan: &BTreeMap<MetricKey, Orientation>) -> Self {
        let columns = plan
            .iter()
            .map(|(&key, &orientation)| {
                let raw = regions
                    .iter()
                    .map(|region| (region.id.clone(), key.value(region)));
                let column = normalise(raw, orientation);
                debug!("normalised {key}: {} of {} regions", column.len(), regions.len());
                (key, column)
            })
            .collect();
        Self { columns }
    }

    /// Normalised value of `key` for region `id`, if the region reports it.
    #[must_use]
    pub fn get(&self, key: MetricKey, id: &RegionId) -> Option<f64> {
        self.columns.get(&key)?.get(id).copied()
    }

    /// Whole column for `key`, if it was planned.
    #[must_use]
    pub fn column(&self, key: MetricKey) -> Option<&BTreeMap<RegionId, f64>> {
        self.columns.get(&key)
    }

    /// Normalised metrics ordered by metric then region.
    pub fn metrics(&self) -> impl Iterator<Item = NormalizedMetric<'_>> + '_ {
        self.columns.iter().flat_map(|(&metric, column)| {
            column.iter().map(move |(region_id, &value)| NormalizedMetric {
                region_id,
                metric,
                value,
            })
        })
    }

    /// Number of normalised columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Report whether no columns were normalised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
