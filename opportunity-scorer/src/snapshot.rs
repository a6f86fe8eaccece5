//! Immutable dataset snapshots and their atomic replacement.

use std::sync::{Arc, PoisonError, RwLock};

use log::info;
use opportunity_core::{CriterionSet, Region, RegionTable, RegionTableError};
use thiserror::Error;

use crate::NormalizedTable;

/// Errors raised while loading a snapshot.
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    /// The supplied regions do not form a valid table.
    #[error("dataset regions are invalid")]
    Regions(#[from] RegionTableError),
}

/// Region table, criteria, and normalised columns of one dataset epoch.
///
/// Nothing in a snapshot changes after construction. Scoring and dissolving
/// read it concurrently through a shared [`Arc`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSnapshot {
    epoch: u64,
    regions: RegionTable,
    criteria: CriterionSet,
    normalized: NormalizedTable,
}

impl DatasetSnapshot {
    /// Normalise every metric the criteria can resolve to.
    ///
    /// The snapshot starts at epoch 0; [`SnapshotStore::reload`] numbers its
    /// successors.
    #[must_use]
    pub fn build(regions: RegionTable, criteria: CriterionSet) -> Self {
        let normalized = NormalizedTable::build(&regions, &criteria.normalisation_plan());
        Self {
            epoch: 0,
            regions,
            criteria,
            normalized,
        }
    }

    /// Validate raw regions and build a snapshot from them.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Regions`] for duplicate identifiers or invalid
    /// geometry.
    pub fn from_regions<I>(regions: I, criteria: CriterionSet) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = Region>,
    {
        Ok(Self::build(RegionTable::from_regions(regions)?, criteria))
    }

    /// Load generation, incremented on every reload.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Consolidated regions.
    #[must_use]
    pub const fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Criteria the normalised columns were planned from.
    #[must_use]
    pub const fn criteria(&self) -> &CriterionSet {
        &self.criteria
    }

    /// Normalised metric columns.
    #[must_use]
    pub const fn normalized(&self) -> &NormalizedTable {
        &self.normalized
    }
}

/// Holder of the current snapshot.
///
/// Readers clone the [`Arc`] and keep a consistent view for as long as they
/// hold it. A reload builds the replacement before taking the write lock, so
/// the lock is held only for the pointer swap.
///
/// # Examples
/// ```
/// use opportunity_core::{CriterionSet, RegionTable};
/// use opportunity_scorer::{DatasetSnapshot, SnapshotStore};
///
/// let store = SnapshotStore::new(DatasetSnapshot::build(
///     RegionTable::default(),
///     CriterionSet::default(),
/// ));
/// let before = store.current();
/// store.reload(RegionTable::default(), CriterionSet::default());
/// assert_eq!(before.epoch(), 0);
/// assert_eq!(store.current().epoch(), 1);
/// ```
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<DatasetSnapshot>>,
}

impl SnapshotStore {
    /// Publish an initial snapshot.
    #[must_use]
    pub fn new(snapshot: DatasetSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Snapshot currently published.
    #[must_use]
    pub fn current(&self) -> Arc<DatasetSnapshot> {
        // A panicking writer cannot leave a half-swapped pointer behind.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Build a snapshot from `regions` and publish it as the next epoch.
    ///
    /// Readers holding the previous snapshot are unaffected.
    pub fn reload(&self, regions: RegionTable, criteria: CriterionSet) {
        let mut next = DatasetSnapshot::build(regions, criteria);
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        next.epoch = slot.epoch.saturating_add(1);
        info!(
            "publishing dataset epoch {} with {} regions",
            next.epoch,
            next.regions.len()
        );
        *slot = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opportunity_core::test_support::region;
    use opportunity_core::{MetricKey, RegionId, UnitSize};
    use rstest::rstest;
    use std::thread;

    fn table(rents: &[(&str, f64)]) -> RegionTable {
        RegionTable::from_regions(
            rents
                .iter()
                .map(|(zip, rent)| region(zip).with_rent(UnitSize::Studio, *rent)),
        )
        .unwrap()
    }

    #[rstest]
    fn build_normalises_planned_columns() {
        let snapshot = DatasetSnapshot::build(
            table(&[("94110", 2000.0), ("94112", 3000.0)]),
            CriterionSet::default(),
        );
        let id = RegionId::parse("94112").unwrap();
        assert_eq!(
            snapshot.normalized().get(MetricKey::Rent(UnitSize::Studio), &id),
            Some(0.0)
        );
        assert_eq!(snapshot.epoch(), 0);
    }

    #[rstest]
    fn from_regions_rejects_duplicates() {
        let result = DatasetSnapshot::from_regions(
            [region("94110"), region("94110")],
            CriterionSet::default(),
        );
        assert!(matches!(result, Err(SnapshotError::Regions(_))));
    }

    #[rstest]
    fn readers_keep_their_snapshot_across_reload() {
        let store = SnapshotStore::new(DatasetSnapshot::build(
            table(&[("94110", 2000.0)]),
            CriterionSet::default(),
        ));
        let held = store.current();
        store.reload(
            table(&[("94110", 2000.0), ("94112", 2500.0)]),
            CriterionSet::default(),
        );
        assert_eq!(held.regions().len(), 1);
        assert_eq!(store.current().regions().len(), 2);
        assert_eq!(store.current().epoch(), 1);
    }

    #[rstest]
    fn concurrent_readers_see_whole_snapshots() {
        let store = SnapshotStore::new(DatasetSnapshot::build(
            table(&[("94110", 2000.0)]),
            CriterionSet::default(),
        ));
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let snapshot = store.current();
                        let expected = usize::try_from(snapshot.epoch() + 1).unwrap();
                        assert_eq!(snapshot.regions().len(), expected.min(2));
                    }
                });
            }
            scope.spawn(|| {
                store.reload(
                    table(&[("94110", 2000.0), ("94112", 2500.0)]),
                    CriterionSet::default(),
                );
            });
        });
        assert_eq!(store.current().epoch(), 1);
    }
}
