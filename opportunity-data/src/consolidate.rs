//! Outer join of source tables into one region table.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use log::{debug, info, warn};
use opportunity_core::{Region, RegionId, RegionTable};

use crate::source::county_key;
use crate::{
    Extracted, FieldTarget, FieldValue, KeyKind, RawRecord, RecordKey, SchemaMismatch, SourceTable,
};

/// Merge source tables into a single region table.
///
/// ZIP-keyed sources are joined first: every ZIP seen in any of them becomes
/// a region, and fields a source does not report stay absent. County-keyed
/// sources are then fanned out to every region whose county matches; they
/// never create regions.
///
/// # Errors
/// Returns [`SchemaMismatch`] when any source is malformed or when two
/// sources disagree on the value of one region field. No partial table is
/// returned.
///
/// # Examples
/// ```
/// use opportunity_core::UnitSize;
/// use opportunity_data::{CellValue, FieldTarget, RawTable, SourceTable, consolidate};
///
/// # fn main() -> Result<(), opportunity_data::SchemaMismatch> {
/// let rent = SourceTable::new(
///     "rent",
///     "ZIP",
///     RawTable::new(["ZIP", "RENT_STUDIO"])
///         .with_row(vec![CellValue::Integer(94110), CellValue::Float(2300.0)]),
/// )
/// .bind("RENT_STUDIO", FieldTarget::Rent { unit: UnitSize::Studio });
/// let income = SourceTable::new(
///     "income",
///     "zip_code",
///     RawTable::new(["zip_code", "MEDIAN"])
///         .with_row(vec![CellValue::Text("94112".into()), CellValue::Integer(98_000)]),
/// )
/// .bind("MEDIAN", FieldTarget::Income);
///
/// let table = consolidate(&[rent, income])?;
/// assert_eq!(table.len(), 2);
/// # Ok(())
/// # }
/// ```
pub fn consolidate(sources: &[SourceTable]) -> Result<RegionTable, SchemaMismatch> {
    let mut joined = Accumulator::default();
    for source in sources.iter().filter(|s| s.key_kind == KeyKind::Region) {
        let Extracted { keys, records } = source.extract()?;
        debug!(
            "source '{}' contributed {} keys and {} values",
            source.source_id,
            keys.len(),
            records.len()
        );
        for key in keys {
            joined.admit(key);
        }
        for record in records {
            joined.apply_region_record(record)?;
        }
    }

    let members = joined.county_members();
    for source in sources.iter().filter(|s| s.key_kind == KeyKind::County) {
        for record in source.records()? {
            joined.apply_county_record(record, &members)?;
        }
    }

    info!(
        "consolidated {} sources into {} regions",
        sources.len(),
        joined.regions.len()
    );
    Ok(RegionTable::from_regions(joined.regions.into_values())?)
}

#[derive(Default)]
struct Accumulator<'a> {
    regions: BTreeMap<RegionId, Region>,
    provenance: BTreeMap<(RegionId, FieldTarget), &'a str>,
}

impl<'a> Accumulator<'a> {
    /// Create an empty region for a ZIP key unless one exists.
    fn admit(&mut self, key: RecordKey) {
        if let RecordKey::Region(id) = key {
            self.regions
                .entry(id)
                .or_insert_with_key(|id| Region::new(id.clone()));
        }
    }

    fn apply_region_record(&mut self, record: RawRecord<'a>) -> Result<(), SchemaMismatch> {
        let RecordKey::Region(id) = record.key else {
            return Ok(());
        };
        self.regions
            .entry(id.clone())
            .or_insert_with(|| Region::new(id.clone()));
        self.assign(&id, record.source_id, record.value)
    }

    fn apply_county_record(
        &mut self,
        record: RawRecord<'a>,
        members: &BTreeMap<String, Vec<RegionId>>,
    ) -> Result<(), SchemaMismatch> {
        let RecordKey::County(county) = &record.key else {
            return Ok(());
        };
        let Some(ids) = members.get(&county_key(county)) else {
            warn!(
                "source '{}' reports {} for county '{county}', which has no regions",
                record.source_id,
                record.value.target()
            );
            return Ok(());
        };
        for id in ids {
            self.assign(id, record.source_id, record.value.clone())?;
        }
        Ok(())
    }

    /// County name to member regions, as known after the ZIP-keyed pass.
    fn county_members(&self) -> BTreeMap<String, Vec<RegionId>> {
        let mut members: BTreeMap<String, Vec<RegionId>> = BTreeMap::new();
        for region in self.regions.values() {
            if let Some(county) = region.county.as_deref() {
                members
                    .entry(county_key(county))
                    .or_default()
                    .push(region.id.clone());
            }
        }
        members
    }

    fn assign(
        &mut self,
        id: &RegionId,
        source_id: &'a str,
        value: FieldValue,
    ) -> Result<(), SchemaMismatch> {
        let target = value.target();
        let Some(region) = self.regions.get_mut(id) else {
            return Ok(());
        };
        if store(region, value) {
            self.provenance.entry((id.clone(), target)).or_insert(source_id);
            return Ok(());
        }
        let previous_source = self
            .provenance
            .get(&(id.clone(), target))
            .copied()
            .unwrap_or_default();
        Err(SchemaMismatch::FieldConflict {
            source_id: source_id.to_owned(),
            previous_source: previous_source.to_owned(),
            key: id.to_string(),
            field: target.to_string(),
        })
    }
}

/// Write `value` into its field. Returns `false` when the field already
/// holds a different value.
fn store(region: &mut Region, value: FieldValue) -> bool {
    match value {
        FieldValue::County(county) => fill(&mut region.county, county),
        FieldValue::PlaceName(name) => fill(&mut region.place_name, name),
        FieldValue::Geometry(shape) => fill(&mut region.geometry, shape),
        FieldValue::Population(count) => fill(&mut region.population, count),
        FieldValue::Households(count) => fill(&mut region.households, count),
        FieldValue::Income(income) => fill(&mut region.income, income),
        FieldValue::Rent(unit, rent) => fill_entry(&mut region.rent, unit, rent),
        FieldValue::CrimeRate(category, rate) => {
            fill(&mut region.crime.entry(category).or_default().current_rate, rate)
        }
        FieldValue::CrimeTrend(category, percent) => fill(
            &mut region.crime.entry(category).or_default().trend_percent,
            percent,
        ),
        FieldValue::TransitStops(mode, stops) => fill_entry(&mut region.transit, mode, stops),
    }
}

fn fill<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    match slot {
        Some(existing) => *existing == value,
        None => {
            *slot = Some(value);
            true
        }
    }
}

fn fill_entry<K: Ord, V: PartialEq>(map: &mut BTreeMap<K, V>, key: K, value: V) -> bool {
    match map.entry(key) {
        Entry::Occupied(existing) => *existing.get() == value,
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
    }
}
