//! Dissolve region boundaries into group-level overlays.
//!
//! [`dissolve_by_group`] unions the polygons of every region sharing a group
//! key (the county, by default) into a single boundary. It reads the region
//! table and nothing else, so overlays can be drawn before, after, or without
//! any scoring pass.
//!
//! # Examples
//! ```
//! use opportunity_core::{DissolveOptions, Region, RegionId, RegionTable, dissolve_by_group};
//! use opportunity_core::geometry::parse_wkt;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let west = parse_wkt("POLYGON((0 0,1 0,1 1,0 1,0 0))")?;
//! let east = parse_wkt("POLYGON((1 0,2 0,2 1,1 1,1 0))")?;
//! let table = RegionTable::from_regions([
//!     Region::new(RegionId::parse("94110")?).with_county("Alameda").with_geometry(west),
//!     Region::new(RegionId::parse("94111")?).with_county("Alameda").with_geometry(east),
//! ])?;
//! let boundaries = dissolve_by_group(&table, &DissolveOptions::default());
//! assert_eq!(boundaries.len(), 1);
//! assert_eq!(boundaries[0].member_ids.len(), 2);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use geo::{MultiPolygon, unary_union};
use log::{debug, warn};

use crate::{Region, RegionId};

/// Region attribute used to group boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GroupKey {
    /// Group by county.
    #[default]
    County,
    /// Group by post-office name.
    PlaceName,
}

impl GroupKey {
    fn value(self, region: &Region) -> Option<&str> {
        match self {
            Self::County => region.county.as_deref(),
            Self::PlaceName => region.place_name.as_deref(),
        }
        .map(str::trim)
        .filter(|value| !value.is_empty())
    }
}

/// Options for [`dissolve_by_group`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DissolveOptions {
    /// Attribute to group by.
    pub key: GroupKey,
    /// Label for regions lacking the key. When `None` those regions are
    /// left out of the output.
    pub unknown_group: Option<String>,
}

impl DissolveOptions {
    /// Group by `key`, dropping regions without a value.
    #[must_use]
    pub const fn by(key: GroupKey) -> Self {
        Self {
            key,
            unknown_group: None,
        }
    }

    /// Collect regions without a value under `label`.
    #[must_use]
    pub fn with_unknown_group(mut self, label: impl Into<String>) -> Self {
        self.unknown_group = Some(label.into());
        self
    }
}

/// Union of the member boundaries of one group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupBoundary {
    /// Group key value.
    pub group: String,
    /// Dissolved boundary.
    #[cfg_attr(feature = "serde", serde(with = "crate::geometry::serde_wkt"))]
    pub geometry: MultiPolygon<f64>,
    /// Regions whose geometry contributed, in identifier order.
    pub member_ids: Vec<RegionId>,
    /// Population summed over members that report it.
    pub population: Option<u64>,
    /// Households summed over members that report them.
    pub households: Option<u64>,
}

/// Dissolve region geometries by a grouping attribute.
///
/// Regions without geometry are skipped and logged as a data-quality note.
/// Groups are returned in ascending key order. The input is never modified.
pub fn dissolve_by_group<'a, I>(regions: I, options: &DissolveOptions) -> Vec<GroupBoundary>
where
    I: IntoIterator<Item = &'a Region>,
{
    let mut groups: BTreeMap<String, Vec<&Region>> = BTreeMap::new();
    for region in regions {
        let label = match (options.key.value(region), options.unknown_group.as_deref()) {
            (Some(value), _) | (None, Some(value)) => value,
            (None, None) => {
                debug!("region {} has no {:?} value; left out of boundaries", region.id, options.key);
                continue;
            }
        };
        if region.geometry.is_none() {
            warn!("region {} has no geometry; excluded from group '{label}'", region.id);
            continue;
        }
        groups.entry(label.to_owned()).or_default().push(region);
    }

    groups
        .into_iter()
        .map(|(group, mut members)| {
            members.sort_by(|a, b| a.id.cmp(&b.id));
            build_boundary(group, &members)
        })
        .collect()
}

fn build_boundary(group: String, members: &[&Region]) -> GroupBoundary {
    let geometry = unary_union(members.iter().filter_map(|region| region.geometry.as_ref()));
    GroupBoundary {
        group,
        geometry,
        member_ids: members.iter().map(|region| region.id.clone()).collect(),
        population: sum_present(members.iter().map(|region| region.population)),
        households: sum_present(members.iter().map(|region| region.households)),
    }
}

fn sum_present(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values.flatten().fold(None, |total, value| {
        Some(total.unwrap_or(0_u64).saturating_add(value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{region, square};
    use geo::Area;
    use rstest::{fixture, rstest};

    #[fixture]
    fn regions() -> Vec<Region> {
        vec![
            region("94002")
                .with_county("San Mateo")
                .with_geometry(square(1.0, 0.0))
                .with_population(100, 40),
            region("94001")
                .with_county("San Mateo")
                .with_geometry(square(0.0, 0.0))
                .with_population(50, 20),
            region("94601")
                .with_county("Alameda")
                .with_geometry(square(5.0, 5.0)),
            region("94999").with_geometry(square(9.0, 9.0)),
            region("94602").with_county("Alameda"),
        ]
    }

    #[rstest]
    fn adjacent_members_dissolve_into_one_polygon(regions: Vec<Region>) {
        let boundaries = dissolve_by_group(&regions, &DissolveOptions::default());
        let san_mateo = boundaries
            .iter()
            .find(|b| b.group == "San Mateo")
            .expect("san mateo boundary");
        assert_eq!(san_mateo.geometry.0.len(), 1);
        assert!((san_mateo.geometry.unsigned_area() - 2.0).abs() < 1e-9);
        assert_eq!(san_mateo.population, Some(150));
        assert_eq!(san_mateo.households, Some(60));
        let ids: Vec<&str> = san_mateo.member_ids.iter().map(RegionId::as_str).collect();
        assert_eq!(ids, ["94001", "94002"]);
    }

    #[rstest]
    fn regions_without_key_are_excluded_by_default(regions: Vec<Region>) {
        let boundaries = dissolve_by_group(&regions, &DissolveOptions::default());
        let groups: Vec<&str> = boundaries.iter().map(|b| b.group.as_str()).collect();
        assert_eq!(groups, ["Alameda", "San Mateo"]);
    }

    #[rstest]
    fn unknown_group_collects_keyless_regions(regions: Vec<Region>) {
        let options = DissolveOptions::default().with_unknown_group("Unassigned");
        let boundaries = dissolve_by_group(&regions, &options);
        let unknown = boundaries
            .iter()
            .find(|b| b.group == "Unassigned")
            .expect("unknown group");
        assert_eq!(unknown.member_ids.len(), 1);
        assert_eq!(unknown.population, None);
    }

    #[rstest]
    fn regions_without_geometry_are_skipped(regions: Vec<Region>) {
        let boundaries = dissolve_by_group(&regions, &DissolveOptions::default());
        let alameda = boundaries
            .iter()
            .find(|b| b.group == "Alameda")
            .expect("alameda boundary");
        let ids: Vec<&str> = alameda.member_ids.iter().map(RegionId::as_str).collect();
        assert_eq!(ids, ["94601"]);
    }

    #[rstest]
    fn input_is_left_untouched(regions: Vec<Region>) {
        let before = regions.clone();
        let _ = dissolve_by_group(&regions, &DissolveOptions::by(GroupKey::PlaceName));
        assert_eq!(regions, before);
    }

    #[rstest]
    fn empty_input_produces_no_boundaries() {
        let regions: Vec<Region> = Vec::new();
        assert!(dissolve_by_group(&regions, &DissolveOptions::default()).is_empty());
    }
}
