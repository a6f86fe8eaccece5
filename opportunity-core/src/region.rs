//! Regions and the table that holds them.
//!
//! A [`Region`] is one ZIP code with whatever socioeconomic, safety, transit,
//! and geospatial attributes the sources supplied. Absent metrics stay absent;
//! they are never defaulted to zero.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use geo::MultiPolygon;
use thiserror::Error;

use crate::geometry::{self, GeometryError};
use crate::metric::{CrimeCategory, TransitMode, UnitSize};

const ZIP_LENGTH: usize = 5;

/// Canonical five-digit ZIP code.
///
/// # Examples
/// ```
/// use opportunity_core::RegionId;
///
/// # fn main() -> Result<(), opportunity_core::RegionIdError> {
/// assert_eq!(RegionId::parse(" 94110-1234 ")?.as_str(), "94110");
/// assert_eq!(RegionId::from_integer(2134)?.as_str(), "02134");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct RegionId(String);

/// Errors returned while canonicalising a region key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionIdError {
    /// The key was empty after trimming.
    #[error("region key is empty")]
    Empty,
    /// The key was not a ZIP or ZIP+4 code.
    #[error("region key '{raw}' is not a five-digit ZIP code")]
    Malformed {
        /// Raw key as supplied.
        raw: String,
    },
    /// A numeric key was negative or wider than five digits.
    #[error("numeric region key {raw} is outside the ZIP range")]
    OutOfRange {
        /// Raw numeric key.
        raw: i64,
    },
}

impl RegionId {
    /// Canonicalise a textual ZIP or ZIP+4 code.
    ///
    /// Short numeric strings are zero padded, mirroring what happens when a
    /// spreadsheet stores ZIP codes as numbers.
    ///
    /// # Errors
    /// Returns [`RegionIdError`] when the text is empty or not a ZIP code.
    pub fn parse(raw: &str) -> Result<Self, RegionIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegionIdError::Empty);
        }
        let base = match trimmed.split_once('-') {
            Some((zip, plus_four))
                if plus_four.len() == 4 && plus_four.bytes().all(|b| b.is_ascii_digit()) =>
            {
                zip
            }
            Some(_) => {
                return Err(RegionIdError::Malformed {
                    raw: raw.to_owned(),
                });
            }
            None => trimmed,
        };
        if base.is_empty() || base.len() > ZIP_LENGTH || !base.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(RegionIdError::Malformed {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(format!("{base:0>ZIP_LENGTH$}")))
    }

    /// Canonicalise a numeric ZIP code.
    ///
    /// # Errors
    /// Returns [`RegionIdError::OutOfRange`] for negative or six-digit values.
    pub fn from_integer(raw: i64) -> Result<Self, RegionIdError> {
        if !(0..=99_999).contains(&raw) {
            return Err(RegionIdError::OutOfRange { raw });
        }
        Ok(Self(format!("{raw:0>ZIP_LENGTH$}")))
    }

    /// Borrow the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionId {
    type Error = RegionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionId> for String {
    fn from(value: RegionId) -> Self {
        value.0
    }
}

/// Crime figures for one category in one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrimeStats {
    /// Current rate per 1,000 residents.
    #[cfg_attr(feature = "serde", serde(default))]
    pub current_rate: Option<f64>,
    /// Change against the previous year, in percent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub trend_percent: Option<f64>,
}

/// One ZIP code and its attributes.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`.
///
/// # Examples
/// ```
/// use opportunity_core::{CrimeCategory, Region, RegionId, TransitMode, UnitSize};
///
/// # fn main() -> Result<(), opportunity_core::RegionIdError> {
/// let region = Region::new(RegionId::parse("94110")?)
///     .with_county("San Francisco")
///     .with_rent(UnitSize::OneBedroom, 3100.0)
///     .with_crime_rate(CrimeCategory::Violent, 6.2)
///     .with_transit(TransitMode::Bus, 40)
///     .with_transit(TransitMode::Rail, 2);
/// assert_eq!(region.transit_total(), Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    /// Canonical ZIP code.
    pub id: RegionId,
    /// County the ZIP belongs to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub county: Option<String>,
    /// Post-office name used for display.
    #[cfg_attr(feature = "serde", serde(default))]
    pub place_name: Option<String>,
    /// Boundary polygon(s).
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "crate::geometry::serde_wkt::optional")
    )]
    pub geometry: Option<MultiPolygon<f64>>,
    /// Resident population.
    #[cfg_attr(feature = "serde", serde(default))]
    pub population: Option<u64>,
    /// Number of households.
    #[cfg_attr(feature = "serde", serde(default))]
    pub households: Option<u64>,
    /// Median household income.
    #[cfg_attr(feature = "serde", serde(default))]
    pub income: Option<f64>,
    /// Median rent per unit size.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rent: BTreeMap<UnitSize, f64>,
    /// Crime figures per category.
    #[cfg_attr(feature = "serde", serde(default))]
    pub crime: BTreeMap<CrimeCategory, CrimeStats>,
    /// Stop counts per transit mode.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transit: BTreeMap<TransitMode, u32>,
}

impl Region {
    /// Construct a region that carries only its identifier.
    #[must_use]
    pub const fn new(id: RegionId) -> Self {
        Self {
            id,
            county: None,
            place_name: None,
            geometry: None,
            population: None,
            households: None,
            income: None,
            rent: BTreeMap::new(),
            crime: BTreeMap::new(),
            transit: BTreeMap::new(),
        }
    }

    /// Set the county while returning `self` for chaining.
    #[must_use]
    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_place_name(mut self, name: impl Into<String>) -> Self {
        self.place_name = Some(name.into());
        self
    }

    /// Set the boundary geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: MultiPolygon<f64>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Set the median income.
    #[must_use]
    pub fn with_income(mut self, income: f64) -> Self {
        self.income = Some(income);
        self
    }

    /// Set population and household counts.
    #[must_use]
    pub fn with_population(mut self, population: u64, households: u64) -> Self {
        self.population = Some(population);
        self.households = Some(households);
        self
    }

    /// Set the median rent for one unit size.
    #[must_use]
    pub fn with_rent(mut self, unit: UnitSize, rent: f64) -> Self {
        self.rent.insert(unit, rent);
        self
    }

    /// Set the current crime rate for one category.
    #[must_use]
    pub fn with_crime_rate(mut self, category: CrimeCategory, rate: f64) -> Self {
        self.crime.entry(category).or_default().current_rate = Some(rate);
        self
    }

    /// Set the crime trend for one category.
    #[must_use]
    pub fn with_crime_trend(mut self, category: CrimeCategory, percent: f64) -> Self {
        self.crime.entry(category).or_default().trend_percent = Some(percent);
        self
    }

    /// Set the stop count for one transit mode.
    #[must_use]
    pub fn with_transit(mut self, mode: TransitMode, stops: u32) -> Self {
        self.transit.insert(mode, stops);
        self
    }

    /// Total stops across every transit mode, if any mode was reported.
    #[must_use]
    pub fn transit_total(&self) -> Option<u32> {
        if self.transit.is_empty() {
            return None;
        }
        Some(
            self.transit
                .values()
                .fold(0_u32, |total, stops| total.saturating_add(*stops)),
        )
    }
}

/// Errors returned by [`RegionTable::from_regions`].
#[derive(Debug, Error, PartialEq)]
pub enum RegionTableError {
    /// Two rows carried the same ZIP code.
    #[error("region {id} appears more than once")]
    DuplicateRegion {
        /// Repeated identifier.
        id: RegionId,
    },
    /// A region carried an invalid boundary.
    #[error("region {id} has an invalid geometry")]
    InvalidGeometry {
        /// Affected region.
        id: RegionId,
        /// Validation failure.
        #[source]
        source: GeometryError,
    },
}

/// Regions keyed by their unique identifier.
///
/// Iteration order is ascending by ZIP code, which keeps every downstream pass
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionTable {
    regions: BTreeMap<RegionId, Region>,
}

impl RegionTable {
    /// Build a table, rejecting duplicate identifiers and invalid geometry.
    ///
    /// # Errors
    /// Returns [`RegionTableError`] on the first offending row.
    pub fn from_regions<I>(regions: I) -> Result<Self, RegionTableError>
    where
        I: IntoIterator<Item = Region>,
    {
        let mut table = BTreeMap::new();
        for region in regions {
            if let Some(shape) = &region.geometry {
                geometry::validate(shape).map_err(|source| RegionTableError::InvalidGeometry {
                    id: region.id.clone(),
                    source,
                })?;
            }
            match table.entry(region.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(RegionTableError::DuplicateRegion { id: region.id });
                }
                Entry::Vacant(slot) => {
                    slot.insert(region);
                }
            }
        }
        Ok(Self { regions: table })
    }

    /// Look up a region by identifier.
    #[must_use]
    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    /// Iterate over regions in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions.values()
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Report whether the table holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Consume the table and return its regions in identifier order.
    #[must_use]
    pub fn into_regions(self) -> Vec<Region> {
        self.regions.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a RegionTable {
    type Item = &'a Region;
    type IntoIter = std::collections::btree_map::Values<'a, RegionId, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.values()
    }
}
