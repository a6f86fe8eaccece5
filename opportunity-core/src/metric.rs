//! Metric categories and the keys used to address normalised columns.
//!
//! Selections coming from a presentation layer (unit size, crime category)
//! are enumerated here and resolved to a [`MetricKey`] through explicit
//! lookups, so no column name is ever assembled from strings.
//!
//! # Examples
//! ```
//! use opportunity_core::{MetricKey, MetricSelector, UnitSize};
//!
//! let key = MetricSelector::SelectedRent.resolve(UnitSize::TwoBedroom);
//! assert_eq!(key, MetricKey::Rent(UnitSize::TwoBedroom));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::Region;

/// Apartment size used to select a rent column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitSize {
    /// Studio apartment.
    #[cfg_attr(feature = "serde", serde(rename = "studio"))]
    Studio,
    /// One bedroom.
    #[cfg_attr(feature = "serde", serde(rename = "1bd"))]
    OneBedroom,
    /// Two bedrooms.
    #[cfg_attr(feature = "serde", serde(rename = "2bd"))]
    TwoBedroom,
    /// Three bedrooms.
    #[cfg_attr(feature = "serde", serde(rename = "3bd"))]
    ThreeBedroom,
    /// Four bedrooms.
    #[cfg_attr(feature = "serde", serde(rename = "4bd"))]
    FourBedroom,
}

impl UnitSize {
    /// Every unit size in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Studio,
        Self::OneBedroom,
        Self::TwoBedroom,
        Self::ThreeBedroom,
        Self::FourBedroom,
    ];

    /// Short code accepted on the command line (`studio`, `1bd` .. `4bd`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Studio => "studio",
            Self::OneBedroom => "1bd",
            Self::TwoBedroom => "2bd",
            Self::ThreeBedroom => "3bd",
            Self::FourBedroom => "4bd",
        }
    }

    /// Human readable label shown in selection widgets.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Studio => "Studio",
            Self::OneBedroom => "1 Bedroom",
            Self::TwoBedroom => "2 Bedrooms",
            Self::ThreeBedroom => "3 Bedrooms",
            Self::FourBedroom => "4 Bedrooms",
        }
    }

    /// Column name used by the rent survey tables.
    #[must_use]
    pub const fn rent_column(self) -> &'static str {
        match self {
            Self::Studio => "RENT_STUDIO",
            Self::OneBedroom => "RENT_1BD",
            Self::TwoBedroom => "RENT_2BD",
            Self::ThreeBedroom => "RENT_3BD",
            Self::FourBedroom => "RENT_4BD",
        }
    }
}

impl fmt::Display for UnitSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UnitSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|unit| {
                needle.eq_ignore_ascii_case(unit.code())
                    || needle.eq_ignore_ascii_case(unit.label())
                    || needle.eq_ignore_ascii_case(unit.rent_column())
            })
            .ok_or_else(|| format!("unknown unit size '{s}'"))
    }
}

/// Category of reported crime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CrimeCategory {
    /// Violent offences.
    Violent,
    /// Property offences.
    Property,
}

impl CrimeCategory {
    /// Return the category as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Violent => "violent",
            Self::Property => "property",
        }
    }
}

impl fmt::Display for CrimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrimeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "violent" | "viol" => Ok(Self::Violent),
            "property" | "prop" => Ok(Self::Property),
            _ => Err(format!("unknown crime category '{s}'")),
        }
    }
}

/// Public transport mode counted at stop level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransitMode {
    /// Bus stops.
    Bus,
    /// Heavy and commuter rail stations.
    Rail,
    /// Light rail and tram stops.
    LightRail,
    /// Ferry terminals.
    Ferry,
}

impl TransitMode {
    /// Return the mode as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bus => "bus",
            Self::Rail => "rail",
            Self::LightRail => "light_rail",
            Self::Ferry => "ferry",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction in which a raw metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Orientation {
    /// Larger raw values are better (income, transit).
    HigherBetter,
    /// Smaller raw values are better (rent, crime).
    LowerBetter,
}

/// Concrete, addressable raw metric of a [`Region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    /// Median rent for a unit size.
    Rent(UnitSize),
    /// Current crime rate for a category.
    CrimeRate(CrimeCategory),
    /// Year-over-year crime trend in percent for a category.
    CrimeTrend(CrimeCategory),
    /// Stop count for a single transit mode.
    TransitStops(TransitMode),
    /// Stop count summed across transit modes.
    TransitTotal,
    /// Median household income.
    Income,
    /// Resident population.
    Population,
    /// Number of households.
    Households,
}

impl MetricKey {
    /// Read the raw value of this metric from a region.
    ///
    /// Returns `None` when the region does not carry the metric.
    ///
    /// # Examples
    /// ```
    /// use opportunity_core::{MetricKey, Region, RegionId, UnitSize};
    ///
    /// # fn main() -> Result<(), opportunity_core::RegionIdError> {
    /// let region = Region::new(RegionId::parse("94110")?).with_rent(UnitSize::Studio, 2400.0);
    /// assert_eq!(MetricKey::Rent(UnitSize::Studio).value(&region), Some(2400.0));
    /// assert_eq!(MetricKey::Income.value(&region), None);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "population and household counts are far below 2^52"
    )]
    pub fn value(self, region: &Region) -> Option<f64> {
        match self {
            Self::Rent(unit) => region.rent.get(&unit).copied(),
            Self::CrimeRate(category) => region
                .crime
                .get(&category)
                .and_then(|stats| stats.current_rate),
            Self::CrimeTrend(category) => region
                .crime
                .get(&category)
                .and_then(|stats| stats.trend_percent),
            Self::TransitStops(mode) => region.transit.get(&mode).copied().map(f64::from),
            Self::TransitTotal => region.transit_total().map(f64::from),
            Self::Income => region.income,
            Self::Population => region.population.map(|value| value as f64),
            Self::Households => region.households.map(|value| value as f64),
        }
        .filter(|value| value.is_finite())
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rent(unit) => write!(f, "rent[{}]", unit.code()),
            Self::CrimeRate(category) => write!(f, "crime_rate[{category}]"),
            Self::CrimeTrend(category) => write!(f, "crime_trend[{category}]"),
            Self::TransitStops(mode) => write!(f, "transit[{mode}]"),
            Self::TransitTotal => f.write_str("transit_total"),
            Self::Income => f.write_str("income"),
            Self::Population => f.write_str("population"),
            Self::Households => f.write_str("households"),
        }
    }
}

/// Metric reference stored in a criterion.
///
/// Unlike [`MetricKey`], a selector may depend on the request: the
/// [`MetricSelector::SelectedRent`] variant resolves to whichever unit size
/// the visitor picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum MetricSelector {
    /// Rent for the unit size chosen in the request.
    SelectedRent,
    /// Rent for a fixed unit size.
    Rent {
        /// Unit size to read.
        unit: UnitSize,
    },
    /// Current crime rate.
    CrimeRate {
        /// Crime category to read.
        category: CrimeCategory,
    },
    /// Crime trend percentage.
    CrimeTrend {
        /// Crime category to read.
        category: CrimeCategory,
    },
    /// Stops for one transit mode.
    TransitStops {
        /// Transit mode to read.
        mode: TransitMode,
    },
    /// Stops across all transit modes.
    TransitTotal,
    /// Median household income.
    Income,
    /// Resident population.
    Population,
    /// Number of households.
    Households,
}

impl MetricSelector {
    /// Resolve the selector against the unit size requested by the visitor.
    #[must_use]
    pub const fn resolve(self, unit: UnitSize) -> MetricKey {
        match self {
            Self::SelectedRent => MetricKey::Rent(unit),
            Self::Rent { unit: fixed } => MetricKey::Rent(fixed),
            Self::CrimeRate { category } => MetricKey::CrimeRate(category),
            Self::CrimeTrend { category } => MetricKey::CrimeTrend(category),
            Self::TransitStops { mode } => MetricKey::TransitStops(mode),
            Self::TransitTotal => MetricKey::TransitTotal,
            Self::Income => MetricKey::Income,
            Self::Population => MetricKey::Population,
            Self::Households => MetricKey::Households,
        }
    }

    /// Every key this selector can resolve to for some request.
    #[must_use]
    pub fn candidate_keys(self) -> Vec<MetricKey> {
        match self {
            Self::SelectedRent => UnitSize::ALL.into_iter().map(MetricKey::Rent).collect(),
            other => vec![other.resolve(UnitSize::Studio)],
        }
    }
}
