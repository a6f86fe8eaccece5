//! Source tables and the records extracted from them.
//!
//! A [`SourceTable`] is a decoded tabular file plus a declaration of which
//! column holds the key and which columns feed which [`Region`] field. The
//! declaration is explicit; no field is ever inferred from a column name.
//!
//! [`Region`]: opportunity_core::Region

use std::collections::BTreeSet;
use std::fmt;

use geo::MultiPolygon;
use opportunity_core::geometry::{parse_wkt, validate};
use opportunity_core::{CrimeCategory, RegionId, RegionIdError, TransitMode, UnitSize};

use crate::SchemaMismatch;

/// Largest float that still maps onto an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One cell of a decoded source table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CellValue {
    /// Empty cell (`null` in JSON).
    Missing,
    /// Integer cell.
    Integer(i64),
    /// Floating-point cell.
    Float(f64),
    /// Text cell.
    Text(String),
}

impl CellValue {
    /// Report whether the cell carries no value. Blank text counts as missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::Integer(_) | Self::Float(_) => false,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "source integers are ZIP codes, counts, and currency amounts"
    )]
    fn as_number(&self) -> Result<f64, String> {
        let value = match self {
            Self::Integer(value) => *value as f64,
            Self::Float(value) => *value,
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{text}' is not a number"))?,
            Self::Missing => return Err("value is missing".to_owned()),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("{value} is not finite"))
        }
    }

    fn as_integer(&self) -> Result<i64, String> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Float(value) => integral(*value).ok_or_else(|| format!("{value} is not a whole number")),
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("'{text}' is not a whole number")),
            Self::Missing => Err("value is missing".to_owned()),
        }
    }

    fn as_count(&self) -> Result<u64, String> {
        let value = self.as_integer()?;
        u64::try_from(value).map_err(|_| format!("{value} is negative"))
    }

    fn as_text(&self) -> Result<&str, String> {
        match self {
            Self::Text(text) => Ok(text.trim()),
            other => Err(format!("expected text, found {other:?}")),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    reason = "the value is checked to be integral and in range before the cast"
)]
fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.trunc() == value && value.abs() < MAX_EXACT_INTEGER)
        .then_some(value as i64)
}

/// Header row plus data rows of a decoded table.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTable {
    /// Column names in order.
    pub headers: Vec<String>,
    /// Data rows; each must be as wide as `headers`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Construct a table from its header.
    #[must_use]
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row while returning `self` for chaining.
    #[must_use]
    pub fn with_row(mut self, row: Vec<CellValue>) -> Self {
        self.rows.push(row);
        self
    }

    /// Position of a column, matched exactly.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

/// What the key column of a source identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KeyKind {
    /// ZIP code; rows create or extend regions.
    #[default]
    Region,
    /// County name; rows fan out to the regions of that county.
    County,
}

/// Region field a source column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "field", rename_all = "snake_case"))]
pub enum FieldTarget {
    /// County name.
    County,
    /// Post-office name.
    PlaceName,
    /// Boundary as WKT.
    Geometry,
    /// Resident population.
    Population,
    /// Household count.
    Households,
    /// Median household income.
    Income,
    /// Median rent for one unit size.
    Rent {
        /// Unit size the column reports.
        unit: UnitSize,
    },
    /// Current crime rate.
    CrimeRate {
        /// Category the column reports.
        category: CrimeCategory,
    },
    /// Year-over-year crime trend in percent.
    CrimeTrend {
        /// Category the column reports.
        category: CrimeCategory,
    },
    /// Stop count for one mode.
    TransitStops {
        /// Mode the column reports.
        mode: TransitMode,
    },
}

impl FieldTarget {
    /// Report whether a county-keyed source may set this field.
    ///
    /// Only rates and medians make sense for every ZIP in a county; counts,
    /// names, and boundaries belong to the ZIP itself.
    #[must_use]
    pub const fn fans_out(self) -> bool {
        matches!(
            self,
            Self::Income | Self::Rent { .. } | Self::CrimeRate { .. } | Self::CrimeTrend { .. }
        )
    }
}

impl fmt::Display for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::County => f.write_str("county"),
            Self::PlaceName => f.write_str("place_name"),
            Self::Geometry => f.write_str("geometry"),
            Self::Population => f.write_str("population"),
            Self::Households => f.write_str("households"),
            Self::Income => f.write_str("income"),
            Self::Rent { unit } => write!(f, "rent[{}]", unit.code()),
            Self::CrimeRate { category } => write!(f, "crime_rate[{category}]"),
            Self::CrimeTrend { category } => write!(f, "crime_trend[{category}]"),
            Self::TransitStops { mode } => write!(f, "transit[{mode}]"),
        }
    }
}

/// Maps one source column onto a region field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnBinding {
    /// Column name in the source header.
    pub column: String,
    /// Field the column feeds.
    pub target: FieldTarget,
}

/// A decoded table and the declaration of how it maps onto regions.
///
/// # Examples
/// ```
/// use opportunity_core::UnitSize;
/// use opportunity_data::{CellValue, FieldTarget, RawTable, SourceTable};
///
/// # fn main() -> Result<(), opportunity_data::SchemaMismatch> {
/// let table = RawTable::new(["ZIP", "RENT_1BD"])
///     .with_row(vec![CellValue::Integer(2134), CellValue::Float(2450.0)]);
/// let source = SourceTable::new("rent", "ZIP", table)
///     .bind("RENT_1BD", FieldTarget::Rent { unit: UnitSize::OneBedroom });
/// let records = source.records()?;
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].key.to_string(), "02134");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceTable {
    /// Identifier used in diagnostics, usually the file stem.
    pub source_id: String,
    /// Column holding the row key.
    pub key_column: String,
    /// What the key identifies.
    #[cfg_attr(feature = "serde", serde(default))]
    pub key_kind: KeyKind,
    /// Column bindings.
    pub bindings: Vec<ColumnBinding>,
    /// Table contents.
    pub table: RawTable,
}

impl SourceTable {
    /// Create a ZIP-keyed source with no bindings.
    #[must_use]
    pub fn new(source_id: impl Into<String>, key_column: impl Into<String>, table: RawTable) -> Self {
        Self {
            source_id: source_id.into(),
            key_column: key_column.into(),
            key_kind: KeyKind::Region,
            bindings: Vec::new(),
            table,
        }
    }

    /// Mark the key column as holding county names.
    #[must_use]
    pub const fn keyed_by_county(mut self) -> Self {
        self.key_kind = KeyKind::County;
        self
    }

    /// Bind a column to a region field.
    #[must_use]
    pub fn bind(mut self, column: impl Into<String>, target: FieldTarget) -> Self {
        self.bindings.push(ColumnBinding {
            column: column.into(),
            target,
        });
        self
    }

    /// Extract one record per bound, non-empty cell.
    ///
    /// Rows whose bound cells are all blank contribute no record; use
    /// [`SourceTable::extract`] when every row key matters.
    ///
    /// # Errors
    /// Returns [`SchemaMismatch`] under the same conditions as
    /// [`SourceTable::extract`].
    pub fn records(&self) -> Result<Vec<RawRecord<'_>>, SchemaMismatch> {
        self.extract().map(|extracted| extracted.records)
    }

    /// Extract every canonical row key and one record per bound, non-empty
    /// cell.
    ///
    /// Keys are canonicalised and checked for uniqueness within the source.
    /// County names compare case-insensitively after trimming.
    ///
    /// # Errors
    /// Returns [`SchemaMismatch`] when a declared column is absent, a row is
    /// ragged, a key is empty, malformed, or repeated, or a value cannot be
    /// read as its field's type.
    pub fn extract(&self) -> Result<Extracted<'_>, SchemaMismatch> {
        let key_index = self.column_index(&self.key_column)?;
        let bound = self
            .bindings
            .iter()
            .map(|binding| {
                if self.key_kind == KeyKind::County && !binding.target.fans_out() {
                    return Err(SchemaMismatch::UnsupportedBinding {
                        source_id: self.source_id.clone(),
                        column: binding.column.clone(),
                        field: binding.target.to_string(),
                    });
                }
                Ok((self.column_index(&binding.column)?, binding))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let width = self.table.headers.len();
        let mut seen = BTreeSet::new();
        let mut keys = Vec::with_capacity(self.table.rows.len());
        let mut records = Vec::new();
        for (row_index, row) in self.table.rows.iter().enumerate() {
            if row.len() != width {
                return Err(SchemaMismatch::RaggedRow {
                    source_id: self.source_id.clone(),
                    row: row_index,
                    expected: width,
                    found: row.len(),
                });
            }
            let key = self.row_key(row_index, row.get(key_index))?;
            if !seen.insert(key.canonical()) {
                return Err(SchemaMismatch::DuplicateKey {
                    source_id: self.source_id.clone(),
                    key: key.to_string(),
                });
            }
            for (index, binding) in &bound {
                let Some(cell) = row.get(*index).filter(|cell| !cell.is_missing()) else {
                    continue;
                };
                let value = self.read_value(binding, &key, cell)?;
                records.push(RawRecord {
                    source_id: &self.source_id,
                    column: &binding.column,
                    key: key.clone(),
                    value,
                });
            }
            keys.push(key);
        }
        Ok(Extracted { keys, records })
    }

    fn column_index(&self, column: &str) -> Result<usize, SchemaMismatch> {
        self.table
            .column_index(column)
            .ok_or_else(|| SchemaMismatch::MissingColumn {
                source_id: self.source_id.clone(),
                column: column.to_owned(),
            })
    }

    fn row_key(&self, row: usize, cell: Option<&CellValue>) -> Result<RecordKey, SchemaMismatch> {
        let missing = || SchemaMismatch::MissingKey {
            source_id: self.source_id.clone(),
            column: self.key_column.clone(),
            row,
        };
        let cell = cell.filter(|cell| !cell.is_missing()).ok_or_else(missing)?;
        match self.key_kind {
            KeyKind::Region => canonical_region_id(cell)
                .map(RecordKey::Region)
                .map_err(|source| SchemaMismatch::InvalidKey {
                    source_id: self.source_id.clone(),
                    column: self.key_column.clone(),
                    row,
                    source,
                }),
            KeyKind::County => match cell {
                CellValue::Text(name) => Ok(RecordKey::County(name.trim().to_owned())),
                _ => Err(missing()),
            },
        }
    }

    fn read_value(
        &self,
        binding: &ColumnBinding,
        key: &RecordKey,
        cell: &CellValue,
    ) -> Result<FieldValue, SchemaMismatch> {
        let invalid = |reason: String| SchemaMismatch::InvalidValue {
            source_id: self.source_id.clone(),
            column: binding.column.clone(),
            key: key.to_string(),
            reason,
        };
        let value = match binding.target {
            FieldTarget::County => FieldValue::County(cell.as_text().map_err(invalid)?.to_owned()),
            FieldTarget::PlaceName => {
                FieldValue::PlaceName(cell.as_text().map_err(invalid)?.to_owned())
            }
            FieldTarget::Geometry => {
                let text = cell.as_text().map_err(invalid)?;
                let shape = parse_wkt(text)
                    .and_then(|shape| validate(&shape).map(|()| shape))
                    .map_err(|source| SchemaMismatch::InvalidGeometry {
                        source_id: self.source_id.clone(),
                        column: binding.column.clone(),
                        key: key.to_string(),
                        source,
                    })?;
                FieldValue::Geometry(shape)
            }
            FieldTarget::Population => FieldValue::Population(cell.as_count().map_err(invalid)?),
            FieldTarget::Households => FieldValue::Households(cell.as_count().map_err(invalid)?),
            FieldTarget::Income => FieldValue::Income(cell.as_number().map_err(invalid)?),
            FieldTarget::Rent { unit } => FieldValue::Rent(unit, cell.as_number().map_err(invalid)?),
            FieldTarget::CrimeRate { category } => {
                FieldValue::CrimeRate(category, cell.as_number().map_err(invalid)?)
            }
            FieldTarget::CrimeTrend { category } => {
                FieldValue::CrimeTrend(category, cell.as_number().map_err(invalid)?)
            }
            FieldTarget::TransitStops { mode } => {
                let count = cell.as_count().map_err(&invalid)?;
                let stops = u32::try_from(count)
                    .map_err(|_| invalid(format!("{count} stops exceeds the supported range")))?;
                FieldValue::TransitStops(mode, stops)
            }
        };
        Ok(value)
    }
}

/// Canonicalise a ZIP cell.
///
/// Integers and whole floats are zero padded; text is trimmed and may carry a
/// ZIP+4 suffix.
fn canonical_region_id(cell: &CellValue) -> Result<RegionId, RegionIdError> {
    match cell {
        CellValue::Integer(value) => RegionId::from_integer(*value),
        CellValue::Float(value) => match integral(*value) {
            Some(whole) => RegionId::from_integer(whole),
            None => Err(RegionIdError::Malformed {
                raw: value.to_string(),
            }),
        },
        CellValue::Text(text) => RegionId::parse(text),
        CellValue::Missing => Err(RegionIdError::Empty),
    }
}

/// Key of a raw record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordKey {
    /// Canonical ZIP code.
    Region(RegionId),
    /// Trimmed county name.
    County(String),
}

impl RecordKey {
    /// Key used for equality across rows and sources. County names are
    /// lowercased; ZIP codes are already canonical.
    #[must_use]
    pub fn canonical(&self) -> Self {
        match self {
            Self::Region(id) => Self::Region(id.clone()),
            Self::County(name) => Self::County(county_key(name)),
        }
    }
}

/// Case-insensitive form of a county name.
pub(crate) fn county_key(county: &str) -> String {
    county.trim().to_lowercase()
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(id) => write!(f, "{id}"),
            Self::County(name) => f.write_str(name),
        }
    }
}

/// Typed value destined for one region field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// County name.
    County(String),
    /// Post-office name.
    PlaceName(String),
    /// Validated boundary.
    Geometry(MultiPolygon<f64>),
    /// Resident population.
    Population(u64),
    /// Household count.
    Households(u64),
    /// Median household income.
    Income(f64),
    /// Median rent for a unit size.
    Rent(UnitSize, f64),
    /// Current crime rate for a category.
    CrimeRate(CrimeCategory, f64),
    /// Crime trend for a category.
    CrimeTrend(CrimeCategory, f64),
    /// Stop count for a mode.
    TransitStops(TransitMode, u32),
}

impl FieldValue {
    /// Field this value targets.
    #[must_use]
    pub const fn target(&self) -> FieldTarget {
        match self {
            Self::County(_) => FieldTarget::County,
            Self::PlaceName(_) => FieldTarget::PlaceName,
            Self::Geometry(_) => FieldTarget::Geometry,
            Self::Population(_) => FieldTarget::Population,
            Self::Households(_) => FieldTarget::Households,
            Self::Income(_) => FieldTarget::Income,
            Self::Rent(unit, _) => FieldTarget::Rent { unit: *unit },
            Self::CrimeRate(category, _) => FieldTarget::CrimeRate {
                category: *category,
            },
            Self::CrimeTrend(category, _) => FieldTarget::CrimeTrend {
                category: *category,
            },
            Self::TransitStops(mode, _) => FieldTarget::TransitStops { mode: *mode },
        }
    }
}

/// Everything a source contributes to a consolidation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<'a> {
    /// Canonical key of every row, in row order.
    pub keys: Vec<RecordKey>,
    /// Values from bound, non-empty cells.
    pub records: Vec<RawRecord<'a>>,
}

/// One value from one source, addressed to one region field.
///
/// Records only live for the duration of a consolidation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<'a> {
    /// Source the value came from.
    pub source_id: &'a str,
    /// Column the value came from.
    pub column: &'a str,
    /// Row key.
    pub key: RecordKey,
    /// Typed value.
    pub value: FieldValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn rent_table() -> RawTable {
        RawTable::new(["ZIP", "RENT_1BD", "PO_NAME"])
            .with_row(vec![
                CellValue::Integer(2134),
                CellValue::Float(2450.0),
                CellValue::Text("Allston".into()),
            ])
            .with_row(vec![
                CellValue::Text(" 94110-1234 ".into()),
                CellValue::Missing,
                CellValue::Text("San Francisco".into()),
            ])
    }

    #[rstest]
    #[case(CellValue::Integer(94110), "94110")]
    #[case(CellValue::Float(2134.0), "02134")]
    #[case(CellValue::Text("501".into()), "00501")]
    #[case(CellValue::Text("94110-1234".into()), "94110")]
    fn region_keys_are_canonicalised(#[case] cell: CellValue, #[case] expected: &str) {
        assert_eq!(canonical_region_id(&cell).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case(CellValue::Float(94110.5))]
    #[case(CellValue::Integer(-3))]
    #[case(CellValue::Text("ZIP".into()))]
    fn malformed_region_keys_are_rejected(#[case] cell: CellValue) {
        assert!(canonical_region_id(&cell).is_err());
    }

    #[rstest]
    fn missing_cells_produce_no_record(rent_table: RawTable) {
        let source = SourceTable::new("rent", "ZIP", rent_table)
            .bind("RENT_1BD", FieldTarget::Rent { unit: UnitSize::OneBedroom })
            .bind("PO_NAME", FieldTarget::PlaceName);
        let records = source.records().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.source_id == "rent"));
        let rents: Vec<_> = records
            .iter()
            .filter(|record| matches!(record.value, FieldValue::Rent(..)))
            .collect();
        assert_eq!(rents.len(), 1);
        assert_eq!(rents[0].key.to_string(), "02134");
    }

    #[rstest]
    fn absent_bound_column_names_source_and_column(rent_table: RawTable) {
        let source = SourceTable::new("rent", "ZIP", rent_table).bind("RENT_2BD", FieldTarget::Income);
        assert_eq!(
            source.records().unwrap_err(),
            SchemaMismatch::MissingColumn {
                source_id: "rent".into(),
                column: "RENT_2BD".into(),
            }
        );
    }

    #[rstest]
    fn absent_key_column_is_reported(rent_table: RawTable) {
        let source = SourceTable::new("rent", "ZIPCODE", rent_table);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::MissingColumn { column, .. }) if column == "ZIPCODE"
        ));
    }

    #[rstest]
    fn keys_that_collide_after_canonicalisation_are_duplicates() {
        let table = RawTable::new(["ZIP", "INCOME"])
            .with_row(vec![CellValue::Integer(2134), CellValue::Integer(70_000)])
            .with_row(vec![CellValue::Text("02134".into()), CellValue::Integer(71_000)]);
        let source = SourceTable::new("income", "ZIP", table).bind("INCOME", FieldTarget::Income);
        assert_eq!(
            source.records().unwrap_err(),
            SchemaMismatch::DuplicateKey {
                source_id: "income".into(),
                key: "02134".into(),
            }
        );
    }

    #[rstest]
    fn every_row_key_is_reported_even_without_values(rent_table: RawTable) {
        let source = SourceTable::new("rent", "ZIP", rent_table)
            .bind("RENT_1BD", FieldTarget::Rent { unit: UnitSize::OneBedroom });
        let extracted = source.extract().unwrap();
        let keys: Vec<String> = extracted.keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["02134", "94110"]);
        assert_eq!(extracted.records.len(), 1);
    }

    #[rstest]
    fn key_only_sources_report_keys_and_no_records() {
        let table = RawTable::new(["ZIP"]).with_row(vec![CellValue::Integer(94110)]);
        let source = SourceTable::new("zips", "ZIP", table);
        let extracted = source.extract().unwrap();
        assert_eq!(extracted.keys.len(), 1);
        assert!(extracted.records.is_empty());
    }

    #[rstest]
    fn county_keys_differing_only_in_case_are_duplicates() {
        let table = RawTable::new(["COUNTY", "MEDIAN"])
            .with_row(vec![CellValue::Text("San Mateo".into()), CellValue::Integer(120_000)])
            .with_row(vec![CellValue::Text(" san mateo".into()), CellValue::Integer(120_000)]);
        let source = SourceTable::new("county_income", "COUNTY", table)
            .keyed_by_county()
            .bind("MEDIAN", FieldTarget::Income);
        assert_eq!(
            source.records().unwrap_err(),
            SchemaMismatch::DuplicateKey {
                source_id: "county_income".into(),
                key: "san mateo".into(),
            }
        );
    }

    #[rstest]
    fn ragged_rows_are_rejected() {
        let table = RawTable::new(["ZIP", "INCOME"]).with_row(vec![CellValue::Integer(94110)]);
        let source = SourceTable::new("income", "ZIP", table);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::RaggedRow { row: 0, expected: 2, found: 1, .. })
        ));
    }

    #[rstest]
    fn empty_key_is_reported_with_row() {
        let table = RawTable::new(["ZIP"]).with_row(vec![CellValue::Text("  ".into())]);
        let source = SourceTable::new("geo", "ZIP", table);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::MissingKey { row: 0, .. })
        ));
    }

    #[rstest]
    #[case(FieldTarget::Population, CellValue::Integer(-10))]
    #[case(FieldTarget::Income, CellValue::Text("n/a".into()))]
    #[case(FieldTarget::TransitStops { mode: TransitMode::Bus }, CellValue::Float(2.5))]
    #[case(FieldTarget::County, CellValue::Integer(6001))]
    fn values_must_match_field_type(#[case] target: FieldTarget, #[case] cell: CellValue) {
        let table = RawTable::new(["ZIP", "VALUE"]).with_row(vec![CellValue::Integer(94110), cell]);
        let source = SourceTable::new("mixed", "ZIP", table).bind("VALUE", target);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::InvalidValue { column, .. }) if column == "VALUE"
        ));
    }

    #[rstest]
    fn numeric_text_is_accepted_for_numbers() {
        let table = RawTable::new(["ZIP", "INCOME"])
            .with_row(vec![CellValue::Integer(94110), CellValue::Text(" 81250.5 ".into())]);
        let source = SourceTable::new("income", "ZIP", table).bind("INCOME", FieldTarget::Income);
        let records = source.records().unwrap();
        assert_eq!(records[0].value, FieldValue::Income(81_250.5));
    }

    #[rstest]
    fn geometry_cells_are_decoded_and_validated() {
        let table = RawTable::new(["ZIP", "WKT"])
            .with_row(vec![
                CellValue::Integer(94110),
                CellValue::Text("POLYGON((0 0,1 0,1 1,0 1,0 0))".into()),
            ])
            .with_row(vec![
                CellValue::Integer(94111),
                CellValue::Text("POLYGON((0 0,1 1,1 0,0 1,0 0))".into()),
            ]);
        let source = SourceTable::new("shapes", "ZIP", table).bind("WKT", FieldTarget::Geometry);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::InvalidGeometry { key, .. }) if key == "94111"
        ));
    }

    #[rstest]
    fn county_sources_reject_region_only_fields() {
        let table = RawTable::new(["COUNTY", "POP"])
            .with_row(vec![CellValue::Text("Marin".into()), CellValue::Integer(260_000)]);
        let source = SourceTable::new("county_pop", "COUNTY", table)
            .keyed_by_county()
            .bind("POP", FieldTarget::Population);
        assert!(matches!(
            source.records(),
            Err(SchemaMismatch::UnsupportedBinding { field, .. }) if field == "population"
        ));
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn source_tables_decode_from_json() {
        let json = r#"{
            "source_id": "crime",
            "key_column": "COUNTY",
            "key_kind": "county",
            "bindings": [
                {"column": "VIOL", "target": {"field": "crime_rate", "category": "violent"}}
            ],
            "table": {
                "headers": ["COUNTY", "VIOL"],
                "rows": [["Alameda", 4.5], ["Marin", null]]
            }
        }"#;
        let source: SourceTable = serde_json::from_str(json).unwrap();
        assert_eq!(source.key_kind, KeyKind::County);
        assert_eq!(source.table.rows[1][1], CellValue::Missing);
        let records = source.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].value,
            FieldValue::CrimeRate(CrimeCategory::Violent, 4.5)
        );
    }
}
