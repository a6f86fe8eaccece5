//! Combination of per-county crime tables.
//!
//! Crime statistics arrive as one table per county whose first column names
//! the crime category and whose remaining columns hold rates and trends. The
//! tables are stacked into one long table tagged with the county, then
//! pivoted into a county-keyed [`SourceTable`] that consolidation can fan out
//! to ZIP codes.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use log::{info, warn};
use opportunity_core::CrimeCategory;
use thiserror::Error;

use crate::{CellValue, CountyLabelError, CountyLabels, FieldTarget, RawTable, SourceTable};

/// Name given to the first column of every county crime table.
pub const CRIME_CATEGORY_COLUMN: &str = "CRIME_CATEGORY";
/// Column attached to every row of the combined table.
pub const COUNTY_COLUMN: &str = "COUNTY";

const PIVOT_CATEGORIES: [CrimeCategory; 2] = [CrimeCategory::Violent, CrimeCategory::Property];

/// Errors raised while combining or pivoting county crime tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrimeTableError {
    /// No files were supplied.
    #[error("no county crime tables supplied")]
    NoFiles,
    /// A file had no columns.
    #[error("crime table '{file_id}' has no columns")]
    EmptyHeader {
        /// Offending file.
        file_id: String,
    },
    /// A file already carried a county column.
    #[error("crime table '{file_id}' already has a 'COUNTY' column")]
    CountyColumnPresent {
        /// Offending file.
        file_id: String,
    },
    /// A row was wider or narrower than its header.
    #[error("crime table '{file_id}' row {row} does not match its header")]
    RaggedRow {
        /// Offending file.
        file_id: String,
        /// Zero-based row index.
        row: usize,
    },
    /// The county label could not be resolved.
    #[error(transparent)]
    Label(#[from] CountyLabelError),
    /// The combined table lacks a column needed for the pivot.
    #[error("combined crime table has no column '{column}'")]
    MissingColumn {
        /// Column that was expected.
        column: String,
    },
    /// One county reported the same category twice.
    #[error("county '{county}' reports {category} crime more than once")]
    DuplicateCategory {
        /// County name.
        county: String,
        /// Repeated category.
        category: CrimeCategory,
    },
}

/// One county's crime table and the identifier of the file it came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountyCrimeFile {
    /// File identifier looked up in [`CountyLabels`].
    pub file_id: String,
    /// Decoded table.
    pub table: RawTable,
}

/// Stack per-county crime tables into one long table.
///
/// The first column of each table becomes [`CRIME_CATEGORY_COLUMN`] and a
/// [`COUNTY_COLUMN`] is appended from `labels`. Columns are the union of all
/// inputs in first-seen order; cells a table does not have are missing.
///
/// # Errors
/// Returns [`CrimeTableError`] when no files are given, a header is empty or
/// already has a county column, a row is ragged, or a label is unknown.
pub fn combine_county_crime_tables(
    files: &[CountyCrimeFile],
    labels: &CountyLabels,
) -> Result<RawTable, CrimeTableError> {
    if files.is_empty() {
        return Err(CrimeTableError::NoFiles);
    }
    if files.len() < labels.len() {
        warn!(
            "combining {} county crime tables; {} counties are labelled",
            files.len(),
            labels.len()
        );
    }

    let mut headers = vec![CRIME_CATEGORY_COLUMN.to_owned()];
    for file in files {
        check_header(file)?;
        for column in file.table.headers.iter().skip(1) {
            if !headers.contains(column) {
                headers.push(column.clone());
            }
        }
    }
    headers.push(COUNTY_COLUMN.to_owned());

    let mut combined = RawTable {
        headers,
        rows: Vec::new(),
    };
    for file in files {
        let county = labels.resolve(&file.file_id)?;
        append_file(&mut combined, file, county)?;
    }
    info!(
        "combined {} county crime tables into {} rows",
        files.len(),
        combined.rows.len()
    );
    Ok(combined)
}

fn check_header(file: &CountyCrimeFile) -> Result<(), CrimeTableError> {
    let headers = &file.table.headers;
    if headers.is_empty() {
        return Err(CrimeTableError::EmptyHeader {
            file_id: file.file_id.clone(),
        });
    }
    if headers.iter().skip(1).any(|column| column == COUNTY_COLUMN) {
        return Err(CrimeTableError::CountyColumnPresent {
            file_id: file.file_id.clone(),
        });
    }
    Ok(())
}

fn append_file(
    combined: &mut RawTable,
    file: &CountyCrimeFile,
    county: &str,
) -> Result<(), CrimeTableError> {
    // Target position of each source column; the first column is always the
    // category.
    let positions: Vec<Option<usize>> = file
        .table
        .headers
        .iter()
        .enumerate()
        .map(|(index, column)| {
            if index == 0 {
                Some(0)
            } else {
                combined.column_index(column)
            }
        })
        .collect();
    let width = combined.headers.len();
    for (row_index, row) in file.table.rows.iter().enumerate() {
        if row.len() != positions.len() {
            return Err(CrimeTableError::RaggedRow {
                file_id: file.file_id.clone(),
                row: row_index,
            });
        }
        let mut out = vec![CellValue::Missing; width];
        for (cell, position) in row.iter().zip(&positions) {
            if let Some(slot) = position.and_then(|index| out.get_mut(index)) {
                *slot = cell.clone();
            }
        }
        if let Some(slot) = out.last_mut() {
            *slot = CellValue::Text(county.to_owned());
        }
        combined.rows.push(out);
    }
    Ok(())
}

/// Pivot a combined crime table into a county-keyed source.
///
/// For every recognised category the rate and trend columns become
/// `<CATEGORY>_RATE` and `<CATEGORY>_TREND` bound to
/// [`FieldTarget::CrimeRate`] and [`FieldTarget::CrimeTrend`]. Rows whose
/// category is not recognised are skipped with a warning. Counties appear in
/// ascending order.
///
/// # Errors
/// Returns [`CrimeTableError::MissingColumn`] when a required column is
/// absent and [`CrimeTableError::DuplicateCategory`] when a county repeats a
/// category.
///
/// # Examples
/// ```
/// use opportunity_data::{CellValue, RawTable, pivot_by_county};
///
/// # fn main() -> Result<(), opportunity_data::CrimeTableError> {
/// let combined = RawTable::new(["CRIME_CATEGORY", "RATE", "TREND", "COUNTY"]).with_row(vec![
///     CellValue::Text("Violent Crimes".into()),
///     CellValue::Float(4.1),
///     CellValue::Float(-2.0),
///     CellValue::Text("Marin".into()),
/// ]);
/// let source = pivot_by_county("crime", &combined, "RATE", "TREND")?;
/// assert_eq!(source.table.rows.len(), 1);
/// assert_eq!(source.bindings.len(), 4);
/// # Ok(())
/// # }
/// ```
pub fn pivot_by_county(
    source_id: impl Into<String>,
    combined: &RawTable,
    rate_column: &str,
    trend_column: &str,
) -> Result<SourceTable, CrimeTableError> {
    let column = |name: &str| {
        combined
            .column_index(name)
            .ok_or_else(|| CrimeTableError::MissingColumn {
                column: name.to_owned(),
            })
    };
    let category_index = column(CRIME_CATEGORY_COLUMN)?;
    let county_index = column(COUNTY_COLUMN)?;
    let rate_index = column(rate_column)?;
    let trend_index = column(trend_column)?;

    let mut counties: BTreeMap<String, BTreeMap<CrimeCategory, (CellValue, CellValue)>> =
        BTreeMap::new();
    for row in &combined.rows {
        let cell = |index: usize| row.get(index).cloned().unwrap_or(CellValue::Missing);
        let Some(county) = text_of(row.get(county_index)) else {
            warn!("skipping crime row without a county");
            continue;
        };
        let label = text_of(row.get(category_index)).unwrap_or_default();
        let Some(category) = recognise_category(label) else {
            warn!("skipping unrecognised crime category '{label}' for {county}");
            continue;
        };
        match counties.entry(county.to_owned()).or_default().entry(category) {
            Entry::Occupied(_) => {
                return Err(CrimeTableError::DuplicateCategory {
                    county: county.to_owned(),
                    category,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert((cell(rate_index), cell(trend_index)));
            }
        }
    }

    let mut headers = vec![COUNTY_COLUMN.to_owned()];
    let mut source = SourceTable::new(source_id, COUNTY_COLUMN, RawTable::default()).keyed_by_county();
    for category in PIVOT_CATEGORIES {
        let prefix = category.as_str().to_ascii_uppercase();
        let rate = format!("{prefix}_RATE");
        let trend = format!("{prefix}_TREND");
        source = source
            .bind(rate.clone(), FieldTarget::CrimeRate { category })
            .bind(trend.clone(), FieldTarget::CrimeTrend { category });
        headers.push(rate);
        headers.push(trend);
    }
    source.table.headers = headers;
    source.table.rows = counties
        .into_iter()
        .map(|(county, categories)| {
            let mut row = vec![CellValue::Text(county)];
            for category in PIVOT_CATEGORIES {
                let (rate, trend) = categories
                    .get(&category)
                    .cloned()
                    .unwrap_or((CellValue::Missing, CellValue::Missing));
                row.push(rate);
                row.push(trend);
            }
            row
        })
        .collect();
    Ok(source)
}

fn text_of(cell: Option<&CellValue>) -> Option<&str> {
    match cell {
        Some(CellValue::Text(text)) if !text.trim().is_empty() => Some(text.trim()),
        _ => None,
    }
}

/// Category named by the first word of a label such as `Violent Crimes`.
fn recognise_category(label: &str) -> Option<CrimeCategory> {
    label.split_whitespace().next()?.parse().ok()
}
