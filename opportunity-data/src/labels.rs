//! County labels for per-county source files.
//!
//! County names come from an explicit mapping keyed by file identifier. The
//! older filename heuristic survives as [`legacy_county_token`] so existing
//! datasets can be checked against the mapping during migration.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised while resolving a county label.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountyLabelError {
    /// No label was registered for the file.
    #[error("no county label registered for '{file_id}'")]
    Unknown {
        /// File identifier that was looked up.
        file_id: String,
    },
    /// A label or identifier was blank.
    #[error("county label for '{file_id}' is blank")]
    Blank {
        /// File identifier being registered.
        file_id: String,
    },
    /// The legacy heuristic found fewer than two tokens.
    #[error("file name '{file_name}' has no county token")]
    NoToken {
        /// File name that was split.
        file_name: String,
    },
}

/// Mapping from canonical file identifiers to county names.
///
/// Identifiers are compared case-insensitively and without a `.csv` suffix,
/// so `crime_san_mateo.csv` and `CRIME_SAN_MATEO` resolve alike.
///
/// # Examples
/// ```
/// use opportunity_data::CountyLabels;
///
/// let labels = CountyLabels::bay_area();
/// assert_eq!(labels.resolve("crime_san_mateo.csv"), Ok("San Mateo"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CountyLabels {
    by_file: BTreeMap<String, String>,
}

const BAY_AREA: [(&str, &str); 9] = [
    ("crime_alameda", "Alameda"),
    ("crime_contra_costa", "Contra Costa"),
    ("crime_marin", "Marin"),
    ("crime_napa", "Napa"),
    ("crime_san_francisco", "San Francisco"),
    ("crime_san_mateo", "San Mateo"),
    ("crime_santa_clara", "Santa Clara"),
    ("crime_solano", "Solano"),
    ("crime_sonoma", "Sonoma"),
];

impl CountyLabels {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels for the nine Bay Area county crime files.
    #[must_use]
    pub fn bay_area() -> Self {
        Self {
            by_file: BAY_AREA
                .iter()
                .map(|(file, county)| (canonical_file_id(file), (*county).to_owned()))
                .collect(),
        }
    }

    /// Register or replace the county for a file identifier.
    ///
    /// # Errors
    /// Returns [`CountyLabelError::Blank`] when either side is blank.
    pub fn insert(
        &mut self,
        file_id: &str,
        county: impl Into<String>,
    ) -> Result<(), CountyLabelError> {
        let county = county.into();
        let key = canonical_file_id(file_id);
        if key.is_empty() || county.trim().is_empty() {
            return Err(CountyLabelError::Blank {
                file_id: file_id.to_owned(),
            });
        }
        self.by_file.insert(key, county.trim().to_owned());
        Ok(())
    }

    /// County registered for `file_id`.
    ///
    /// # Errors
    /// Returns [`CountyLabelError::Unknown`] when nothing is registered.
    pub fn resolve(&self, file_id: &str) -> Result<&str, CountyLabelError> {
        self.by_file
            .get(&canonical_file_id(file_id))
            .map(String::as_str)
            .ok_or_else(|| CountyLabelError::Unknown {
                file_id: file_id.to_owned(),
            })
    }

    /// Number of registered files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    /// Report whether no files are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

fn canonical_file_id(file_id: &str) -> String {
    let trimmed = file_id.trim();
    let lowered = trimmed.to_ascii_lowercase();
    lowered
        .strip_suffix(".csv")
        .map_or_else(|| lowered.clone(), str::to_owned)
}

/// County token derived from a crime file name by the historical heuristic.
///
/// Strips `crime_` and `.csv`, turns underscores into spaces, title-cases the
/// result and keeps the second whitespace token. Multi-word counties come out
/// truncated (`crime_2024_san_mateo.csv` yields `San`), so this is only fit
/// for cross-checking an explicit [`CountyLabels`] mapping.
///
/// # Errors
/// Returns [`CountyLabelError::NoToken`] when the name has fewer than two
/// tokens.
///
/// # Examples
/// ```
/// use opportunity_data::legacy_county_token;
///
/// assert_eq!(legacy_county_token("crime_2024_alameda.csv").as_deref(), Ok("Alameda"));
/// assert_eq!(legacy_county_token("crime_2024_san_mateo.csv").as_deref(), Ok("San"));
/// ```
pub fn legacy_county_token(file_name: &str) -> Result<String, CountyLabelError> {
    let stripped = file_name
        .replace("crime_", "")
        .replace(".csv", "")
        .replace('_', " ");
    title_case(&stripped)
        .split_whitespace()
        .nth(1)
        .map(str::to_owned)
        .ok_or_else(|| CountyLabelError::NoToken {
            file_name: file_name.to_owned(),
        })
}

/// Upper-case the first letter of every alphabetic run and lower-case the
/// rest.
fn title_case(text: &str) -> String {
    let mut previous_alphabetic = false;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            out.push(ch);
            previous_alphabetic = false;
        }
    }
    out
}
