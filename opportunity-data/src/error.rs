//! Fatal errors raised while consolidating source tables.

use opportunity_core::{GeometryError, RegionIdError, RegionTableError};
use thiserror::Error;

/// A source table does not match the shape its bindings declare.
///
/// Every variant names the offending source so the caller can point at the
/// file that needs fixing. The whole consolidation pass is abandoned.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaMismatch {
    /// A declared key or bound column is missing from the header.
    #[error("source '{source_id}' has no column '{column}'")]
    MissingColumn {
        /// Offending source.
        source_id: String,
        /// Column that was expected.
        column: String,
    },
    /// A row had a different number of cells than the header.
    #[error("source '{source_id}' row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Offending source.
        source_id: String,
        /// Zero-based row index.
        row: usize,
        /// Header width.
        expected: usize,
        /// Cells found.
        found: usize,
    },
    /// A row had no value in its key column.
    #[error("source '{source_id}' row {row} has an empty '{column}' key")]
    MissingKey {
        /// Offending source.
        source_id: String,
        /// Key column.
        column: String,
        /// Zero-based row index.
        row: usize,
    },
    /// A ZIP key could not be canonicalised.
    #[error("source '{source_id}' row {row} has an invalid '{column}' key")]
    InvalidKey {
        /// Offending source.
        source_id: String,
        /// Key column.
        column: String,
        /// Zero-based row index.
        row: usize,
        /// Canonicalisation failure.
        #[source]
        source: RegionIdError,
    },
    /// The same key appeared twice in one source.
    #[error("source '{source_id}' contains more than one row for '{key}'")]
    DuplicateKey {
        /// Offending source.
        source_id: String,
        /// Repeated key.
        key: String,
    },
    /// A cell could not be read as the type its binding requires.
    #[error("source '{source_id}' column '{column}' for '{key}' is invalid: {reason}")]
    InvalidValue {
        /// Offending source.
        source_id: String,
        /// Column holding the value.
        column: String,
        /// Row key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A geometry cell held unusable WKT or an invalid polygon.
    #[error("source '{source_id}' column '{column}' for '{key}' holds an invalid geometry")]
    InvalidGeometry {
        /// Offending source.
        source_id: String,
        /// Column holding the geometry.
        column: String,
        /// Row key.
        key: String,
        /// Decoding or validation failure.
        #[source]
        source: GeometryError,
    },
    /// Two sources supplied different values for one region field.
    #[error(
        "source '{source_id}' sets {field} for '{key}', which '{previous_source}' already set to a different value"
    )]
    FieldConflict {
        /// Source that supplied the second value.
        source_id: String,
        /// Source that supplied the first value.
        previous_source: String,
        /// Region key.
        key: String,
        /// Field description.
        field: String,
    },
    /// A binding is not allowed for the source's key kind.
    #[error("source '{source_id}' binds column '{column}' to {field}, which a county-keyed source cannot set")]
    UnsupportedBinding {
        /// Offending source.
        source_id: String,
        /// Bound column.
        column: String,
        /// Field description.
        field: String,
    },
    /// The joined rows failed region-table validation.
    #[error("consolidated regions are inconsistent")]
    Table(#[from] RegionTableError),
}
