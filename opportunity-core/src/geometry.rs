//! Boundary geometry decoding and validation.
//!
//! Region boundaries travel as WKT text. Both `POLYGON` and `MULTIPOLYGON`
//! are accepted and normalised to a [`MultiPolygon`] so ZIP codes made of
//! several islands need no special casing downstream.
//!
//! # Examples
//! ```
//! use opportunity_core::geometry::{parse_wkt, to_wkt};
//!
//! # fn main() -> Result<(), opportunity_core::GeometryError> {
//! let shape = parse_wkt("POLYGON((0 0,1 0,1 1,0 1,0 0))")?;
//! assert_eq!(shape.0.len(), 1);
//! assert!(to_wkt(&shape).starts_with("MULTIPOLYGON"));
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;

use geo::{Geometry, MultiPolygon, Validation};
use thiserror::Error;
use wkt::{ToWkt, Wkt};

/// Errors raised while decoding or validating a boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// The WKT text was empty.
    #[error("geometry text is empty")]
    Empty,
    /// The WKT text could not be parsed.
    #[error("failed to parse WKT: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
    /// The geometry was not areal.
    #[error("expected a polygon or multipolygon, found {kind}")]
    UnsupportedType {
        /// Geometry type that was found.
        kind: &'static str,
    },
    /// The polygon rings self-intersect or are otherwise malformed.
    #[error("geometry is not valid (self-intersecting or malformed rings)")]
    Invalid,
}

/// Decode WKT into a multipolygon without validating ring topology.
///
/// # Errors
/// Returns [`GeometryError`] when the text is empty, unparsable, or describes
/// a non-areal geometry.
pub fn parse_wkt(text: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GeometryError::Empty);
    }
    let parsed = Wkt::<f64>::from_str(trimmed).map_err(|err| GeometryError::Parse {
        message: err.to_string(),
    })?;
    let geometry = Geometry::<f64>::try_from(parsed).map_err(|err| GeometryError::Parse {
        message: err.to_string(),
    })?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Ok(multi),
        other => Err(GeometryError::UnsupportedType {
            kind: geometry_kind(&other),
        }),
    }
}

/// Encode a multipolygon as WKT.
#[must_use]
pub fn to_wkt(geometry: &MultiPolygon<f64>) -> String {
    geometry.wkt_string()
}

/// Check that a multipolygon is topologically valid.
///
/// # Errors
/// Returns [`GeometryError::Invalid`] for self-intersecting or malformed rings.
pub fn validate(geometry: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if geometry.is_valid() {
        Ok(())
    } else {
        Err(GeometryError::Invalid)
    }
}

const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) | Geometry::LineString(_) => "LINESTRING",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        _ => "non-areal geometry",
    }
}

/// Serde adapters encoding geometry fields as WKT strings.
#[cfg(feature = "serde")]
pub mod serde_wkt {
    use geo::MultiPolygon;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Serialise a multipolygon as WKT.
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn serialize<S>(geometry: &MultiPolygon<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_wkt(geometry))
    }

    /// Deserialise a multipolygon from WKT.
    ///
    /// # Errors
    /// Fails when the text is not a polygon or multipolygon.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<MultiPolygon<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse_wkt(&text).map_err(D::Error::custom)
    }

    /// Adapters for optional geometry fields; `null` and empty text map to `None`.
    pub mod optional {
        use geo::MultiPolygon;
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        /// Serialise an optional multipolygon as WKT or `null`.
        ///
        /// # Errors
        /// Propagates serializer failures.
        #[expect(
            clippy::ref_option,
            reason = "serde `with` adapters receive a reference to the field"
        )]
        pub fn serialize<S>(
            geometry: &Option<MultiPolygon<f64>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match geometry {
                Some(shape) => serializer.serialize_some(&crate::geometry::to_wkt(shape)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialise an optional multipolygon from WKT.
        ///
        /// # Errors
        /// Fails when non-empty text is not a polygon or multipolygon.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<MultiPolygon<f64>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text = Option::<String>::deserialize(deserializer)?;
            match text {
                Some(value) if !value.trim().is_empty() => crate::geometry::parse_wkt(&value)
                    .map(Some)
                    .map_err(D::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
