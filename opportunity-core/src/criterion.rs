//! Scorable criteria and the visitor-supplied weights attached to them.
//!
//! A [`CriterionSet`] is static, versioned configuration loaded once per
//! dataset. Adding a criterion is a configuration change: the scorer walks
//! whatever set it is given and never names individual criteria.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::metric::{CrimeCategory, MetricKey, MetricSelector, Orientation};

/// Version written by [`CriterionSet::default`].
pub const DEFAULT_CRITERIA_VERSION: u32 = 1;

/// Upper bound of the default slider range.
const DEFAULT_MAX_WEIGHT: f64 = 10.0;

/// One scorable metric and how its weight is interpreted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CriterionSpec {
    name: String,
    metric: MetricSelector,
    max_weight: f64,
    orientation: Orientation,
}

/// Errors raised while building criteria.
#[derive(Debug, Error, PartialEq)]
pub enum CriterionError {
    /// The criterion name was blank.
    #[error("criterion name must not be empty")]
    EmptyName,
    /// The declared weight range was unusable.
    #[error("criterion '{name}' must declare a finite, positive maximum weight (got {max_weight})")]
    InvalidRange {
        /// Criterion name.
        name: String,
        /// Declared maximum.
        max_weight: f64,
    },
    /// The set contained no criteria.
    #[error("criterion set must contain at least one criterion")]
    Empty,
    /// Two criteria shared a name.
    #[error("criterion '{name}' is declared more than once")]
    DuplicateName {
        /// Repeated name.
        name: String,
    },
    /// Two criteria read the same metric with opposite orientations.
    #[error("metric {metric} is declared both higher-better and lower-better")]
    ConflictingOrientation {
        /// Metric with the conflicting declarations.
        metric: String,
    },
}

impl CriterionSpec {
    /// Validate and construct a criterion.
    ///
    /// # Errors
    /// Returns [`CriterionError`] for a blank name or a non-positive range.
    ///
    /// # Examples
    /// ```
    /// use opportunity_core::{CriterionSpec, MetricSelector, Orientation};
    ///
    /// # fn main() -> Result<(), opportunity_core::CriterionError> {
    /// let spec = CriterionSpec::new("income", MetricSelector::Income, 3.0, Orientation::HigherBetter)?;
    /// assert_eq!(spec.max_weight(), 3.0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        name: impl Into<String>,
        metric: MetricSelector,
        max_weight: f64,
        orientation: Orientation,
    ) -> Result<Self, CriterionError> {
        let spec = Self {
            name: name.into(),
            metric,
            max_weight,
            orientation,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), CriterionError> {
        if self.name.trim().is_empty() {
            return Err(CriterionError::EmptyName);
        }
        if !self.max_weight.is_finite() || self.max_weight <= 0.0 {
            return Err(CriterionError::InvalidRange {
                name: self.name.clone(),
                max_weight: self.max_weight,
            });
        }
        Ok(())
    }

    /// Criterion name used as the weight key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metric read by this criterion.
    #[must_use]
    pub const fn metric(&self) -> MetricSelector {
        self.metric
    }

    /// Upper bound of the declared weight range `[0, max_weight]`.
    #[must_use]
    pub const fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Direction in which the metric improves.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Versioned collection of criteria.
///
/// # Examples
/// ```
/// use opportunity_core::CriterionSet;
///
/// let criteria = CriterionSet::default();
/// assert_eq!(criteria.len(), 5);
/// assert!(criteria.get("transit").is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "CriterionSetDocument", into = "CriterionSetDocument")
)]
pub struct CriterionSet {
    version: u32,
    criteria: Vec<CriterionSpec>,
}

/// Wire form of a [`CriterionSet`], validated on conversion.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CriterionSetDocument {
    version: u32,
    criteria: Vec<CriterionSpec>,
}

#[cfg(feature = "serde")]
impl TryFrom<CriterionSetDocument> for CriterionSet {
    type Error = CriterionError;

    fn try_from(document: CriterionSetDocument) -> Result<Self, Self::Error> {
        Self::new(document.version, document.criteria)
    }
}

#[cfg(feature = "serde")]
impl From<CriterionSet> for CriterionSetDocument {
    fn from(set: CriterionSet) -> Self {
        Self {
            version: set.version,
            criteria: set.criteria,
        }
    }
}

impl CriterionSet {
    /// Validate and construct a set.
    ///
    /// Every spec is re-validated so sets decoded from configuration files get
    /// the same checks as those built in code.
    ///
    /// # Errors
    /// Returns [`CriterionError`] for an empty set, repeated names, invalid
    /// specs, or one metric declared with both orientations.
    pub fn new(version: u32, criteria: Vec<CriterionSpec>) -> Result<Self, CriterionError> {
        if criteria.is_empty() {
            return Err(CriterionError::Empty);
        }
        let mut names = HashSet::new();
        let mut orientations: HashMap<MetricKey, Orientation> = HashMap::new();
        for spec in &criteria {
            spec.validate()?;
            if !names.insert(spec.name.as_str()) {
                return Err(CriterionError::DuplicateName {
                    name: spec.name.clone(),
                });
            }
            for key in spec.metric.candidate_keys() {
                let declared = *orientations.entry(key).or_insert(spec.orientation);
                if declared != spec.orientation {
                    return Err(CriterionError::ConflictingOrientation {
                        metric: key.to_string(),
                    });
                }
            }
        }
        Ok(Self { version, criteria })
    }

    /// Configuration version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Look up a criterion by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CriterionSpec> {
        self.criteria.iter().find(|spec| spec.name == name)
    }

    /// Iterate over criteria in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CriterionSpec> + '_ {
        self.criteria.iter()
    }

    /// Number of criteria.
    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Report whether the set is empty. Always `false` for a validated set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Every metric key any criterion can resolve to, with its orientation.
    ///
    /// This is the set of columns a dataset load must normalise.
    #[must_use]
    pub fn normalisation_plan(&self) -> BTreeMap<MetricKey, Orientation> {
        self.criteria
            .iter()
            .flat_map(|spec| {
                spec.metric
                    .candidate_keys()
                    .into_iter()
                    .map(move |key| (key, spec.orientation))
            })
            .collect()
    }
}

impl Default for CriterionSet {
    /// The five opportunity sliders, each ranging over `0..=10`.
    fn default() -> Self {
        let criteria = vec![
            CriterionSpec {
                name: "rent".to_owned(),
                metric: MetricSelector::SelectedRent,
                max_weight: DEFAULT_MAX_WEIGHT,
                orientation: Orientation::LowerBetter,
            },
            CriterionSpec {
                name: "safety".to_owned(),
                metric: MetricSelector::CrimeRate {
                    category: CrimeCategory::Violent,
                },
                max_weight: DEFAULT_MAX_WEIGHT,
                orientation: Orientation::LowerBetter,
            },
            CriterionSpec {
                name: "crime_trend".to_owned(),
                metric: MetricSelector::CrimeTrend {
                    category: CrimeCategory::Violent,
                },
                max_weight: DEFAULT_MAX_WEIGHT,
                orientation: Orientation::LowerBetter,
            },
            CriterionSpec {
                name: "transit".to_owned(),
                metric: MetricSelector::TransitTotal,
                max_weight: DEFAULT_MAX_WEIGHT,
                orientation: Orientation::HigherBetter,
            },
            CriterionSpec {
                name: "income".to_owned(),
                metric: MetricSelector::Income,
                max_weight: DEFAULT_MAX_WEIGHT,
                orientation: Orientation::HigherBetter,
            },
        ];
        Self {
            version: DEFAULT_CRITERIA_VERSION,
            criteria,
        }
    }
}

/// Raw, per-request weights keyed by criterion name.
///
/// Criteria without an entry weigh zero.
///
/// # Examples
/// ```
/// use opportunity_core::{CriterionSet, WeightVector};
///
/// let weights = WeightVector::new().with_weight("rent", 5.0).with_weight("safety", 8.0);
/// assert!(weights.validate(&CriterionSet::default()).is_ok());
/// assert_eq!(weights.weight("income"), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

/// Errors raised when a weight vector does not fit a criterion set.
#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    /// A weight named a criterion the set does not declare.
    #[error("no criterion named '{name}'")]
    UnknownCriterion {
        /// Unrecognised name.
        name: String,
    },
    /// A weight was negative, non-finite, or above the declared maximum.
    #[error("weight {weight} for '{name}' is outside 0..={max_weight}")]
    OutOfRange {
        /// Criterion name.
        name: String,
        /// Supplied weight.
        weight: f64,
        /// Declared maximum.
        max_weight: f64,
    },
}

impl WeightVector {
    /// Construct an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting slider positions for the default criterion set.
    #[must_use]
    pub fn default_sliders() -> Self {
        [
            ("rent", 5.0),
            ("safety", 8.0),
            ("crime_trend", 5.0),
            ("transit", 5.0),
            ("income", 2.0),
        ]
        .into_iter()
        .fold(Self::new(), |weights, (name, weight)| {
            weights.with_weight(name, weight)
        })
    }

    /// Starting slider positions for an arbitrary criterion set.
    ///
    /// Criteria that share a name with a default slider start at its
    /// position, capped at their declared maximum; all others start at zero.
    /// For [`CriterionSet::default`] this equals [`WeightVector::default_sliders`].
    #[must_use]
    pub fn default_sliders_for(criteria: &CriterionSet) -> Self {
        Self::default_sliders()
            .weights
            .into_iter()
            .filter_map(|(name, weight)| {
                let max_weight = criteria.get(&name)?.max_weight;
                Some((name, weight.min(max_weight)))
            })
            .fold(Self::new(), |weights, (name, weight)| {
                weights.with_weight(name, weight)
            })
    }

    /// Insert or replace a weight.
    pub fn set_weight(&mut self, name: impl Into<String>, weight: f64) {
        self.weights.insert(name.into(), weight);
    }

    /// Add a weight while returning `self` for chaining.
    #[must_use]
    pub fn with_weight(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.set_weight(name, weight);
        self
    }

    /// Raw weight for a criterion, `0.0` when unset.
    #[must_use]
    pub fn weight(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    /// Iterate over the explicitly set weights.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
    }

    /// Check every weight against the declared ranges of `criteria`.
    ///
    /// # Errors
    /// Returns [`WeightError`] for unknown names or out-of-range values.
    pub fn validate(&self, criteria: &CriterionSet) -> Result<(), WeightError> {
        for (name, weight) in &self.weights {
            let spec = criteria
                .get(name)
                .ok_or_else(|| WeightError::UnknownCriterion { name: name.clone() })?;
            if !weight.is_finite() || *weight < 0.0 || *weight > spec.max_weight {
                return Err(WeightError::OutOfRange {
                    name: name.clone(),
                    weight: *weight,
                    max_weight: spec.max_weight,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::UnitSize;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn spec_rejects_unusable_ranges(#[case] max_weight: f64) {
        let result = CriterionSpec::new(
            "income",
            MetricSelector::Income,
            max_weight,
            Orientation::HigherBetter,
        );
        assert!(matches!(result, Err(CriterionError::InvalidRange { .. })));
    }

    #[rstest]
    fn spec_rejects_blank_names() {
        let result = CriterionSpec::new(" ", MetricSelector::Income, 1.0, Orientation::HigherBetter);
        assert_eq!(result, Err(CriterionError::EmptyName));
    }

    #[rstest]
    fn set_rejects_duplicate_names() {
        let spec =
            CriterionSpec::new("income", MetricSelector::Income, 3.0, Orientation::HigherBetter)
                .unwrap();
        let result = CriterionSet::new(1, vec![spec.clone(), spec]);
        assert!(matches!(result, Err(CriterionError::DuplicateName { .. })));
    }

    #[rstest]
    fn set_rejects_conflicting_orientations() {
        let cheap = CriterionSpec::new(
            "cheap",
            MetricSelector::SelectedRent,
            10.0,
            Orientation::LowerBetter,
        )
        .unwrap();
        let pricey = CriterionSpec::new(
            "pricey",
            MetricSelector::Rent {
                unit: UnitSize::TwoBedroom,
            },
            3.0,
            Orientation::HigherBetter,
        )
        .unwrap();
        let result = CriterionSet::new(1, vec![cheap, pricey]);
        assert!(matches!(
            result,
            Err(CriterionError::ConflictingOrientation { .. })
        ));
    }

    #[rstest]
    fn set_rejects_empty() {
        assert_eq!(CriterionSet::new(1, Vec::new()), Err(CriterionError::Empty));
    }

    #[rstest]
    fn default_plan_normalises_every_rent_column() {
        let plan = CriterionSet::default().normalisation_plan();
        for unit in UnitSize::ALL {
            assert_eq!(
                plan.get(&MetricKey::Rent(unit)),
                Some(&Orientation::LowerBetter)
            );
        }
        assert_eq!(
            plan.get(&MetricKey::TransitTotal),
            Some(&Orientation::HigherBetter)
        );
    }

    #[rstest]
    #[case("rent", 10.0, true)]
    #[case("rent", 0.0, true)]
    #[case("rent", 10.5, false)]
    #[case("rent", -0.5, false)]
    #[case("rent", f64::NAN, false)]
    fn weights_must_fit_declared_range(
        #[case] name: &str,
        #[case] weight: f64,
        #[case] ok: bool,
    ) {
        let weights = WeightVector::new().with_weight(name, weight);
        assert_eq!(weights.validate(&CriterionSet::default()).is_ok(), ok);
    }

    #[rstest]
    fn default_sliders_fit_default_criteria() {
        let weights = WeightVector::default_sliders();
        assert!(weights.validate(&CriterionSet::default()).is_ok());
        assert_eq!(weights.weight("safety"), 8.0);
        assert_eq!(weights.iter().count(), CriterionSet::default().len());
    }

    #[rstest]
    fn unknown_weights_are_rejected() {
        let weights = WeightVector::new().with_weight("parking", 1.0);
        assert_eq!(
            weights.validate(&CriterionSet::default()),
            Err(WeightError::UnknownCriterion {
                name: "parking".to_owned()
            })
        );
    }

    #[rstest]
    fn default_sliders_follow_the_declared_criteria() {
        let set = CriterionSet::new(
            1,
            vec![
                CriterionSpec::new("rent", MetricSelector::SelectedRent, 3.0, Orientation::LowerBetter)
                    .unwrap(),
                CriterionSpec::new("income", MetricSelector::Income, 10.0, Orientation::HigherBetter)
                    .unwrap(),
                CriterionSpec::new("people", MetricSelector::Population, 4.0, Orientation::HigherBetter)
                    .unwrap(),
            ],
        )
        .unwrap();
        let weights = WeightVector::default_sliders_for(&set);
        assert_eq!(
            weights,
            WeightVector::new().with_weight("income", 2.0).with_weight("rent", 3.0)
        );
        assert!(weights.validate(&set).is_ok());
    }

    #[rstest]
    fn default_sliders_for_the_default_set_are_unchanged() {
        assert_eq!(
            WeightVector::default_sliders_for(&CriterionSet::default()),
            WeightVector::default_sliders()
        );
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn criterion_sets_decode_from_json() {
        let json = r#"{
            "version": 2,
            "criteria": [
                {"name": "rent", "metric": {"kind": "selected_rent"}, "max_weight": 10.0, "orientation": "lower_better"},
                {"name": "property_safety", "metric": {"kind": "crime_rate", "category": "property"}, "max_weight": 3.0, "orientation": "lower_better"}
            ]
        }"#;
        let set: CriterionSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.version(), 2);
        assert_eq!(set.get("property_safety").map(CriterionSpec::max_weight), Some(3.0));
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn invalid_documents_fail_to_decode() {
        let json = r#"{"version": 1, "criteria": []}"#;
        assert!(serde_json::from_str::<CriterionSet>(json).is_err());
    }
}
