//! Profile to feature-vector conversion.
//!
//! Column order is fixed for the lifetime of the process:
//!
//! | index       | column                              |
//! |-------------|-------------------------------------|
//! | 0           | gpa                                 |
//! | 1           | toefl                               |
//! | 2           | gre                                 |
//! | 3           | major code                          |
//! | 4 .. 4+C    | target country multi-hot (C known)  |
//! | 4+C         | unknown target country              |
//!
//! Numeric fields are passed through unscaled.

use std::sync::Arc;
use validator::Validate;

use crate::core::encoder::{CategoryKind, EncoderRegistry};
use crate::error::{UnknownCategoryWarning, ValidationError};
use crate::models::UserProfile;

pub const GPA_INDEX: usize = 0;
pub const TOEFL_INDEX: usize = 1;
pub const GRE_INDEX: usize = 2;
pub const MAJOR_INDEX: usize = 3;
pub const COUNTRIES_START: usize = 4;

/// Immutable, fixed-length model input
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Box<[f64]>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values.into_boxed_slice())
    }
}

/// Shape of the feature vector for a given country vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLayout {
    country_slots: usize,
}

impl FeatureLayout {
    pub fn for_registry(registry: &EncoderRegistry) -> Self {
        Self {
            country_slots: registry.country_slots(),
        }
    }

    pub fn len(&self) -> usize {
        COUNTRIES_START + self.country_slots
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn country_slots(&self) -> usize {
        self.country_slots
    }

    /// Index of the trailing unknown-country slot
    pub fn unknown_country_index(&self) -> usize {
        COUNTRIES_START + self.country_slots - 1
    }

    /// Column names in vector order
    pub fn column_names(&self, registry: &EncoderRegistry) -> Vec<String> {
        let mut names = vec![
            "gpa".to_string(),
            "toefl".to_string(),
            "gre".to_string(),
            "major_code".to_string(),
        ];
        names.extend(
            registry
                .encoding(CategoryKind::Country)
                .labels()
                .iter()
                .map(|label| format!("country:{}", label)),
        );
        names.push("country:<unknown>".to_string());
        names
    }
}

/// Feature vector plus the non-fatal warnings raised while building it
#[derive(Debug, Clone)]
pub struct Extraction {
    pub vector: FeatureVector,
    pub warnings: Vec<UnknownCategoryWarning>,
}

/// Builds feature vectors against a shared, read-only registry
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    registry: Arc<EncoderRegistry>,
    layout: FeatureLayout,
}

impl FeatureExtractor {
    pub fn new(registry: Arc<EncoderRegistry>) -> Self {
        let layout = FeatureLayout::for_registry(&registry);
        Self { registry, layout }
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    pub fn registry(&self) -> &Arc<EncoderRegistry> {
        &self.registry
    }

    pub fn extract(&self, profile: &UserProfile) -> Result<FeatureVector, ValidationError> {
        let extraction = self.extract_with_warnings(profile)?;
        for warning in &extraction.warnings {
            tracing::debug!("{}", warning);
        }
        Ok(extraction.vector)
    }

    pub fn extract_with_warnings(&self, profile: &UserProfile) -> Result<Extraction, ValidationError> {
        validate_profile(profile)?;

        let mut warnings = Vec::new();
        let mut values = Vec::with_capacity(self.layout.len());

        values.push(profile.gpa);
        values.push(f64::from(profile.toefl));
        values.push(f64::from(profile.gre));

        let (major_code, warning) = self.registry.encode_checked(CategoryKind::Major, &profile.major);
        values.push(f64::from(major_code));
        warnings.extend(warning);

        let (country_slots, country_warnings) = self.registry.encode_countries(&profile.target_countries);
        values.extend(country_slots);
        warnings.extend(country_warnings);

        debug_assert_eq!(values.len(), self.layout.len());

        Ok(Extraction {
            vector: FeatureVector::from(values),
            warnings,
        })
    }
}

/// Range checks shared by every entry point into the pipeline
pub fn validate_profile(profile: &UserProfile) -> Result<(), ValidationError> {
    // Range rules let NaN through
    if !profile.gpa.is_finite() {
        return Err(ValidationError::InvalidField {
            field: "gpa".to_string(),
            reason: "gpa must be a finite number".to_string(),
        });
    }

    // length(min = 1) accepts whitespace
    if profile.major.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "major".to_string(),
            reason: "major must not be blank".to_string(),
        });
    }

    profile
        .validate()
        .map_err(|errors| ValidationError::from_validator(&errors))
}
