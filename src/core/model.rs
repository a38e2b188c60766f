//! Scoring models.
//!
//! A model turns one feature vector into one score per catalog entry, in
//! catalog order. Models are loaded once at startup and shared read-only.
//! Schools missing a reference statistic score NaN and are dropped by the
//! ranker.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::encoder::{CategoryKind, EncoderRegistry, UNKNOWN_CODE};
use crate::core::features::{
    FeatureLayout, FeatureVector, COUNTRIES_START, GPA_INDEX, GRE_INDEX, MAJOR_INDEX, TOEFL_INDEX,
};
use crate::error::ScoringError;
use crate::models::{SchoolCatalog, SchoolRecord};

/// Narrow interface to a trained scoring function
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn version(&self) -> &str;

    /// Feature vector length the model was trained on
    fn input_len(&self) -> usize;

    /// One score per school, same order as `catalog`. Deterministic.
    fn score(&self, features: &FeatureVector, catalog: &SchoolCatalog) -> Result<Vec<f64>, ScoringError>;
}

/// Model section of the artifact, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LogisticParams),
    RuleBased(RuleBasedParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub intercept: f64,
    #[serde(default = "default_ratio_cap")]
    pub ratio_cap: f64,
    pub weights: LogisticWeights,
}

/// Coefficients over the per-school interaction terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticWeights {
    pub gpa_fit: f64,
    pub toefl_fit: f64,
    pub gre_fit: f64,
    #[serde(default)]
    pub major_offered: f64,
    #[serde(default)]
    pub country_preferred: f64,
    #[serde(default)]
    pub selectivity: f64,
}

impl LogisticWeights {
    fn all(&self) -> [f64; 6] {
        [
            self.gpa_fit,
            self.toefl_fit,
            self.gre_fit,
            self.major_offered,
            self.country_preferred,
            self.selectivity,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBasedParams {
    #[serde(default = "default_ratio_cap")]
    pub ratio_cap: f64,
    #[serde(default)]
    pub weights: RuleWeights,
    #[serde(default = "default_true")]
    pub round: bool,
}

impl Default for RuleBasedParams {
    fn default() -> Self {
        Self {
            ratio_cap: default_ratio_cap(),
            weights: RuleWeights::default(),
            round: true,
        }
    }
}

/// Points awarded per component; the defaults sum to 100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleWeights {
    pub gpa: f64,
    pub language: f64,
    pub gre: f64,
    pub accessibility: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            gpa: 40.0,
            language: 30.0,
            gre: 20.0,
            accessibility: 10.0,
        }
    }
}

fn default_ratio_cap() -> f64 { 1.2 }
fn default_true() -> bool { true }

impl ModelSpec {
    /// Reject parameters that would make every score undefined
    pub fn check(&self) -> Result<(), String> {
        let (cap, weights): (f64, Vec<f64>) = match self {
            ModelSpec::Logistic(p) => {
                let mut w = p.weights.all().to_vec();
                w.push(p.intercept);
                (p.ratio_cap, w)
            }
            ModelSpec::RuleBased(p) => (
                p.ratio_cap,
                vec![p.weights.gpa, p.weights.language, p.weights.gre, p.weights.accessibility],
            ),
        };

        if !(cap.is_finite() && cap > 0.0) {
            return Err(format!("ratio_cap must be a positive number, got {}", cap));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err("model weights must be finite".to_string());
        }
        Ok(())
    }

    pub fn into_model(self, version: String, registry: Arc<EncoderRegistry>) -> Arc<dyn ScoringModel> {
        match self {
            ModelSpec::Logistic(params) => Arc::new(LogisticModel::new(params, version, registry)),
            ModelSpec::RuleBased(params) => Arc::new(RuleBasedModel::new(params, version, registry)),
        }
    }
}

/// Ratio of a profile value to a school reference, capped.
/// NaN when the reference is missing or not positive.
#[inline]
pub fn fit_ratio(value: f64, reference: Option<f64>, cap: f64) -> f64 {
    match reference {
        Some(r) if r > 0.0 => (value / r).min(cap),
        _ => f64::NAN,
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn check_shape(features: &FeatureVector, expected: usize) -> Result<(), ScoringError> {
    if features.len() != expected {
        return Err(ScoringError::ShapeMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Logistic model over profile/school interaction terms
pub struct LogisticModel {
    params: LogisticParams,
    version: String,
    registry: Arc<EncoderRegistry>,
    layout: FeatureLayout,
}

impl LogisticModel {
    pub fn new(params: LogisticParams, version: String, registry: Arc<EncoderRegistry>) -> Self {
        let layout = FeatureLayout::for_registry(&registry);
        Self {
            params,
            version,
            registry,
            layout,
        }
    }

    fn score_school(&self, features: &[f64], school: &SchoolRecord) -> f64 {
        let cap = self.params.ratio_cap;
        let w = &self.params.weights;

        let gpa_fit = fit_ratio(features[GPA_INDEX], school.avg_gpa, cap);
        let toefl_fit = fit_ratio(features[TOEFL_INDEX], school.avg_toefl, cap);
        let gre_fit = fit_ratio(features[GRE_INDEX], school.avg_gre, cap);

        let major_code = features[MAJOR_INDEX] as u32;
        let major_offered = if major_code != UNKNOWN_CODE
            && school
                .majors
                .iter()
                .any(|m| self.registry.encode(CategoryKind::Major, m) == major_code)
        {
            1.0
        } else {
            0.0
        };

        let country_preferred = match self.registry.country_slot(&school.country) {
            Some(slot) => features[COUNTRIES_START + slot],
            None => 0.0,
        };

        let selectivity = school.admission_fraction().map(|rate| 1.0 - rate).unwrap_or(0.5);

        let logit = self.params.intercept
            + w.gpa_fit * gpa_fit
            + w.toefl_fit * toefl_fit
            + w.gre_fit * gre_fit
            + w.major_offered * major_offered
            + w.country_preferred * country_preferred
            + w.selectivity * selectivity;

        sigmoid(logit)
    }
}

impl ScoringModel for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn input_len(&self) -> usize {
        self.layout.len()
    }

    fn score(&self, features: &FeatureVector, catalog: &SchoolCatalog) -> Result<Vec<f64>, ScoringError> {
        check_shape(features, self.input_len())?;
        let values = features.as_slice();
        Ok(catalog.iter().map(|school| self.score_school(values, school)).collect())
    }
}

/// Weighted 0-100 fit score against school averages.
///
/// score = min(gpa/avg_gpa, cap) * 40
///       + min(toefl/avg_toefl, cap) * 30
///       + min(gre/avg_gre, cap) * 20
///       + admission_rate * 10
/// clamped to 100.
pub struct RuleBasedModel {
    params: RuleBasedParams,
    version: String,
    layout: FeatureLayout,
}

impl RuleBasedModel {
    pub fn new(params: RuleBasedParams, version: String, registry: Arc<EncoderRegistry>) -> Self {
        let layout = FeatureLayout::for_registry(&registry);
        Self {
            params,
            version,
            layout,
        }
    }

    fn score_school(&self, features: &[f64], school: &SchoolRecord) -> f64 {
        let cap = self.params.ratio_cap;
        let w = &self.params.weights;

        let gpa = fit_ratio(features[GPA_INDEX], school.avg_gpa, cap) * w.gpa;
        let language = fit_ratio(features[TOEFL_INDEX], school.avg_toefl, cap) * w.language;
        let gre = fit_ratio(features[GRE_INDEX], school.avg_gre, cap) * w.gre;
        let accessibility = school.admission_fraction().unwrap_or(0.0) * w.accessibility;

        // NaN propagates through min(), so check before clamping
        let total = gpa + language + gre + accessibility;
        if total.is_nan() {
            return f64::NAN;
        }

        let total = total.min(100.0);
        if self.params.round {
            total.round()
        } else {
            total
        }
    }
}

impl ScoringModel for RuleBasedModel {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn input_len(&self) -> usize {
        self.layout.len()
    }

    fn score(&self, features: &FeatureVector, catalog: &SchoolCatalog) -> Result<Vec<f64>, ScoringError> {
        check_shape(features, self.input_len())?;
        let values = features.as_slice();
        Ok(catalog.iter().map(|school| self.score_school(values, school)).collect())
    }
}
