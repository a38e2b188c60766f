use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::core::encoder::EncoderRegistry;
use crate::core::features::{validate_profile, FeatureExtractor};
use crate::core::model::ScoringModel;
use crate::core::ranker::{rank, RecommendationResult};
use crate::error::{RecommendError, ScoringError, UnknownCategoryWarning, ValidationError};
use crate::models::{SchoolCatalog, UserProfile};

/// Request count limits, the per-request scoring deadline and the cap on
/// concurrent blocking scoring tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendLimits {
    pub default_limit: usize,
    pub max_limit: usize,
    pub timeout: Option<Duration>,
    /// Scoring tasks still running count against this, even after their
    /// request timed out
    pub max_in_flight: usize,
}

impl Default for RecommendLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            timeout: Some(Duration::from_millis(2000)),
            max_in_flight: 64,
        }
    }
}

/// Ranked schools plus the non-fatal warnings raised for the profile
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub result: RecommendationResult,
    pub warnings: Vec<UnknownCategoryWarning>,
}

/// Recommendation pipeline orchestrator
///
/// # Pipeline Stages
/// 1. Validate the requested count and the profile
/// 2. Extract the feature vector
/// 3. Score the whole catalog
/// 4. Rank, tie-break and truncate
///
/// All shared state is read-only behind `Arc`, so clones are cheap and
/// requests run in parallel without locking.
#[derive(Clone)]
pub struct Recommender {
    extractor: FeatureExtractor,
    model: Arc<dyn ScoringModel>,
    catalog: Arc<SchoolCatalog>,
    limits: RecommendLimits,
    in_flight: Arc<Semaphore>,
}

impl Recommender {
    pub fn new(registry: Arc<EncoderRegistry>, model: Arc<dyn ScoringModel>, catalog: Arc<SchoolCatalog>) -> Self {
        Self {
            extractor: FeatureExtractor::new(registry),
            model,
            catalog,
            limits: RecommendLimits::default(),
            in_flight: Arc::new(Semaphore::new(RecommendLimits::default().max_in_flight)),
        }
    }

    pub fn with_limits(mut self, limits: RecommendLimits) -> Self {
        self.in_flight = Arc::new(Semaphore::new(limits.max_in_flight.max(1)));
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> RecommendLimits {
        self.limits
    }

    pub fn model(&self) -> &dyn ScoringModel {
        self.model.as_ref()
    }

    pub fn catalog(&self) -> &SchoolCatalog {
        &self.catalog
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn registry(&self) -> &EncoderRegistry {
        self.extractor.registry()
    }

    /// Check a requested count. Non-positive counts are rejected; counts
    /// above `max_limit` are capped.
    pub fn validate_count(&self, n: i64) -> Result<NonZeroUsize, ValidationError> {
        if n <= 0 {
            return Err(ValidationError::InvalidCount(n));
        }
        let capped = usize::try_from(n)
            .unwrap_or(usize::MAX)
            .min(self.limits.max_limit.max(1));
        NonZeroUsize::new(capped).ok_or(ValidationError::InvalidCount(n))
    }

    /// Recommend up to `n` schools for `profile` on the calling thread
    pub fn recommend(&self, profile: &UserProfile, n: i64) -> Result<Recommendation, RecommendError> {
        let count = self.validate_count(n)?;
        validate_profile(profile)?;
        self.run(profile, count)
    }

    /// Same as [`Recommender::recommend`], with scoring moved to the
    /// blocking pool and bounded by the configured timeout. On timeout the
    /// scoring task is left to finish in the background and its result is
    /// discarded. Fails with [`RecommendError::Overloaded`] when
    /// `max_in_flight` scoring tasks are already running.
    pub async fn recommend_with_timeout(&self, profile: UserProfile, n: i64) -> Result<Recommendation, RecommendError> {
        let count = self.validate_count(n)?;
        validate_profile(&profile)?;

        let permit = self
            .in_flight
            .clone()
            .try_acquire_owned()
            .map_err(|_| RecommendError::Overloaded)?;

        let recommender = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            // Held until scoring actually ends, not until the request gives up
            let _permit = permit;
            recommender.run(&profile, count)
        });

        let joined = match self.limits.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| RecommendError::Timeout(limit))?,
            None => task.await,
        };

        joined.map_err(|e| ScoringError::Aborted(e.to_string()))?
    }

    fn run(&self, profile: &UserProfile, count: NonZeroUsize) -> Result<Recommendation, RecommendError> {
        let extraction = self.extractor.extract_with_warnings(profile)?;
        for warning in &extraction.warnings {
            tracing::debug!("{}", warning);
        }

        let scores = self.model.score(&extraction.vector, &self.catalog)?;
        if scores.len() != self.catalog.len() {
            return Err(ScoringError::OutputLength {
                expected: self.catalog.len(),
                actual: scores.len(),
            }
            .into());
        }

        let result = rank(&scores, &self.catalog, count);

        tracing::debug!(
            "Ranked {} schools with {}: returning {}, excluded {}",
            result.considered,
            self.model.name(),
            result.len(),
            result.excluded
        );

        Ok(Recommendation {
            result,
            warnings: extraction.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::Vocabulary;
    use crate::core::features::FeatureVector;
    use crate::models::SchoolRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns canned scores and counts how often it was called
    struct FixedModel {
        scores: Vec<f64>,
        input_len: usize,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScoringModel for FixedModel {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn version(&self) -> &str {
            "test"
        }

        fn input_len(&self) -> usize {
            self.input_len
        }

        fn score(&self, features: &FeatureVector, _catalog: &SchoolCatalog) -> Result<Vec<f64>, ScoringError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if features.len() != self.input_len {
                return Err(ScoringError::ShapeMismatch {
                    expected: self.input_len,
                    actual: features.len(),
                });
            }
            Ok(self.scores.clone())
        }
    }

    fn registry() -> Arc<EncoderRegistry> {
        let vocabulary = Vocabulary {
            majors: vec!["CS".into()],
            countries: vec!["US".into(), "UK".into()],
            ..Default::default()
        };
        Arc::new(EncoderRegistry::from_vocabulary(&vocabulary).unwrap())
    }

    fn catalog(ids: &[&str]) -> Arc<SchoolCatalog> {
        Arc::new(
            SchoolCatalog::new(
                ids.iter()
                    .map(|id| SchoolRecord::new(*id, format!("School {}", id), "US"))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn model(scores: Vec<f64>) -> Arc<FixedModel> {
        Arc::new(FixedModel {
            scores,
            input_len: 7,
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    fn profile() -> UserProfile {
        UserProfile {
            gpa: 3.8,
            toefl: 100,
            gre: 320,
            major: "CS".to_string(),
            target_countries: vec!["US".to_string()],
        }
    }

    fn ids(recommendation: &Recommendation) -> Vec<&str> {
        recommendation
            .result
            .candidates
            .iter()
            .map(|c| c.school.id.as_str())
            .collect()
    }

    #[test]
    fn test_scenario_tie_break_and_nan() {
        let model = model(vec![0.9, 0.9, 0.7, 0.5, f64::NAN]);
        let recommender = Recommender::new(registry(), model, catalog(&["2", "1", "3", "4", "5"]));

        let recommendation = recommender.recommend(&profile(), 3).unwrap();

        assert_eq!(ids(&recommendation), vec!["1", "2", "3"]);
        assert_eq!(recommendation.result.excluded, 1);
    }

    #[test]
    fn test_zero_count_skips_scoring() {
        let model = model(vec![0.5]);
        let recommender = Recommender::new(registry(), model.clone(), catalog(&["1"]));

        let err = recommender.recommend(&profile(), 0).unwrap_err();

        assert!(matches!(err, RecommendError::Validation(ValidationError::InvalidCount(0))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_negative_count_rejected() {
        let recommender = Recommender::new(registry(), model(vec![]), catalog(&[]));
        assert!(recommender.validate_count(-3).is_err());
    }

    #[test]
    fn test_count_capped_at_max_limit() {
        let recommender = Recommender::new(registry(), model(vec![]), catalog(&[])).with_limits(RecommendLimits {
            max_limit: 25,
            ..RecommendLimits::default()
        });
        assert_eq!(recommender.validate_count(1000).unwrap().get(), 25);
        assert_eq!(recommender.validate_count(7).unwrap().get(), 7);
    }

    #[test]
    fn test_invalid_profile_skips_scoring() {
        let model = model(vec![0.5]);
        let recommender = Recommender::new(registry(), model.clone(), catalog(&["1"]));
        let mut bad = profile();
        bad.toefl = 150;

        let err = recommender.recommend(&bad, 5).unwrap_err();

        assert_eq!(err.kind(), "validation_error");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blank_major_skips_scoring() {
        let model = model(vec![0.5]);
        let recommender = Recommender::new(registry(), model.clone(), catalog(&["1"]));
        let mut blank = profile();
        blank.major = "   ".to_string();

        let err = recommender.recommend(&blank, 3).unwrap_err();

        assert!(matches!(
            err,
            RecommendError::Validation(ValidationError::InvalidField { ref field, .. }) if field == "major"
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_catalog_is_success() {
        let recommender = Recommender::new(registry(), model(vec![]), catalog(&[]));
        let recommendation = recommender.recommend(&profile(), 10).unwrap();
        assert!(recommendation.result.is_empty());
    }

    #[test]
    fn test_wrong_output_length() {
        let recommender = Recommender::new(registry(), model(vec![0.1]), catalog(&["1", "2"]));
        let err = recommender.recommend(&profile(), 10).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::Scoring(ScoringError::OutputLength { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_shape_mismatch_is_scoring_error() {
        let bad_model = Arc::new(FixedModel {
            scores: vec![0.1],
            input_len: 9,
            calls: AtomicUsize::new(0),
            delay: None,
        });
        let recommender = Recommender::new(registry(), bad_model, catalog(&["1"]));

        let err = recommender.recommend(&profile(), 10).unwrap_err();
        assert_eq!(err.kind(), "scoring_error");
    }

    #[test]
    fn test_unknown_categories_are_warnings() {
        let recommender = Recommender::new(registry(), model(vec![0.4]), catalog(&["1"]));
        let mut odd = profile();
        odd.major = "Alchemy".to_string();

        let recommendation = recommender.recommend(&odd, 5).unwrap();
        assert_eq!(recommendation.result.len(), 1);
        assert_eq!(recommendation.warnings.len(), 1);
    }

    #[test]
    fn test_idempotent() {
        let recommender = Recommender::new(registry(), model(vec![0.3, 0.3, 0.8]), catalog(&["3", "1", "2"]));
        let first = recommender.recommend(&profile(), 2).unwrap();
        let second = recommender.recommend(&profile(), 2).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recommend_with_timeout_completes() {
        let recommender = Recommender::new(registry(), model(vec![0.2, 0.6]), catalog(&["1", "2"]));
        let recommendation = recommender.recommend_with_timeout(profile(), 5).await.unwrap();
        assert_eq!(ids(&recommendation), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_recommend_with_timeout_expires() {
        let slow = Arc::new(FixedModel {
            scores: vec![0.5],
            input_len: 7,
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(500)),
        });
        let recommender = Recommender::new(registry(), slow, catalog(&["1"])).with_limits(RecommendLimits {
            timeout: Some(Duration::from_millis(20)),
            ..RecommendLimits::default()
        });

        let err = recommender.recommend_with_timeout(profile(), 5).await.unwrap_err();
        assert!(matches!(err, RecommendError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_busy_scoring_slots_reject_new_requests() {
        let slow = Arc::new(FixedModel {
            scores: vec![0.5],
            input_len: 7,
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(300)),
        });
        let recommender = Recommender::new(registry(), slow.clone(), catalog(&["1"])).with_limits(RecommendLimits {
            timeout: Some(Duration::from_millis(20)),
            max_in_flight: 1,
            ..RecommendLimits::default()
        });

        let first = recommender.recommend_with_timeout(profile(), 5).await.unwrap_err();
        assert!(matches!(first, RecommendError::Timeout(_)));

        // The timed-out task still occupies the only slot
        let second = recommender.recommend_with_timeout(profile(), 5).await.unwrap_err();
        assert!(matches!(second, RecommendError::Overloaded));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        // Slot frees once the abandoned task finishes
        tokio::time::sleep(Duration::from_millis(500)).await;
        let third = recommender.recommend_with_timeout(profile(), 5).await.unwrap_err();
        assert!(matches!(third, RecommendError::Timeout(_)));
    }
}
