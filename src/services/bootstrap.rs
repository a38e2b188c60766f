use std::sync::Arc;

use crate::config::Settings;
use crate::core::{EncoderRegistry, FeatureLayout, Recommender};
use crate::error::StartupError;
use crate::models::SchoolCatalog;
use crate::services::artifact::{load_artifact, ModelArtifact};
use crate::services::catalog::load_catalog;

/// Assemble the pipeline from an already loaded artifact and catalog.
///
/// Fails when the artifact's declared feature count disagrees with the
/// layout implied by its vocabulary.
pub fn build_recommender(artifact: ModelArtifact, catalog: SchoolCatalog) -> Result<Recommender, StartupError> {
    let registry = Arc::new(EncoderRegistry::from_vocabulary(&artifact.vocabulary)?);
    let layout = FeatureLayout::for_registry(&registry);

    if let Some(expected) = artifact.feature_count {
        if expected != layout.len() {
            return Err(StartupError::ShapeMismatch {
                expected,
                actual: layout.len(),
            });
        }
    }

    let model = artifact.model.into_model(artifact.version, registry.clone());

    tracing::info!(
        "Model {} {} ready: {} features, {} schools",
        model.name(),
        model.version(),
        model.input_len(),
        catalog.len()
    );

    Ok(Recommender::new(registry, model, Arc::new(catalog)))
}

/// Load every startup input named in the settings. Any failure here keeps
/// the service from starting.
pub fn load_recommender(settings: &Settings) -> Result<Recommender, StartupError> {
    let catalog = load_catalog(&settings.data.catalog_path)?;
    let artifact = load_artifact(&settings.data.model_path)?;

    let recommender = build_recommender(artifact, catalog)?.with_limits(settings.recommendation.limits());
    Ok(recommender)
}
