use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::{ModelSpec, Vocabulary};

/// Errors that can occur while loading the model artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),
}

/// Trained model as exported by the training pipeline
///
/// ```json
/// {
///   "version": "2024-06-01",
///   "feature_count": 9,
///   "vocabulary": { "majors": ["CS"], "countries": ["US", "UK", "CA", "AU"] },
///   "model": { "kind": "rule_based" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    /// Input width the model was trained with, checked at startup
    #[serde(default)]
    pub feature_count: Option<usize>,
    pub vocabulary: Vocabulary,
    pub model: ModelSpec,
}

impl ModelArtifact {
    pub fn from_json(data: &str) -> Result<Self, ArtifactError> {
        let artifact: ModelArtifact = serde_json::from_str(data)?;
        artifact
            .model
            .check()
            .map_err(ArtifactError::InvalidParameters)?;
        Ok(artifact)
    }
}

pub fn load_artifact<P: AsRef<Path>>(path: P) -> Result<ModelArtifact, ArtifactError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let artifact = ModelArtifact::from_json(&data)?;
    tracing::info!(
        "Loaded model artifact {} (version {}, {} majors, {} countries)",
        path.display(),
        artifact.version,
        artifact.vocabulary.majors.len(),
        artifact.vocabulary.countries.len()
    );
    Ok(artifact)
}
