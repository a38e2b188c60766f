use serde::{Deserialize, Serialize};

use crate::core::Tier;
use crate::models::domain::SchoolId;

/// Response for the recommend endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub status: String,
    pub request_id: uuid::Uuid,
    pub count: usize,
    pub excluded: usize,
    pub recommendations: Vec<SchoolRecommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One recommended school as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolRecommendation {
    pub rank: usize,
    pub id: SchoolId,
    pub name: String,
    pub country: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_chance: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<String>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub model: String,
    pub model_version: String,
    pub catalog_size: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub kind: String,
    pub error: String,
    pub status_code: u16,
}

impl ErrorResponse {
    pub fn new(kind: impl Into<String>, error: impl Into<String>, status_code: u16) -> Self {
        Self {
            status: "error".to_string(),
            kind: kind.into(),
            error: error.into(),
            status_code,
        }
    }
}
