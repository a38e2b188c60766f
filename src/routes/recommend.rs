use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;

use crate::core::{present, Recommender};
use crate::error::RecommendError;
use crate::models::{HealthResponse, RecommendRequest, RecommendResponse};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Recommender,
}

/// Configure recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/recommend", web::post().to(recommend));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let model = state.recommender.model();

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        model: model.name().to_string(),
        model_version: model.version().to_string(),
        catalog_size: state.recommender.catalog().len(),
    })
}

/// Recommend schools for a student profile
///
/// POST /recommend
///
/// Request body:
/// ```json
/// {
///   "user_profile": {
///     "gpa": 3.8,
///     "toefl": 105,
///     "gre": 320,
///     "major": "CS",
///     "targetCountries": ["US", "CA"]
///   },
///   "num_recommendations": 10,
///   "include_reasoning": true
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> Result<HttpResponse, RecommendError> {
    let request_id = Uuid::new_v4();
    let req = req.into_inner();

    let profile = req.profile()?;
    let n = req.count_or(state.recommender.limits().default_limit);

    tracing::info!(
        %request_id,
        "Recommending up to {} schools (major={}, countries={:?})",
        n,
        profile.major,
        profile.target_countries
    );

    let start = std::time::Instant::now();
    let recommendation = state
        .recommender
        .recommend_with_timeout(profile.clone(), n)
        .await?;

    let warnings: Vec<String> = recommendation
        .warnings
        .iter()
        .map(ToString::to_string)
        .collect();
    let excluded = recommendation.result.excluded;
    let recommendations = present(
        recommendation.result,
        &profile,
        state.recommender.registry(),
        req.include_reasoning,
    );

    tracing::info!(
        %request_id,
        "Returned {} recommendations in {:?} ({} excluded, {} warnings)",
        recommendations.len(),
        start.elapsed(),
        excluded,
        warnings.len()
    );

    Ok(HttpResponse::Ok().json(RecommendResponse {
        status: "success".to_string(),
        request_id,
        count: recommendations.len(),
        excluded,
        recommendations,
        warnings,
    }))
}
