// Route exports
pub mod recommend;

use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::models::ErrorResponse;

pub use recommend::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(recommend::configure);
}

/// JSON extractor config that reports malformed bodies in the service's
/// error shape instead of actix's plain-text default
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);

    let body = ErrorResponse::new("validation_error", format!("Invalid JSON: {}", err), 400);
    error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}
