// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{SchoolCatalog, SchoolId, SchoolRecord, UserProfile};
pub use requests::{ProfilePayload, RecommendRequest};
pub use responses::{ErrorResponse, HealthResponse, RecommendResponse, SchoolRecommendation};
