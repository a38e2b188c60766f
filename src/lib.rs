//! School recommender - ranks a school catalog against a student profile
//!
//! A trained scoring model is loaded once at startup together with the
//! school catalog. Each request encodes the student's profile into a
//! feature vector, scores every school and returns the top results.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{EncoderRegistry, FeatureExtractor, Recommender, ScoringModel};
pub use error::{RecommendError, ScoringError, StartupError, ValidationError};
pub use models::{RecommendRequest, RecommendResponse, SchoolCatalog, SchoolId, SchoolRecord, UserProfile};
