// Core recommendation pipeline
pub mod encoder;
pub mod features;
pub mod insight;
pub mod model;
pub mod ranker;
pub mod recommender;

pub use encoder::{CategoryEncoding, CategoryKind, EncoderRegistry, Vocabulary, UNKNOWN_CODE};
pub use features::{Extraction, FeatureExtractor, FeatureLayout, FeatureVector};
pub use insight::{admission_chance, present, Tier};
pub use model::{LogisticModel, ModelSpec, RuleBasedModel, ScoringModel};
pub use ranker::{rank, RecommendationResult, ScoredCandidate};
pub use recommender::{Recommendation, RecommendLimits, Recommender};
