// Startup loaders for the external inputs
pub mod artifact;
pub mod bootstrap;
pub mod catalog;

pub use artifact::{load_artifact, ArtifactError, ModelArtifact};
pub use bootstrap::{build_recommender, load_recommender};
pub use catalog::{load_catalog, CatalogError};
