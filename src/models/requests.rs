use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::domain::UserProfile;

/// Request body for `POST /recommend`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(alias = "userProfile")]
    pub user_profile: Option<ProfilePayload>,
    #[serde(alias = "numRecommendations")]
    pub num_recommendations: Option<i64>,
    #[serde(alias = "includeReasoning", default)]
    pub include_reasoning: bool,
}

impl RecommendRequest {
    /// Requested result count, falling back to `default_limit` when absent
    pub fn count_or(&self, default_limit: usize) -> i64 {
        self.num_recommendations
            .unwrap_or_else(|| i64::try_from(default_limit).unwrap_or(i64::MAX))
    }

    pub fn profile(&self) -> Result<UserProfile, ValidationError> {
        self.user_profile
            .clone()
            .ok_or(ValidationError::MissingField("user_profile"))?
            .into_profile()
    }
}

/// Profile as sent by clients. Every field is optional on the wire so that
/// a missing field is reported by name instead of as a JSON parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub gpa: Option<f64>,
    pub toefl: Option<i32>,
    pub gre: Option<i32>,
    pub major: Option<String>,
    #[serde(rename = "targetCountries", alias = "target_countries")]
    pub target_countries: Option<Vec<String>>,
}

impl ProfilePayload {
    pub fn into_profile(self) -> Result<UserProfile, ValidationError> {
        let gpa = self.gpa.ok_or(ValidationError::MissingField("gpa"))?;
        let toefl = self.toefl.ok_or(ValidationError::MissingField("toefl"))?;
        let gre = self.gre.ok_or(ValidationError::MissingField("gre"))?;

        let major = self
            .major
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::MissingField("major"))?;

        let target_countries = self
            .target_countries
            .ok_or(ValidationError::MissingField("targetCountries"))?
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Ok(UserProfile {
            gpa,
            toefl,
            gre,
            major,
            target_countries,
        })
    }
}
