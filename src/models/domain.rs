use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

use crate::services::CatalogError;

/// Academic profile of the applicant asking for recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[validate(range(min = 0.0, max = 4.0, message = "gpa must be between 0.0 and 4.0"))]
    pub gpa: f64,
    #[validate(range(min = 0, max = 120, message = "toefl must be between 0 and 120"))]
    pub toefl: i32,
    #[validate(range(min = 0, max = 340, message = "gre must be between 0 and 340"))]
    pub gre: i32,
    #[validate(length(min = 1, message = "major must not be empty"))]
    pub major: String,
    #[serde(rename = "targetCountries", alias = "target_countries", default)]
    pub target_countries: Vec<String>,
}

/// Catalog identifier for a school.
///
/// Integer ids compare numerically ("9" < "10"); anything else compares
/// lexicographically, after all integer ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawId")]
pub struct SchoolId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for SchoolId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => SchoolId(n.to_string()),
            RawId::Text(s) => SchoolId(s.trim().to_string()),
        }
    }
}

impl SchoolId {
    pub fn new(id: impl Into<String>) -> Self {
        SchoolId(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// Numeric value when the id is written as a canonical integer
    fn canonical_number(&self) -> Option<u64> {
        self.numeric().filter(|n| n.to_string() == self.0)
    }
}

impl From<u64> for SchoolId {
    fn from(id: u64) -> Self {
        SchoolId(id.to_string())
    }
}

impl From<&str> for SchoolId {
    fn from(id: &str) -> Self {
        SchoolId::new(id)
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for SchoolId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            // Raw text breaks ties between "01" and "1"
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SchoolId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for SchoolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.canonical_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

/// School reference data loaded from the catalog at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub id: SchoolId,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub avg_gpa: Option<f64>,
    #[serde(default)]
    pub avg_toefl: Option<f64>,
    #[serde(default)]
    pub avg_gre: Option<f64>,
    /// Percentage of applicants admitted, 0-100
    #[serde(default)]
    pub admission_rate: Option<f64>,
    #[serde(default)]
    pub majors: Vec<String>,
    #[serde(default)]
    pub world_rank: Option<u32>,
}

impl SchoolRecord {
    pub fn new(id: impl Into<SchoolId>, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            country: country.into(),
            avg_gpa: None,
            avg_toefl: None,
            avg_gre: None,
            admission_rate: None,
            majors: Vec::new(),
            world_rank: None,
        }
    }

    /// Admission rate as a fraction in [0, 1]
    pub fn admission_fraction(&self) -> Option<f64> {
        self.admission_rate.map(|rate| (rate / 100.0).clamp(0.0, 1.0))
    }
}

/// Read-only school catalog with unique ids, kept in load order
#[derive(Debug, Clone, Default)]
pub struct SchoolCatalog {
    schools: Vec<SchoolRecord>,
}

impl SchoolCatalog {
    pub fn new(schools: Vec<SchoolRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(schools.len());
        for school in &schools {
            if !seen.insert(&school.id) {
                return Err(CatalogError::DuplicateId(school.id.to_string()));
            }
        }
        Ok(Self { schools })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchoolRecord> {
        self.schools.iter()
    }

    pub fn as_slice(&self) -> &[SchoolRecord] {
        &self.schools
    }

    pub fn get(&self, id: &SchoolId) -> Option<&SchoolRecord> {
        self.schools.iter().find(|s| &s.id == id)
    }
}

impl<'a> IntoIterator for &'a SchoolCatalog {
    type Item = &'a SchoolRecord;
    type IntoIter = std::slice::Iter<'a, SchoolRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.schools.iter()
    }
}
