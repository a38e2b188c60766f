use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::{SchoolCatalog, SchoolId, SchoolRecord};

/// Errors that can occur while loading the school catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate school id: {0}")]
    DuplicateId(String),

    #[error("Invalid record for school {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Unsupported catalog format: {0} (expected .csv or .json)")]
    UnsupportedFormat(String),
}

/// One row of the tabular catalog. `majors` is `;`-separated; empty cells
/// are absent values.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    name: String,
    country: String,
    #[serde(default)]
    avg_gpa: Option<f64>,
    #[serde(default)]
    avg_toefl: Option<f64>,
    #[serde(default)]
    avg_gre: Option<f64>,
    #[serde(default)]
    admission_rate: Option<f64>,
    #[serde(default)]
    majors: Option<String>,
    #[serde(default)]
    world_rank: Option<u32>,
}

impl From<CatalogRow> for SchoolRecord {
    fn from(row: CatalogRow) -> Self {
        SchoolRecord {
            id: SchoolId::new(row.id),
            name: row.name.trim().to_string(),
            country: row.country.trim().to_string(),
            avg_gpa: row.avg_gpa,
            avg_toefl: row.avg_toefl,
            avg_gre: row.avg_gre,
            admission_rate: row.admission_rate,
            majors: row
                .majors
                .map(|m| {
                    m.split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            world_rank: row.world_rank,
        }
    }
}

/// Parse a CSV catalog with a header row
pub fn parse_csv<R: Read>(reader: R) -> Result<SchoolCatalog, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut schools = Vec::new();
    for row in csv_reader.deserialize::<CatalogRow>() {
        schools.push(SchoolRecord::from(row?));
    }
    build(schools)
}

/// Parse a JSON array of school records
pub fn parse_json<R: Read>(reader: R) -> Result<SchoolCatalog, CatalogError> {
    let schools: Vec<SchoolRecord> = serde_json::from_reader(reader)?;
    build(schools)
}

fn build(schools: Vec<SchoolRecord>) -> Result<SchoolCatalog, CatalogError> {
    for school in &schools {
        check_record(school)?;
    }
    SchoolCatalog::new(schools)
}

fn check_record(school: &SchoolRecord) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidRecord {
        id: school.id.to_string(),
        reason,
    };

    if school.id.as_str().is_empty() {
        return Err(invalid("empty id".to_string()));
    }
    if school.name.trim().is_empty() {
        return Err(invalid("empty name".to_string()));
    }
    if let Some(rate) = school.admission_rate {
        if !(0.0..=100.0).contains(&rate) {
            return Err(invalid(format!("admission_rate {} outside 0-100", rate)));
        }
    }
    for (field, value) in [
        ("avg_gpa", school.avg_gpa),
        ("avg_toefl", school.avg_toefl),
        ("avg_gre", school.avg_gre),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number, got {}", field, v)));
            }
        }
    }
    Ok(())
}

/// Load the catalog from disk, picking the parser by file extension
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<SchoolCatalog, CatalogError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let open = || {
        std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })
    };

    let catalog = match extension.as_str() {
        "csv" => parse_csv(open()?)?,
        "json" => parse_json(open()?)?,
        other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
    };

    tracing::info!("Loaded {} schools from {}", catalog.len(), path.display());
    Ok(catalog)
}
