use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{StartupError, UnknownCategoryWarning};

/// Code reserved for values outside the vocabulary
pub const UNKNOWN_CODE: u32 = 0;

/// Categorical profile fields with a learned vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Major,
    Country,
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKind::Major => f.write_str("major"),
            CategoryKind::Country => f.write_str("country"),
        }
    }
}

/// Vocabulary shipped with the model artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub majors: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub major_aliases: HashMap<String, String>,
    #[serde(default)]
    pub country_aliases: HashMap<String, String>,
}

#[inline]
fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Stable value-to-code mapping for one category kind.
///
/// Entries get codes `1..=n` in vocabulary order; `UNKNOWN_CODE` covers
/// everything else. Lookups ignore surrounding whitespace and case.
#[derive(Debug, Clone)]
pub struct CategoryEncoding {
    kind: CategoryKind,
    codes: HashMap<String, u32>,
    labels: Vec<String>,
}

impl CategoryEncoding {
    pub fn new<I, S>(kind: CategoryKind, vocabulary: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes = HashMap::new();
        let mut labels = Vec::new();

        for entry in vocabulary {
            let label = entry.as_ref().trim();
            let key = normalize(label);
            if key.is_empty() {
                continue;
            }
            if codes.contains_key(&key) {
                return Err(StartupError::DuplicateVocabulary {
                    kind,
                    value: label.to_string(),
                });
            }
            labels.push(label.to_string());
            codes.insert(key, labels.len() as u32);
        }

        Ok(Self { kind, codes, labels })
    }

    /// Register alternative spellings for existing entries. Aliases pointing
    /// at values outside the vocabulary are skipped.
    pub fn with_aliases(mut self, aliases: &HashMap<String, String>) -> Self {
        let mut names: Vec<&String> = aliases.keys().collect();
        names.sort();

        for alias in names {
            let target = normalize(&aliases[alias]);
            match self.codes.get(&target).copied() {
                Some(code) => {
                    self.codes.entry(normalize(alias)).or_insert(code);
                }
                None => {
                    tracing::warn!("Ignoring {} alias '{}': target not in vocabulary", self.kind, alias);
                }
            }
        }
        self
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    /// Number of known entries (the unknown code excluded)
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.codes.get(&normalize(value)).copied()
    }

    /// Encode a value, falling back to `UNKNOWN_CODE`. Never fails.
    #[inline]
    pub fn encode(&self, value: &str) -> u32 {
        self.lookup(value).unwrap_or(UNKNOWN_CODE)
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        if code == UNKNOWN_CODE {
            return None;
        }
        self.labels.get(code as usize - 1).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Process-wide encodings for every categorical feature
#[derive(Debug, Clone)]
pub struct EncoderRegistry {
    majors: CategoryEncoding,
    countries: CategoryEncoding,
}

impl EncoderRegistry {
    pub fn new(majors: CategoryEncoding, countries: CategoryEncoding) -> Self {
        Self { majors, countries }
    }

    pub fn from_vocabulary(vocabulary: &Vocabulary) -> Result<Self, StartupError> {
        let majors = CategoryEncoding::new(CategoryKind::Major, &vocabulary.majors)?
            .with_aliases(&vocabulary.major_aliases);
        let countries = CategoryEncoding::new(CategoryKind::Country, &vocabulary.countries)?
            .with_aliases(&vocabulary.country_aliases);

        Ok(Self::new(majors, countries))
    }

    pub fn encoding(&self, kind: CategoryKind) -> &CategoryEncoding {
        match kind {
            CategoryKind::Major => &self.majors,
            CategoryKind::Country => &self.countries,
        }
    }

    pub fn encode(&self, kind: CategoryKind, value: &str) -> u32 {
        self.encoding(kind).encode(value)
    }

    /// Like `encode`, also reporting a warning for out-of-vocabulary values
    pub fn encode_checked(&self, kind: CategoryKind, value: &str) -> (u32, Option<UnknownCategoryWarning>) {
        match self.encoding(kind).lookup(value) {
            Some(code) => (code, None),
            None => (
                UNKNOWN_CODE,
                Some(UnknownCategoryWarning {
                    kind,
                    value: value.to_string(),
                }),
            ),
        }
    }

    /// Width of the country multi-hot block: one slot per known country
    /// plus a trailing unknown slot.
    pub fn country_slots(&self) -> usize {
        self.countries.len() + 1
    }

    /// Multi-hot encoding of a set of target countries.
    ///
    /// Known country with code `c` sets slot `c - 1`; any unknown country
    /// sets the last slot. Repeats collapse. Empty input yields all zeros.
    pub fn encode_countries<S: AsRef<str>>(&self, values: &[S]) -> (Vec<f64>, Vec<UnknownCategoryWarning>) {
        let unknown_slot = self.countries.len();
        let mut slots = vec![0.0; self.country_slots()];
        let mut warnings = Vec::new();

        for value in values {
            let (code, warning) = self.encode_checked(CategoryKind::Country, value.as_ref());
            match warning {
                Some(w) => {
                    slots[unknown_slot] = 1.0;
                    warnings.push(w);
                }
                None => slots[code as usize - 1] = 1.0,
            }
        }

        (slots, warnings)
    }

    /// Slot index of a country inside the multi-hot block, if known
    pub fn country_slot(&self, country: &str) -> Option<usize> {
        self.countries.lookup(country).map(|code| code as usize - 1)
    }
}
