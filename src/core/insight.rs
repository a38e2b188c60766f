use serde::{Deserialize, Serialize};

use crate::core::encoder::{CategoryKind, EncoderRegistry, UNKNOWN_CODE};
use crate::core::ranker::{RecommendationResult, ScoredCandidate};
use crate::models::{SchoolRecommendation, SchoolRecord, UserProfile};

const MIN_CHANCE: f64 = 5.0;
const MAX_CHANCE: f64 = 85.0;

/// Application category relative to the applicant's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Reach,
    Match,
    Safety,
}

impl Tier {
    pub fn from_chance(chance: u8) -> Self {
        match chance {
            0..=29 => Tier::Reach,
            30..=59 => Tier::Match,
            _ => Tier::Safety,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Reach => "reach",
            Tier::Match => "match",
            Tier::Safety => "safety",
        }
    }
}

/// Rough admission chance in percent, clamped to [5, 85].
///
/// (gpa/avg_gpa * 0.4 + toefl/avg_toefl * 0.3 + gre/avg_gre * 0.3)
///     * admission_rate
///
/// `None` when the school lacks any of the statistics.
pub fn admission_chance(profile: &UserProfile, school: &SchoolRecord) -> Option<u8> {
    let ratio = |value: f64, reference: Option<f64>| reference.filter(|r| *r > 0.0).map(|r| value / r);

    let gpa = ratio(profile.gpa, school.avg_gpa)?;
    let toefl = ratio(f64::from(profile.toefl), school.avg_toefl)?;
    let gre = ratio(f64::from(profile.gre), school.avg_gre)?;
    let rate = school.admission_fraction()?;

    let probability = (gpa * 0.4 + toefl * 0.3 + gre * 0.3) * rate * 100.0;
    Some(probability.clamp(MIN_CHANCE, MAX_CHANCE).round() as u8)
}

fn compare_line(label: &str, value: f64, reference: Option<f64>, precision: usize) -> Option<String> {
    let reference = reference.filter(|r| *r > 0.0)?;
    let relation = if (value - reference).abs() < f64::EPSILON * reference.max(1.0) {
        "matches"
    } else if value > reference {
        "is above"
    } else {
        "is below"
    };
    Some(format!(
        "{} {:.*} {} the school average of {:.*}",
        label, precision, value, relation, precision, reference
    ))
}

/// Human-readable notes on how the profile lines up with a school
pub fn reasoning(profile: &UserProfile, school: &SchoolRecord, registry: &EncoderRegistry) -> Vec<String> {
    let mut lines = Vec::new();

    lines.extend(compare_line("GPA", profile.gpa, school.avg_gpa, 2));
    lines.extend(compare_line("TOEFL", f64::from(profile.toefl), school.avg_toefl, 0));
    lines.extend(compare_line("GRE", f64::from(profile.gre), school.avg_gre, 0));

    let major_code = registry.encode(CategoryKind::Major, &profile.major);
    let offers_major = major_code != UNKNOWN_CODE
        && school
            .majors
            .iter()
            .any(|m| registry.encode(CategoryKind::Major, m) == major_code);
    if offers_major {
        lines.push(format!("Offers your intended major ({})", profile.major));
    } else if !school.majors.is_empty() {
        lines.push(format!("{} is not among the listed programs", profile.major));
    }

    let in_target_country = profile.target_countries.iter().any(|c| {
        c.eq_ignore_ascii_case(&school.country)
            || matches!(
                (registry.country_slot(c), registry.country_slot(&school.country)),
                (Some(a), Some(b)) if a == b
            )
    });
    if in_target_country {
        lines.push(format!("Located in one of your target countries ({})", school.country));
    }

    if let Some(chance) = admission_chance(profile, school) {
        lines.push(format!(
            "Estimated admission chance {}% ({})",
            chance,
            Tier::from_chance(chance).as_str()
        ));
    }

    lines
}

fn present_one(
    rank: usize,
    candidate: ScoredCandidate,
    profile: &UserProfile,
    registry: &EncoderRegistry,
    include_reasoning: bool,
) -> SchoolRecommendation {
    let chance = admission_chance(profile, &candidate.school);
    let reasons = include_reasoning.then(|| reasoning(profile, &candidate.school, registry));
    let school = candidate.school;

    SchoolRecommendation {
        rank,
        id: school.id,
        name: school.name,
        country: school.country,
        score: candidate.score,
        admission_chance: chance,
        tier: chance.map(Tier::from_chance),
        world_rank: school.world_rank,
        reasoning: reasons,
    }
}

/// Shape ranked candidates into response records, ranks starting at 1
pub fn present(
    result: RecommendationResult,
    profile: &UserProfile,
    registry: &EncoderRegistry,
    include_reasoning: bool,
) -> Vec<SchoolRecommendation> {
    result
        .candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| present_one(idx + 1, candidate, profile, registry, include_reasoning))
        .collect()
}
