// Unit tests for the school recommender

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use school_recommender::core::{
    admission_chance, rank, CategoryKind, EncoderRegistry, FeatureExtractor, FeatureLayout, ModelSpec, Tier,
    Vocabulary, UNKNOWN_CODE,
};
use school_recommender::core::model::RuleBasedParams;
use school_recommender::models::{SchoolCatalog, SchoolRecord, UserProfile};

fn vocabulary() -> Vocabulary {
    Vocabulary {
        majors: vec!["CS".into(), "Physics".into(), "Business".into()],
        countries: vec!["US".into(), "UK".into(), "CA".into()],
        major_aliases: HashMap::from([("computer science".to_string(), "CS".to_string())]),
        country_aliases: HashMap::from([("canada".to_string(), "CA".to_string())]),
    }
}

fn registry() -> Arc<EncoderRegistry> {
    Arc::new(EncoderRegistry::from_vocabulary(&vocabulary()).unwrap())
}

fn profile(major: &str, countries: &[&str]) -> UserProfile {
    UserProfile {
        gpa: 3.6,
        toefl: 102,
        gre: 318,
        major: major.to_string(),
        target_countries: countries.iter().map(|c| c.to_string()).collect(),
    }
}

fn school(id: u64, country: &str, gpa: f64, rate: f64) -> SchoolRecord {
    let mut school = SchoolRecord::new(id, format!("School {}", id), country);
    school.avg_gpa = Some(gpa);
    school.avg_toefl = Some(100.0);
    school.avg_gre = Some(315.0);
    school.admission_rate = Some(rate);
    school.majors = vec!["CS".to_string()];
    school
}

#[test]
fn test_encoding_is_stable() {
    let registry = registry();
    let first = registry.encode(CategoryKind::Major, "Physics");
    for _ in 0..10 {
        assert_eq!(registry.encode(CategoryKind::Major, "Physics"), first);
    }
    assert_eq!(first, 2);
}

#[test]
fn test_encoding_normalizes_case_and_whitespace() {
    let registry = registry();
    assert_eq!(registry.encode(CategoryKind::Major, "  cs "), 1);
    assert_eq!(registry.encode(CategoryKind::Major, "Computer Science"), 1);
    assert_eq!(registry.encode(CategoryKind::Country, "CANADA"), 3);
}

#[test]
fn test_unknown_values_share_reserved_code() {
    let registry = registry();
    assert_eq!(registry.encode(CategoryKind::Major, "Underwater Basket Weaving"), UNKNOWN_CODE);
    assert_eq!(registry.encode(CategoryKind::Major, "Astrology"), UNKNOWN_CODE);
    assert_eq!(registry.encode(CategoryKind::Country, "Atlantis"), UNKNOWN_CODE);

    // Known codes never collide with the reserved one
    for label in registry.encoding(CategoryKind::Major).labels() {
        assert_ne!(registry.encode(CategoryKind::Major, label), UNKNOWN_CODE);
    }
}

#[test]
fn test_feature_vector_layout() {
    let extractor = FeatureExtractor::new(registry());
    let vector = extractor.extract(&profile("Physics", &["UK", "Mars"])).unwrap();

    // 3 numeric + major + 3 countries + unknown slot
    assert_eq!(vector.len(), 8);
    assert_eq!(vector.len(), FeatureLayout::for_registry(extractor.registry()).len());
    assert_eq!(vector.as_slice(), &[3.6, 102.0, 318.0, 2.0, 0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_feature_vector_deterministic() {
    let extractor = FeatureExtractor::new(registry());
    let p = profile("CS", &["US", "CA"]);
    assert_eq!(extractor.extract(&p).unwrap(), extractor.extract(&p).unwrap());
}

#[test]
fn test_empty_target_countries_allowed() {
    let extractor = FeatureExtractor::new(registry());
    let extraction = extractor.extract_with_warnings(&profile("CS", &[])).unwrap();
    assert!(extraction.warnings.is_empty());
    assert!(extraction.vector.as_slice()[4..].iter().all(|v| *v == 0.0));
}

#[test]
fn test_unknown_major_warns_but_succeeds() {
    let extractor = FeatureExtractor::new(registry());
    let extraction = extractor.extract_with_warnings(&profile("Astrology", &["US"])).unwrap();
    assert_eq!(extraction.warnings.len(), 1);
    assert_eq!(extraction.warnings[0].kind, CategoryKind::Major);
    assert_eq!(extraction.vector.get(3), Some(0.0));
}

#[test]
fn test_out_of_range_profile_rejected() {
    let extractor = FeatureExtractor::new(registry());

    let mut p = profile("CS", &["US"]);
    p.gpa = 4.5;
    assert!(extractor.extract(&p).is_err());

    let mut p = profile("CS", &["US"]);
    p.toefl = 121;
    assert!(extractor.extract(&p).is_err());

    let mut p = profile("CS", &["US"]);
    p.gpa = f64::NAN;
    assert!(extractor.extract(&p).is_err());
}

#[test]
fn test_rank_orders_and_breaks_ties() {
    let catalog = SchoolCatalog::new(vec![
        school(2, "US", 3.5, 30.0),
        school(1, "US", 3.5, 30.0),
        school(3, "US", 3.5, 30.0),
        school(4, "US", 3.5, 30.0),
        school(5, "US", 3.5, 30.0),
    ])
    .unwrap();

    let result = rank(&[0.9, 0.9, 0.7, 0.5, f64::NAN], &catalog, NonZeroUsize::new(3).unwrap());

    let ids: Vec<String> = result.candidates.iter().map(|c| c.school.id.to_string()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(result.excluded, 1);
}

#[test]
fn test_rank_never_exceeds_n() {
    let schools: Vec<SchoolRecord> = (1..=20).map(|id| school(id, "US", 3.5, 30.0)).collect();
    let catalog = SchoolCatalog::new(schools).unwrap();
    let scores: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();

    for n in 1..=25 {
        let result = rank(&scores, &catalog, NonZeroUsize::new(n).unwrap());
        assert_eq!(result.len(), n.min(20));
        assert!(result
            .candidates
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
    }
}

#[test]
fn test_rank_drops_infinite_scores() {
    let catalog = SchoolCatalog::new(vec![
        school(1, "US", 3.5, 30.0),
        school(2, "US", 3.5, 30.0),
        school(3, "US", 3.5, 30.0),
    ])
    .unwrap();

    let result = rank(
        &[f64::INFINITY, 0.4, f64::NEG_INFINITY],
        &catalog,
        NonZeroUsize::new(10).unwrap(),
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result.excluded, 2);
}

#[test]
fn test_rule_based_prefers_stronger_fit() {
    let registry = registry();
    let model = ModelSpec::RuleBased(RuleBasedParams::default()).into_model("test".to_string(), registry.clone());
    let extractor = FeatureExtractor::new(registry);

    let catalog = SchoolCatalog::new(vec![
        school(1, "US", 3.95, 5.0),
        school(2, "US", 3.0, 60.0),
    ])
    .unwrap();

    let features = extractor.extract(&profile("CS", &["US"])).unwrap();
    let scores = model.score(&features, &catalog).unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores[1] > scores[0]);
    assert!(scores.iter().all(|s| (0.0..=100.0).contains(s)));
}

#[test]
fn test_admission_chance_tiers() {
    let p = profile("CS", &["US"]);

    let selective = admission_chance(&p, &school(1, "US", 3.9, 5.0)).unwrap();
    assert_eq!(Tier::from_chance(selective), Tier::Reach);

    let open = admission_chance(&p, &school(2, "US", 3.0, 90.0)).unwrap();
    assert_eq!(open, 85);
    assert_eq!(Tier::from_chance(open), Tier::Safety);
}
