//! Tree and path navigation over the shipped taxonomies

mod common;

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use common::{open_session, ENTITY_TYPES};
use records_taxonomy::navigation::MAX_SEARCH_RESULTS;
use records_taxonomy::taxonomy::check_completeness;

#[test]
fn test_every_entity_type_loads_complete() {
    let ts = open_session();
    assert_eq!(ts.session.entity_types(), ENTITY_TYPES.to_vec());

    for entity in ENTITY_TYPES {
        let tree = ts.session.tree(entity).unwrap();
        assert_eq!(tree.country_code(), "US");
        assert!(
            check_completeness(&tree).is_empty(),
            "{} taxonomy is incomplete",
            entity
        );
    }
}

#[test]
fn test_all_document_types_is_the_traversal_union() {
    let ts = open_session();

    for entity in ENTITY_TYPES {
        let tree = ts.session.tree(entity).unwrap();

        let mut traversed = BTreeSet::new();
        for function in tree.functions() {
            for service in function.services() {
                for activity in service.activities() {
                    traversed.extend(activity.document_types.iter().cloned());
                }
            }
        }

        let first = tree.all_document_types();
        assert_eq!(first, traversed);
        assert_eq!(tree.all_document_types(), first);
    }
}

#[test]
fn test_consultations_example() {
    let ts = open_session();
    let resolver = ts.session.resolver("household").unwrap();

    let validation = resolver.validate("HealthManagement/MedicalCare/Consultations");
    assert!(validation.valid);
    let resolved = validation.resolved.unwrap();
    assert_eq!(resolved.function.as_deref(), Some("HealthManagement"));
    assert_eq!(resolved.service.as_deref(), Some("MedicalCare"));
    assert_eq!(resolved.activity.as_deref(), Some("Consultations"));
    assert!(!resolved.document_types.is_empty());
    assert!(resolved
        .retention
        .values()
        .any(|rule| rule.years.is_some() && !rule.authority.is_empty()));
}

#[test]
fn test_validate_and_parse_agree_on_every_activity() {
    let ts = open_session();

    for entity in ENTITY_TYPES {
        let resolver = ts.session.resolver(entity).unwrap();
        let mut paths: Vec<String> = resolver
            .tree()
            .activity_paths()
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect();
        paths.extend([
            String::new(),
            "Nope".to_string(),
            "FinancialManagement/Nope".to_string(),
            "a/b/c/d/e".to_string(),
        ]);

        for path in paths {
            let parsed = resolver.parse(&path);
            let validation = resolver.validate(&path);
            assert_eq!(parsed.valid, validation.valid, "{}", path);
            if validation.valid {
                assert_eq!(Some(parsed.resolved), validation.resolved, "{}", path);
            } else {
                assert_eq!(parsed.error, validation.error, "{}", path);
            }
        }
    }
}

#[test]
fn test_resolve_path_levels() {
    let ts = open_session();
    let resolver = ts.session.resolver("household").unwrap();

    let root = resolver.resolve_path("");
    let functions: Vec<String> = resolver
        .tree()
        .functions()
        .iter()
        .map(|f| f.name.clone())
        .collect();
    assert_eq!(root.suggestions, functions);
    assert_eq!(root.remaining, 3);

    let full = resolver.resolve_path("HealthManagement/MedicalCare/Consultations");
    assert_eq!(full.remaining, 0);
    assert_eq!(full.suggestions, vec!["VisitSummary", "Referral", "LabResult"]);
}

#[test]
fn test_invalid_segment_suggests_closest() {
    let ts = open_session();
    let resolver = ts.session.resolver("household").unwrap();

    let validation = resolver.validate("HealthManagement/MedicalCar/Consultations");
    assert!(!validation.valid);
    assert_eq!(
        validation.error.as_deref(),
        Some("Invalid service: MedicalCar for function HealthManagement")
    );
    assert_eq!(validation.suggestion.as_deref(), Some("MedicalCare"));
}

#[test]
fn test_hierarchical_tags_have_no_duplicates() {
    let ts = open_session();

    for entity in ENTITY_TYPES {
        let resolver = ts.session.resolver(entity).unwrap();
        for (path, _) in resolver.tree().activity_paths() {
            let [function, service, activity] = path.segments();
            let tags = resolver.generate_hierarchical_tags(function, service, activity);
            let unique: HashSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();
            assert_eq!(unique.len(), tags.len(), "{}", path);
            assert_eq!(&tags[..3], &[function, service, activity]);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_search_is_sorted_and_bounded(keyword in "[a-z]{1,6}") {
        let ts = open_session();
        for entity in ENTITY_TYPES {
            let hits = ts.session.resolver(entity).unwrap().search_by_keyword(&keyword);
            prop_assert!(hits.len() <= MAX_SEARCH_RESULTS);
            prop_assert!(hits.windows(2).all(|w| w[0].relevance >= w[1].relevance));
        }
    }
}

#[test]
fn test_common_keyword_search_is_truncated() {
    let ts = open_session();
    let hits = ts
        .session
        .resolver("household")
        .unwrap()
        .search_by_keyword("e");
    assert_eq!(hits.len(), MAX_SEARCH_RESULTS);
}
