// tests/duplicates_tests.rs
use std::collections::BTreeSet;

use grscicoll_lib::models::{DuplicatesSearchParams, EntityKind};
use grscicoll_lib::{DuplicatesService, InMemoryRegistry, RegistryError};
use serde_json::json;
use uuid::Uuid;

const INST_A: &str = "0a000000-0000-4000-8000-00000000000a";
const INST_B: &str = "0b000000-0000-4000-8000-00000000000b";
const INST_C: &str = "0c000000-0000-4000-8000-00000000000c";
const COLL_1: &str = "c0000000-0000-4000-8000-000000000001";
const COLL_2: &str = "c0000000-0000-4000-8000-000000000002";
const COLL_3: &str = "c0000000-0000-4000-8000-000000000003";

fn key(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap()
}

fn service() -> DuplicatesService<InMemoryRegistry> {
    let snapshot = json!({
        "generatedDate": "2024-03-01T12:00:00Z",
        "institutions": [
            {
                "key": INST_A,
                "code": "C1",
                "name": "Museum of Zoology",
                "active": true,
                "address": { "city": "Lund", "country": "SE" }
            },
            {
                "key": INST_B,
                "code": "c1",
                "name": "Museum  of Zoology.",
                "active": true,
                "address": { "city": "Oslo", "country": "NO" }
            },
            {
                "key": INST_C,
                "code": "OTHER",
                "name": "Botanical Garden",
                "active": true,
                "address": { "city": "Lund", "country": "SE" }
            }
        ],
        "collections": [
            { "key": COLL_1, "code": "HERB", "institutionKey": INST_A },
            { "key": COLL_2, "code": "HERB", "institutionKey": INST_A },
            { "key": COLL_3, "code": "HERB", "institutionKey": INST_B }
        ]
    });
    DuplicatesService::new(InMemoryRegistry::from_json(&snapshot.to_string()).unwrap())
}

fn keys_of(group: &BTreeSet<grscicoll_lib::Duplicate>) -> BTreeSet<Uuid> {
    group.iter().map(|d| d.key).collect()
}

#[tokio::test]
async fn test_institutions_sharing_a_code() {
    let params = DuplicatesSearchParams {
        same_code: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
    assert_eq!(
        keys_of(&result.duplicates[0]),
        BTreeSet::from([key(INST_A), key(INST_B)])
    );
    assert_eq!(
        result.generation_date.map(|d| d.to_rfc3339()),
        Some("2024-03-01T12:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn test_criteria_combine() {
    // same code, but different countries
    let params = DuplicatesSearchParams {
        same_code: true,
        same_country: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap();
    assert!(result.duplicates.is_empty());
    assert!(result.generation_date.is_none());

    let params = DuplicatesSearchParams {
        same_city: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
    assert_eq!(
        keys_of(&result.duplicates[0]),
        BTreeSet::from([key(INST_A), key(INST_C)])
    );
}

#[tokio::test]
async fn test_fuzzy_name_ignores_punctuation_and_spacing() {
    let exact = DuplicatesSearchParams {
        same_name: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&exact)
        .await
        .unwrap();
    assert!(result.duplicates.is_empty());

    let fuzzy = DuplicatesSearchParams {
        same_fuzzy_name: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&fuzzy)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
}

#[tokio::test]
async fn test_country_scoping() {
    let params = DuplicatesSearchParams {
        same_code: true,
        not_in_countries: vec!["NO".parse().unwrap()],
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap();
    assert!(result.duplicates.is_empty());
}

#[tokio::test]
async fn test_collections_scoped_by_institution() {
    let params = DuplicatesSearchParams {
        same_code: true,
        same_institution_key: true,
        ..Default::default()
    };
    let service = service();
    let result = service
        .find_possible_duplicate_collections(&params)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
    let group = &result.duplicates[0];
    assert_eq!(keys_of(group), BTreeSet::from([key(COLL_1), key(COLL_2)]));
    assert!(group.iter().all(|d| d.institution_key == Some(key(INST_A))));

    let scoped = DuplicatesSearchParams {
        in_institutions: vec![key(INST_A)],
        ..params.clone()
    };
    let result = service
        .find_possible_duplicate_collections(&scoped)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);

    let excluded = DuplicatesSearchParams {
        not_in_institutions: vec![key(INST_A)],
        ..params
    };
    let result = service
        .find_possible_duplicates(EntityKind::Collection, &excluded)
        .await
        .unwrap();
    assert!(result.duplicates.is_empty());
}

#[tokio::test]
async fn test_excluded_keys_leave_the_scan() {
    let params = DuplicatesSearchParams {
        same_code: true,
        exclude_keys: vec![key(COLL_3)],
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_collections(&params)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
    assert_eq!(
        keys_of(&result.duplicates[0]),
        BTreeSet::from([key(COLL_1), key(COLL_2)])
    );
}

#[tokio::test]
async fn test_three_way_duplicates_form_one_group() {
    let params = DuplicatesSearchParams {
        same_code: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_collections(&params)
        .await
        .unwrap();
    assert_eq!(result.duplicates.len(), 1);
    assert_eq!(result.duplicates[0].len(), 3);
}

#[tokio::test]
async fn test_scan_needs_a_criterion() {
    let params = DuplicatesSearchParams {
        in_countries: vec!["SE".parse().unwrap()],
        ..Default::default()
    };
    let err = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RegistryError>(),
        Some(RegistryError::InvalidSearchParams(_))
    ));
}

#[tokio::test]
async fn test_result_json_shape() {
    let params = DuplicatesSearchParams {
        same_code: true,
        ..Default::default()
    };
    let result = service()
        .find_possible_duplicate_institutions(&params)
        .await
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["duplicates"][0][0]["key"], INST_A);
    assert_eq!(value["duplicates"][0][0]["physicalCountry"], "SE");
    assert!(value["generationDate"].is_string());
}
