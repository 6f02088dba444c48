mod common;

use std::fs;

use common::{LibraryTree, TestFixtures};
use validate_melm::{
    CatalogScanner, ErrorKind, LibraryStatus, LibraryValidator, ScanConfig, ValidateOptions,
};

fn scanner(max_concurrent_validations: usize) -> CatalogScanner {
    let validator = LibraryValidator::new(&TestFixtures::new().schema()).unwrap();
    CatalogScanner::new(
        validator,
        ScanConfig {
            max_concurrent_validations,
        },
    )
}

#[tokio::test]
async fn test_scan_mixed_catalog() {
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");
    tree.library_from_fixture("NATO_AirTrack", "1.0", "nato_airtrack-1.0.xml");
    tree.library_without_icon("emergency.lu.incorrect.icon.path", "1.0", "emergency_lu-1.1.xml");
    tree.library_from_fixture("emergency.lu.wrong.library.type", "1.0", "wrong_library_type.xml");
    // Version directory without an unpacked library is not part of the catalog
    fs::create_dir_all(tree.base().join("emergency.fr").join("1.1")).unwrap();

    let report = scanner(2).scan(tree.base()).await.unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.valid, 2);
    assert_eq!(report.invalid, 2);
    assert!(!report.all_valid());

    let statuses: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.location.name(), o.status.clone()))
        .collect();

    assert_eq!(statuses[0].0, "NATO_AirTrack");
    assert_eq!(statuses[0].1, LibraryStatus::Valid);
    assert_eq!(statuses[1].0, "emergency.lu");
    assert_eq!(statuses[1].1, LibraryStatus::Valid);
    assert!(matches!(
        &statuses[2].1,
        LibraryStatus::Invalid {
            kind: ErrorKind::IconNotFound,
            ..
        }
    ));
    assert!(matches!(
        &statuses[3].1,
        LibraryStatus::Invalid {
            kind: ErrorKind::SchemaViolation,
            ..
        }
    ));
}

#[tokio::test]
async fn test_scan_all_valid() {
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");
    tree.library_declaring("emergency.lu", "1.2", "emergency.lu", "1.2");

    let report = scanner(1).scan(tree.base()).await.unwrap();

    assert_eq!(report.total, 2);
    assert!(report.all_valid());
}

#[tokio::test]
async fn test_scan_applies_validate_options() {
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");

    let validator = LibraryValidator::new(&TestFixtures::new().schema())
        .unwrap()
        .with_options(ValidateOptions {
            expected_library_type: Some("lines".to_string()),
        });
    let report = CatalogScanner::new(validator, ScanConfig::default())
        .scan(tree.base())
        .await
        .unwrap();

    assert_eq!(report.invalid, 1);
    assert!(matches!(
        &report.outcomes[0].status,
        LibraryStatus::Invalid {
            kind: ErrorKind::LibraryTypeMismatch,
            ..
        }
    ));
}

#[tokio::test]
async fn test_scan_many_libraries_concurrently() {
    let tree = LibraryTree::new();
    for minor in 0..24 {
        let version = format!("1.{}", minor);
        tree.library_declaring("emergency.lu", &version, "emergency.lu", &version);
    }

    let report = scanner(4).scan(tree.base()).await.unwrap();

    assert_eq!(report.total, 24);
    assert!(report.all_valid());
}

#[tokio::test]
async fn test_scan_empty_catalog() {
    let tree = LibraryTree::new();

    let report = scanner(2).scan(tree.base()).await.unwrap();

    assert_eq!(report.total, 0);
    assert!(!report.all_valid());
}

#[tokio::test]
async fn test_scan_missing_base() {
    let tree = LibraryTree::new();

    let error = scanner(2)
        .scan(&tree.base().join("missing"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Io);
}
