mod common;

use std::fs;

use common::{LibraryTree, TestFixtures};
use validate_melm::{
    ErrorKind, LibraryLocation, LibraryValidator, ValidateOptions, build_directory_for_library_version,
    check_name_and_version, extract_icon_path, extract_library_type, validate_library,
    validate_library_with_options,
};

#[test]
fn test_valid_library() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");

    let validated =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap();

    assert_eq!(validated.unpacked_directory, unpacked);
    assert_eq!(validated.descriptor, unpacked.join("library.xml"));
    assert_eq!(validated.icon, unpacked.join("icon.png"));
    assert_eq!(validated.fields.library_type, "points");
}

#[test]
fn test_missing_icon() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_without_icon("emergency.lu", "1.1", "emergency_lu-1.1.xml");

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::IconNotFound);
    assert_eq!(
        error.message(),
        "Icon file not found with local path : icon.png"
    );
}

#[test]
fn test_icon_in_subdirectory() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.library_without_icon("ocha_activity", "1.0", "ocha_activity-1.0.xml");

    let error =
        validate_library(&fixtures.schema(), tree.base(), "ocha_activity", "1.0").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::IconNotFound);

    fs::create_dir(unpacked.join("images")).unwrap();
    fs::write(unpacked.join("images").join("ocha.png"), b"png").unwrap();

    let validated =
        validate_library(&fixtures.schema(), tree.base(), "ocha_activity", "1.0").unwrap();
    assert_eq!(validated.fields.library_type, "areas");
}

#[test]
fn test_wrong_declared_name() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_declaring("emergency.lu", "1.0", "wrong.name", "1.0");

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.0").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NameMismatch);
    assert!(error.message().starts_with("Incorrect Library name in xml"));
}

#[test]
fn test_wrong_declared_version() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_declaring("emergency.lu", "1.1", "emergency.lu", "2.0");

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::VersionMismatch);
}

#[test]
fn test_declared_identity_suffix_accepted() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_declaring("hitec.emergency.lu", "v1.1", "emergency.lu", "1.1");

    assert!(validate_library(&fixtures.schema(), tree.base(), "hitec.emergency.lu", "v1.1").is_ok());
}

#[test]
fn test_missing_unpacked_directory() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.fr", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert!(tree.base().join("emergency.fr").join("1.1").is_dir());
    assert!(!tree.unpacked_dir("emergency.fr", "1.1").exists());
    assert_eq!(
        fs::read_dir(tree.base().join("emergency.fr").join("1.1"))
            .unwrap()
            .count(),
        0
    );
}

#[test]
fn test_unavailable_base_directory() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let missing_base = tree.base().join("not").join("there");

    let error =
        validate_library(&fixtures.schema(), &missing_base, "emergency.lu", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DirectoryUnavailable);
    assert!(!missing_base.exists());
}

#[test]
fn test_no_descriptor() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.empty_library("emergency.lu", "1.1");
    fs::write(unpacked.join("icon.png"), b"png").unwrap();

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DescriptorCount);
    assert_eq!(
        error.message(),
        "There are 0 xml files in the folder, one and only one is allowed"
    );
}

#[test]
fn test_two_descriptors() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");
    fs::copy(
        fixtures.xml("nato_airtrack-1.0.xml"),
        unpacked.join("second.xml"),
    )
    .unwrap();

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DescriptorCount);
    assert!(error.message().contains("There are 2 xml files"));
}

#[test]
fn test_schema_violation() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.0", "wrong_library_type.xml");

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.0").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::SchemaViolation);
    assert!(error.message().starts_with("Error in validateXML"));
}

#[test]
fn test_malformed_descriptor_reported_as_schema_violation() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.empty_library("emergency.lu.broken.xml", "1.0");
    fs::write(unpacked.join("library.xml"), "<elements><description>").unwrap();

    let error = validate_library(
        &fixtures.schema(),
        tree.base(),
        "emergency.lu.broken.xml",
        "1.0",
    )
    .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn test_expected_library_type() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");
    let location = LibraryLocation::new(tree.base(), "emergency.lu", "1.1");

    let points = ValidateOptions {
        expected_library_type: Some("points".to_string()),
    };
    assert!(validate_library_with_options(&fixtures.schema(), &location, points).is_ok());

    let areas = ValidateOptions {
        expected_library_type: Some("areas".to_string()),
    };
    let error = validate_library_with_options(&fixtures.schema(), &location, areas).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::LibraryTypeMismatch);
}

#[test]
fn test_validator_reused_across_libraries() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    tree.library_from_fixture("emergency.lu", "1.1", "emergency_lu-1.1.xml");
    tree.library_from_fixture("NATO_AirTrack", "1.0", "nato_airtrack-1.0.xml");
    tree.library_without_icon("emergency.lu", "1.0", "emergency_lu-1.1.xml");

    let validator = LibraryValidator::new(&fixtures.schema()).unwrap();

    assert!(
        validator
            .validate(&LibraryLocation::new(tree.base(), "emergency.lu", "1.1"))
            .is_ok()
    );
    assert!(
        validator
            .validate(&LibraryLocation::new(tree.base(), "NATO_AirTrack", "1.0"))
            .is_ok()
    );
    // emergency.lu 1.0 has no icon, and the descriptor declares 1.1
    assert_eq!(
        validator
            .validate(&LibraryLocation::new(tree.base(), "emergency.lu", "1.0"))
            .unwrap_err()
            .kind(),
        ErrorKind::IconNotFound
    );
}

#[test]
fn test_build_directory_is_idempotent() {
    let tree = LibraryTree::new();

    let first = build_directory_for_library_version(tree.base(), "emergency.lu", "1.1").unwrap();
    let second = build_directory_for_library_version(tree.base(), "emergency.lu", "1.1").unwrap();

    assert_eq!(first, second);
    assert_eq!(first, tree.base().join("emergency.lu").join("1.1"));
    assert!(first.is_dir());
}

#[test]
fn test_lower_level_operations_on_fixtures() {
    let fixtures = TestFixtures::new();
    let emergency = fixtures.xml("emergency_lu-1.1.xml");
    let nato = fixtures.xml("nato_airtrack-1.0.xml");

    assert_eq!(extract_icon_path(&emergency).unwrap(), "icon.png");
    assert_eq!(extract_library_type(&emergency).unwrap(), "points");
    assert_eq!(extract_library_type(&fixtures.xml("missing_description.xml")).unwrap(), "");

    assert!(check_name_and_version(&nato, "NATO_AirTrack", "1.0").is_ok());
    assert!(check_name_and_version(&emergency, "NATO_AirTrack", "1.0").is_err());
}

#[cfg(unix)]
#[test]
fn test_absolute_icon_path_resolved_inside_unpacked_directory() {
    let fixtures = TestFixtures::new();
    let tree = LibraryTree::new();
    let unpacked = tree.empty_library("emergency.lu", "1.1");

    let outside = tree.base().join("outside.png");
    fs::write(&outside, b"png").unwrap();
    let descriptor = fs::read_to_string(fixtures.xml("emergency_lu-1.1.xml"))
        .unwrap()
        .replace(
            r#"file="icon.png""#,
            &format!(r#"file="{}""#, outside.display()),
        );
    fs::write(unpacked.join("library.xml"), descriptor).unwrap();

    let error =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::IconNotFound);

    let relocated = unpacked.join(outside.strip_prefix("/").unwrap());
    fs::create_dir_all(relocated.parent().unwrap()).unwrap();
    fs::write(&relocated, b"png").unwrap();

    let validated =
        validate_library(&fixtures.schema(), tree.base(), "emergency.lu", "1.1").unwrap();
    assert_eq!(validated.icon, relocated);
}
