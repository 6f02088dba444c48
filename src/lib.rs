//! # validate-melm Library
//!
//! Validation of unpacked map-element libraries. A library version lives under
//! `{base}/{name}/{version}/{name}-{version}/` and must hold exactly one XML descriptor that
//! conforms to the descriptor schema, points at an existing icon and declares a name and
//! version consistent with where it was found.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod layout;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod schema;
pub mod validator;

pub use catalog::{
    CatalogScanner, LibraryOutcome, LibraryStatus, ScanConfig, ScanReport, discover_libraries,
};
pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{ErrorKind, LibraryValidatorError, Result};
pub use extractor::{ExtractedFields, extract_fields, extract_icon_path, extract_library_type};
pub use identity::{check_identity, check_name_and_version};
pub use layout::{
    LibraryIdentity, LibraryLocation, build_directory_for_library_version, library_directory,
    unpacked_directory_for_library_version,
};
pub use libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};
pub use output::Output;
pub use schema::{DescriptorSchema, XSD_PATH, default_schema_path, validate_against_schema};
pub use validator::{
    LibraryValidator, ValidateOptions, ValidatedLibrary, find_descriptor, locate_descriptor,
    validate_library, validate_library_with_options,
};
