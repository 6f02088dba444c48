use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong during a library validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The library or version directory could not be created or is not a directory
    DirectoryUnavailable,
    /// The unpacked directory does not exist or is not a directory
    NotFound,
    /// The unpacked directory does not hold exactly one descriptor
    DescriptorCount,
    /// The descriptor does not conform to the schema, or the schema could not be loaded
    SchemaViolation,
    /// The descriptor could not be parsed or queried
    MalformedDescriptor,
    /// The icon declared by the descriptor is missing on disk
    IconNotFound,
    /// The declared library name is not a suffix of the expected name
    NameMismatch,
    /// The declared library version is not a suffix of the expected version
    VersionMismatch,
    /// The declared library type differs from the one the caller asked for
    LibraryTypeMismatch,
    /// Any other filesystem failure
    Io,
}

/// The single error reported by library validation
///
/// Carries a kind for programmatic handling, a human-readable message and, where one
/// exists, the lower-level error that triggered it.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct LibraryValidatorError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl LibraryValidatorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Path resolver errors
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to create directory {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path exists but is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: {path} - {details}")]
    SchemaParseFailed { path: PathBuf, details: String },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("File validation failed with code {code}: {file} - {details}")]
    ValidationFailed {
        code: i32,
        file: PathBuf,
        details: String,
    },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Invalid XML structure: {file} - {details}")]
    InvalidXml { file: PathBuf, details: String },

    #[error("XPath evaluation failed: {expression}")]
    XPathEvaluation { expression: String },

    #[error("Path cannot be passed to libxml2: {path}")]
    InvalidPath { path: PathBuf },
}

/// Schema validation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Error in validateXML {0}")]
    Load(#[source] LibXml2Error),

    #[error("Error in validateXML {file}: {first_error} ({error_count} error(s))")]
    Invalid {
        file: PathBuf,
        error_count: i32,
        first_error: String,
        errors: Vec<String>,
    },

    #[error("Error in validateXML {0}")]
    Unreadable(#[source] LibXml2Error),
}

/// Name/version consistency errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Incorrect Library name in xml: '{declared}' is not a suffix of '{expected}'")]
    WrongName { declared: String, expected: String },

    #[error("Incorrect Library version in xml: '{declared}' is not a suffix of '{expected}'")]
    WrongVersion { declared: String, expected: String },

    #[error(transparent)]
    Xml(#[from] LibXml2Error),
}

// Normalization into the single public error
impl From<LayoutError> for LibraryValidatorError {
    fn from(err: LayoutError) -> Self {
        LibraryValidatorError::with_source(ErrorKind::DirectoryUnavailable, err.to_string(), err)
    }
}

impl From<LibXml2Error> for LibraryValidatorError {
    fn from(err: LibXml2Error) -> Self {
        LibraryValidatorError::with_source(ErrorKind::MalformedDescriptor, err.to_string(), err)
    }
}

impl From<SchemaError> for LibraryValidatorError {
    fn from(err: SchemaError) -> Self {
        LibraryValidatorError::with_source(ErrorKind::SchemaViolation, err.to_string(), err)
    }
}

impl From<IdentityError> for LibraryValidatorError {
    fn from(err: IdentityError) -> Self {
        let kind = match err {
            IdentityError::WrongName { .. } => ErrorKind::NameMismatch,
            IdentityError::WrongVersion { .. } => ErrorKind::VersionMismatch,
            IdentityError::Xml(_) => ErrorKind::MalformedDescriptor,
        };
        LibraryValidatorError::with_source(kind, err.to_string(), err)
    }
}

impl From<std::io::Error> for LibraryValidatorError {
    fn from(err: std::io::Error) -> Self {
        LibraryValidatorError::with_source(ErrorKind::Io, format!("IO error: {}", err), err)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LibraryValidatorError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
