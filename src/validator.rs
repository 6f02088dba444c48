//! Library validation pipeline
//!
//! Each gate must pass before the next one runs:
//!
//! 1. the unpacked directory `{base}/{name}/{version}/{name}-{version}` exists
//! 2. it holds exactly one `.xml` descriptor
//! 3. the descriptor conforms to the schema
//! 4. the icon it declares exists relative to the unpacked directory
//! 5. the declared name and version are suffixes of the expected ones
//!
//! Every failure is reported as a single `LibraryValidatorError`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ErrorKind, LibraryValidatorError, Result};
use crate::extractor::ExtractedFields;
use crate::identity::check_identity;
use crate::layout::{LibraryIdentity, LibraryLocation};
use crate::libxml2::LibXml2Wrapper;
use crate::schema::DescriptorSchema;

const DESCRIPTOR_EXTENSION: &str = ".xml";

/// Caller policy applied on top of the fixed pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// When set, the declared `library-type` must equal this value
    pub expected_library_type: Option<String>,
}

/// What a successful validation found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedLibrary {
    pub identity: LibraryIdentity,
    pub unpacked_directory: PathBuf,
    pub descriptor: PathBuf,
    pub icon: PathBuf,
    pub fields: ExtractedFields,
}

/// Validates library versions against one compiled schema
#[derive(Clone)]
pub struct LibraryValidator {
    schema: DescriptorSchema,
    options: ValidateOptions,
}

impl LibraryValidator {
    /// Compile the schema at `xsd_path`
    pub fn new(xsd_path: &Path) -> Result<Self> {
        Ok(Self::with_schema(DescriptorSchema::load(xsd_path)?))
    }

    pub fn with_schema(schema: DescriptorSchema) -> Self {
        Self {
            schema,
            options: ValidateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema(&self) -> &DescriptorSchema {
        &self.schema
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// Run the full pipeline for one library version
    pub fn validate(&self, location: &LibraryLocation) -> Result<ValidatedLibrary> {
        let (unpacked_directory, descriptor) = locate_descriptor(location)?;
        self.validate_descriptor(location, unpacked_directory, descriptor)
    }

    /// Gates 3 to 5 for a descriptor that has already been located
    fn validate_descriptor(
        &self,
        location: &LibraryLocation,
        unpacked_directory: PathBuf,
        descriptor: PathBuf,
    ) -> Result<ValidatedLibrary> {
        self.schema.validate(&descriptor)?;

        let document = LibXml2Wrapper::new().parse_document(&descriptor)?;
        let fields = ExtractedFields::from_document(&document)?;
        drop(document);

        let icon = resolve_icon(&unpacked_directory, &fields.icon_relative_path);
        if fields.icon_relative_path.is_empty() || !icon.exists() {
            let msg = format!(
                "Icon file not found with local path : {}",
                fields.icon_relative_path
            );
            debug!("{}", msg);
            return Err(LibraryValidatorError::new(ErrorKind::IconNotFound, msg));
        }

        check_identity(&descriptor, &location.identity)?;

        if let Some(expected_type) = &self.options.expected_library_type
            && fields.library_type != *expected_type
        {
            let msg = format!(
                "Incorrect Library type in xml: expected '{}', found '{}'",
                expected_type, fields.library_type
            );
            debug!("{}", msg);
            return Err(LibraryValidatorError::new(
                ErrorKind::LibraryTypeMismatch,
                msg,
            ));
        }

        info!(
            "Library {} {} is valid ({})",
            location.name(),
            location.version(),
            descriptor.display()
        );

        Ok(ValidatedLibrary {
            identity: location.identity.clone(),
            unpacked_directory,
            descriptor,
            icon,
            fields,
        })
    }
}

/// `declared` appended below `unpacked_directory`
///
/// Root and drive prefixes are dropped, so an absolute declared path still points inside
/// the unpacked directory.
pub fn resolve_icon(unpacked_directory: &Path, declared: &str) -> PathBuf {
    let mut icon = unpacked_directory.to_path_buf();
    for component in Path::new(declared).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            other => icon.push(other.as_os_str()),
        }
    }
    icon
}

/// Resolve the unpacked directory of `location` and the descriptor inside it
///
/// Returns `(unpacked_directory, descriptor)`.
pub fn locate_descriptor(location: &LibraryLocation) -> Result<(PathBuf, PathBuf)> {
    let unpacked_directory = location.unpacked_directory()?;
    if !unpacked_directory.is_dir() {
        let msg = "Unzipped Folder does not exist / is not a directory";
        debug!("{}: {}", msg, unpacked_directory.display());
        return Err(LibraryValidatorError::new(
            ErrorKind::NotFound,
            format!("{}: {}", msg, unpacked_directory.display()),
        ));
    }

    let descriptor = find_descriptor(&unpacked_directory)?;
    Ok((unpacked_directory, descriptor))
}

/// The single `.xml` entry directly inside `directory`
///
/// Fails when there are none or more than one, reporting the count.
pub fn find_descriptor(directory: &Path) -> Result<PathBuf> {
    let mut descriptors = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(DESCRIPTOR_EXTENSION))
        {
            descriptors.push(entry.path());
        }
    }

    if descriptors.len() != 1 {
        let msg = format!(
            "There are {} xml files in the folder, one and only one is allowed",
            descriptors.len()
        );
        debug!("{}", msg);
        return Err(LibraryValidatorError::new(ErrorKind::DescriptorCount, msg));
    }

    Ok(descriptors.remove(0))
}

/// Validate the library `name`/`version` under `base_directory` against the XSD at `xsd_path`
///
/// The version directory is created if missing; nothing else is written.
pub fn validate_library(
    xsd_path: &Path,
    base_directory: &Path,
    library_name: &str,
    version: &str,
) -> Result<ValidatedLibrary> {
    validate_library_with_options(
        xsd_path,
        &LibraryLocation::new(base_directory, library_name, version),
        ValidateOptions::default(),
    )
}

/// [`validate_library`] with caller policy; the schema is only compiled once a descriptor is found
pub fn validate_library_with_options(
    xsd_path: &Path,
    location: &LibraryLocation,
    options: ValidateOptions,
) -> Result<ValidatedLibrary> {
    let (unpacked_directory, descriptor) = locate_descriptor(location)?;
    LibraryValidator::new(xsd_path)?
        .with_options(options)
        .validate_descriptor(location, unpacked_directory, descriptor)
}
