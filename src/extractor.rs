//! Read-only queries over a parsed descriptor
//!
//! A missing node yields an empty string, so callers must treat `""` as "field absent".
//! A document that cannot be parsed is an error.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LibXml2Result;
use crate::libxml2::{LibXml2Wrapper, XmlDocument};

pub const ICON_FILE_XPATH: &str = "/elements/description/library-icon/@file";
pub const LIBRARY_TYPE_XPATH: &str = "/elements/description/library-type";

/// Fields read from fixed locations in the descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Icon path relative to the unpacked directory
    pub icon_relative_path: String,
    pub library_type: String,
}

impl ExtractedFields {
    pub fn from_document(document: &XmlDocument) -> LibXml2Result<Self> {
        Ok(Self {
            icon_relative_path: document.evaluate_string(ICON_FILE_XPATH)?,
            library_type: document.evaluate_string(LIBRARY_TYPE_XPATH)?,
        })
    }
}

/// Value of `library-icon/@file`
pub fn extract_icon_path(xml_path: &Path) -> LibXml2Result<String> {
    LibXml2Wrapper::new()
        .parse_document(xml_path)?
        .evaluate_string(ICON_FILE_XPATH)
}

/// Text of `description/library-type`
pub fn extract_library_type(xml_path: &Path) -> LibXml2Result<String> {
    LibXml2Wrapper::new()
        .parse_document(xml_path)?
        .evaluate_string(LIBRARY_TYPE_XPATH)
}

/// Both fields from a single parse
pub fn extract_fields(xml_path: &Path) -> LibXml2Result<ExtractedFields> {
    let document = LibXml2Wrapper::new().parse_document(xml_path)?;
    ExtractedFields::from_document(&document)
}
