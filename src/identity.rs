//! Declared name/version consistency check
//!
//! The descriptor is streamed and every text segment found directly inside a
//! `library-name` or `library-version` element is checked against the expected identity.
//! A declared value passes when the expected value *ends with* it, so a declared version
//! `1.1` is accepted for an expected `v1.1`.
//!
//! Only the innermost open element is remembered: an opening tag replaces it and any closing
//! tag clears it. Text that follows a nested element's closing tag is therefore not
//! attributed to the enclosing element.

use std::path::Path;

use tracing::debug;

use crate::error::IdentityError;
use crate::layout::LibraryIdentity;
use crate::libxml2::{LibXml2Wrapper, ReaderEvent};

pub const LIBRARY_NAME_ELEMENT: &str = "library-name";
pub const LIBRARY_VERSION_ELEMENT: &str = "library-version";

/// Streaming state for the identity check
#[derive(Debug, Clone)]
pub struct IdentityTracker<'a> {
    expected: &'a LibraryIdentity,
    current_element: String,
}

impl<'a> IdentityTracker<'a> {
    pub fn new(expected: &'a LibraryIdentity) -> Self {
        Self {
            expected,
            current_element: String::new(),
        }
    }

    pub fn current_element(&self) -> &str {
        &self.current_element
    }

    pub fn start_element(&mut self, name: &str) {
        self.current_element.clear();
        self.current_element.push_str(name);
    }

    pub fn end_element(&mut self) {
        self.current_element.clear();
    }

    pub fn text(&self, segment: &str) -> Result<(), IdentityError> {
        match self.current_element.as_str() {
            LIBRARY_VERSION_ELEMENT if !self.expected.version.ends_with(segment) => {
                Err(IdentityError::WrongVersion {
                    declared: segment.to_string(),
                    expected: self.expected.version.clone(),
                })
            }
            LIBRARY_NAME_ELEMENT if !self.expected.name.ends_with(segment) => {
                Err(IdentityError::WrongName {
                    declared: segment.to_string(),
                    expected: self.expected.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn handle(&mut self, event: ReaderEvent<'_>) -> Result<(), IdentityError> {
        match event {
            ReaderEvent::Start { name, empty } => {
                self.start_element(&name);
                if empty {
                    self.end_element();
                }
                Ok(())
            }
            ReaderEvent::End { .. } => {
                self.end_element();
                Ok(())
            }
            ReaderEvent::Text(segment) => self.text(&segment),
        }
    }
}

/// Stream `xml_path` and check every declared name and version against the expected ones
///
/// Succeeds when neither element appears.
pub fn check_name_and_version(
    xml_path: &Path,
    expected_name: &str,
    expected_version: &str,
) -> Result<(), IdentityError> {
    check_identity(
        xml_path,
        &LibraryIdentity::new(expected_name, expected_version),
    )
}

pub fn check_identity(xml_path: &Path, expected: &LibraryIdentity) -> Result<(), IdentityError> {
    let mut tracker = IdentityTracker::new(expected);
    let result = LibXml2Wrapper::new().stream_document(xml_path, |event| tracker.handle(event));

    if let Err(e) = &result {
        debug!("Identity check failed for {}: {}", xml_path.display(), e);
    }
    result
}
