//! Descriptor schema validation
//!
//! The schema is an external artifact; this module only answers "does the document conform".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{LibXml2Error, SchemaError};
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};

/// Location of the descriptor schema shipped with this crate, relative to the crate root
pub const XSD_PATH: &str = "schemas/mapelement-hierarchy.xsd";

/// [`XSD_PATH`] resolved against the crate root rather than the working directory
pub fn default_schema_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(XSD_PATH)
}

/// A compiled descriptor schema
///
/// Compiling is comparatively expensive and serialized process-wide, so a schema is compiled
/// once and shared. Cloning is cheap and clones may be used from any thread.
#[derive(Clone)]
pub struct DescriptorSchema {
    path: PathBuf,
    schema: XmlSchemaPtr,
    wrapper: Arc<LibXml2Wrapper>,
}

impl DescriptorSchema {
    /// Compile the XSD at `xsd_path`
    pub fn load(xsd_path: &Path) -> Result<Self, SchemaError> {
        let wrapper = Arc::new(LibXml2Wrapper::new());
        let schema = wrapper.parse_schema_from_file(xsd_path).map_err(|e| {
            debug!("Error in validateXML {}", e);
            SchemaError::Load(e)
        })?;

        Ok(Self {
            path: xsd_path.to_path_buf(),
            schema,
            wrapper,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `xml_path`, reporting the first diagnostic and the total count on failure
    pub fn validate(&self, xml_path: &Path) -> Result<(), SchemaError> {
        let result = self
            .wrapper
            .validate_file(&self.schema, xml_path)
            .map_err(SchemaError::Unreadable)?;

        match result {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid {
                error_count,
                errors,
            } => {
                let first_error = errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "document does not conform to the schema".to_string());
                debug!(
                    "Error in validateXML {}: {} error(s), first: {}",
                    xml_path.display(),
                    error_count,
                    first_error
                );
                Err(SchemaError::Invalid {
                    file: xml_path.to_path_buf(),
                    error_count,
                    first_error,
                    errors,
                })
            }
            // validate_file reports internal errors as Err
            ValidationResult::InternalError { code } => Err(SchemaError::Unreadable(
                LibXml2Error::ValidationFailed {
                    code,
                    file: xml_path.to_path_buf(),
                    details: "internal libxml2 error".to_string(),
                },
            )),
        }
    }
}

/// Compile `xsd_path` and validate `xml_path` against it
pub fn validate_against_schema(xml_path: &Path, xsd_path: &Path) -> Result<(), SchemaError> {
    DescriptorSchema::load(xsd_path)?.validate(xml_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const NOTE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="note">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="to" type="xs:string"/>
        <xs:element name="priority">
          <xs:simpleType>
            <xs:restriction base="xs:string">
              <xs:enumeration value="low"/>
              <xs:enumeration value="high"/>
            </xs:restriction>
          </xs:simpleType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    #[test]
    fn test_default_schema_path_is_absolute_and_shipped() {
        let path = default_schema_path();
        assert!(path.is_absolute());
        assert!(path.ends_with(XSD_PATH));
        assert!(path.is_file());
    }

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let xsd = temp_dir.path().join("note.xsd");
        fs::write(&xsd, NOTE_XSD).unwrap();
        (temp_dir, xsd)
    }

    #[test]
    fn test_conforming_document_passes() {
        let (temp_dir, xsd) = setup();
        let xml = temp_dir.path().join("note.xml");
        fs::write(&xml, "<note><to>Tove</to><priority>low</priority></note>").unwrap();

        validate_against_schema(&xml, &xsd).unwrap();
    }

    #[test]
    fn test_enumeration_violation_fails() {
        let (temp_dir, xsd) = setup();
        let xml = temp_dir.path().join("note.xml");
        fs::write(&xml, "<note><to>Tove</to><priority>urgent</priority></note>").unwrap();

        match validate_against_schema(&xml, &xsd) {
            Err(SchemaError::Invalid {
                error_count,
                first_error,
                ..
            }) => {
                assert!(error_count >= 1);
                assert!(first_error.contains("priority"));
            }
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_schema_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let xml = temp_dir.path().join("note.xml");
        fs::write(&xml, "<note/>").unwrap();

        let result = validate_against_schema(&xml, &temp_dir.path().join("missing.xsd"));
        assert!(matches!(result, Err(SchemaError::Load(_))));
    }

    #[test]
    fn test_missing_document_fails() {
        let (temp_dir, xsd) = setup();
        let result = validate_against_schema(&temp_dir.path().join("missing.xml"), &xsd);
        assert!(result.is_err());
    }

    #[test]
    fn test_compiled_schema_is_reusable() {
        let (temp_dir, xsd) = setup();
        let schema = DescriptorSchema::load(&xsd).unwrap();

        for priority in ["low", "high"] {
            let xml = temp_dir.path().join(format!("{}.xml", priority));
            fs::write(
                &xml,
                format!("<note><to>Tove</to><priority>{}</priority></note>", priority),
            )
            .unwrap();
            schema.validate(&xml).unwrap();
        }
        assert_eq!(schema.path(), xsd.as_path());
    }
}
