//! LibXML2 FFI Wrapper Module
//!
//! This module provides safe wrappers around the three libxml2 facilities the descriptor
//! pipeline relies on:
//!
//! - **XML Schema**: compiling an XSD (from a file or a memory buffer) and validating a
//!   document file against it
//! - **DOM + XPath**: parsing a document into a tree and evaluating XPath expressions with
//!   `string()` semantics
//! - **Text reader**: a forward-only pull parser used to stream element/text events
//!
//! ## Why libxml2
//!
//! No mature pure Rust crate performs XSD validation (roxmltree and quick-xml parse, but do
//! not validate), so schema validation goes through libxml2 directly. Once libxml2 is linked,
//! its XPath engine and text reader come for free, which keeps the whole pipeline on one
//! parser with one set of well-formedness rules.
//!
//! ## Thread Safety Strategy
//!
//! - **Initialization**: guarded by `std::sync::Once`
//! - **Schema parsing**: serialized behind a process-wide mutex (libxml2's schema parser is
//!   not thread-safe)
//! - **Validation, document parsing, reading**: thread-safe for distinct documents; each call
//!   creates and frees its own context
//! - **Schema sharing**: `XmlSchemaPtr` is Arc-wrapped and may be used from many threads

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int, c_uint, c_void};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
static LIBXML2_INIT: Once = Once::new();

/// Serializes schema compilation, which libxml2 does not support concurrently
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

/// `XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET`
const PARSE_OPTIONS: c_int = (1 << 5) | (1 << 6) | (1 << 11);

// Reader node types (xmlReaderTypes)
const READER_TYPE_ELEMENT: c_int = 1;
const READER_TYPE_TEXT: c_int = 3;
const READER_TYPE_CDATA: c_int = 4;
const READER_TYPE_WHITESPACE: c_int = 13;
const READER_TYPE_SIGNIFICANT_WHITESPACE: c_int = 14;
const READER_TYPE_END_ELEMENT: c_int = 15;

/// ## Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathContext {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlTextReader {
    _private: [u8; 0],
}

/// Public layout of `xmlXPathObject`
#[repr(C)]
pub struct XmlXPathObject {
    pub object_type: c_int,
    pub nodesetval: *mut c_void,
    pub boolval: c_int,
    pub floatval: f64,
    pub stringval: *mut u8,
    pub user: *mut c_void,
    pub index: c_int,
    pub user2: *mut c_void,
    pub index2: c_int,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Schema parsing functions
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        sherr: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );

    // Tree and error functions
    pub fn xmlReadFile(
        file_name: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlGetLastError() -> *const xmlError;
    pub fn xmlResetLastError();

    // XPath functions
    pub fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    pub fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    pub fn xmlXPathEvalExpression(
        expr: *const u8,
        ctxt: *mut XmlXPathContext,
    ) -> *mut XmlXPathObject;
    pub fn xmlXPathConvertString(obj: *mut XmlXPathObject) -> *mut XmlXPathObject;
    pub fn xmlXPathFreeObject(obj: *mut XmlXPathObject);

    // Text reader functions
    pub fn xmlReaderForFile(
        file_name: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlTextReader;
    pub fn xmlTextReaderSetStructuredErrorHandler(
        reader: *mut XmlTextReader,
        f: XmlStructuredErrorFunc,
        arg: *mut c_void,
    );
    pub fn xmlTextReaderRead(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderNodeType(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderIsEmptyElement(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderConstName(reader: *mut XmlTextReader) -> *const u8;
    pub fn xmlTextReaderConstValue(reader: *mut XmlTextReader) -> *const u8;
    pub fn xmlFreeTextReader(reader: *mut XmlTextReader);
}

/// Callback for libxml2 to report errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };

    if !error.is_null() {
        let msg_ptr = unsafe { (*error).message };
        if !msg_ptr.is_null() {
            let c_str = unsafe { CStr::from_ptr(msg_ptr) };
            errors.push(c_str.to_string_lossy().trim().to_string());
        }
    }
}

/// Message of the thread's last libxml2 error, if any
fn last_error_message() -> Option<String> {
    unsafe {
        let error = xmlGetLastError();
        if error.is_null() || (*error).message.is_null() {
            return None;
        }
        Some(
            CStr::from_ptr((*error).message)
                .to_string_lossy()
                .trim()
                .to_string(),
        )
    }
}

fn path_to_cstring(path: &Path) -> LibXml2Result<CString> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| LibXml2Error::InvalidPath {
            path: path.to_path_buf(),
        })
}

fn join_errors(errors: &[String], fallback: &str) -> String {
    if errors.is_empty() {
        fallback.to_string()
    } else {
        errors.join("; ")
    }
}

/// Thread-safe wrapper for libxml2 schema pointer with proper resource management
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 xmlSchema structures are thread-safe for reading once parsed
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// Create a new XmlSchemaPtr from a raw pointer
    ///
    /// # Safety
    ///
    /// The pointer must come from `xmlSchemaParse` and must not be freed elsewhere.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema, source: &Path) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed {
                path: source.to_path_buf(),
                details: "null schema returned".to_string(),
            });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// Check if the schema pointer is valid (non-null)
    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<String>,
    },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    /// Create ValidationResult from libxml2 return code and captured errors
    pub fn from_code(code: c_int, errors: Vec<String>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }
}

/// A parsed document tree, freed on drop
///
/// Not `Send`: a document stays on the thread that parsed it.
pub struct XmlDocument {
    ptr: *mut XmlDoc,
    path: PathBuf,
}

impl XmlDocument {
    /// Path the document was parsed from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Evaluate an XPath expression and convert the result with XPath `string()` semantics
    ///
    /// A node-set result yields the string value of its first node in document order, and an
    /// empty node-set yields the empty string.
    pub fn evaluate_string(&self, expression: &str) -> LibXml2Result<String> {
        let c_expr = CString::new(expression).map_err(|_| LibXml2Error::XPathEvaluation {
            expression: expression.to_string(),
        })?;

        unsafe {
            let ctxt = xmlXPathNewContext(self.ptr);
            if ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let obj = xmlXPathEvalExpression(c_expr.as_ptr() as *const u8, ctxt);
            xmlXPathFreeContext(ctxt);
            if obj.is_null() {
                return Err(LibXml2Error::XPathEvaluation {
                    expression: expression.to_string(),
                });
            }

            // Consumes `obj`
            let converted = xmlXPathConvertString(obj);
            if converted.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let value = if (*converted).stringval.is_null() {
                String::new()
            } else {
                CStr::from_ptr((*converted).stringval as *const c_char)
                    .to_string_lossy()
                    .into_owned()
            };
            xmlXPathFreeObject(converted);

            Ok(value)
        }
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Event produced while streaming a document with the text reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent<'a> {
    /// Opening tag; `empty` is set for self-closing elements, which produce no `End`
    Start { name: Cow<'a, str>, empty: bool },
    /// Closing tag
    End { name: Cow<'a, str> },
    /// Character data (text, CDATA or whitespace)
    Text(Cow<'a, str>),
}

/// LibXML2 wrapper providing safe access to libxml2 functionality
///
/// Creating a wrapper initializes libxml2 once per process. All methods take `&self` and
/// allocate their own contexts, so one wrapper may be shared across threads.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new LibXML2 wrapper instance
    ///
    /// It's safe to call this multiple times - initialization happens exactly once.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse an XML schema from a file
    ///
    /// Relative `xs:include` and `xs:import` locations resolve against the schema's own path.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` with libxml2's diagnostics if the file cannot
    /// be read or is not a valid schema.
    pub fn parse_schema_from_file(&self, schema_path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        let c_path = path_to_cstring(schema_path)?;
        let _guard = SCHEMA_PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        unsafe {
            let parser_ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }
            Self::finish_schema_parse(parser_ctxt, schema_path)
        }
    }

    /// Parse an XML schema from memory buffer
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` if the schema cannot be parsed.
    /// Returns `LibXml2Error::MemoryAllocation` if memory allocation fails.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        let _guard = SCHEMA_PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }
            Self::finish_schema_parse(parser_ctxt, Path::new("<memory>"))
        }
    }

    /// # Safety
    ///
    /// `parser_ctxt` must be a live parser context; it is freed here.
    unsafe fn finish_schema_parse(
        parser_ctxt: *mut XmlSchemaParserCtxt,
        source: &Path,
    ) -> LibXml2Result<XmlSchemaPtr> {
        let mut errors: Vec<String> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<String> as *mut c_void;

        let schema_ptr = unsafe {
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };

        if schema_ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed {
                path: source.to_path_buf(),
                details: join_errors(&errors, "schema could not be compiled"),
            });
        }

        unsafe { XmlSchemaPtr::from_raw(schema_ptr, source) }
    }

    /// Validate an XML file against a schema
    ///
    /// Each call creates its own validation context, so concurrent calls against the same
    /// schema are safe.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::ValidationContextCreationFailed` if validation context creation fails.
    /// Returns `LibXml2Error::ValidationFailed` when libxml2 reports an internal error (for
    /// instance an unreadable file).
    pub fn validate_file(
        &self,
        schema: &XmlSchemaPtr,
        file_path: &Path,
    ) -> LibXml2Result<ValidationResult> {
        let c_path = path_to_cstring(file_path)?;

        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut errors: Vec<String> = Vec::new();
            let errors_ptr = &mut errors as *mut Vec<String> as *mut c_void;
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );

            let result_code = xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0);
            xmlSchemaFreeValidCtxt(valid_ctxt);

            if result_code < 0 {
                return Err(LibXml2Error::ValidationFailed {
                    code: result_code,
                    file: file_path.to_path_buf(),
                    details: join_errors(&errors, "document could not be read"),
                });
            }

            Ok(ValidationResult::from_code(result_code, errors))
        }
    }

    /// Parse a document into a tree for XPath queries
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::InvalidXml` if the file is missing or not well-formed.
    pub fn parse_document(&self, file_path: &Path) -> LibXml2Result<XmlDocument> {
        let c_path = path_to_cstring(file_path)?;

        let doc = unsafe {
            xmlResetLastError();
            xmlReadFile(c_path.as_ptr(), std::ptr::null(), PARSE_OPTIONS)
        };
        if doc.is_null() {
            return Err(LibXml2Error::InvalidXml {
                file: file_path.to_path_buf(),
                details: last_error_message()
                    .unwrap_or_else(|| "document could not be parsed".to_string()),
            });
        }

        Ok(XmlDocument {
            ptr: doc,
            path: file_path.to_path_buf(),
        })
    }

    /// Stream a document through the text reader, handing each event to `visitor`
    ///
    /// Streaming stops at the first error returned by `visitor`, which is passed through
    /// unchanged. Reader failures (missing file, malformed markup) are converted into `E`
    /// from `LibXml2Error::InvalidXml`.
    pub fn stream_document<E, F>(&self, file_path: &Path, mut visitor: F) -> Result<(), E>
    where
        E: From<LibXml2Error>,
        F: FnMut(ReaderEvent<'_>) -> Result<(), E>,
    {
        let c_path = path_to_cstring(file_path)?;
        let mut errors: Vec<String> = Vec::new();

        let reader =
            unsafe { xmlReaderForFile(c_path.as_ptr(), std::ptr::null(), PARSE_OPTIONS) };
        if reader.is_null() {
            return Err(LibXml2Error::InvalidXml {
                file: file_path.to_path_buf(),
                details: "document could not be opened".to_string(),
            }
            .into());
        }
        let reader = TextReaderGuard(reader);

        unsafe {
            xmlTextReaderSetStructuredErrorHandler(
                reader.0,
                Some(structured_error_callback),
                &mut errors as *mut Vec<String> as *mut c_void,
            );
        }

        loop {
            let status = unsafe { xmlTextReaderRead(reader.0) };
            if status == 0 {
                return Ok(());
            }
            if status < 0 {
                return Err(LibXml2Error::InvalidXml {
                    file: file_path.to_path_buf(),
                    details: join_errors(&errors, "document could not be read"),
                }
                .into());
            }

            let event = unsafe {
                match xmlTextReaderNodeType(reader.0) {
                    READER_TYPE_ELEMENT => Some(ReaderEvent::Start {
                        name: xml_str(xmlTextReaderConstName(reader.0)),
                        empty: xmlTextReaderIsEmptyElement(reader.0) == 1,
                    }),
                    READER_TYPE_END_ELEMENT => Some(ReaderEvent::End {
                        name: xml_str(xmlTextReaderConstName(reader.0)),
                    }),
                    READER_TYPE_TEXT
                    | READER_TYPE_CDATA
                    | READER_TYPE_WHITESPACE
                    | READER_TYPE_SIGNIFICANT_WHITESPACE => {
                        Some(ReaderEvent::Text(xml_str(xmlTextReaderConstValue(reader.0))))
                    }
                    _ => None,
                }
            };

            if let Some(event) = event {
                visitor(event)?;
            }
        }
    }
}

struct TextReaderGuard(*mut XmlTextReader);

impl Drop for TextReaderGuard {
    fn drop(&mut self) {
        unsafe {
            xmlFreeTextReader(self.0);
        }
    }
}

/// Borrow an `xmlChar*` owned by the reader as UTF-8
///
/// # Safety
///
/// `ptr` must be null or a NUL-terminated string that outlives the returned value.
unsafe fn xml_str<'a>(ptr: *const u8) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        unsafe { CStr::from_ptr(ptr as *const c_char) }.to_string_lossy()
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
