//! On-disk layout of unpacked libraries
//!
//! ```text
//! {base}/{name}/{version}/{name}-{version}/descriptor.xml
//! ```
//!
//! The library and version directories are created on demand. The unpacked directory is
//! produced by whoever extracts the archive and is never created here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LayoutError;

/// The identity a caller expects a library to declare
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryIdentity {
    pub name: String,
    pub version: String,
}

impl LibraryIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Name of the unpacked directory, `{name}-{version}`
    pub fn unpacked_dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Where a library version lives under a base directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryLocation {
    pub base_directory: PathBuf,
    pub identity: LibraryIdentity,
}

impl LibraryLocation {
    pub fn new(
        base_directory: impl Into<PathBuf>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            base_directory: base_directory.into(),
            identity: LibraryIdentity::new(name, version),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    pub fn library_directory(&self) -> PathBuf {
        library_directory(&self.base_directory, self.name())
    }

    pub fn version_directory(&self) -> Result<PathBuf, LayoutError> {
        build_directory_for_library_version(&self.base_directory, self.name(), self.version())
    }

    pub fn unpacked_directory(&self) -> Result<PathBuf, LayoutError> {
        unpacked_directory_for_library_version(&self.base_directory, self.name(), self.version())
    }
}

/// `{base}/{name}`, without touching the filesystem
pub fn library_directory(base_directory: &Path, library_name: &str) -> PathBuf {
    base_directory.join(library_name)
}

/// Ensure `{base}/{name}/{version}` exists and return it
///
/// Creates each missing level with a single `mkdir`, so the base directory itself must
/// already exist. Calling this repeatedly is harmless; a directory created concurrently by
/// another caller counts as success.
pub fn build_directory_for_library_version(
    base_directory: &Path,
    library_name: &str,
    version: &str,
) -> Result<PathBuf, LayoutError> {
    let result = ensure_directory(&library_directory(base_directory, library_name))
        .and_then(|library_dir| ensure_directory(&library_dir.join(version)));

    match &result {
        Ok(version_dir) => debug!(
            "Directory for libraryName : {}, version : {} is : {}",
            library_name,
            version,
            version_dir.display()
        ),
        Err(e) => debug!(
            "Failed to get or build the Directory for libraryName : {}, version : {}: {}",
            library_name, version, e
        ),
    }

    result
}

/// `{version directory}/{name}-{version}`
///
/// The version directory is created if needed; the returned directory may not exist.
pub fn unpacked_directory_for_library_version(
    base_directory: &Path,
    library_name: &str,
    version: &str,
) -> Result<PathBuf, LayoutError> {
    let version_dir = build_directory_for_library_version(base_directory, library_name, version)?;
    Ok(version_dir.join(format!("{}-{}", library_name, version)))
}

fn ensure_directory(path: &Path) -> Result<PathBuf, LayoutError> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }

    match fs::create_dir(path) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if path.is_dir() {
                Ok(path.to_path_buf())
            } else {
                Err(LayoutError::NotADirectory {
                    path: path.to_path_buf(),
                })
            }
        }
        Err(source) => Err(LayoutError::CreateFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
