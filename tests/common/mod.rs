#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn xml(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join("xml").join(name)
    }

    pub fn schema(&self) -> PathBuf {
        validate_melm::default_schema_path()
    }
}

/// A base directory holding unpacked libraries, removed on drop
pub struct LibraryTree {
    pub temp_dir: TempDir,
}

impl LibraryTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn base(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn unpacked_dir(&self, name: &str, version: &str) -> PathBuf {
        self.base()
            .join(name)
            .join(version)
            .join(format!("{}-{}", name, version))
    }

    /// Create the unpacked directory, empty
    pub fn empty_library(&self, name: &str, version: &str) -> PathBuf {
        let dir = self.unpacked_dir(name, version);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Unpacked library holding a copy of `fixture` and the icon it declares
    pub fn library_from_fixture(&self, name: &str, version: &str, fixture: &str) -> PathBuf {
        let dir = self.library_without_icon(name, version, fixture);
        fs::write(dir.join("icon.png"), b"\x89PNG\r\n\x1a\n").unwrap();
        dir
    }

    pub fn library_without_icon(&self, name: &str, version: &str, fixture: &str) -> PathBuf {
        let dir = self.empty_library(name, version);
        fs::copy(TestFixtures::new().xml(fixture), dir.join("library.xml")).unwrap();
        dir
    }

    /// Unpacked library whose descriptor declares `declared_name`/`declared_version`
    pub fn library_declaring(
        &self,
        name: &str,
        version: &str,
        declared_name: &str,
        declared_version: &str,
    ) -> PathBuf {
        let dir = self.empty_library(name, version);
        let template = fs::read_to_string(TestFixtures::new().xml("emergency_lu-1.1.xml")).unwrap();
        let content = template
            .replace(
                "<library-name>emergency.lu</library-name>",
                &format!("<library-name>{}</library-name>", declared_name),
            )
            .replace(
                "<library-version>1.1</library-version>",
                &format!("<library-version>{}</library-version>", declared_version),
            );
        fs::write(dir.join("library.xml"), content).unwrap();
        fs::write(dir.join("icon.png"), b"\x89PNG\r\n\x1a\n").unwrap();
        dir
    }
}
