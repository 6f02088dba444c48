//! Batch validation of every library version under a base directory
//!
//! Discovery is async (`tokio::fs`); each validation is synchronous libxml2 work and runs on
//! the blocking pool, with a semaphore bounding how many run at once. All tasks share one
//! compiled schema.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ErrorKind, LibraryValidatorError, Result};
use crate::layout::LibraryLocation;
use crate::validator::LibraryValidator;

/// Scan settings
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Number of libraries validated at the same time
    pub max_concurrent_validations: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: num_cpus::get(),
        }
    }
}

/// Status of a single library validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LibraryStatus {
    Valid,
    Invalid { kind: ErrorKind, message: String },
}

impl LibraryStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, LibraryStatus::Valid)
    }
}

impl From<&LibraryValidatorError> for LibraryStatus {
    fn from(error: &LibraryValidatorError) -> Self {
        LibraryStatus::Invalid {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result of validating one discovered library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryOutcome {
    pub location: LibraryLocation,
    pub status: LibraryStatus,
    pub duration: Duration,
}

/// Aggregated results of a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<LibraryOutcome>,
}

impl ScanReport {
    pub fn aggregate(outcomes: Vec<LibraryOutcome>, duration: Duration) -> Self {
        let valid = outcomes.iter().filter(|o| o.status.is_valid()).count();
        Self {
            total: outcomes.len(),
            valid,
            invalid: outcomes.len() - valid,
            duration,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    /// True when at least one library was found and all of them are valid
    pub fn all_valid(&self) -> bool {
        self.total > 0 && self.valid == self.total
    }
}

/// Every `{name}/{version}` under `base_directory` whose `{name}-{version}` directory exists
///
/// Sorted by name, then version. Entries that are not directories are skipped, and so are library
/// or version entries that cannot be read; only an unreadable base directory is an error.
pub async fn discover_libraries(base_directory: &Path) -> Result<Vec<LibraryLocation>> {
    let mut locations = Vec::new();

    let mut libraries = fs::read_dir(base_directory).await?;
    while let Some(library) = libraries.next_entry().await? {
        if !is_directory(&library.path()).await {
            continue;
        }
        let Some(name) = library.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 library directory {}", library.path().display());
            continue;
        };

        let mut versions = match fs::read_dir(library.path()).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Skipping unreadable library directory {}: {}", library.path().display(), e);
                continue;
            }
        };
        loop {
            let version = match versions.next_entry().await {
                Ok(Some(version)) => version,
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped listing {}: {}", library.path().display(), e);
                    break;
                }
            };
            if !is_directory(&version.path()).await {
                continue;
            }
            let Some(version_name) = version.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 version directory {}", version.path().display());
                continue;
            };

            let location = LibraryLocation::new(base_directory, name.clone(), version_name);
            if version
                .path()
                .join(location.identity.unpacked_dir_name())
                .is_dir()
            {
                locations.push(location);
            } else {
                debug!(
                    "No unpacked directory for {} {}, skipping",
                    location.name(),
                    location.version()
                );
            }
        }
    }

    locations.sort_by(|a, b| (a.name(), a.version()).cmp(&(b.name(), b.version())));
    Ok(locations)
}

/// Follows symlinks; entries whose metadata cannot be read are logged and treated as absent
async fn is_directory(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_dir(),
        Err(e) => {
            warn!("Skipping unreadable entry {}: {}", path.display(), e);
            false
        }
    }
}

/// Validates every library version found under a base directory
pub struct CatalogScanner {
    validator: Arc<LibraryValidator>,
    config: ScanConfig,
}

impl CatalogScanner {
    pub fn new(validator: LibraryValidator, config: ScanConfig) -> Self {
        Self {
            validator: Arc::new(validator),
            config,
        }
    }

    /// Discover and validate; a failing library is recorded, never fatal to the scan
    pub async fn scan(&self, base_directory: &Path) -> Result<ScanReport> {
        let start = Instant::now();
        let locations = discover_libraries(base_directory).await?;
        debug!(
            "Discovered {} libraries under {}",
            locations.len(),
            base_directory.display()
        );

        let outcomes = self.validate_all(locations).await?;
        Ok(ScanReport::aggregate(outcomes, start.elapsed()))
    }

    /// Validate the given locations with bounded concurrency, preserving their order
    pub async fn validate_all(
        &self,
        locations: Vec<LibraryLocation>,
    ) -> Result<Vec<LibraryOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_validations.max(1)));

        let tasks: Vec<_> = locations
            .into_iter()
            .map(|location| {
                let validator = Arc::clone(&self.validator);
                let semaphore = Arc::clone(&semaphore);

                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        LibraryValidatorError::new(
                            ErrorKind::Io,
                            "Failed to acquire validation semaphore",
                        )
                    })?;

                    let start = Instant::now();
                    let task_location = location.clone();
                    let result =
                        tokio::task::spawn_blocking(move || validator.validate(&task_location))
                            .await
                            .map_err(|e| {
                                LibraryValidatorError::new(
                                    ErrorKind::Io,
                                    format!("Validation task failed: {}", e),
                                )
                            })?;

                    let status = match &result {
                        Ok(_) => LibraryStatus::Valid,
                        Err(e) => LibraryStatus::from(e),
                    };

                    Ok::<LibraryOutcome, LibraryValidatorError>(LibraryOutcome {
                        location,
                        status,
                        duration: start.elapsed(),
                    })
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for joined in join_all(tasks).await {
            let outcome = joined.map_err(|e| {
                LibraryValidatorError::new(ErrorKind::Io, format!("Task join error: {}", e))
            })??;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
