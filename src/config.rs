use crate::catalog::ScanConfig;
use crate::cli::{Cli, Command, OutputFormat, VerbosityLevel};
use crate::schema::default_schema_path;
use crate::validator::ValidateOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "validate-melm.toml",
    "validate-melm.json",
    ".validate-melm.toml",
    ".validate-melm.json",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationSettings,
    pub output: OutputConfig,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    /// XSD every descriptor must conform to
    pub schema: PathBuf,
    /// Number of libraries validated at once during a scan
    pub max_concurrent_validations: Option<usize>,
    /// Library type every descriptor must declare
    pub expected_library_type: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    /// Failures only
    pub quiet: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema: default_schema_path(),
            max_concurrent_validations: None,
            expected_library_type: None,
        }
    }
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in the current directory, then the user config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        if let Some(found) = Self::find_config_in(Path::new(".")).await? {
            return Ok(Some(found));
        }

        if let Some(config_dir) = dirs::config_dir() {
            return Self::find_config_in(&config_dir.join("validate-melm")).await;
        }

        Ok(None)
    }

    async fn find_config_in(directory: &Path) -> Result<Option<Config>> {
        for name in &CONFIG_NAMES {
            let path = directory.join(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }
        Ok(None)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    ///
    /// Only flags actually given on the command line override the configuration.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(schema) = &cli.schema {
            config.validation.schema = schema.clone();
        }

        match &cli.command {
            Command::Check {
                expect_type: Some(expect_type),
                ..
            } => config.validation.expected_library_type = Some(expect_type.clone()),
            Command::Scan {
                threads: Some(threads),
                ..
            } => config.validation.max_concurrent_validations = Some(*threads),
            _ => {}
        }

        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.validation.schema = override_config.validation.schema;
        if override_config.validation.max_concurrent_validations.is_some() {
            base.validation.max_concurrent_validations =
                override_config.validation.max_concurrent_validations;
        }
        if override_config.validation.expected_library_type.is_some() {
            base.validation.expected_library_type =
                override_config.validation.expected_library_type;
        }

        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.validation.max_concurrent_validations {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of concurrent validations must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of concurrent validations cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.validation.schema.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Schema path must not be empty".to_string(),
            ));
        }

        if config
            .validation
            .expected_library_type
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(ConfigError::Validation(
                "Expected library type must not be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the effective number of concurrent validations
    pub fn get_thread_count(config: &Config) -> usize {
        config
            .validation
            .max_concurrent_validations
            .unwrap_or_else(num_cpus::get)
    }

    pub fn scan_config(config: &Config) -> ScanConfig {
        ScanConfig {
            max_concurrent_validations: Self::get_thread_count(config),
        }
    }

    pub fn validate_options(config: &Config) -> ValidateOptions {
        ValidateOptions {
            expected_library_type: config.validation.expected_library_type.clone(),
        }
    }
}
