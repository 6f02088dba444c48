use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Validate unpacked map-element libraries
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-melm")]
#[command(about = "Validate unpacked map-element libraries against the descriptor schema")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// XSD the descriptors must conform to
    ///
    /// Defaults to schemas/mapelement-hierarchy.xsd under the crate root.
    #[arg(short = 's', long = "schema", global = true)]
    pub schema: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", global = true, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate one library version
    Check {
        /// Directory holding the libraries
        base: PathBuf,
        /// Expected library name
        name: String,
        /// Expected library version
        version: String,
        /// Require the descriptor to declare this library type
        #[arg(long = "expect-type")]
        expect_type: Option<String>,
    },
    /// Validate every library version found under a directory
    Scan {
        /// Directory holding the libraries
        base: PathBuf,
        /// Number of concurrent validations
        #[arg(short = 't', long = "threads")]
        threads: Option<usize>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Verbosity from the command-line flags alone
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let base = match &self.command {
            Command::Check { base, .. } | Command::Scan { base, .. } => base,
        };
        if !base.is_dir() {
            return Err(format!("Base directory does not exist: {}", base.display()));
        }
        if let Command::Scan {
            threads: Some(0), ..
        } = self.command
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_parsing() {
        let cli = Cli::try_parse_from([
            "validate-melm",
            "--schema",
            "mapelement-hierarchy.xsd",
            "check",
            "/libraries",
            "emergency.lu",
            "1.1",
            "--expect-type",
            "points",
        ])
        .unwrap();

        assert_eq!(cli.schema, Some(PathBuf::from("mapelement-hierarchy.xsd")));
        assert_eq!(
            cli.command,
            Command::Check {
                base: PathBuf::from("/libraries"),
                name: "emergency.lu".to_string(),
                version: "1.1".to_string(),
                expect_type: Some("points".to_string()),
            }
        );
    }

    #[test]
    fn test_scan_parsing_with_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["validate-melm", "scan", "/libraries", "-t", "4", "-v", "-f", "json"])
                .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(
            cli.command,
            Command::Scan {
                base: PathBuf::from("/libraries"),
                threads: Some(4),
            }
        );
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["validate-melm", "-v", "-q", "scan", "/libraries"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let base = temp_dir.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["validate-melm", "scan", base, "-t", "0"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["validate-melm", "scan", base]).unwrap();
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_base() {
        let cli = Cli::try_parse_from(["validate-melm", "scan", "/nonexistent/libraries"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_verbosity_from_flags() {
        let cli = Cli::try_parse_from(["validate-melm", "scan", "/libraries"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Normal);

        let cli = Cli::try_parse_from(["validate-melm", "-q", "scan", "/libraries"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Quiet);

        let cli = Cli::try_parse_from(["validate-melm", "scan", "/libraries", "-v"]).unwrap();
        assert_eq!(cli.verbosity(), VerbosityLevel::Verbose);
    }
}
