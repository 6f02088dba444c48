use std::fmt::Display;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error};

use validate_melm::cli::{Cli, Command, OutputFormat, VerbosityLevel};
use validate_melm::config::{ConfigError, ConfigManager};
use validate_melm::layout::LibraryLocation;
use validate_melm::logging::{init_cli_logger, init_json_logger};
use validate_melm::output::Output;
use validate_melm::{CatalogScanner, LibraryValidator, validate_library_with_options};

const EXIT_INVALID: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    if let Err(e) = cli.validate() {
        return Ok(usage_error(&cli, e));
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(ConfigError::Validation(e)) => return Ok(usage_error(&cli, e)),
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    let verbosity = config.output.verbosity();
    init_logger(config.output.format, verbosity);
    debug!("Effective configuration: {:?}", config);

    let output = Output::new(config.output.format, verbosity);
    let options = ConfigManager::validate_options(&config);
    let schema_path = config.validation.schema.clone();

    match cli.command {
        Command::Check {
            base,
            name,
            version,
            ..
        } => {
            let location = LibraryLocation::new(&base, name, version);
            let identity = location.identity.clone();

            let result = tokio::task::spawn_blocking(move || {
                validate_library_with_options(&schema_path, &location, options)
            })
            .await
            .context("Validation task failed")?;

            print!("{}", output.format_check(&identity, &result));
            Ok(match result {
                Ok(_) => ExitCode::SUCCESS,
                Err(_) => ExitCode::from(EXIT_INVALID),
            })
        }
        Command::Scan { base, .. } => {
            let validator = tokio::task::spawn_blocking(move || LibraryValidator::new(&schema_path))
                .await
                .context("Schema compilation task failed")?
                .context("Failed to compile descriptor schema")?
                .with_options(options);

            let scanner = CatalogScanner::new(validator, ConfigManager::scan_config(&config));
            let report = scanner
                .scan(&base)
                .await
                .with_context(|| format!("Failed to scan {}", base.display()))?;

            print!("{}", output.format_report(&report));
            Ok(if report.all_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_INVALID)
            })
        }
    }
}

fn init_logger(format: OutputFormat, verbosity: VerbosityLevel) {
    match format {
        OutputFormat::Json => init_json_logger(verbosity),
        OutputFormat::Human => init_cli_logger(verbosity),
    }
}

/// Log `message` with the logging flags given on the command line and exit with the usage code
fn usage_error(cli: &Cli, message: impl Display) -> ExitCode {
    init_logger(cli.format.unwrap_or_default(), cli.verbosity());
    error!("{}", message);
    ExitCode::from(EXIT_USAGE)
}
