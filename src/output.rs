//! Output and reporting
//!
//! Renders a single library check or a catalog scan either for a terminal or as JSON.

use std::io::IsTerminal;
use std::time::Duration;

use serde_json::json;

use crate::catalog::{LibraryOutcome, LibraryStatus, ScanReport};
use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::LibraryValidatorError;
use crate::layout::LibraryIdentity;
use crate::validator::ValidatedLibrary;

/// Output formatter for validation results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: std::io::stdout().is_terminal(),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Result of `check` for one library
    pub fn format_check(
        &self,
        identity: &LibraryIdentity,
        result: &Result<ValidatedLibrary, LibraryValidatorError>,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let value = match result {
                    Ok(validated) => json!({
                        "status": "valid",
                        "library": validated,
                    }),
                    Err(e) => json!({
                        "status": "invalid",
                        "name": identity.name,
                        "version": identity.version,
                        "kind": e.kind(),
                        "message": e.message(),
                    }),
                };
                format!("{:#}\n", value)
            }
            OutputFormat::Human => match result {
                Ok(_) if self.verbosity == VerbosityLevel::Quiet => String::new(),
                Ok(validated) => {
                    let mut output = format!(
                        "{}  {} {}\n",
                        self.colorize("✓ VALID", "32"),
                        identity.name,
                        identity.version
                    );
                    if self.verbosity >= VerbosityLevel::Verbose {
                        output.push_str(&format!(
                            "    descriptor: {}\n",
                            validated.descriptor.display()
                        ));
                        output.push_str(&format!("    icon: {}\n", validated.icon.display()));
                        output.push_str(&format!(
                            "    library-type: {}\n",
                            validated.fields.library_type
                        ));
                    }
                    output
                }
                Err(e) => format!(
                    "{}  {} {} - {}\n",
                    self.colorize("✗ INVALID", "31"),
                    identity.name,
                    identity.version,
                    e
                ),
            },
        }
    }

    /// Result of `scan`
    pub fn format_report(&self, report: &ScanReport) -> String {
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(report) {
                Ok(json) => format!("{}\n", json),
                Err(e) => format!("{{\"error\": \"{}\"}}\n", e),
            },
            OutputFormat::Human => self.format_report_human(report),
        }
    }

    fn format_report_human(&self, report: &ScanReport) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                for outcome in report.outcomes.iter().filter(|o| !o.status.is_valid()) {
                    output.push_str(&self.format_outcome(outcome));
                    output.push('\n');
                }
                if report.invalid > 0 {
                    output.push_str(&format!("Invalid: {}\n", report.invalid));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                for outcome in &report.outcomes {
                    if self.verbosity == VerbosityLevel::Verbose || !outcome.status.is_valid() {
                        output.push_str(&self.format_outcome(outcome));
                        output.push('\n');
                    }
                }
                if !report.outcomes.is_empty() {
                    output.push('\n');
                }
                output.push_str(&self.format_summary(report));
            }
        }

        output
    }

    pub fn format_outcome(&self, outcome: &LibraryOutcome) -> String {
        let duration_str = format_duration(outcome.duration);

        match &outcome.status {
            LibraryStatus::Valid => format!(
                "{}  {} {} ({})",
                self.colorize("✓ VALID", "32"),
                outcome.location.name(),
                outcome.location.version(),
                duration_str
            ),
            LibraryStatus::Invalid { message, .. } => format!(
                "{}  {} {} ({}) - {}",
                self.colorize("✗ INVALID", "31"),
                outcome.location.name(),
                outcome.location.version(),
                duration_str,
                message
            ),
        }
    }

    fn format_summary(&self, report: &ScanReport) -> String {
        let mut output = String::new();
        output.push_str("Scan Summary:\n");
        output.push_str(&format!("  Total libraries: {}\n", report.total));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Valid:", "32"),
            report.valid
        ));
        if report.invalid > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Invalid:", "31"),
                report.invalid
            ));
        }
        if report.total == 0 {
            output.push_str(&format!(
                "  {}\n",
                self.colorize("No unpacked libraries found", "33")
            ));
        }
        output.push_str(&format!("  Duration: {}\n", format_duration(report.duration)));
        if self.verbosity == VerbosityLevel::Verbose {
            output.push_str(&format!("  Finished at: {}\n", report.finished_at.to_rfc3339()));
        }
        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
