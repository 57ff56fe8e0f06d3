//! Output formatting for CLI commands.
//!
//! This module renders command outcomes for the user, either as colored
//! text or as JSON for scripting.

use colored::Colorize;
use std::fmt::Write;
use tracing::error;

use crate::dws::Endpoints;
use crate::report::{DeletionOutcome, Outcome, ProvisioningOutcome};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a command outcome for display.
    #[must_use]
    pub fn format_outcome(&self, outcome: &Outcome) -> String {
        match self.format {
            OutputFormat::Json => match serde_json::to_string_pretty(outcome) {
                Ok(mut json) => {
                    json.push('\n');
                    json
                }
                Err(e) => {
                    error!("Failed to serialize outcome: {e}");
                    String::new()
                }
            },
            OutputFormat::Text => match outcome {
                Outcome::Create(created) => Self::format_created_text(created),
                Outcome::Delete(deleted) => Self::format_deleted_text(deleted),
            },
        }
    }

    fn format_created_text(outcome: &ProvisioningOutcome) -> String {
        let mut output = String::new();

        match &outcome.failure {
            None => {
                let _ = writeln!(
                    output,
                    "{} {} {} is ready",
                    "✓".green(),
                    outcome.kind,
                    outcome.id.bold()
                );
            }
            Some(reason) if outcome.id.is_empty() => {
                let _ = writeln!(output, "{} {} not created: {reason}", "✗".red(), outcome.kind);
            }
            Some(reason) => {
                let _ = writeln!(
                    output,
                    "{} {} {} is not ready: {reason}",
                    "✗".red(),
                    outcome.kind,
                    outcome.id.bold()
                );
            }
        }

        Self::write_endpoints(&mut output, &outcome.endpoints);
        output
    }

    fn format_deleted_text(outcome: &DeletionOutcome) -> String {
        if outcome.success {
            format!("{} {} {} deleted\n", "✓".green(), outcome.kind, outcome.id.bold())
        } else {
            format!(
                "{} {} {} not deleted: {}\n",
                "✗".red(),
                outcome.kind,
                outcome.id.bold(),
                outcome.error.as_deref().unwrap_or("unknown error")
            )
        }
    }

    fn write_endpoints(output: &mut String, endpoints: &Endpoints) {
        let fields = [
            ("SSH host", endpoints.ssh_host.clone()),
            ("SSH port", endpoints.ssh_port.map(|p| p.to_string())),
            ("IPv4", endpoints.ip.clone()),
            ("IPv6", endpoints.ipv6.clone()),
            ("Ygg", endpoints.ygg.clone()),
        ];

        for (label, value) in fields {
            if let Some(value) = value {
                let _ = writeln!(output, "   {}: {value}", label.dimmed());
            }
        }
    }
}
