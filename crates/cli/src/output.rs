//! Shared text/JSON output formatting for every subcommand.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print one value as pretty JSON, or hand it to `render` for the text path.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, render: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => render(value),
    }
    Ok(())
}

/// Render a status as a short, fixed-width label so list output lines up.
pub fn status_label(status: &str) -> &'static str {
    match status {
        "queued" => "QUEUED",
        "processing" => "PROCESSING",
        "completed" => "COMPLETED",
        "failed" => "FAILED",
        "canceled" => "CANCELED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
