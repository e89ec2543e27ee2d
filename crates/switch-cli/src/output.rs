//! Output formatting for switch-cli (table, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use switch_session::ConnectionSummary;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print a single item in the configured format
    pub fn print_one<T: Tabled + Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Table => {
                let table = Table::new([data]).to_string();
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }

    /// Print an arbitrary JSON document
    ///
    /// Table format lists the top-level fields of an object as key/value pairs.
    pub fn print_value(&self, value: &serde_json::Value) {
        match (self.format, value) {
            (OutputFormat::Table, serde_json::Value::Object(map)) => {
                for (key, value) in map {
                    let rendered = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    println!("{}: {}", key.bold(), rendered);
                }
            }
            _ => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                );
            }
        }
    }
}

// =============================================================================
// Display types
// =============================================================================

/// Connection display for info command
#[derive(Debug, Tabled, Serialize)]
pub struct ConnectionRow {
    #[tabled(rename = "Server")]
    pub server: String,
    #[tabled(rename = "Port")]
    pub port: u16,
    #[tabled(rename = "API Version")]
    pub api_version: String,
    #[tabled(rename = "API Prefix")]
    pub api_prefix: String,
    #[tabled(rename = "Skip Cert Check")]
    pub skip_certificate_check: bool,
}

impl From<ConnectionSummary> for ConnectionRow {
    fn from(summary: ConnectionSummary) -> Self {
        Self {
            server: summary.server,
            port: summary.port,
            api_version: summary.api_version,
            api_prefix: summary.api_prefix.unwrap_or_else(|| "-".to_string()),
            skip_certificate_check: summary.skip_certificate_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_name("csv"), None);
    }

    #[test]
    fn test_connection_row_fills_missing_prefix() {
        let row = ConnectionRow::from(ConnectionSummary {
            server: "sw1".into(),
            port: 443,
            api_version: "10.09".into(),
            api_prefix: None,
            skip_certificate_check: false,
            runtime: switch_session::RuntimeCapability::Modern,
        });
        assert_eq!(row.api_prefix, "-");
    }
}
