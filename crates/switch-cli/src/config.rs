//! Configuration file handling for switch-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use switch_session::DEFAULT_PORT;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default device address
    pub server: Option<String>,
    /// Default HTTPS port
    pub port: Option<u16>,
    /// Default login name
    pub username: Option<String>,
    /// Accept any server certificate
    pub skip_certificate_check: Option<bool>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// Values given on the command line (all optional)
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides<'a> {
    pub server: Option<&'a str>,
    pub port: Option<u16>,
    pub username: Option<&'a str>,
    pub skip_certificate_check: bool,
    pub timeout_secs: Option<u64>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("switch-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> Result<MergedConfig> {
        let server = args
            .server
            .map(String::from)
            .or_else(|| self.server.clone())
            .context("No server given (use --server or set `server` in the config file)")?;

        let timeout_secs = args
            .timeout_secs
            .or(self.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        anyhow::ensure!(timeout_secs > 0, "timeout_secs must be at least 1");

        Ok(MergedConfig {
            server,
            port: args.port.or(self.port).unwrap_or(DEFAULT_PORT),
            username: args
                .username
                .map(String::from)
                .or_else(|| self.username.clone()),
            skip_certificate_check: args.skip_certificate_check
                || self.skip_certificate_check.unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub skip_certificate_check: bool,
    pub timeout: Duration,
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_override_file() {
        let config = Config {
            server: Some("file-switch".into()),
            port: Some(8443),
            username: Some("file-user".into()),
            ..Default::default()
        };
        let merged = config
            .merge_with_args(&ArgOverrides {
                server: Some("cli-switch"),
                username: Some("cli-user"),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.server, "cli-switch");
        assert_eq!(merged.port, 8443);
        assert_eq!(merged.username.as_deref(), Some("cli-user"));
        assert_eq!(merged.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_defaults_when_unset() {
        let merged = Config::default()
            .merge_with_args(&ArgOverrides {
                server: Some("sw1"),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.port, DEFAULT_PORT);
        assert!(!merged.skip_certificate_check);
        assert!(merged.username.is_none());
    }

    #[test]
    fn test_zero_timeout_in_file_rejected() {
        let config = Config {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config
            .merge_with_args(&ArgOverrides {
                server: Some("sw1"),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_server_required() {
        assert!(Config::default()
            .merge_with_args(&ArgOverrides::default())
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server = \"10.0.0.5\"\nport = 4443\nskip_certificate_check = true\ntimeout_secs = 5"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.port, Some(4443));
        assert_eq!(config.skip_certificate_check, Some(true));
        assert_eq!(config.timeout_secs, Some(5));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
