use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Common Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (for client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (for peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,

    /// TLS material for `tls/` endpoints.
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
            tls: None,
        }
    }
}

/// Certificates used to authenticate the device against the telemetry backend.
///
/// The server CA is optional; without it the backend certificate is not
/// verified against a pinned chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM chain of the backend's CA.
    #[serde(default)]
    pub root_ca_certificate: Option<PathBuf>,

    /// PEM certificate chain presented by this device.
    pub connect_certificate: PathBuf,

    /// PEM private key matching `connect_certificate`.
    pub connect_private_key: PathBuf,
}

impl TlsConfig {
    /// All files this configuration refers to.
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![
            self.connect_certificate.as_path(),
            self.connect_private_key.as_path(),
        ];
        if let Some(ca) = &self.root_ca_certificate {
            files.push(ca.as_path());
        }
        files
    }

    /// Check that every referenced file exists and is a regular file.
    pub fn verify_files(&self) -> Result<()> {
        for file in self.files() {
            if !file.is_file() {
                return Err(Error::Tls(format!(
                    "The file {} is inaccessible or not there",
                    file.display()
                )));
            }
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zenoh_config() {
        let json5 = r#"
        {
            mode: "client",
            connect: ["tls/telemetry.example.com:7447"],
            tls: {
                connect_certificate: "certs/device_chain.pem",
                connect_private_key: "certs/device_key.pem",
            },
        }
        "#;

        let config: ZenohConfig = parse_config(json5).unwrap();

        assert_eq!(config.mode, "client");
        assert_eq!(config.connect, vec!["tls/telemetry.example.com:7447"]);
        let tls = config.tls.unwrap();
        assert!(tls.root_ca_certificate.is_none());
        assert_eq!(tls.files().len(), 2);
    }

    #[test]
    fn test_default_zenoh_config() {
        let config: ZenohConfig = parse_config("{}").unwrap();

        assert_eq!(config.mode, "peer");
        assert!(config.connect.is_empty());
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_logging_defaults_and_json_format() {
        let config: LoggingConfig = parse_config("{}").unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Text);

        let config: LoggingConfig = parse_config(r#"{ level: "debug", format: "json" }"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_tls_missing_files_rejected() {
        let tls = TlsConfig {
            root_ca_certificate: Some(PathBuf::from("/nonexistent/ca.pem")),
            connect_certificate: PathBuf::from("/nonexistent/chain.pem"),
            connect_private_key: PathBuf::from("/nonexistent/key.pem"),
        };

        assert_eq!(tls.files().len(), 3);
        assert!(matches!(tls.verify_files(), Err(Error::Tls(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result: Result<ZenohConfig> = load_config("/nonexistent/regbridge.json5");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
