//! Configuration for the Modbus bridge.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regbridge_common::KEY_PREFIX;
use regbridge_framework::{BridgeConfig, BridgeError, Format, LoggingConfig, ZenohConfig};

use crate::catalog::{Catalog, CatalogError, Channel};
use crate::engine::{EngineSettings, FullPushPolicy};

/// Highest supported rounding precision for float channels.
pub const MAX_FLOAT_PRECISION: u32 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid channel catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusBridgeConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Wire format for published measurements
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Modbus-specific settings
    pub modbus: ModbusConfig,
}

/// Modbus polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Key expression prefix (default: "regbridge/modbus")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Channel group every measurement is published under
    #[serde(default = "default_channel_group")]
    pub channel_group: String,

    /// The device to poll
    pub device: DeviceConfig,

    /// Seconds between ticks
    #[serde(default = "default_tick_period")]
    pub tick_period_secs: u64,

    /// Minutes between full pushes
    #[serde(default = "default_full_push_interval")]
    pub full_push_interval_mins: u64,

    /// Whether every tick publishes all channels or only interval ticks do
    #[serde(default)]
    pub full_push_policy: FullPushPolicy,

    /// Decimal places float channels are rounded to
    #[serde(default = "default_float_precision")]
    pub float_precision: u32,

    /// Channel catalog; empty means the built-in datalogger layout
    #[serde(default)]
    pub channels: Vec<Channel>,
}

fn default_key_prefix() -> String {
    KEY_PREFIX.to_string()
}

fn default_channel_group() -> String {
    "datalogger".to_string()
}

fn default_tick_period() -> u64 {
    10
}

fn default_full_push_interval() -> u64 {
    6
}

fn default_float_precision() -> u32 {
    4
}

/// Configuration for the Modbus device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name (used as the measurement source)
    pub name: String,

    /// Connection type and address
    pub connection: ConnectionConfig,

    /// Modbus unit/slave ID (1-247)
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Connect and read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a failed read
    #[serde(default)]
    pub retries: u32,
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Connection configuration (TCP or RTU).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// Modbus TCP connection
    Tcp {
        /// Host address (IP or hostname)
        host: String,
        /// TCP port (default: 502)
        #[serde(default = "default_modbus_port")]
        port: u16,
    },
    /// Modbus RTU (serial) connection
    Rtu {
        /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
        port: String,
        /// Baud rate (default: 9600)
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Data bits (default: 8)
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Parity: "none", "even", or "odd" (default: "none")
        #[serde(default = "default_parity")]
        parity: String,
        /// Stop bits: 1 or 2 (default: 1)
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionConfig::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            ConnectionConfig::Rtu {
                port, baud_rate, ..
            } => write!(f, "rtu://{}@{}", port, baud_rate),
        }
    }
}

fn default_modbus_port() -> u16 {
    502
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl ModbusConfig {
    /// The configured catalog, or the datalogger layout when none is given.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        if self.channels.is_empty() {
            return Ok(Catalog::datalogger());
        }
        Ok(Catalog::new(self.channels.clone())?)
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            source: self.device.name.clone(),
            group: self.channel_group.clone(),
            full_push_interval: i64::try_from(self.full_push_interval_mins)
                .ok()
                .and_then(TimeDelta::try_minutes)
                .unwrap_or(TimeDelta::MAX),
            policy: self.full_push_policy,
            float_precision: self.float_precision,
        }
    }

    /// Validate the Modbus section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let device = &self.device;

        if device.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Device name cannot be empty".to_string(),
            ));
        }

        if device.unit_id == 0 {
            return Err(ConfigError::Validation(format!(
                "Device '{}': unit_id must be 1-247",
                device.name
            )));
        }

        if let ConnectionConfig::Rtu { parity, .. } = &device.connection {
            match parity.to_lowercase().as_str() {
                "none" | "even" | "odd" => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "Device '{}': invalid parity '{}' (use none, even, or odd)",
                        device.name, parity
                    )));
                }
            }
        }

        if self.tick_period_secs == 0 {
            return Err(ConfigError::Validation(
                "tick_period_secs must be at least 1".to_string(),
            ));
        }

        if self.channel_group.trim().is_empty() {
            return Err(ConfigError::Validation(
                "channel_group cannot be empty".to_string(),
            ));
        }

        if self.float_precision > MAX_FLOAT_PRECISION {
            return Err(ConfigError::Validation(format!(
                "float_precision {} exceeds the maximum of {}",
                self.float_precision, MAX_FLOAT_PRECISION
            )));
        }

        self.catalog()?;

        Ok(())
    }
}

impl BridgeConfig for ModbusBridgeConfig {
    fn zenoh(&self) -> &ZenohConfig {
        &self.zenoh
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn key_prefix(&self) -> &str {
        &self.modbus.key_prefix
    }

    fn format(&self) -> Format {
        self.serialization
    }

    fn validate(&self) -> regbridge_framework::Result<()> {
        self.modbus
            .validate()
            .map_err(|e| BridgeError::validation(e.to_string()))?;

        if let Some(tls) = &self.zenoh.tls {
            tls.verify_files()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Encoding, WordOrder};

    const MINIMAL: &str = r#"{
        modbus: {
            device: {
                name: "fx30",
                connection: { type: "tcp", host: "192.168.13.100" }
            }
        }
    }"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = ModbusBridgeConfig::parse(MINIMAL).unwrap();
        let modbus = &config.modbus;

        assert_eq!(modbus.key_prefix, "regbridge/modbus");
        assert_eq!(modbus.channel_group, "datalogger");
        assert_eq!(modbus.tick_period_secs, 10);
        assert_eq!(modbus.full_push_interval_mins, 6);
        assert_eq!(modbus.full_push_policy, FullPushPolicy::EveryTick);
        assert_eq!(modbus.float_precision, 4);
        assert_eq!(modbus.device.unit_id, 1);
        assert_eq!(modbus.device.timeout_ms, 1000);
        assert_eq!(modbus.device.retries, 0);
        assert_eq!(config.serialization, Format::Json);

        if let ConnectionConfig::Tcp { host, port } = &modbus.device.connection {
            assert_eq!(host, "192.168.13.100");
            assert_eq!(*port, 502); // default
        } else {
            panic!("Expected TCP connection");
        }

        assert_eq!(modbus.catalog().unwrap(), Catalog::datalogger());
    }

    #[test]
    fn test_parse_rtu_config() {
        let json = r#"{
            serialization: "cbor",
            modbus: {
                device: {
                    name: "sonde",
                    connection: {
                        type: "rtu",
                        port: "/dev/ttyUSB0",
                        baud_rate: 19200,
                        parity: "even"
                    },
                    unit_id: 5,
                    retries: 2
                },
                full_push_policy: "interval"
            }
        }"#;

        let config = ModbusBridgeConfig::parse(json).unwrap();
        let device = &config.modbus.device;

        assert_eq!(device.unit_id, 5);
        assert_eq!(device.retries, 2);
        assert_eq!(config.format(), Format::Cbor);
        assert_eq!(config.modbus.full_push_policy, FullPushPolicy::Interval);
        if let ConnectionConfig::Rtu {
            port,
            baud_rate,
            parity,
            data_bits,
            stop_bits,
        } = &device.connection
        {
            assert_eq!(port, "/dev/ttyUSB0");
            assert_eq!(*baud_rate, 19200);
            assert_eq!(parity, "even");
            assert_eq!(*data_bits, 8);
            assert_eq!(*stop_bits, 1);
        } else {
            panic!("Expected RTU connection");
        }
        assert_eq!(device.connection.to_string(), "rtu:///dev/ttyUSB0@19200");
    }

    #[test]
    fn test_custom_channels() {
        let json = r#"{
            modbus: {
                device: { name: "plc01", connection: { type: "tcp", host: "plc.local" } },
                channel_group: "tank",
                channels: [
                    { address: 0, name: "Flow", unit: "m3/h", encoding: "float32", word_order: "reverse" },
                    { address: 2, name: "Pump", encoding: "int16" }
                ]
            }
        }"#;

        let config = ModbusBridgeConfig::parse(json).unwrap();
        let catalog = config.modbus.catalog().unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.channels()[0].word_order, WordOrder::Reverse);
        assert_eq!(catalog.channels()[1].encoding, Encoding::Int16);
        assert_eq!(catalog.level_index(), Some(1));

        let settings = config.modbus.engine_settings();
        assert_eq!(settings.source, "plc01");
        assert_eq!(settings.group, "tank");
        assert_eq!(settings.full_push_interval, TimeDelta::minutes(6));
    }

    fn with_modbus(extra: &str) -> String {
        format!(
            r#"{{ modbus: {{ device: {{ name: "fx30", connection: {{ type: "tcp", host: "h" }} }}, {} }} }}"#,
            extra
        )
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        for extra in [
            "tick_period_secs: 0",
            "float_precision: 11",
            "channel_group: \"\"",
            "channels: [{ address: 0, name: \"\", encoding: \"int16\" }]",
            "channels: [{ address: 0, name: \"a\", encoding: \"int32\" }, { address: 1, name: \"b\", encoding: \"int16\" }]",
        ] {
            let err = ModbusBridgeConfig::parse(&with_modbus(extra)).unwrap_err();
            assert!(
                matches!(err, BridgeError::ConfigValidation(_)),
                "{} should fail validation, got {:?}",
                extra,
                err
            );
        }
    }

    #[test]
    fn test_validate_device() {
        let json = r#"{ modbus: { device: { name: "", connection: { type: "tcp", host: "h" } } } }"#;
        assert!(ModbusBridgeConfig::parse(json).is_err());

        let json = r#"{ modbus: { device: { name: "d", unit_id: 0, connection: { type: "tcp", host: "h" } } } }"#;
        assert!(ModbusBridgeConfig::parse(json).is_err());

        let json = r#"{ modbus: { device: { name: "d", connection: { type: "rtu", port: "/dev/x", parity: "mark" } } } }"#;
        assert!(ModbusBridgeConfig::parse(json).is_err());
    }

    #[test]
    fn test_validate_missing_tls_files() {
        let json = r#"{
            zenoh: {
                mode: "client",
                connect: ["tls/localhost:7447"],
                tls: {
                    connect_certificate: "/nonexistent/chain.pem",
                    connect_private_key: "/nonexistent/key.pem"
                }
            },
            modbus: { device: { name: "fx30", connection: { type: "tcp", host: "h" } } }
        }"#;

        assert!(ModbusBridgeConfig::parse(json).is_err());
    }
}
