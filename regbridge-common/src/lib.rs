//! regbridge Common Library
//!
//! This crate provides shared types and utilities for the regbridge bridges:
//!
//! - [`telemetry`] - Measurement data model (`TelemetryPoint`, `TelemetryValue`)
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Configuration types (JSON5 format)
//! - [`session`] - Zenoh session management (plain or TLS)
//! - [`keyexpr`] - Key expression builders and parsers
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod serialization;
pub mod session;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig, TlsConfig, ZenohConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{KEY_PREFIX, KeyExprBuilder, ParsedKeyExpr, parse_key_expr, sanitize_chunk};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;
pub use telemetry::{TelemetryPoint, TelemetryValue, current_timestamp_millis};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level when set.
///
/// # Example
///
/// ```ignore
/// use regbridge_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
