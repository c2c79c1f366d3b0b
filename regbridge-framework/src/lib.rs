//! regbridge Bridge Framework
//!
//! Common abstractions for bridges that publish measurements to Zenoh.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (startup, graceful shutdown, signal handling)
//! - [`Publisher`] for publishing measurements to Zenoh with automatic serialization
//! - [`Shutdown`] for observing the operator interrupt from worker loops
//! - [`BridgeArgs`] for common CLI argument parsing
//! - [`BridgeStatus`] for standardized status reporting
//!
//! # Example
//!
//! ```ignore
//! use regbridge_framework::{run_bridge, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_bridge::<MyBridgeConfig, _>("mybridge", "mybridge.json5", |runner| {
//!         let publisher = runner.publisher();
//!         let shutdown = runner.shutdown_signal();
//!         runner.spawn("worker", my_worker(publisher, shutdown));
//!         Ok(None)
//!     })
//!     .await
//! }
//! ```

mod args;
mod config;
mod error;
mod publisher;
mod runner;
mod shutdown;
mod status;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use publisher::{PublishStats, Publisher};
pub use runner::{BridgeRunner, run_bridge};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use status::{BridgeStatus, StatusPublisher};

// Re-export commonly used types from regbridge-common
pub use regbridge_common::{Format, LoggingConfig, TelemetryPoint, TelemetryValue, ZenohConfig};
