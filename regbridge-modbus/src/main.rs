//! Modbus register bridge.
//!
//! Polls a Modbus device (TCP or RTU/serial) and publishes its channels to
//! Zenoh as telemetry.

use std::time::Duration;

use anyhow::{Context, Result};
use regbridge_framework::run_bridge;
use regbridge_modbus::config::ModbusBridgeConfig;
use regbridge_modbus::engine::DispatchEngine;
use regbridge_modbus::poller::ModbusPoller;
use regbridge_modbus::transport::ModbusTransport;

#[tokio::main]
async fn main() -> Result<()> {
    run_bridge::<ModbusBridgeConfig, _>("modbus", "regbridge.json5", |runner| {
        let config = runner.config().modbus.clone();
        let catalog = config.catalog().context("Invalid channel catalog")?;

        let metadata = serde_json::json!({
            "device": config.device.name,
            "connection": config.device.connection.to_string(),
            "channel_group": config.channel_group,
            "channels": catalog.len(),
            "tick_period_secs": config.tick_period_secs,
            "full_push_interval_mins": config.full_push_interval_mins,
            "full_push_policy": config.full_push_policy.as_str(),
            "format": runner.publisher().format().mime_type(),
        });

        tracing::info!(
            device = %config.device.name,
            connection = %config.device.connection,
            channels = catalog.len(),
            "Starting poller"
        );

        let engine = DispatchEngine::new(catalog, config.engine_settings());
        let poller = ModbusPoller::new(
            engine,
            ModbusTransport::new(config.device.clone()),
            runner.publisher(),
            Duration::from_secs(config.tick_period_secs),
        );

        let shutdown = runner.shutdown_signal();
        runner.spawn(format!("poller:{}", config.device.name), poller.run(shutdown));

        Ok(Some(metadata))
    })
    .await
}
