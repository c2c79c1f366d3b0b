//! Register transport over Modbus TCP or RTU.

use std::future::Future;
use std::time::Duration;

use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, error, warn};

use crate::config::{ConnectionConfig, DeviceConfig};

/// Error type for register reads.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Timed out after {timeout_ms} ms reading {count} registers at {address}")]
    Timeout {
        address: u16,
        count: u16,
        timeout_ms: u64,
    },
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Device exception: {0}")]
    Exception(String),
}

/// Source of raw holding-register words.
pub trait RegisterReader {
    /// Read `count` holding registers starting at `address`.
    ///
    /// The response is returned as received; callers check its length.
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;
}

/// [`RegisterReader`] backed by `tokio-modbus`.
///
/// Connects on first use and keeps the connection between reads. Any error
/// drops the connection so the next read starts with a fresh one.
pub struct ModbusTransport {
    device: DeviceConfig,
    ctx: Option<Context>,
}

impl ModbusTransport {
    pub fn new(device: DeviceConfig) -> Self {
        Self { device, ctx: None }
    }

    /// The device this transport talks to.
    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    /// One attempt: reuse or open a connection, then read.
    async fn read_once(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => {
                let ctx = connect(&self.device).await.inspect_err(|e| {
                    error!(device = %self.device.name, error = %e, "Modbus connection failed");
                })?;
                debug!(device = %self.device.name, connection = %self.device.connection, "Connected");
                ctx
            }
        };

        let words = tokio::time::timeout(self.timeout(), ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| TransportError::Timeout {
                address,
                count,
                timeout_ms: self.device.timeout_ms,
            })?
            .map_err(|e| TransportError::Read(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{:?}", e)))?;

        self.ctx = Some(ctx);
        Ok(words)
    }
}

/// Connect to the Modbus device.
async fn connect(device: &DeviceConfig) -> Result<Context, TransportError> {
    let timeout = Duration::from_millis(device.timeout_ms);
    let slave = Slave(device.unit_id);

    match &device.connection {
        ConnectionConfig::Tcp { host, port } => {
            let addr = tokio::net::lookup_host((host.as_str(), *port))
                .await
                .map_err(|e| TransportError::Connection(format!("Invalid address: {}", e)))?
                .next()
                .ok_or_else(|| TransportError::Connection(format!("No address found for {}", host)))?;

            let ctx = tokio::time::timeout(timeout, tcp::connect_slave(addr, slave))
                .await
                .map_err(|_| TransportError::Connection("Connection timeout".to_string()))?
                .map_err(|e| TransportError::Connection(e.to_string()))?;

            Ok(ctx)
        }
        ConnectionConfig::Rtu {
            port,
            baud_rate,
            data_bits,
            parity,
            stop_bits,
        } => {
            let parity = match parity.to_lowercase().as_str() {
                "even" => tokio_serial::Parity::Even,
                "odd" => tokio_serial::Parity::Odd,
                _ => tokio_serial::Parity::None,
            };

            let stop_bits = match stop_bits {
                2 => tokio_serial::StopBits::Two,
                _ => tokio_serial::StopBits::One,
            };

            let data_bits = match data_bits {
                5 => tokio_serial::DataBits::Five,
                6 => tokio_serial::DataBits::Six,
                7 => tokio_serial::DataBits::Seven,
                _ => tokio_serial::DataBits::Eight,
            };

            let builder = tokio_serial::new(port, *baud_rate)
                .parity(parity)
                .stop_bits(stop_bits)
                .data_bits(data_bits)
                .timeout(timeout);

            let serial = tokio_serial::SerialStream::open(&builder)
                .map_err(|e| TransportError::Connection(format!("Serial open failed: {}", e)))?;

            Ok(rtu::attach_slave(serial, slave))
        }
    }
}

impl RegisterReader for ModbusTransport {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let attempts = self.device.retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.read_once(address, count).await {
                Ok(words) => return Ok(words),
                Err(e) if attempt < attempts => {
                    warn!(
                        device = %self.device.name,
                        address,
                        count,
                        attempt,
                        error = %e,
                        "Register read failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_device(retries: u32) -> DeviceConfig {
        DeviceConfig {
            name: "nowhere".to_string(),
            connection: ConnectionConfig::Tcp {
                host: "127.0.0.1".to_string(),
                port: 1,
            },
            unit_id: 1,
            timeout_ms: 200,
            retries,
        }
    }

    #[test]
    fn test_new_transport_is_lazy() {
        let transport = ModbusTransport::new(unreachable_device(0));
        assert!(!transport.is_connected());
        assert_eq!(transport.device().name, "nowhere");
    }

    #[tokio::test]
    async fn test_unreachable_device_fails_without_connection() {
        let mut transport = ModbusTransport::new(unreachable_device(1));

        let err = transport.read_holding_registers(199, 36).await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
        assert!(!transport.is_connected());
    }
}
