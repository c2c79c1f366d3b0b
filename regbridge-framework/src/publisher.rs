//! Measurement publisher for Zenoh.

use std::sync::Arc;

use regbridge_common::{Format, KeyExprBuilder, TelemetryPoint, encode};

use crate::error::{BridgeError, Result};

/// Publisher for sending measurements to Zenoh.
///
/// Wraps a Zenoh session and provides convenient methods for publishing
/// [`TelemetryPoint`] values with automatic serialization. Every point is put
/// at `<prefix>/<source>/<group>/<metric>`.
#[derive(Clone, Debug)]
pub struct Publisher {
    session: Arc<zenoh::Session>,
    keys: KeyExprBuilder,
    format: Format,
}

impl Publisher {
    /// Create a new publisher.
    pub fn new(
        session: Arc<zenoh::Session>,
        key_prefix: impl Into<String>,
        format: Format,
    ) -> Result<Self> {
        Ok(Self {
            session,
            keys: KeyExprBuilder::new(key_prefix)?,
            format,
        })
    }

    /// Get the key prefix.
    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    /// Get the key builder.
    pub fn keys(&self) -> &KeyExprBuilder {
        &self.keys
    }

    /// Get the serialization format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    /// The key a point is published at.
    pub fn key_for(&self, point: &TelemetryPoint) -> String {
        self.keys.build(&point.source, &point.group, &point.metric)
    }

    /// Publish a measurement.
    pub async fn publish(&self, point: &TelemetryPoint) -> Result<()> {
        let key = self.key_for(point);
        let payload =
            encode(point, self.format).map_err(|e| BridgeError::Serialization(e.to_string()))?;

        self.publish_raw(&key, payload).await
    }

    /// Publish raw bytes to a key (for status messages, etc.).
    pub async fn publish_raw(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| BridgeError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Publish a JSON value to a key.
    pub async fn publish_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish_raw(key, payload).await
    }
}

/// Outcome counters for a group of publishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Number of successfully published points.
    pub success: usize,
    /// Number of failed publishes.
    pub failed: usize,
}

impl PublishStats {
    /// Record one publish result.
    pub fn record<T, E>(&mut self, result: &std::result::Result<T, E>) {
        match result {
            Ok(_) => self.success += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Total number of attempted publishes.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.success as f64 / self.total() as f64) * 100.0
        }
    }
}
