//! Bridge status reporting.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::publisher::Publisher;

/// Bridge status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// Bridge name (e.g., "modbus").
    pub bridge: String,
    /// Bridge version.
    pub version: String,
    /// Current status ("running", "offline", "error").
    pub status: String,
    /// Additional metadata (bridge-specific).
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl BridgeStatus {
    /// Create a new status with "running" state.
    pub fn running(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, "running")
    }

    /// Create a status with "offline" state.
    pub fn offline(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, "offline")
    }

    /// Create a status with "error" state.
    pub fn error(
        bridge: impl Into<String>,
        version: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::with_state(bridge, version, "error")
            .with_metadata(serde_json::json!({ "error": error.into() }))
    }

    fn with_state(
        bridge: impl Into<String>,
        version: impl Into<String>,
        status: &str,
    ) -> Self {
        Self {
            bridge: bridge.into(),
            version: version.into(),
            status: status.to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Add metadata to the status.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Publish this status to Zenoh.
    ///
    /// Publishes to `{key_prefix}/@/status`.
    pub async fn publish(&self, publisher: &Publisher) -> Result<()> {
        let key = publisher.keys().status_key();
        publisher.publish_json(&key, self).await
    }
}

/// Helper to publish bridge status on startup and shutdown.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    publisher: Publisher,
    bridge_name: String,
    version: String,
}

impl StatusPublisher {
    /// Create a new status publisher.
    pub fn new(
        publisher: Publisher,
        bridge_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            bridge_name: bridge_name.into(),
            version: version.into(),
        }
    }

    /// Publish "running" status with optional metadata.
    pub async fn publish_running(&self, metadata: Option<serde_json::Value>) -> Result<()> {
        let mut status = BridgeStatus::running(&self.bridge_name, &self.version);
        if let Some(meta) = metadata {
            status = status.with_metadata(meta);
        }
        status.publish(&self.publisher).await
    }

    /// Publish "offline" status.
    pub async fn publish_offline(&self) -> Result<()> {
        BridgeStatus::offline(&self.bridge_name, &self.version)
            .publish(&self.publisher)
            .await
    }

    /// Publish "error" status.
    pub async fn publish_error(&self, error: impl Into<String>) -> Result<()> {
        BridgeStatus::error(&self.bridge_name, &self.version, error)
            .publish(&self.publisher)
            .await
    }
}
