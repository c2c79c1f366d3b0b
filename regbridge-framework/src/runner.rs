//! Bridge runner for lifecycle management.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use regbridge_common::{connect, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::publisher::Publisher;
use crate::shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
use crate::status::StatusPublisher;

/// Time workers get to finish their current unit of work on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Bridge runner that manages the lifecycle of a bridge.
///
/// Handles:
/// - Logging initialization
/// - Zenoh connection
/// - Task spawning and management
/// - Graceful shutdown on Ctrl+C: workers are signalled and awaited, not aborted
/// - Status publishing (optional)
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging and status.
    name: String,
    /// Bridge version.
    version: String,
    /// The loaded configuration.
    config: C,
    /// Zenoh session.
    session: Arc<zenoh::Session>,
    /// Publisher for measurements.
    publisher: Publisher,
    /// Status publisher (optional).
    status_publisher: Option<StatusPublisher>,
    /// Spawned tasks.
    tasks: Vec<(String, JoinHandle<()>)>,
    /// Signals workers to stop.
    shutdown: ShutdownTrigger,
    /// How long workers get to finish after the signal.
    shutdown_grace: Duration,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner.
    ///
    /// This will:
    /// 1. Initialize logging based on config (with optional CLI override)
    /// 2. Connect to Zenoh
    /// 3. Create the publisher
    pub async fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        let mut log_config = config.logging().clone();
        if let Some(level) = args.and_then(|a| a.log_level.as_ref()) {
            log_config.level = level.clone();
        }

        init_tracing(&log_config).map_err(|e| BridgeError::config(e.to_string()))?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        let session = Arc::new(
            connect(config.zenoh())
                .await
                .map_err(|e| BridgeError::ZenohConnection(e.to_string()))?,
        );

        let publisher = Publisher::new(session.clone(), config.key_prefix(), config.format())?;
        let (shutdown, _) = shutdown_channel();

        Ok(Self {
            name,
            version,
            config,
            session,
            publisher,
            status_publisher: None,
            tasks: Vec::new(),
            shutdown,
            shutdown_grace: SHUTDOWN_GRACE,
        })
    }

    /// Enable status publishing.
    ///
    /// When enabled, the runner will publish status messages on startup and shutdown.
    pub fn with_status_publishing(mut self) -> Self {
        self.status_publisher = Some(StatusPublisher::new(
            self.publisher.clone(),
            &self.name,
            &self.version,
        ));
        self
    }

    /// Get the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the bridge version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    /// Get a clone of the publisher.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Get a shutdown signal for a worker.
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.subscribe()
    }

    /// Spawn a worker task.
    ///
    /// The task is awaited on shutdown; it should watch a [`Shutdown`] signal
    /// and return once it fires.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.push((name.into(), handle));
    }

    /// Run the bridge until Ctrl+C is received.
    ///
    /// This will:
    /// 1. Publish "running" status with `metadata` (if enabled)
    /// 2. Wait for Ctrl+C signal
    /// 3. Signal all workers and wait for them to finish (bounded by the grace period)
    /// 4. Publish "offline" status (if enabled)
    /// 5. Close the Zenoh session
    pub async fn run_with_metadata(mut self, metadata: Option<serde_json::Value>) -> Result<()> {
        if let Some(ref status_pub) = self.status_publisher {
            if let Err(e) = status_pub.publish_running(metadata).await {
                tracing::warn!(error = %e, "Failed to publish running status");
            }
        }

        tracing::info!(
            bridge = %self.name,
            tasks = self.tasks.len(),
            "Bridge running. Press Ctrl+C to stop."
        );

        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }

        tracing::info!(bridge = %self.name, "Received shutdown signal");

        self.shutdown.trigger();
        self.join_workers().await;

        if let Some(ref status_pub) = self.status_publisher {
            if let Err(e) = status_pub.publish_offline().await {
                tracing::warn!(error = %e, "Failed to publish offline status");
            }
        }

        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "Error closing Zenoh session");
        }

        tracing::info!(bridge = %self.name, "Goodbye!");

        Ok(())
    }

    /// Wait for every worker, aborting those still busy when the grace period ends.
    async fn join_workers(&mut self) {
        let deadline = Instant::now() + self.shutdown_grace;

        for (name, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(worker = %name, "Worker stopped"),
                Ok(Err(e)) if e.is_panic() => {
                    tracing::error!(worker = %name, "Worker panicked");
                    if let Some(ref status_pub) = self.status_publisher {
                        let message = format!("worker '{}' panicked", name);
                        if let Err(e) = status_pub.publish_error(message).await {
                            tracing::warn!(error = %e, "Failed to publish error status");
                        }
                    }
                }
                Ok(Err(_)) => tracing::debug!(worker = %name, "Worker cancelled"),
                Err(_) => {
                    tracing::warn!(
                        worker = %name,
                        grace_secs = self.shutdown_grace.as_secs(),
                        "Worker did not stop within the grace period, aborting"
                    );
                    handle.abort();
                }
            }
        }
    }
}

/// Convenience function to run a bridge with minimal boilerplate.
///
/// Parses [`BridgeArgs`], loads and validates the configuration, starts the
/// runner with status publishing, lets `setup` spawn workers and return the
/// status metadata, then runs until Ctrl+C.
///
/// # Example
///
/// ```ignore
/// use regbridge_framework::run_bridge;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     run_bridge::<MyBridgeConfig, _>("mybridge", "mybridge.json5", |runner| {
///         let publisher = runner.publisher();
///         let shutdown = runner.shutdown_signal();
///         runner.spawn("worker", my_worker(publisher, shutdown));
///         Ok(None)
///     })
///     .await
/// }
/// ```
pub async fn run_bridge<C, F>(
    name: &str,
    default_config: &'static str,
    setup: F,
) -> anyhow::Result<()>
where
    C: BridgeConfig,
    F: FnOnce(&mut BridgeRunner<C>) -> anyhow::Result<Option<serde_json::Value>>,
{
    let args = BridgeArgs::parse_with_default(default_config);
    let config = C::load(&args.config).map_err(|e| {
        anyhow::anyhow!("Failed to load config from {:?}: {}", args.config, e)
    })?;

    let mut runner = BridgeRunner::new_with_args(name, config, Some(&args))
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?
        .with_status_publishing();

    tracing::info!(config = ?args.config, "Loaded configuration");

    let metadata = setup(&mut runner)?;

    runner
        .run_with_metadata(metadata)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
}
