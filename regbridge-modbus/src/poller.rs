//! Periodic polling of the Modbus device.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use regbridge_framework::Shutdown;

use crate::engine::{DispatchEngine, TickReport};
use crate::sink::MeasurementSink;
use crate::transport::RegisterReader;

/// Drives a [`DispatchEngine`] once per tick period.
pub struct ModbusPoller<R, S> {
    engine: DispatchEngine,
    reader: R,
    sink: S,
    tick_period: Duration,
}

impl<R, S> ModbusPoller<R, S>
where
    R: RegisterReader,
    S: MeasurementSink,
{
    pub fn new(engine: DispatchEngine, reader: R, sink: S, tick_period: Duration) -> Self {
        Self {
            engine,
            reader,
            sink,
            tick_period,
        }
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    /// Run the polling loop until `shutdown` fires.
    ///
    /// The signal is only observed between ticks, so a tick in progress
    /// always completes.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        let source = self.engine.settings().source.clone();

        info!(
            device = %source,
            tick_secs = self.tick_period.as_secs(),
            channels = self.engine.catalog().len(),
            "Starting Modbus poller"
        );

        while !shutdown.is_triggered() {
            self.tick_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.tick_period) => {}
                _ = shutdown.wait() => {}
            }
        }

        info!(device = %source, "Modbus poller stopped");
    }

    /// Run a single tick, logging its outcome.
    pub async fn tick_once(&mut self) -> Option<TickReport> {
        match self
            .engine
            .tick(&mut self.reader, &self.sink, Utc::now())
            .await
        {
            Ok(report) => {
                debug!(
                    device = %self.engine.settings().source,
                    published = report.stats.success,
                    failed = report.stats.failed,
                    full_push = report.full_push,
                    level_changed = report.level_changed,
                    "Tick complete"
                );
                if report.stats.failed > 0 {
                    warn!(
                        device = %self.engine.settings().source,
                        failed = report.stats.failed,
                        total = report.stats.total(),
                        "Some measurements were not published"
                    );
                }
                Some(report)
            }
            Err(e) => {
                warn!(
                    device = %self.engine.settings().source,
                    error = %e,
                    "Tick abandoned"
                );
                None
            }
        }
    }
}
