//! Poll/dispatch engine.
//!
//! Each tick reads every block of the catalog's read plan, decodes it into a
//! [`Reading`] and decides what to emit:
//!
//! - the first complete reading emits every channel;
//! - later readings emit every channel under [`FullPushPolicy::EveryTick`],
//!   or only once the full-push interval has elapsed under
//!   [`FullPushPolicy::Interval`];
//! - a change of the level channel emits that channel once more, after the
//!   batch.
//!
//! A tick that cannot read every channel is abandoned without touching the
//! engine state.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use regbridge_framework::{PublishStats, TelemetryValue};

use crate::catalog::{Catalog, ReadBlock};
use crate::decoder::{DecodedValue, decode};
use crate::sink::{Measurement, MeasurementSink};
use crate::transport::{RegisterReader, TransportError};

/// When a non-first tick publishes the whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullPushPolicy {
    /// Publish every channel on every tick.
    #[default]
    EveryTick,
    /// Publish every channel only when the full-push interval has elapsed.
    Interval,
}

impl FullPushPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FullPushPolicy::EveryTick => "every_tick",
            FullPushPolicy::Interval => "interval",
        }
    }
}

/// Static inputs of the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Device name measurements are attributed to.
    pub source: String,
    /// Channel group measurements are published under.
    pub group: String,
    pub full_push_interval: TimeDelta,
    pub policy: FullPushPolicy,
    /// Decimal places float channels are rounded to.
    pub float_precision: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            source: String::new(),
            group: "datalogger".to_string(),
            full_push_interval: TimeDelta::minutes(6),
            policy: FullPushPolicy::default(),
            float_precision: 4,
        }
    }
}

/// One value per catalog channel, in catalog order.
///
/// Float values are already rounded to the configured precision.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    values: Vec<TelemetryValue>,
}

impl Reading {
    pub fn values(&self) -> &[TelemetryValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<TelemetryValue> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Mutable engine state, owned by a single engine.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    last_reading: Option<Reading>,
    last_full_push_at: Option<DateTime<Utc>>,
}

impl EngineState {
    /// The most recent complete reading.
    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    /// When the last full push (or interval mark) happened.
    pub fn last_full_push_at(&self) -> Option<DateTime<Utc>> {
        self.last_full_push_at
    }

    /// Whether no complete reading has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.last_reading.is_none()
    }
}

/// Reasons a tick is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("reading {count} registers at {address} failed: {source}")]
    Transport {
        address: u16,
        count: u16,
        #[source]
        source: TransportError,
    },

    #[error("incomplete reading: expected {expected} values, decoded {actual}")]
    Incomplete { expected: usize, actual: usize },
}

/// What a successful tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// This was the first complete reading.
    pub first: bool,
    /// Every channel was published.
    pub full_push: bool,
    /// The full-push interval had elapsed.
    pub interval_reached: bool,
    /// The level channel changed and was published again.
    pub level_changed: bool,
    /// Publish outcomes for the tick.
    pub stats: PublishStats,
}

/// Table-driven poll/dispatch engine.
pub struct DispatchEngine {
    catalog: Catalog,
    plan: Vec<ReadBlock>,
    settings: EngineSettings,
    state: EngineState,
}

impl DispatchEngine {
    pub fn new(catalog: Catalog, settings: EngineSettings) -> Self {
        let plan = catalog.read_plan();
        Self {
            catalog,
            plan,
            settings,
            state: EngineState::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn read_plan(&self) -> &[ReadBlock] {
        &self.plan
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Run one tick: read, then dispatch at `now`.
    pub async fn tick<R, S>(
        &mut self,
        reader: &mut R,
        sink: &S,
        now: DateTime<Utc>,
    ) -> Result<TickReport, TickError>
    where
        R: RegisterReader,
        S: MeasurementSink,
    {
        let reading = self.read(reader).await?;
        Ok(self.dispatch(reading, sink, now).await)
    }

    /// Read and decode every block of the read plan.
    ///
    /// Fails on the first transport error, or if the blocks together do not
    /// yield exactly one value per channel.
    pub async fn read<R: RegisterReader>(&self, reader: &mut R) -> Result<Reading, TickError> {
        let mut values = Vec::with_capacity(self.catalog.len());

        for block in &self.plan {
            let words = reader
                .read_holding_registers(block.address, block.count)
                .await
                .map_err(|source| TickError::Transport {
                    address: block.address,
                    count: block.count,
                    source,
                })?;

            debug!(address = block.address, words = ?words, "Raw registers");

            if words.len() % usize::from(block.encoding.words_per_value()) != 0 {
                warn!(
                    address = block.address,
                    encoding = %block.encoding,
                    words = words.len(),
                    "Odd register count for a 2-word encoding, dropping the trailing word"
                );
            }

            let decoded = decode(&words, block.encoding, block.word_order);
            debug!(address = block.address, values = ?decoded, "Decoded registers");

            values.extend(
                decoded
                    .into_iter()
                    .take(block.expected_values())
                    .map(|v| self.normalize(v)),
            );
        }

        if values.len() != self.catalog.len() {
            return Err(TickError::Incomplete {
                expected: self.catalog.len(),
                actual: values.len(),
            });
        }

        Ok(Reading { values })
    }

    /// Emit measurements for a complete reading and advance the state.
    pub async fn dispatch<S: MeasurementSink>(
        &mut self,
        reading: Reading,
        sink: &S,
        now: DateTime<Utc>,
    ) -> TickReport {
        let mut report = TickReport {
            first: self.state.is_empty(),
            ..TickReport::default()
        };

        report.interval_reached = match self.state.last_full_push_at {
            Some(at) => now.signed_duration_since(at) > self.settings.full_push_interval,
            None => true,
        };

        report.full_push = report.first
            || match self.settings.policy {
                FullPushPolicy::EveryTick => true,
                FullPushPolicy::Interval => report.interval_reached,
            };

        if report.first {
            info!(
                channels = reading.len(),
                "First reading, publishing all channels"
            );
        } else if report.interval_reached {
            info!(
                interval_mins = self.settings.full_push_interval.num_minutes(),
                "Full push interval reached, publishing all channels"
            );
        }

        if report.full_push {
            for (index, value) in reading.values.iter().enumerate() {
                self.emit(sink, index, *value, now, &mut report.stats).await;
            }
        }

        if report.interval_reached {
            self.state.last_full_push_at = Some(now);
        }

        if let (Some(index), Some(baseline)) = (self.catalog.level_index(), &self.state.last_reading)
        {
            let previous = baseline.get(index);
            let current = reading.get(index);
            if let Some(value) = current.filter(|_| previous != current) {
                info!(
                    previous = ?previous,
                    current = %value,
                    "Level changed"
                );
                report.level_changed = true;
                self.emit(sink, index, value, now, &mut report.stats).await;
            }
        }

        self.state.last_reading = Some(reading);

        report
    }

    async fn emit<S: MeasurementSink>(
        &self,
        sink: &S,
        index: usize,
        value: TelemetryValue,
        now: DateTime<Utc>,
        stats: &mut PublishStats,
    ) {
        let Some(channel) = self.catalog.get(index) else {
            return;
        };

        let measurement = Measurement {
            source: self.settings.source.clone(),
            group: self.settings.group.clone(),
            name: channel.name.clone(),
            value,
            unit: channel.unit.clone(),
            timestamp: now,
            address: channel.address,
            encoding: channel.encoding,
        };

        let result = sink.publish(&measurement).await;
        if let Err(e) = &result {
            warn!(
                channel = %measurement.name,
                error = %e,
                "Failed to publish measurement"
            );
        }
        stats.record(&result);
    }

    /// Apply the rounding policy to a decoded value.
    fn normalize(&self, value: DecodedValue) -> TelemetryValue {
        match value {
            DecodedValue::Int16(v) => TelemetryValue::from(v),
            DecodedValue::Int32(v) => TelemetryValue::from(v),
            DecodedValue::Float32(v) => {
                TelemetryValue::Float(round_to(f64::from(v), self.settings.float_precision))
            }
        }
    }
}

/// Round to `decimals` places, ties to even. Non-finite values pass through.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round_ties_even() / factor;
    if rounded.is_finite() { rounded } else { value }
}
