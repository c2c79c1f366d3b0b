use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single measurement published by a bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Unix epoch milliseconds when the measurement was taken.
    pub timestamp: i64,

    /// Device identifier (e.g., "fx30", "192.168.13.100").
    pub source: String,

    /// Channel group the measurement belongs to (e.g., "datalogger").
    pub group: String,

    /// Measurement name (e.g., "Temp(200)").
    pub metric: String,

    /// The measured value.
    pub value: TelemetryValue,

    /// Physical unit, empty for dimensionless values.
    #[serde(default)]
    pub unit: String,

    /// Additional context labels (e.g., register address).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl TelemetryPoint {
    /// Create a new telemetry point with the current timestamp.
    pub fn new(
        source: impl Into<String>,
        group: impl Into<String>,
        metric: impl Into<String>,
        value: TelemetryValue,
    ) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            source: source.into(),
            group: group.into(),
            metric: metric.into(),
            value,
            unit: String::new(),
            labels: HashMap::new(),
        }
    }

    /// Set the timestamp (unix epoch milliseconds).
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the physical unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Add a label to this telemetry point.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add multiple labels to this telemetry point.
    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels.extend(labels);
        self
    }
}

/// Typed measurement value.
///
/// Integer channels stay integral on the wire so that a level switch reading
/// `1` is never published as `1.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// Signed integer value.
    Integer(i64),

    /// Floating point value.
    Float(f64),
}

impl TelemetryValue {
    /// The value as `f64`, whatever its representation.
    pub fn as_f64(&self) -> f64 {
        match self {
            TelemetryValue::Integer(v) => *v as f64,
            TelemetryValue::Float(v) => *v,
        }
    }
}

impl std::fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryValue::Integer(v) => write!(f, "{}", v),
            TelemetryValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for TelemetryValue {
    fn from(v: i64) -> Self {
        TelemetryValue::Integer(v)
    }
}

impl From<i32> for TelemetryValue {
    fn from(v: i32) -> Self {
        TelemetryValue::Integer(i64::from(v))
    }
}

impl From<i16> for TelemetryValue {
    fn from(v: i16) -> Self {
        TelemetryValue::Integer(i64::from(v))
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Float(v)
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
