//! Measurement emission.

use std::future::Future;

use chrono::{DateTime, Utc};

use regbridge_framework::{BridgeError, Publisher, TelemetryPoint, TelemetryValue};

use crate::decoder::Encoding;

/// One channel value ready to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Device the value was read from.
    pub source: String,
    /// Channel group, e.g. `datalogger`.
    pub group: String,
    /// Channel name, e.g. `Temp(200)`.
    pub name: String,
    pub value: TelemetryValue,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    /// Starting register of the channel.
    pub address: u16,
    pub encoding: Encoding,
}

impl Measurement {
    /// Convert to the wire representation.
    pub fn to_point(&self) -> TelemetryPoint {
        TelemetryPoint::new(&self.source, &self.group, &self.name, self.value)
            .with_timestamp(self.timestamp.timestamp_millis())
            .with_unit(&self.unit)
            .with_label("address", self.address.to_string())
            .with_label("encoding", self.encoding.as_str())
    }
}

/// Destination for measurements.
pub trait MeasurementSink {
    /// Publish a single measurement.
    fn publish(
        &self,
        measurement: &Measurement,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl MeasurementSink for Publisher {
    async fn publish(&self, measurement: &Measurement) -> Result<(), BridgeError> {
        Publisher::publish(self, &measurement.to_point()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_measurement_to_point() {
        let measurement = Measurement {
            source: "fx30".to_string(),
            group: "datalogger".to_string(),
            name: "Sp Cond(224)".to_string(),
            value: TelemetryValue::Float(512.25),
            unit: "uS/cm".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            address: 223,
            encoding: Encoding::Float32,
        };

        let point = measurement.to_point();
        assert_eq!(point.source, "fx30");
        assert_eq!(point.group, "datalogger");
        assert_eq!(point.metric, "Sp Cond(224)");
        assert_eq!(point.unit, "uS/cm");
        assert_eq!(point.value, TelemetryValue::Float(512.25));
        assert_eq!(point.timestamp, 1_709_294_400_000);
        assert_eq!(point.labels.get("address").map(String::as_str), Some("223"));
        assert_eq!(point.labels.get("encoding").map(String::as_str), Some("float32"));
    }
}
