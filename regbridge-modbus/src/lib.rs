//! Modbus register bridge.
//!
//! Polls one Modbus device (TCP or RTU/serial) on a fixed tick, decodes its
//! holding registers through a channel catalog and publishes the values to
//! Zenoh as telemetry.
//!
//! # Key Expressions
//!
//! ```text
//! regbridge/modbus/<device>/<group>/<channel>
//! ```
//!
//! Where:
//! - `<device>` - Device name from configuration
//! - `<group>` - Channel group, `datalogger` by default
//! - `<channel>` - Channel name, e.g. `Temp(200)` or `Sp_Cond(224)`
//!
//! # Dispatch
//!
//! Every tick publishes all channels (or only every `full_push_interval_mins`
//! with the `interval` policy). When the level channel changes it is
//! published once more after the batch.

pub mod catalog;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod poller;
pub mod sink;
pub mod transport;

pub use catalog::{Catalog, CatalogError, Channel, ReadBlock};
pub use config::{ConfigError, ConnectionConfig, DeviceConfig, ModbusBridgeConfig, ModbusConfig};
pub use decoder::{DecodedValue, Encoding, WordOrder, decode, encode, encode_pair};
pub use engine::{
    DispatchEngine, EngineSettings, EngineState, FullPushPolicy, Reading, TickError, TickReport,
};
pub use poller::ModbusPoller;
pub use sink::{Measurement, MeasurementSink};
pub use transport::{ModbusTransport, RegisterReader, TransportError};
