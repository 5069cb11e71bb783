//! Sensor module - synthetic periodic sensor sources

mod traits;
mod history;
mod cycle;
mod endpoint;
mod driver;
mod barometer;
mod magnetic;
mod manager;

pub use traits::{
    BusType, CharDevice, CycleState, DeviceId, HistoryStats, InfoReport, Sample, SampleSource,
    SensorDriver,
};
pub use history::RingHistory;
pub use cycle::PeriodicCycle;
pub use endpoint::SampleEndpoint;
pub use driver::{Driver, DriverSettings};
pub use barometer::{barometer_sample, BaroSample, BaroSource, FakeBaro};
pub use magnetic::{
    field_in_body_frame, MagSample, MocapMag, MocapMagSource, VehicleOdometry, DEVTYPE_MAGSIM,
};
pub use manager::{DriverFactory, DriverManager, StartOutcome, Verb, EXIT_FAILED, EXIT_OK, EXIT_USAGE};
