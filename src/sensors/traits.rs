// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Sensor traits and common types

use std::fmt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::Topic;
use crate::error::{DriverError, DriverResult};

/// A timestamped reading with a byte-stable serialized layout
pub trait Sample: Topic + fmt::Debug + Default + Serialize + DeserializeOwned {
    /// Monotonic timestamp in microseconds
    fn timestamp(&self) -> u64;

    /// Encoded size of one sample in bytes
    fn encoded_len() -> usize {
        bincode::serialized_size(&Self::default()).unwrap_or(0) as usize
    }

    /// Encode into the fixed little-endian layout, fields in declaration order
    fn encode(&self) -> DriverResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a buffer produced by [`Sample::encode`]
    fn decode(bytes: &[u8]) -> DriverResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Produces the samples for one kind of synthetic sensor
pub trait SampleSource: Send + 'static {
    type Sample: Sample;

    /// Driver name used on the command line
    const NAME: &'static str;

    /// Placeholder published when the topic is advertised
    fn initial_sample(&self) -> Self::Sample;

    /// Manufacture the reading for time `now_us`
    fn produce(&mut self, now_us: u64) -> Self::Sample;
}

/// Pollable read side of a registered device node
pub trait CharDevice: Send + Sync {
    /// Copy the freshest sample into `buf`, returning bytes written (0 = no data)
    fn read(&self, buf: &mut [u8]) -> DriverResult<usize>;

    /// Bytes needed to hold one sample
    fn sample_size(&self) -> usize;
}

/// Bus a device is attached to, as packed into [`DeviceId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BusType {
    Unknown = 0,
    I2c = 1,
    Spi = 2,
    Uavcan = 3,
    Simulation = 4,
}

/// Packed 32-bit device identifier: bus type (3 bits), bus (5), address (8), devtype (8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub bus_type: u8,
    pub bus: u8,
    pub address: u8,
    pub devtype: u8,
}

impl DeviceId {
    pub fn simulated(devtype: u8) -> Self {
        Self {
            bus_type: BusType::Simulation as u8,
            bus: 0,
            address: 0,
            devtype,
        }
    }

    pub fn encode(&self) -> u32 {
        (self.bus_type as u32 & 0x07)
            | ((self.bus as u32 & 0x1f) << 3)
            | ((self.address as u32) << 8)
            | ((self.devtype as u32) << 16)
    }

    pub fn decode(id: u32) -> Self {
        Self {
            bus_type: (id & 0x07) as u8,
            bus: ((id >> 3) & 0x1f) as u8,
            address: (id >> 8) as u8,
            devtype: (id >> 16) as u8,
        }
    }
}

/// Cycle scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Stopped,
    Scheduled,
    Running,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Stopped => "stopped",
            CycleState::Scheduled => "scheduled",
            CycleState::Running => "running",
        };
        f.write_str(s)
    }
}

/// Occupancy summary of a history buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub capacity: usize,
    pub len: usize,
    pub pushed: u64,
    pub evicted: u64,
}

/// Diagnostics produced by the `info` verb
#[derive(Debug, Clone)]
pub struct InfoReport {
    pub driver: String,
    pub device_path: Option<String>,
    pub state: CycleState,
    pub period_us: u64,
    pub cycles: u64,
    pub history: HistoryStats,
    /// Newest buffered sample, formatted
    pub latest: Option<String>,
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} ({}), period {} us, {} cycles",
            self.driver,
            self.state,
            self.device_path.as_deref().unwrap_or("no device node"),
            self.period_us,
            self.cycles
        )?;
        writeln!(
            f,
            "report queue: {}/{} used, {} pushed, {} overwritten",
            self.history.len, self.history.capacity, self.history.pushed, self.history.evicted
        )?;
        match &self.latest {
            Some(sample) => write!(f, "latest: {}", sample),
            None => write!(f, "latest: none"),
        }
    }
}

/// Lifecycle and read capabilities shared by every driver
pub trait SensorDriver: Send {
    fn name(&self) -> &str;

    /// Allocate resources and start producing samples
    fn init(&mut self) -> DriverResult<()>;

    /// Poll-style read, see [`CharDevice::read`]
    fn read(&self, buf: &mut [u8]) -> DriverResult<usize>;

    fn info(&self) -> InfoReport;

    fn self_test(&mut self) -> DriverResult<()> {
        Err(DriverError::NotImplemented("test"))
    }
}
