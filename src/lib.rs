// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! FakeSense - synthetic periodic sensor sources
//!
//! Fake sensor drivers that manufacture plausible readings on a fixed
//! period and hand them out two ways:
//! - published on an in-process publish/subscribe bus
//! - buffered in a small report history served to polling readers
//!
//! Shipped drivers:
//! - `fakebaro`: constant pressure with a timestamp-derived wobble, 20 Hz
//! - `mocap_mag`: earth field rotated into the body frame using the
//!   motion-capture attitude, 100 Hz
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     DriverManager                        │
//! │            start / stop / info / test verbs              │
//! ├──────────────────────────────────────────────────────────┤
//! │  Driver<S> ──► PeriodicCycle ──► SampleSource::produce   │
//! │                     │                                    │
//! │                     ├──► RingHistory ◄── SampleEndpoint  │
//! │                     └──► Bus publication                 │
//! ├──────────────────────────────────────────────────────────┤
//! │   WorkQueue     │   Bus     │  DeviceRegistry  │  Clock  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod sensors;

// Re-exports for convenience
pub use crate::config::Config;
pub use crate::core::{Bus, Context, DeviceRegistry, WorkQueue};
pub use crate::error::{DriverError, DriverResult};
pub use crate::sensors::{DriverManager, FakeBaro, MocapMag, SensorDriver};

/// FakeSense version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FakeSense name
pub const NAME: &str = "FakeSense";
