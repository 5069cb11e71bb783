// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Fake barometer - constant pressure with a small time-derived wobble

use serde::{Deserialize, Serialize};

use super::{Driver, DriverSettings, Sample, SampleSource};
use crate::config::BarometerConfig;
use crate::core::{Context, Topic};

/// Barometer report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaroSample {
    pub timestamp: u64,
    pub device_id: u32,
    /// hPa
    pub pressure: f32,
    /// °C
    pub temperature: f32,
    pub error_count: u64,
}

impl Topic for BaroSample {
    const NAME: &'static str = "sensor_baro";
}

impl Sample for BaroSample {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Reading at time `now_us`: the low byte of the timestamp adds up to 0.255 hPa.
pub fn barometer_sample(now_us: u64, base_pressure: f32, temperature: f32) -> BaroSample {
    let wobble = 1e-3 * (now_us & 0xff) as f64;
    BaroSample {
        timestamp: now_us,
        device_id: 0,
        pressure: (base_pressure as f64 + wobble) as f32,
        temperature,
        error_count: 0,
    }
}

pub struct BaroSource {
    base_pressure: f32,
    temperature: f32,
}

impl BaroSource {
    pub fn new(base_pressure: f32, temperature: f32) -> Self {
        Self {
            base_pressure,
            temperature,
        }
    }
}

impl SampleSource for BaroSource {
    type Sample = BaroSample;
    const NAME: &'static str = "fakebaro";

    fn initial_sample(&self) -> BaroSample {
        BaroSample {
            pressure: self.base_pressure,
            temperature: self.temperature,
            ..Default::default()
        }
    }

    fn produce(&mut self, now_us: u64) -> BaroSample {
        barometer_sample(now_us, self.base_pressure, self.temperature)
    }
}

pub type FakeBaro = Driver<BaroSource>;

impl FakeBaro {
    pub fn from_config(ctx: Context, config: &BarometerConfig) -> Self {
        Driver::new(
            ctx,
            BaroSource::new(config.base_pressure, config.temperature),
            DriverSettings {
                class_path: config.class_path.clone(),
                period_us: config.period_us,
                history_depth: config.history_depth,
            },
        )
    }
}
