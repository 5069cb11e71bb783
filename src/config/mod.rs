// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest accepted scheduler tick, one second
pub const MAX_TICK_US: u64 = 1_000_000;

/// Longest accepted sampling period, one minute
pub const MAX_PERIOD_US: u64 = 60_000_000;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Commands executed at boot, e.g. "fakebaro start"
    pub autostart: Vec<String>,

    /// Work queue configuration
    pub scheduler: SchedulerConfig,

    /// Bus configuration
    pub bus: BusConfig,

    /// Device registry configuration
    pub registry: RegistryConfig,

    /// Fake barometer
    pub barometer: BarometerConfig,

    /// Mocap magnetometer
    pub magnetometer: MagnetometerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            autostart: vec![],
            scheduler: SchedulerConfig::default(),
            bus: BusConfig::default(),
            registry: RegistryConfig::default(),
            barometer: BarometerConfig::default(),
            magnetometer: MagnetometerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the drivers cannot run with
    pub fn validate(&self) -> Result<()> {
        check_range("scheduler.tick_us", self.scheduler.tick_us, MAX_TICK_US)?;
        check_range("barometer.period_us", self.barometer.period_us, MAX_PERIOD_US)?;
        check_range("magnetometer.period_us", self.magnetometer.period_us, MAX_PERIOD_US)?;
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("fakesense"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

fn check_range(key: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 {
        bail!("{} must be non-zero", key);
    }
    if value > max {
        bail!("{} = {} exceeds the limit of {}", key, value, max);
    }
    Ok(())
}

/// Work queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Queue name used in logs
    pub queue_name: String,

    /// Length of one scheduler tick in microseconds
    pub tick_us: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_name: "hp_default".to_string(),
            tick_us: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Publishers allowed per topic
    pub max_instances: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { max_instances: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Numbered nodes allowed per device class
    pub max_class_instances: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_class_instances: 4 }
    }
}

/// Fake barometer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarometerConfig {
    /// Cycle period in microseconds
    pub period_us: u64,

    /// Samples kept for polling readers
    pub history_depth: usize,

    /// Pressure baseline in hPa
    pub base_pressure: f32,

    /// Reported temperature in °C
    pub temperature: f32,

    /// Device class base path
    pub class_path: String,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            period_us: 50_000,
            history_depth: 2,
            base_pressure: 1013.0,
            temperature: 25.0,
            class_path: "/dev/baro".to_string(),
        }
    }
}

/// Mocap magnetometer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetometerConfig {
    /// Cycle period in microseconds
    pub period_us: u64,

    /// Samples kept for polling readers
    pub history_depth: usize,

    /// Earth field in the world frame, gauss
    pub reference_field: [f32; 3],

    /// Instance of the odometry topic to follow
    pub pose_instance: u8,

    /// Device class base path
    pub class_path: String,
}

impl Default for MagnetometerConfig {
    fn default() -> Self {
        Self {
            period_us: 10_000,
            history_depth: 2,
            reference_field: [0.5, 0.0, 0.0],
            pose_instance: 0,
            class_path: "/dev/mag".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [barometer]
            period_us = 20000
            "#,
        )
        .unwrap();
        assert_eq!(config.barometer.period_us, 20_000);
        assert_eq!(config.barometer.history_depth, 2);
        assert_eq!(config.magnetometer.period_us, 10_000);
        assert_eq!(config.scheduler.tick_us, 1_000);
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut config = Config::default();
        config.magnetometer.period_us = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = Config::default();
        config.barometer.period_us = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scheduler.tick_us = MAX_TICK_US + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.magnetometer.period_us = MAX_PERIOD_US;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("fakesense-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_file(&path);

        let created = Config::load_or_create(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(created.barometer.class_path, loaded.barometer.class_path);
        assert_eq!(loaded.magnetometer.reference_field, [0.5, 0.0, 0.0]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
