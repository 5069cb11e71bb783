// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Driver manager - owns one instance slot per driver and maps command
//! verbs onto the driver lifecycle

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

use super::{FakeBaro, InfoReport, MocapMag, SensorDriver};
use crate::config::Config;
use crate::core::Context;
use crate::error::{DriverError, DriverResult};

/// Builds a fresh, uninitialized driver
pub type DriverFactory = Box<dyn Fn(&Context) -> DriverResult<Box<dyn SensorDriver>> + Send>;

/// Lifecycle verbs accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Start,
    Stop,
    Info,
    Test,
}

impl FromStr for Verb {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Verb::Start),
            "stop" | "reset" => Ok(Verb::Stop),
            "info" | "status" => Ok(Verb::Info),
            "test" => Ok(Verb::Test),
            other => Err(DriverError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Start => "start",
            Verb::Stop => "stop",
            Verb::Info => "info",
            Verb::Test => "test",
        };
        f.write_str(s)
    }
}

/// Result of a `start` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Exit codes reported by [`DriverManager::execute`]
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_USAGE: i32 = -1;

struct DriverSlot {
    factory: DriverFactory,
    instance: Option<Box<dyn SensorDriver>>,
}

/// Owns every driver instance; all lifecycle changes go through `&mut self`
pub struct DriverManager {
    ctx: Context,
    slots: BTreeMap<String, DriverSlot>,
}

impl DriverManager {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            slots: BTreeMap::new(),
        }
    }

    /// Manager with the fake barometer and mocap magnetometer registered
    pub fn with_builtin_drivers(ctx: Context, config: &Config) -> Self {
        let mut manager = Self::new(ctx);

        let baro = config.barometer.clone();
        manager.register("fakebaro", move |ctx: &Context| {
            Ok(Box::new(FakeBaro::from_config(ctx.clone(), &baro)) as Box<dyn SensorDriver>)
        });

        let mag = config.magnetometer.clone();
        manager.register("mocap_mag", move |ctx: &Context| {
            Ok(Box::new(MocapMag::from_config(ctx.clone(), &mag)?) as Box<dyn SensorDriver>)
        });

        manager
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Context) -> DriverResult<Box<dyn SensorDriver>> + Send + 'static,
    {
        self.slots.insert(
            name.to_string(),
            DriverSlot {
                factory: Box::new(factory),
                instance: None,
            },
        );
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|slot| slot.instance.is_some())
            .unwrap_or(false)
    }

    fn slot_mut(&mut self, name: &str) -> DriverResult<&mut DriverSlot> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| DriverError::UnknownDriver(name.to_string()))
    }

    fn slot(&self, name: &str) -> DriverResult<&DriverSlot> {
        self.slots
            .get(name)
            .ok_or_else(|| DriverError::UnknownDriver(name.to_string()))
    }

    /// Construct and initialize `name` unless it is already running.
    pub fn start(&mut self, name: &str) -> DriverResult<StartOutcome> {
        let ctx = self.ctx.clone();
        let slot = self.slot_mut(name)?;
        if slot.instance.is_some() {
            info!("{}: already running", name);
            return Ok(StartOutcome::AlreadyRunning);
        }

        let mut driver = (slot.factory)(&ctx)?;
        // a failed init drops the partial driver, which releases what it acquired
        driver.init()?;
        slot.instance = Some(driver);
        Ok(StartOutcome::Started)
    }

    /// Stop and destroy `name`. Returns false if it was not running.
    pub fn stop(&mut self, name: &str) -> DriverResult<bool> {
        let slot = self.slot_mut(name)?;
        Ok(slot.instance.take().is_some())
    }

    /// Diagnostics for a running driver
    pub fn info(&self, name: &str) -> DriverResult<Option<InfoReport>> {
        Ok(self.slot(name)?.instance.as_ref().map(|driver| driver.info()))
    }

    pub fn test(&mut self, name: &str) -> DriverResult<()> {
        match self.slot_mut(name)?.instance.as_mut() {
            Some(driver) => driver.self_test(),
            None => Err(DriverError::NotImplemented("test")),
        }
    }

    /// Poll-style read from a running driver; 0 bytes when stopped or no new data
    pub fn read(&self, name: &str, buf: &mut [u8]) -> DriverResult<usize> {
        match self.slot(name)?.instance.as_ref() {
            Some(driver) => driver.read(buf),
            None => Ok(0),
        }
    }

    /// Stop every running driver
    pub fn shutdown(&mut self) {
        for (name, slot) in self.slots.iter_mut() {
            if slot.instance.take().is_some() {
                info!("{}: stopped at shutdown", name);
            }
        }
    }

    pub fn usage(&self) -> String {
        let names: Vec<&str> = self.drivers().collect();
        format!(
            "usage: <{}> <start|stop|reset|info|status|test>",
            names.join("|")
        )
    }

    /// Run one `<driver> <verb>` command and return its exit code
    pub fn execute(&mut self, args: &[&str]) -> i32 {
        let (name, verb) = match args {
            [name, verb] => (*name, *verb),
            _ => {
                warn!("missing command: {}", self.usage());
                return EXIT_USAGE;
            }
        };

        if !self.slots.contains_key(name) {
            error!("{}", DriverError::UnknownDriver(name.to_string()));
            warn!("{}", self.usage());
            return EXIT_USAGE;
        }

        let verb = match verb.parse::<Verb>() {
            Ok(verb) => verb,
            Err(e) => {
                error!("{}, try 'start', 'stop', 'reset', 'info' or 'test'", e);
                return EXIT_USAGE;
            }
        };

        match self.dispatch(name, verb) {
            Ok(()) => EXIT_OK,
            Err(e) if e.is_benign() => {
                warn!("{}", e);
                EXIT_OK
            }
            Err(e) => {
                error!("{} {} failed: {}", name, verb, e);
                EXIT_FAILED
            }
        }
    }

    fn dispatch(&mut self, name: &str, verb: Verb) -> DriverResult<()> {
        match verb {
            Verb::Start => {
                self.start(name)?;
            }
            Verb::Stop => {
                if !self.stop(name)? {
                    info!("{}: not running", name);
                }
            }
            Verb::Info => match self.info(name)? {
                Some(report) => info!("\n{}", report),
                None => info!("{}: not running", name),
            },
            Verb::Test => self.test(name)?,
        }
        Ok(())
    }
}

impl Drop for DriverManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{BaroSample, CycleState, MagSample, Sample, VehicleOdometry};
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn manager(config: &Config) -> DriverManager {
        let ctx = Context::new(config, Handle::current());
        DriverManager::with_builtin_drivers(ctx, config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_registers_once() {
        let config = Config::default();
        let mut manager = manager(&config);

        assert_eq!(manager.start("fakebaro").unwrap(), StartOutcome::Started);
        assert_eq!(manager.start("fakebaro").unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(manager.execute(&["fakebaro", "start"]), EXIT_OK);

        let ctx = manager.context().clone();
        assert_eq!(ctx.registry.class_instances("/dev/baro"), 1);
        assert_eq!(ctx.bus.advertised_instances::<BaroSample>(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_info_is_noop() {
        let config = Config::default();
        let mut manager = manager(&config);
        manager.start("fakebaro").unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(manager.info("fakebaro").unwrap().is_some());

        assert!(manager.stop("fakebaro").unwrap());
        for _ in 0..3 {
            assert!(manager.info("fakebaro").unwrap().is_none());
            assert!(!manager.stop("fakebaro").unwrap());
            assert_eq!(manager.execute(&["fakebaro", "info"]), EXIT_OK);
            assert_eq!(manager.execute(&["fakebaro", "reset"]), EXIT_OK);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.context().registry.class_instances("/dev/baro"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_baro_publishes_after_one_cycle() {
        let config = Config::default();
        let mut manager = manager(&config);
        let mut sub = manager.context().bus.subscribe::<BaroSample>(0).unwrap();
        manager.start("fakebaro").unwrap();

        let mut sample = BaroSample::default();
        assert!(sub.update(&mut sample));
        assert_eq!(sample.pressure, 1013.0);
        assert_eq!(sample.temperature, 25.0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sub.update(&mut sample));
        let expected = 1013.0 + 0.001 * (sample.timestamp & 0xff) as f32;
        assert!((sample.pressure - expected).abs() < 1e-4);
        assert_eq!(sample.temperature, 25.0);
        assert_eq!(sample.error_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mag_follows_published_pose() {
        let config = Config::default();
        let mut manager = manager(&config);
        let bus = manager.context().bus.clone();
        let mut sub = bus.subscribe::<MagSample>(0).unwrap();
        manager.start("mocap_mag").unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut sample = MagSample::default();
        assert!(sub.update(&mut sample));
        assert_eq!((sample.x, sample.y, sample.z), (0.5, 0.0, 0.0));

        let pose = bus
            .advertise(VehicleOdometry {
                timestamp: 1,
                q: [0.0, 0.0, 0.0, 1.0],
                ..Default::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(sub.update(&mut sample));
        assert!((sample.x + 0.5).abs() < 1e-6);
        assert!(sample.y.abs() < 1e-6);
        drop(pose);

        let info = manager.info("mocap_mag").unwrap().unwrap();
        assert_eq!(info.state, CycleState::Scheduled);
        assert_eq!(info.device_path.as_deref(), Some("/dev/mag0"));
    }

    #[tokio::test]
    async fn test_failed_start_leaves_slot_empty() {
        let mut config = Config::default();
        config.bus.max_instances = 0;
        let mut manager = manager(&config);

        assert!(matches!(
            manager.start("fakebaro"),
            Err(DriverError::AllocationFailure(_))
        ));
        assert!(!manager.is_running("fakebaro"));
        assert_eq!(manager.context().registry.class_instances("/dev/baro"), 0);
        assert_eq!(manager.execute(&["fakebaro", "start"]), EXIT_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_period_saturates() {
        let mut config = Config::default();
        config.barometer.period_us = u64::MAX;
        assert!(config.validate().is_err());

        let mut manager = manager(&config);
        assert_eq!(manager.start("fakebaro").unwrap(), StartOutcome::Started);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let info = manager.info("fakebaro").unwrap().unwrap();
        assert_eq!(info.state, CycleState::Scheduled);
        assert!(manager.stop("fakebaro").unwrap());
    }

    #[tokio::test]
    async fn test_command_parsing() {
        let config = Config::default();
        let mut manager = manager(&config);

        assert_eq!(manager.execute(&["fakebaro"]), EXIT_USAGE);
        assert_eq!(manager.execute(&["fakebaro", "calibrate"]), EXIT_USAGE);
        assert_eq!(manager.execute(&["nosuch", "start"]), EXIT_USAGE);
        assert_eq!(manager.execute(&["fakebaro", "test"]), EXIT_OK);
        assert_eq!("status".parse::<Verb>().unwrap(), Verb::Info);
        assert_eq!("reset".parse::<Verb>().unwrap(), Verb::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_verb_not_implemented() {
        let config = Config::default();
        let mut manager = manager(&config);
        manager.start("mocap_mag").unwrap();
        assert!(matches!(
            manager.test("mocap_mag"),
            Err(DriverError::NotImplemented(_))
        ));
        assert_eq!(manager.execute(&["mocap_mag", "test"]), EXIT_OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_requires_room_for_one_sample() {
        let config = Config::default();
        let mut manager = manager(&config);
        manager.start("fakebaro").unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut empty: [u8; 0] = [];
        assert!(matches!(
            manager.read("fakebaro", &mut empty),
            Err(DriverError::InsufficientBuffer { .. })
        ));
        let mut buf = vec![0u8; BaroSample::encoded_len()];
        assert_eq!(manager.read("fakebaro", &mut buf).unwrap(), 0);
    }
}
