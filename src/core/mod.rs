//! Core services shared by all drivers - bus, registry, work queue, clock

mod bus;
mod clock;
mod registry;
mod scheduler;

pub use bus::{Bus, Publication, Subscription, Topic};
pub use clock::{Clock, MonotonicClock};
pub use registry::DeviceRegistry;
pub use scheduler::{WorkHandle, WorkQueue};

use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::Config;

/// Handles to the services a driver needs during its lifetime
#[derive(Clone)]
pub struct Context {
    pub bus: Arc<Bus>,
    pub registry: Arc<DeviceRegistry>,
    pub queue: Arc<WorkQueue>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    /// Build the shared services from configuration, running work on `runtime`
    pub fn new(config: &Config, runtime: Handle) -> Self {
        Self {
            bus: Arc::new(Bus::new(config.bus.max_instances)),
            registry: Arc::new(DeviceRegistry::new(config.registry.max_class_instances)),
            queue: Arc::new(WorkQueue::new(
                &config.scheduler.queue_name,
                runtime,
                config.scheduler.tick_us,
            )),
            clock: Arc::new(MonotonicClock::new()),
        }
    }
}
