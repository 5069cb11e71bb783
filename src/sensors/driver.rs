// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Generic synthetic driver: one sample source wired to history, device
//! node, bus publication and periodic cycle.

use std::sync::Arc;
use tracing::{info, warn};

use super::{
    CharDevice, CycleState, HistoryStats, InfoReport, PeriodicCycle, RingHistory, SampleEndpoint,
    SampleSource, SensorDriver,
};
use crate::core::Context;
use crate::error::{DriverError, DriverResult};

/// Per-driver settings resolved from configuration
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Device class base path, e.g. `/dev/baro`
    pub class_path: String,
    pub period_us: u64,
    pub history_depth: usize,
}

pub struct Driver<S: SampleSource> {
    ctx: Context,
    settings: DriverSettings,
    source: Option<S>,
    node_path: Option<String>,
    endpoint: Option<Arc<SampleEndpoint<S::Sample>>>,
    class_instance: Option<u32>,
    cycle: Option<PeriodicCycle<S>>,
}

impl<S: SampleSource> Driver<S> {
    pub fn new(ctx: Context, source: S, settings: DriverSettings) -> Self {
        Self {
            ctx,
            settings,
            source: Some(source),
            node_path: None,
            endpoint: None,
            class_instance: None,
            cycle: None,
        }
    }

    /// Primary device node, `/dev/<driver name>`
    pub fn node_path(&self) -> Option<&str> {
        self.node_path.as_deref()
    }

    /// Registered class node, once initialized
    pub fn device_path(&self) -> Option<String> {
        self.class_instance
            .map(|index| format!("{}{}", self.settings.class_path, index))
    }

    pub fn endpoint(&self) -> Option<&Arc<SampleEndpoint<S::Sample>>> {
        self.endpoint.as_ref()
    }

    pub fn cycle(&self) -> Option<&PeriodicCycle<S>> {
        self.cycle.as_ref()
    }
}

impl<S: SampleSource> SensorDriver for Driver<S> {
    fn name(&self) -> &str {
        S::NAME
    }

    fn init(&mut self) -> DriverResult<()> {
        let Some(source) = self.source.take() else {
            return Err(DriverError::AllocationFailure(format!(
                "{} was already initialized",
                S::NAME
            )));
        };

        let history = Arc::new(RingHistory::new(self.settings.history_depth)?);
        let endpoint = Arc::new(SampleEndpoint::new(history.clone()));
        self.endpoint = Some(endpoint.clone());

        let device: Arc<dyn CharDevice> = endpoint;
        let node_path = format!("/dev/{}", S::NAME);
        self.ctx.registry.register(&node_path, device.clone())?;
        self.node_path = Some(node_path);

        self.class_instance = Some(
            self.ctx
                .registry
                .register_class(&self.settings.class_path, device)?,
        );

        let publication = self
            .ctx
            .bus
            .advertise(source.initial_sample())
            .map_err(|e| {
                warn!("{}: failed to create publication", S::NAME);
                e
            })?;

        let period_ticks = self.ctx.queue.ticks_from_micros(self.settings.period_us);
        let cycle = PeriodicCycle::new(
            source,
            period_ticks,
            self.ctx.queue.clone(),
            self.ctx.clock.clone(),
            history,
            publication,
        );
        cycle.start();
        self.cycle = Some(cycle);

        info!(
            "{}: started on {} every {} us",
            S::NAME,
            self.device_path().unwrap_or_default(),
            self.settings.period_us
        );
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> DriverResult<usize> {
        match &self.endpoint {
            Some(endpoint) => endpoint.read(buf),
            None => Ok(0),
        }
    }

    fn info(&self) -> InfoReport {
        let (state, cycles, history, latest) = match &self.cycle {
            Some(cycle) => (
                cycle.state(),
                cycle.cycles(),
                cycle.history().stats(),
                cycle.history().peek_newest().map(|s| format!("{:?}", s)),
            ),
            None => (CycleState::Stopped, 0, HistoryStats::default(), None),
        };

        InfoReport {
            driver: S::NAME.to_string(),
            device_path: self.device_path(),
            state,
            period_us: self.settings.period_us,
            cycles,
            history,
            latest,
        }
    }
}

impl<S: SampleSource> Drop for Driver<S> {
    fn drop(&mut self) {
        // no execution may outlive the history and publication it writes to
        if let Some(cycle) = self.cycle.take() {
            cycle.stop();
            drop(cycle);
        }

        if let Some(index) = self.class_instance.take() {
            self.ctx
                .registry
                .unregister_class(&self.settings.class_path, index);
        }
        if let Some(path) = self.node_path.take() {
            self.ctx.registry.unregister(&path);
        }

        if self.endpoint.take().is_some() {
            info!("{}: torn down", S::NAME);
        }
    }
}
