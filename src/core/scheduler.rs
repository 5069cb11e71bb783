// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Shared work queue running delayed one-shot work items

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Armed work item. Dropping it leaves the work armed; use [`WorkQueue::cancel`].
#[derive(Debug)]
pub struct WorkHandle {
    task: JoinHandle<()>,
}

/// Low-latency queue shared by every driver instance
pub struct WorkQueue {
    name: String,
    runtime: Handle,
    tick: Duration,
}

impl WorkQueue {
    pub fn new(name: &str, runtime: Handle, tick_us: u64) -> Self {
        let tick_us = tick_us.max(1);
        debug!("Work queue '{}' created, tick {} us", name, tick_us);
        Self {
            name: name.to_string(),
            runtime,
            tick: Duration::from_micros(tick_us),
        }
    }

    /// Convert a microsecond interval to whole ticks, rounding up.
    pub fn ticks_from_micros(&self, us: u64) -> u32 {
        let tick_us = self.tick.as_micros() as u64;
        u32::try_from(us.div_ceil(tick_us)).unwrap_or(u32::MAX)
    }

    /// Run `work` once after `delay_ticks` ticks.
    pub fn schedule<F>(&self, delay_ticks: u32, work: F) -> WorkHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.tick.checked_mul(delay_ticks).unwrap_or(Duration::MAX);
        trace!("{}: arming work in {:?}", self.name, delay);
        let task = self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            work();
        });
        WorkHandle { task }
    }

    /// Cancel armed work. A no-op if it already ran.
    pub fn cancel(&self, handle: WorkHandle) {
        if !handle.task.is_finished() {
            trace!("{}: cancelling armed work", self.name);
        }
        handle.task.abort();
    }
}
