// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Self-rescheduling sample cycle
//!
//! Each execution produces one sample, stores it in the history, publishes
//! it and, while the running flag holds, arms the next execution one period
//! later on the shared work queue. The cycle body and `stop` serialize on
//! the same lock, and every arm carries an epoch so a stale execution that
//! already fired when `stop` cancelled it does nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{CycleState, RingHistory, SampleSource};
use crate::core::{Clock, Publication, WorkHandle, WorkQueue};

struct CycleCore<S> {
    state: CycleState,
    source: S,
    pending: Option<WorkHandle>,
    epoch: u64,
}

struct CycleInner<S: SampleSource> {
    name: &'static str,
    running: AtomicBool,
    cycles: AtomicU64,
    period_ticks: u32,
    queue: Arc<WorkQueue>,
    clock: Arc<dyn Clock>,
    history: Arc<RingHistory<S::Sample>>,
    publication: Publication<S::Sample>,
    core: Mutex<CycleCore<S>>,
}

/// Periodic producer owning a sample source and its publication
pub struct PeriodicCycle<S: SampleSource> {
    inner: Arc<CycleInner<S>>,
}

impl<S: SampleSource> PeriodicCycle<S> {
    pub fn new(
        source: S,
        period_ticks: u32,
        queue: Arc<WorkQueue>,
        clock: Arc<dyn Clock>,
        history: Arc<RingHistory<S::Sample>>,
        publication: Publication<S::Sample>,
    ) -> Self {
        Self {
            inner: Arc::new(CycleInner {
                name: S::NAME,
                running: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                period_ticks,
                queue,
                clock,
                history,
                publication,
                core: Mutex::new(CycleCore {
                    state: CycleState::Stopped,
                    source,
                    pending: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Start cycling; the first execution runs one tick from now.
    pub fn start(&self) {
        self.inner.running.store(true, Ordering::SeqCst);
        self.inner.history.flush();

        let mut core = self.inner.core.lock();
        if let Some(armed) = core.pending.take() {
            self.inner.queue.cancel(armed);
        }
        CycleInner::arm(&self.inner, &mut core, 1);
        debug!("{}: cycle started, period {} ticks", self.inner.name, self.inner.period_ticks);
    }

    /// Stop cycling. Safe when nothing is armed; once it returns no execution runs.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);

        let mut core = self.inner.core.lock();
        if let Some(armed) = core.pending.take() {
            self.inner.queue.cancel(armed);
        }
        core.epoch += 1;
        if core.state != CycleState::Stopped {
            debug!("{}: cycle stopped", self.inner.name);
        }
        core.state = CycleState::Stopped;
    }

    pub fn state(&self) -> CycleState {
        self.inner.core.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Completed cycle executions
    pub fn cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::Relaxed)
    }

    pub fn period_ticks(&self) -> u32 {
        self.inner.period_ticks
    }

    pub fn history(&self) -> &Arc<RingHistory<S::Sample>> {
        &self.inner.history
    }

    pub fn publication_instance(&self) -> u8 {
        self.inner.publication.instance()
    }
}

impl<S: SampleSource> Drop for PeriodicCycle<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: SampleSource> CycleInner<S> {
    fn arm(this: &Arc<Self>, core: &mut CycleCore<S>, delay_ticks: u32) {
        core.epoch += 1;
        let epoch = core.epoch;
        let weak: Weak<Self> = Arc::downgrade(this);
        core.pending = Some(this.queue.schedule(delay_ticks, move || {
            if let Some(inner) = weak.upgrade() {
                inner.execute(epoch);
            }
        }));
        core.state = CycleState::Scheduled;
    }

    fn execute(self: Arc<Self>, epoch: u64) {
        let mut core = self.core.lock();
        if core.epoch != epoch {
            trace!("{}: discarding stale cycle", self.name);
            return;
        }
        core.pending = None;
        if !self.running.load(Ordering::SeqCst) {
            core.state = CycleState::Stopped;
            return;
        }

        core.state = CycleState::Running;
        let now = self.clock.now_us();
        let sample = core.source.produce(now);
        self.history.push(sample.clone());
        self.publication.publish(sample);
        self.cycles.fetch_add(1, Ordering::Relaxed);

        if self.running.load(Ordering::SeqCst) {
            Self::arm(&self, &mut core, self.period_ticks);
        } else {
            core.state = CycleState::Stopped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bus, MonotonicClock, Subscription, Topic};
    use crate::sensors::Sample;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tokio::runtime::Handle;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Tick {
        timestamp: u64,
        seq: u32,
    }

    impl Topic for Tick {
        const NAME: &'static str = "tick";
    }

    impl Sample for Tick {
        fn timestamp(&self) -> u64 {
            self.timestamp
        }
    }

    struct Counter {
        seq: u32,
    }

    impl SampleSource for Counter {
        type Sample = Tick;
        const NAME: &'static str = "counter";

        fn initial_sample(&self) -> Tick {
            Tick::default()
        }

        fn produce(&mut self, now_us: u64) -> Tick {
            self.seq += 1;
            Tick { timestamp: now_us, seq: self.seq }
        }
    }

    fn cycle(bus: &Bus, period_ms: u32) -> PeriodicCycle<Counter> {
        let queue = Arc::new(WorkQueue::new("test", Handle::current(), 1_000));
        let history = Arc::new(RingHistory::new(2).unwrap());
        let publication = bus.advertise(Tick::default()).unwrap();
        PeriodicCycle::new(
            Counter { seq: 0 },
            period_ms,
            queue,
            Arc::new(MonotonicClock::new()),
            history,
            publication,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_rearms_every_period() {
        let bus = Bus::new(1);
        let cycle = cycle(&bus, 10);
        assert_eq!(cycle.state(), CycleState::Stopped);

        cycle.start();
        assert_eq!(cycle.state(), CycleState::Scheduled);

        tokio::time::sleep(Duration::from_millis(55)).await;
        let cycles = cycle.cycles();
        assert!((5..=6).contains(&cycles), "ran {} cycles", cycles);
        assert_eq!(cycle.state(), CycleState::Scheduled);
        assert_eq!(cycle.history().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamps_non_decreasing() {
        let bus = Bus::new(1);
        let mut sub: Subscription<Tick> = bus.subscribe(0).unwrap();
        let cycle = cycle(&bus, 5);
        cycle.start();

        let mut last = Tick::default();
        let mut seen = 0;
        let mut sample = Tick::default();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if sub.update(&mut sample) {
                assert!(sample.timestamp >= last.timestamp);
                assert!(sample.seq >= last.seq);
                last = sample.clone();
                seen += 1;
            }
        }
        assert!(seen > 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_stays_stopped() {
        let bus = Bus::new(1);
        let cycle = cycle(&bus, 10);
        cycle.start();
        tokio::time::sleep(Duration::from_millis(25)).await;

        cycle.stop();
        assert_eq!(cycle.state(), CycleState::Stopped);
        cycle.stop();
        assert_eq!(cycle.state(), CycleState::Stopped);
        assert!(!cycle.is_running());

        let after_stop = cycle.cycles();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cycle.cycles(), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let bus = Bus::new(1);
        let cycle = cycle(&bus, 10);
        cycle.start();
        cycle.stop();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cycle.cycles(), 0);
        assert!(cycle.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_double_arm() {
        let bus = Bus::new(1);
        let cycle = cycle(&bus, 10);
        cycle.start();
        cycle.start();
        cycle.stop();
        cycle.start();

        tokio::time::sleep(Duration::from_millis(55)).await;
        let cycles = cycle.cycles();
        assert!((5..=6).contains(&cycles), "ran {} cycles", cycles);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unadvertises() {
        let bus = Bus::new(1);
        let cycle = cycle(&bus, 10);
        cycle.start();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(bus.advertised_instances::<Tick>(), 1);
        let sub = bus.subscribe::<Tick>(cycle.publication_instance()).unwrap();
        assert!(sub.advertised());

        drop(cycle);
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(bus.advertised_instances::<Tick>(), 0);
        assert!(!sub.advertised());
    }
}
