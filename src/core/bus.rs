// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Publish/subscribe bus with latest-value topics

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{DriverError, DriverResult};

/// A message type carried on the bus
pub trait Topic: Clone + Send + Sync + 'static {
    /// Topic name shared by all instances
    const NAME: &'static str;
}

/// One topic instance: a watch channel holding the latest value
struct TopicSlot<T> {
    tx: watch::Sender<Option<T>>,
    advertised: AtomicBool,
}

impl<T: Topic> TopicSlot<T> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            advertised: AtomicBool::new(false),
        }
    }

    fn store(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    fn is_advertised(&self) -> bool {
        self.advertised.load(Ordering::Acquire)
    }
}

type SlotKey = (&'static str, u8);

/// Central bus shared by every driver
pub struct Bus {
    slots: RwLock<HashMap<SlotKey, Arc<dyn Any + Send + Sync>>>,
    max_instances: u8,
}

impl Bus {
    pub fn new(max_instances: u8) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_instances,
        }
    }

    fn slot<T: Topic>(&self, instance: u8) -> DriverResult<Arc<TopicSlot<T>>> {
        let key = (T::NAME, instance);
        let any = {
            let mut slots = self.slots.write();
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(TopicSlot::<T>::new()) as Arc<dyn Any + Send + Sync>)
                .clone()
        };
        any.downcast::<TopicSlot<T>>().map_err(|_| {
            DriverError::AllocationFailure(format!("topic '{}' registered with another type", T::NAME))
        })
    }

    /// Claim the first free instance of `T` and publish `initial` on it.
    pub fn advertise<T: Topic>(&self, initial: T) -> DriverResult<Publication<T>> {
        for instance in 0..self.max_instances {
            let slot = self.slot::<T>(instance)?;
            if slot
                .advertised
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }
            slot.store(initial);
            info!("Advertised {} instance {}", T::NAME, instance);
            return Ok(Publication { slot, instance });
        }

        Err(DriverError::AllocationFailure(format!(
            "no free instance of topic '{}' ({} in use)",
            T::NAME,
            self.max_instances
        )))
    }

    /// Subscribe to one instance of `T`, whether or not it is advertised yet.
    ///
    /// A value already on the topic counts as new for the first `update`.
    pub fn subscribe<T: Topic>(&self, instance: u8) -> DriverResult<Subscription<T>> {
        let slot = self.slot::<T>(instance)?;
        let mut rx = slot.tx.subscribe();
        if rx.borrow().is_some() {
            rx.mark_changed();
        }
        debug!("Subscribed to {} instance {}", T::NAME, instance);
        Ok(Subscription { slot, rx })
    }

    /// Number of currently advertised instances of `T`
    pub fn advertised_instances<T: Topic>(&self) -> usize {
        (0..self.max_instances)
            .filter_map(|i| self.slot::<T>(i).ok())
            .filter(|slot| slot.is_advertised())
            .count()
    }
}

/// Publisher side of an advertised topic instance. Unadvertises on drop.
pub struct Publication<T: Topic> {
    slot: Arc<TopicSlot<T>>,
    instance: u8,
}

impl<T: Topic> Publication<T> {
    pub fn publish(&self, value: T) {
        self.slot.store(value);
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    pub fn unadvertise(self) {}
}

impl<T: Topic> Drop for Publication<T> {
    fn drop(&mut self) {
        self.slot.advertised.store(false, Ordering::Release);
        info!("Unadvertised {} instance {}", T::NAME, self.instance);
    }
}

impl<T: Topic> fmt::Debug for Publication<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publication")
            .field("topic", &T::NAME)
            .field("instance", &self.instance)
            .finish()
    }
}

/// Read-only view of the most recent value on a topic instance
pub struct Subscription<T: Topic> {
    slot: Arc<TopicSlot<T>>,
    rx: watch::Receiver<Option<T>>,
}

impl<T: Topic> Subscription<T> {
    /// Copy the latest value into `out` if it changed since the last call.
    ///
    /// Returns false and leaves `out` untouched when nothing new arrived.
    pub fn update(&mut self, out: &mut T) -> bool {
        // the slot owns the sender, so the channel never closes under us
        if !self.rx.has_changed().unwrap_or(false) {
            return false;
        }
        match &*self.rx.borrow_and_update() {
            Some(value) => {
                *out = value.clone();
                true
            }
            None => false,
        }
    }

    /// Whether a publisher currently holds this instance
    pub fn advertised(&self) -> bool {
        self.slot.is_advertised()
    }
}
