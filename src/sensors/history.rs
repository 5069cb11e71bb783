// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Fixed-capacity report history for polling readers
//!
//! One cycle writes, any number of readers flush and get. Every operation
//! takes the internal lock on its own, so a cycle may land between a
//! reader's `flush` and `get`.

use std::collections::VecDeque;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::HistoryStats;
use crate::error::{DriverError, DriverResult};

struct Ring<T> {
    items: VecDeque<T>,
    pushed: u64,
    evicted: u64,
}

/// Overwrite-oldest circular buffer
pub struct RingHistory<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
    pushed: Notify,
}

impl<T: Clone> RingHistory<T> {
    pub fn new(capacity: usize) -> DriverResult<Self> {
        if capacity == 0 {
            return Err(DriverError::AllocationFailure(
                "report history needs room for at least one sample".to_string(),
            ));
        }
        Ok(Self {
            ring: Mutex::new(Ring {
                items: VecDeque::with_capacity(capacity),
                pushed: 0,
                evicted: 0,
            }),
            capacity,
            pushed: Notify::new(),
        })
    }

    /// Insert `item`, evicting the oldest entry when full. Returns true if one was evicted.
    pub fn push(&self, item: T) -> bool {
        let evicted = {
            let mut ring = self.ring.lock();
            let evicted = if ring.items.len() == self.capacity {
                ring.items.pop_front();
                ring.evicted += 1;
                true
            } else {
                false
            };
            ring.items.push_back(item);
            ring.pushed += 1;
            evicted
        };
        self.pushed.notify_waiters();
        evicted
    }

    /// Remove and return the oldest entry
    pub fn get(&self) -> Option<T> {
        self.ring.lock().items.pop_front()
    }

    /// Remove and return the newest entry, dropping the older ones
    pub fn take_newest(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        let newest = ring.items.pop_back();
        ring.items.clear();
        newest
    }

    pub fn flush(&self) {
        self.ring.lock().items.clear();
    }

    pub fn peek_newest(&self) -> Option<T> {
        self.ring.lock().items.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> HistoryStats {
        let ring = self.ring.lock();
        HistoryStats {
            capacity: self.capacity,
            len: ring.items.len(),
            pushed: ring.pushed,
            evicted: ring.evicted,
        }
    }

    /// Flush, then wait for the next push and take the newest entry
    pub async fn next_after_flush(&self) -> Option<T> {
        let notified = self.pushed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        self.flush();
        notified.await;
        self.take_newest()
    }
}
