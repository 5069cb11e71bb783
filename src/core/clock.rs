// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Monotonic microsecond time source for sample timestamps

use tokio::time::Instant;

/// Absolute time in microseconds since an arbitrary origin
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Clock backed by `tokio::time::Instant`, so paused test runtimes control it
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}
