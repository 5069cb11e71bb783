// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fakesense

//! Read side of a driver's report history

use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

use super::{CharDevice, RingHistory, Sample};
use crate::error::{DriverError, DriverResult};

/// Serves the freshest sample to polling readers
pub struct SampleEndpoint<S> {
    history: Arc<RingHistory<S>>,
    _sample: PhantomData<fn() -> S>,
}

impl<S: Sample> SampleEndpoint<S> {
    pub fn new(history: Arc<RingHistory<S>>) -> Self {
        Self {
            history,
            _sample: PhantomData,
        }
    }

    /// Read for a caller buffer of `capacity` bytes.
    ///
    /// Stale entries are flushed first, so `Ok(None)` means no cycle has
    /// completed since the call started.
    pub fn read_sample(&self, capacity: usize) -> DriverResult<Option<S>> {
        let required = S::encoded_len();
        if capacity < required {
            return Err(DriverError::InsufficientBuffer { capacity, required });
        }
        self.history.flush();
        Ok(self.history.get())
    }

    /// Flush, then wait for the next cycle and return the newest sample.
    pub async fn next_sample(&self) -> Option<S> {
        self.history.next_after_flush().await
    }
}

impl<S: Sample> CharDevice for SampleEndpoint<S> {
    fn read(&self, buf: &mut [u8]) -> DriverResult<usize> {
        match self.read_sample(buf.len())? {
            Some(sample) => {
                let bytes = sample.encode()?;
                buf[..bytes.len()].copy_from_slice(&bytes);
                trace!("{}: read {} bytes", S::NAME, bytes.len());
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }

    fn sample_size(&self) -> usize {
        S::encoded_len()
    }
}
