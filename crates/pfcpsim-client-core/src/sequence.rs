use std::collections::HashSet;

use parking_lot::Mutex;
use pfcpsim_shared::MAX_SEQUENCE_NUMBER;
use thiserror::Error;

const SEQUENCE_SPACE: usize = MAX_SEQUENCE_NUMBER as usize + 1;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No free sequence number ({in_flight} in flight)")]
pub struct SequenceExhausted {
    pub in_flight: usize,
}

#[derive(Debug)]
struct Inner {
    next: u32,
    in_flight: HashSet<u32>,
    max_in_flight: usize,
}

/// 24-bit wrapping sequence numbers that are never handed out twice while in flight
#[derive(Debug)]
pub struct SequenceAllocator {
    inner: Mutex<Inner>,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: first & MAX_SEQUENCE_NUMBER,
                in_flight: HashSet::new(),
                max_in_flight: SEQUENCE_SPACE,
            }),
        }
    }

    /// Cap the number of outstanding sequence numbers
    pub fn with_max_in_flight(self, max_in_flight: usize) -> Self {
        self.inner.lock().max_in_flight = max_in_flight.clamp(1, SEQUENCE_SPACE);
        self
    }

    /// Next free sequence number, marked in flight until [`release`](Self::release)
    pub fn next(&self) -> Result<u32, SequenceExhausted> {
        let mut inner = self.inner.lock();
        if inner.in_flight.len() >= inner.max_in_flight {
            return Err(SequenceExhausted {
                in_flight: inner.in_flight.len(),
            });
        }

        // Terminates: fewer than SEQUENCE_SPACE values are taken
        loop {
            let candidate = inner.next;
            inner.next = if candidate == MAX_SEQUENCE_NUMBER {
                0
            } else {
                candidate + 1
            };
            if inner.in_flight.insert(candidate) {
                return Ok(candidate);
            }
        }
    }

    pub fn release(&self, sequence: u32) -> bool {
        self.inner.lock().in_flight.remove(&sequence)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    pub fn is_in_flight(&self, sequence: u32) -> bool {
        self.inner.lock().in_flight.contains(&sequence)
    }
}
