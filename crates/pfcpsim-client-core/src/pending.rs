use std::time::{Duration, Instant};

use bytes::Bytes;
use pfcpsim_core::MessageType;
use serde::{Deserialize, Serialize};

/// How the wait between retransmissions evolves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Exponential { factor: f64, max_interval: Duration },
}

/// Retransmission discipline for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retransmissions after the first send
    pub max_retries: u32,
    pub interval: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(3))
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(
        max_retries: u32,
        interval: Duration,
        factor: f64,
        max_interval: Duration,
    ) -> Self {
        Self {
            max_retries,
            interval,
            backoff: Backoff::Exponential {
                factor,
                max_interval,
            },
        }
    }

    /// Total number of transmissions
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after transmission number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let scaled = self.interval.as_nanos() as f64 * factor.max(1.0).powi(attempt as i32);
                if !scaled.is_finite() || scaled >= max_interval.as_nanos() as f64 {
                    max_interval
                } else {
                    Duration::from_nanos(scaled.round() as u64)
                }
            }
        }
    }

    /// Time until a never-answered request is given up
    pub fn total_budget(&self) -> Duration {
        (0..self.attempts()).map(|attempt| self.delay_for(attempt)).sum()
    }
}

/// An outstanding request waiting for its response
#[derive(Debug)]
pub struct PendingRequest<W> {
    pub sequence: u32,
    pub message_type: MessageType,
    /// Encoded datagram, resent as-is on retransmission
    pub payload: Bytes,
    pub sent_at: Instant,
    pub retries: u32,
    pub waiter: W,
}

impl<W> PendingRequest<W> {
    pub fn new(sequence: u32, message_type: MessageType, payload: Bytes, waiter: W) -> Self {
        Self {
            sequence,
            message_type,
            payload,
            sent_at: Instant::now(),
            retries: 0,
            waiter,
        }
    }

    /// Whether `response` answers this request
    pub fn is_answered_by(&self, response: MessageType) -> bool {
        self.message_type.response_type() == Some(response)
    }

    pub fn retransmitted(&mut self) {
        self.retries += 1;
        self.sent_at = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }
}
