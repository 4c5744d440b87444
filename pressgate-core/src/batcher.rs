//! Event Batching
//!
//! The batcher drains the event channel into a fixed-capacity batch and
//! hands full (or stale) batches to an encoder and then to the outbound
//! sink.
//!
//! ## Flush Policy
//!
//! A non-empty batch is flushed when it holds `B` events or when the flush
//! timeout has elapsed since the previous flush. An empty batch is never
//! flushed, so an idle device sends nothing.
//!
//! A flush always clears the batch and restarts the timeout, whatever the
//! outcome. A batch the encoder rejects, or that finds the outbound channel
//! full, is counted and dropped rather than retried, so one bad batch cannot
//! wedge the channel behind it.

use heapless::Vec;

use crate::config::BatchConfig;
use crate::constants::MAX_EVENTS_PER_MESSAGE;
use crate::errors::EncodeError;
use crate::events::Event;
use crate::queue::Consumer;
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::{BatchEncoder, OutboundSink};

/// Result of one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Message queued for the publisher
    Sent,
    /// Outbound channel full, batch dropped
    OutboundFull,
    /// Encoder refused the batch, batch dropped
    EncodeFailed(EncodeError),
    /// Nothing to send
    Empty,
}

/// Batcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    /// Messages queued for the publisher
    pub batches_sent: u32,
    /// Batches lost to a full outbound channel
    pub batches_dropped: u32,
    /// Events lost with dropped or rejected batches
    pub events_dropped: u32,
    /// Batches the encoder refused
    pub encode_errors: u32,
}

/// Fixed-capacity batch with size and time flush triggers
#[derive(Debug, Clone)]
pub struct MessageBatcher<const B: usize = MAX_EVENTS_PER_MESSAGE> {
    batch: Vec<Event, B>,
    last_flush: Timestamp,
    flush_timeout_ms: Option<u64>,
    stats: BatchStats,
}

impl<const B: usize> MessageBatcher<B> {
    /// Empty batcher whose timeout starts counting at `now`
    pub fn new(config: &BatchConfig, now: Timestamp) -> Self {
        Self {
            batch: Vec::new(),
            last_flush: now,
            flush_timeout_ms: config.flush_timeout_ms,
            stats: BatchStats::default(),
        }
    }

    /// Add an event; gives it back if the batch is already full
    pub fn push(&mut self, event: Event) -> Result<(), Event> {
        self.batch.push(event)
    }

    /// True if the batch holds `B` events
    pub fn is_full(&self) -> bool {
        self.batch.is_full()
    }

    /// Flush policy evaluated at `now`
    pub fn should_flush(&self, now: Timestamp) -> bool {
        if self.batch.is_empty() {
            return false;
        }
        if self.batch.is_full() {
            return true;
        }

        match self.flush_timeout_ms {
            Some(timeout) => elapsed_ms(self.last_flush, now) >= timeout,
            None => false,
        }
    }

    /// Encode and queue the current batch, then clear it
    pub fn flush<E, S>(&mut self, now: Timestamp, encoder: &mut E, sink: &mut S) -> FlushOutcome
    where
        E: BatchEncoder + ?Sized,
        S: OutboundSink + ?Sized,
    {
        if self.batch.is_empty() {
            self.last_flush = now;
            return FlushOutcome::Empty;
        }

        let count = self.batch.len() as u32;
        let outcome = match encoder.encode(&self.batch, now) {
            Ok(message) => match sink.try_send(message) {
                Ok(()) => {
                    self.stats.batches_sent += 1;
                    FlushOutcome::Sent
                }
                Err(_message) => {
                    self.stats.batches_dropped += 1;
                    self.stats.events_dropped += count;
                    log_warn!("outbound channel full, dropping batch of {} events", count);
                    FlushOutcome::OutboundFull
                }
            },
            Err(err) => {
                self.stats.encode_errors += 1;
                self.stats.events_dropped += count;
                log_warn!("batch of {} events rejected: {}", count, err);
                FlushOutcome::EncodeFailed(err)
            }
        };

        self.batch.clear();
        self.last_flush = now;
        outcome
    }

    /// Drain `events` into the batch, flushing whenever the policy says so
    ///
    /// Returns the number of flushes performed.
    pub fn poll<E, S, const K: usize>(
        &mut self,
        now: Timestamp,
        events: &mut Consumer<'_, Event, K>,
        encoder: &mut E,
        sink: &mut S,
    ) -> usize
    where
        E: BatchEncoder + ?Sized,
        S: OutboundSink + ?Sized,
    {
        let mut flushes = 0;

        loop {
            while !self.batch.is_full() {
                match events.try_pop() {
                    Some(event) => {
                        // Capacity checked by the loop condition
                        let _ = self.batch.push(event);
                    }
                    None => break,
                }
            }

            if !self.should_flush(now) {
                break;
            }

            self.flush(now, encoder, sink);
            flushes += 1;

            if events.channel().is_empty() {
                break;
            }
        }

        flushes
    }

    /// Events waiting in the batch
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Batch capacity
    pub const fn capacity(&self) -> usize {
        B
    }

    /// Time of the last flush
    pub fn last_flush(&self) -> Timestamp {
        self.last_flush
    }

    /// Counters
    pub fn stats(&self) -> BatchStats {
        self.stats
    }
}
