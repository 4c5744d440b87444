//! Lock-Free Bounded Channels for the Signal Path
#![allow(unsafe_code)] // Required for lock-free slot hand-off
//!
//! ## Overview
//!
//! Every hop of the pipeline (reader → telemetry, telemetry → batcher,
//! pulse interrupt → grouper) is a bounded single-producer single-consumer
//! ring. Pushing never blocks: a full ring counts the item as dropped and
//! hands it back, and the producer moves on.
//!
//! ```text
//! Producer (reader / ISR)              Consumer (next stage)
//!      ↓                                     ↓
//!   try_push ──────→ [ ring of N slots ] ←── try_pop
//!      ↓                                     ↓
//!   never blocks                         never blocks
//! ```
//!
//! ## Algorithm
//!
//! `head` and `tail` are free-running counters (total pushes and total pops).
//! The slot for a counter value `c` is `c % N`, the fill level is
//! `head − tail`, and the ring is full when that equals `N`. All `N` slots
//! are usable, so a channel declared with capacity 10 holds exactly 10
//! items.
//!
//! ### Push (producer)
//! 1. Load `head` (Relaxed, producer owned) and `tail` (Acquire)
//! 2. Full if `head − tail == N`: count a drop, return the item
//! 3. Write the slot, then publish `head + 1` with Release
//!
//! ### Pop (consumer)
//! 1. Load `tail` (Relaxed, consumer owned) and `head` (Acquire)
//! 2. Empty if equal
//! 3. Read the slot, then publish `tail + 1` with Release
//!
//! ## Safety Considerations
//!
//! Single-producer single-consumer is enforced by the type system:
//! [`RingChannel::split`] hands out exactly one [`Producer`] and one
//! [`Consumer`], and only those handles can push or pop. Statistics are
//! readable from anywhere.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::constants::EVENT_QUEUE_SIZE;
use crate::events::Event;
use crate::message::OutboundMessage;
use crate::system::Notification;
use crate::traits::{Notifier, OutboundSink};

/// After the first drop, a full channel logs once per this many drops
pub const DROP_LOG_EVERY: u32 = 100;

/// Channel carrying finalized events to the batcher
pub type EventChannel<const K: usize = EVENT_QUEUE_SIZE> = RingChannel<Event, K>;

/// Channel health counters
///
/// Track channel health without impacting the hot path
#[derive(Debug)]
pub struct ChannelStats {
    /// Items accepted
    pub pushed: AtomicU32,
    /// Items taken out
    pub popped: AtomicU32,
    /// Items refused because the ring was full
    pub dropped: AtomicU32,
    /// Highest fill level seen
    pub max_depth: AtomicU32,
}

impl ChannelStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    /// Consistent-enough copy for logging
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
        }
    }

    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

/// Plain copy of [`ChannelStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSnapshot {
    /// Items accepted
    pub pushed: u32,
    /// Items taken out
    pub popped: u32,
    /// Items refused
    pub dropped: u32,
    /// Highest fill level seen
    pub max_depth: u32,
}

/// Bounded SPSC ring of exactly `N` items
pub struct RingChannel<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],

    /// Total pushes (producer owned)
    head: AtomicUsize,

    /// Total pops (consumer owned)
    tail: AtomicUsize,

    split_taken: AtomicBool,
    stats: ChannelStats,
}

// Slots are only touched through the unique Producer / Consumer handles
unsafe impl<T: Send, const N: usize> Send for RingChannel<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for RingChannel<T, N> {}

impl<T, const N: usize> RingChannel<T, N> {
    const NON_EMPTY: () = assert!(N > 0, "channel capacity must be non-zero");

    /// Create an empty channel; usable in `static` items
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;

        Self {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            split_taken: AtomicBool::new(false),
            stats: ChannelStats::new(),
        }
    }

    /// Take the producer and consumer handles
    ///
    /// Returns `None` after the first call.
    pub fn split(&self) -> Option<(Producer<'_, T, N>, Consumer<'_, T, N>)> {
        if self.split_taken.swap(true, Ordering::AcqRel) {
            return None;
        }

        Some((Producer { channel: self }, Consumer { channel: self }))
    }

    /// Items currently queued
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(N)
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the next push would be dropped
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Compile-time capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Channel counters
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    fn push(&self, value: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= N {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(value);
        }

        // Only the producer writes this slot, and the consumer will not read
        // it until head is published below
        unsafe {
            (*self.slots[head % N].get()).write(value);
        }

        self.head.store(head.wrapping_add(1), Ordering::Release);

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(head.wrapping_add(1).wrapping_sub(tail) as u32);
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        // The Acquire load of head makes the producer's write visible, and
        // the producer will not reuse the slot until tail is published below
        let value = unsafe { (*self.slots[tail % N].get()).assume_init_read() };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        self.stats.popped.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }
}

impl<T, const N: usize> Default for RingChannel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for RingChannel<T, N> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();

        while tail != head {
            // Exclusive access; slots between tail and head are initialized
            unsafe { self.slots[tail % N].get_mut().assume_init_drop() };
            tail = tail.wrapping_add(1);
        }
    }
}

/// Push side of a [`RingChannel`]
pub struct Producer<'a, T, const N: usize> {
    channel: &'a RingChannel<T, N>,
}

impl<'a, T, const N: usize> Producer<'a, T, N> {
    /// Queue `value`, or give it back if the ring is full
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        self.channel.push(value)
    }

    /// Queue `value`; on the channel's first ever drop, post `alert`
    ///
    /// Later drops are counted, with a log line every
    /// [`DROP_LOG_EVERY`] drops. Returns true if queued.
    pub fn push_or_alert<N2: Notifier + ?Sized>(
        &mut self,
        value: T,
        notifier: &N2,
        alert: Notification,
    ) -> bool {
        match self.channel.push(value) {
            Ok(()) => true,
            Err(_) => {
                let dropped = self.channel.stats.dropped.load(Ordering::Relaxed);
                if dropped == 1 {
                    log_warn!("channel full, dropping (further drops counted silently)");
                    notifier.notify(alert);
                } else if dropped % DROP_LOG_EVERY == 0 {
                    log_warn!("channel still full, {} items dropped so far", dropped);
                }
                false
            }
        }
    }

    /// The underlying channel
    pub fn channel(&self) -> &'a RingChannel<T, N> {
        self.channel
    }
}

impl<const N: usize> OutboundSink for Producer<'_, OutboundMessage, N> {
    fn try_send(&mut self, message: OutboundMessage) -> Result<(), OutboundMessage> {
        self.try_push(message)
    }
}

/// Pop side of a [`RingChannel`]
pub struct Consumer<'a, T, const N: usize> {
    channel: &'a RingChannel<T, N>,
}

impl<'a, T, const N: usize> Consumer<'a, T, N> {
    /// Take the oldest item
    pub fn try_pop(&mut self) -> Option<T> {
        self.channel.pop()
    }

    /// Iterator that pops until empty
    pub fn drain(&mut self) -> Drain<'_, 'a, T, N> {
        Drain { consumer: self }
    }

    /// The underlying channel
    pub fn channel(&self) -> &'a RingChannel<T, N> {
        self.channel
    }
}

/// Iterator returned by [`Consumer::drain`]
pub struct Drain<'c, 'a, T, const N: usize> {
    consumer: &'c mut Consumer<'a, T, N>,
}

impl<T, const N: usize> Iterator for Drain<'_, '_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.consumer.try_pop()
    }
}
