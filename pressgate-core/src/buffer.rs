//! Fixed-Size Ring Buffer for Sliding Windows
//!
//! ## Overview
//!
//! The derivative estimator needs the oldest and newest sample of a sliding
//! window, updated once per reading, with no allocation. This module
//! provides that window as a const-generic ring buffer that overwrites the
//! oldest entry when full.
//!
//! ### Memory Layout
//!
//! ```text
//! RingBuffer<T, 5> after 7 pushes (values 0..=6):
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  5  │  6  │  2  │  3  │  4  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!               ↑
//!               write_pos = 2 (also the oldest entry once full)
//! ```
//!
//! Oldest and newest are found by cursor arithmetic modulo `N`:
//! - newest = `(write_pos + N - 1) % N`
//! - oldest = `0` while filling, `write_pos` once full
//!
//! ## Usage Example
//!
//! ```rust
//! use pressgate_core::buffer::RingBuffer;
//!
//! let mut window: RingBuffer<u32, 3> = RingBuffer::new();
//! for v in [10, 20, 30, 40] {
//!     window.push(v);
//! }
//! assert_eq!(window.oldest(), Some(&20));
//! assert_eq!(window.newest(), Some(&40));
//! ```

/// Fixed-size ring buffer that overwrites its oldest entry when full
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - Logical index 0 is always the oldest entry
///
/// Not thread-safe; owned by the single stage that uses it.
#[derive(Clone, Debug)]
pub struct RingBuffer<T: Copy, const N: usize> {
    /// Storage; `None` marks slots never written since the last clear
    data: [Option<T>; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Number of valid entries, saturates at N
    len: usize,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Creates an empty buffer
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Appends an entry, overwriting the oldest one when full
    pub fn push(&mut self, item: T) {
        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been pushed since the last clear
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `N` entries are held
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Compile-time capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recently pushed entry
    pub fn newest(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        self.data[(self.write_pos + N - 1) % N].as_ref()
    }

    /// Oldest entry still held
    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    /// Entry by logical index (0 = oldest, len-1 = newest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let physical = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[physical].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Forget all entries
    pub fn clear(&mut self) {
        self.data = [None; N];
        self.write_pos = 0;
        self.len = 0;
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
