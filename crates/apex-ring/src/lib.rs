//! Lock-free SPSC ring buffer.
//!
//! Single-producer single-consumer queue with wait-free push and pop on
//! both sides. Head and tail cursors live on separate cache lines to
//! prevent false sharing, and each side keeps a private cached copy of the
//! opposite cursor so the common case touches only one shared line.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Padded atomic cursor. 128-byte alignment keeps each cursor on its own
/// cache line (two lines on CPUs with adjacent-line prefetch).
#[repr(C, align(128))]
struct PaddedAtomicUsize {
    value: AtomicUsize,
}

impl PaddedAtomicUsize {
    const fn new(v: usize) -> Self {
        Self {
            value: AtomicUsize::new(v),
        }
    }
}

/// Shared ring state. Constructed through [`channel`]; user code only ever
/// sees the [`Producer`] and [`Consumer`] halves.
///
/// Capacity must be a power of two. One slot is kept unused to distinguish
/// full from empty, so the usable capacity is `capacity - 1`.
pub struct SpscRing<T> {
    /// Consumer cursor (next slot to read).
    head: PaddedAtomicUsize,
    /// Producer cursor (next slot to write).
    tail: PaddedAtomicUsize,
    mask: usize,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: exactly one producer and one consumer exist (enforced by the
// channel constructor handing out one of each), and all cross-thread slot
// accesses are ordered by the release store / acquire load on the cursors.
unsafe impl<T: Copy + Send> Send for SpscRing<T> {}
unsafe impl<T: Copy + Send> Sync for SpscRing<T> {}

impl<T: Copy> SpscRing<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "capacity must be a power of 2");
        assert!(capacity >= 2, "capacity must be at least 2");

        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            head: PaddedAtomicUsize::new(0),
            tail: PaddedAtomicUsize::new(0),
            mask: capacity - 1,
            buffer: buffer.into_boxed_slice(),
        }
    }

    /// Usable capacity (one slot is reserved).
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.mask
    }

    /// Advisory number of queued elements. May be stale by the time the
    /// caller acts on it.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        tail.wrapping_sub(head) & self.mask
    }

    /// Advisory emptiness check.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create a connected producer/consumer pair over a fresh ring.
///
/// `capacity` must be a power of two; `capacity - 1` slots are usable.
/// The backing storage is allocated here and never reallocated.
pub fn channel<T: Copy + Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(SpscRing::new(capacity));
    (
        Producer {
            ring: Arc::clone(&ring),
            cached_head: 0,
        },
        Consumer {
            ring,
            cached_tail: 0,
        },
    )
}

/// Write half. There is exactly one per ring; `&mut self` on the push
/// methods makes concurrent producers unrepresentable.
pub struct Producer<T: Copy + Send> {
    ring: Arc<SpscRing<T>>,
    /// Private copy of the consumer cursor, refreshed only when the ring
    /// looks full. Not shared, so it needs no atomics.
    cached_head: usize,
}

impl<T: Copy + Send> Producer<T> {
    /// Attempt to push a value. Returns `false` if the ring is full.
    #[inline(always)]
    pub fn try_push(&mut self, value: T) -> bool {
        let tail = self.ring.tail.value.load(Ordering::Relaxed);
        let next = (tail + 1) & self.ring.mask;

        if next == self.cached_head {
            self.cached_head = self.ring.head.value.load(Ordering::Acquire);
            if next == self.cached_head {
                return false;
            }
        }

        // SAFETY: the slot at `tail` is outside the consumer's visible
        // range until the release store below publishes it.
        unsafe {
            (*self.ring.buffer[tail].get()).write(value);
        }

        self.ring.tail.value.store(next, Ordering::Release);
        true
    }

    /// Push a value, spinning until a slot frees up.
    #[inline]
    pub fn push(&mut self, value: T) {
        while !self.try_push(value) {
            core::hint::spin_loop();
        }
    }

    /// Usable capacity of the underlying ring.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Read half. Exactly one per ring.
pub struct Consumer<T: Copy + Send> {
    ring: Arc<SpscRing<T>>,
    /// Private copy of the producer cursor, refreshed only when the ring
    /// looks empty.
    cached_tail: usize,
}

impl<T: Copy + Send> Consumer<T> {
    /// Attempt to pop a value. Returns `None` if the ring is empty.
    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        let head = self.ring.head.value.load(Ordering::Relaxed);

        if head == self.cached_tail {
            self.cached_tail = self.ring.tail.value.load(Ordering::Acquire);
            if head == self.cached_tail {
                return None;
            }
        }

        // SAFETY: head != tail, so the producer has published this slot;
        // the acquire load of tail ordered the payload write before us.
        let value = unsafe { (*self.ring.buffer[head].get()).assume_init_read() };

        self.ring
            .head
            .value
            .store((head + 1) & self.ring.mask, Ordering::Release);
        Some(value)
    }

    /// Pop a value, spinning until one is available.
    #[inline]
    pub fn pop(&mut self) -> T {
        loop {
            if let Some(value) = self.try_pop() {
                return value;
            }
            core::hint::spin_loop();
        }
    }

    /// Advisory number of elements waiting.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Advisory emptiness check.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_message() {
        let (mut tx, mut rx) = channel::<u64>(16);

        assert!(tx.try_push(42));
        assert_eq!(rx.try_pop(), Some(42));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn fill_then_drain() {
        let (mut tx, mut rx) = channel::<u64>(16);

        // One slot is reserved: 15 usable.
        for i in 0..15 {
            assert!(tx.try_push(i), "push failed at {}", i);
        }
        assert!(!tx.try_push(100));

        for i in 0..15 {
            assert_eq!(rx.try_pop(), Some(i));
        }
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn wrap_around() {
        let (mut tx, mut rx) = channel::<u64>(4);

        for round in 0..10 {
            let base = round * 3;
            for i in 0..3 {
                assert!(tx.try_push(base + i));
            }
            for i in 0..3 {
                assert_eq!(rx.try_pop(), Some(base + i));
            }
        }
    }

    #[test]
    fn advisory_len() {
        let (mut tx, rx) = channel::<u64>(8);

        assert_eq!(rx.len(), 0);
        assert!(rx.is_empty());

        tx.try_push(1);
        tx.try_push(2);
        assert_eq!(rx.len(), 2);
        assert!(!rx.is_empty());
    }

    #[test]
    fn capacity_reports_usable_slots() {
        let (tx, _rx) = channel::<u64>(64);
        assert_eq!(tx.capacity(), 63);
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two() {
        let _ = channel::<u64>(100);
    }
}
