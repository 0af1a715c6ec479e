//! Lock-free single-producer single-consumer ring buffer (spec §4.A).
//!
//! Power-of-two capacity with a mask, two cache-line-aligned atomic
//! indices. No allocation or syscall after construction. Single producer,
//! single consumer; concurrent violations from more than one thread on
//! either side are undefined by contract (not checked at runtime — that
//! would cost the hot path the very thing this type exists to avoid).

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

#[repr(align(64))]
struct CachePadded<T>(T);

/// A fixed-capacity SPSC ring buffer.
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<Option<T>>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Sync for RingBuffer<T> {}
unsafe impl<T: Send> Send for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Create a ring buffer with at least `min_capacity` slots, rounded up
    /// to the next power of two.
    pub fn new(min_capacity: usize) -> Self {
        let capacity = min_capacity.max(2).next_power_of_two();
        let slots = (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        Self {
            slots,
            mask: capacity - 1,
            head: CachePadded(AtomicUsize::new(0)),
            tail: CachePadded(AtomicUsize::new(0)),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    fn len_from(&self, head: usize, tail: usize) -> usize {
        head.wrapping_sub(tail)
    }

    /// Number of items currently queued. Approximate under concurrent
    /// access by the other side; exact from the calling side's own view.
    pub fn len(&self) -> usize {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        self.len_from(head, tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Producer side: attempt to push one item. Returns `Err(item)` if the
    /// buffer is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let tail = self.tail.0.load(Ordering::Acquire);
        let head = self.head.0.load(Ordering::Relaxed);

        if self.len_from(head, tail) == self.capacity() {
            return Err(item);
        }

        let idx = head & self.mask;
        // SAFETY: single producer owns this slot; the consumer only reads
        // slots behind `tail`, which cannot reach `idx` until we publish
        // the new `head` below.
        unsafe {
            *self.slots[idx].get() = Some(item);
        }
        self.head.0.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Consumer side: attempt to pop one item. Returns `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Relaxed);

        if self.len_from(head, tail) == 0 {
            return None;
        }

        let idx = tail & self.mask;
        // SAFETY: single consumer owns this slot; the producer only writes
        // slots at or beyond `head`, which cannot reach `idx` until we
        // publish the new `tail` below.
        let item = unsafe { (*self.slots[idx].get()).take() };
        self.tail.0.store(tail.wrapping_add(1), Ordering::Release);
        item
    }

    /// Push as many of `items` as fit, stopping at the first that doesn't.
    /// Returns the number actually pushed.
    pub fn try_push_bulk(&self, items: impl IntoIterator<Item = T>) -> usize {
        let mut pushed = 0;
        for item in items {
            if self.try_push(item).is_err() {
                break;
            }
            pushed += 1;
        }
        pushed
    }

    /// Pop up to `max` items into a `Vec`. At most one wrap split occurs
    /// internally (handled transparently by the per-item loop).
    pub fn try_pop_bulk(&self, max: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(max.min(self.capacity()));
        for _ in 0..max {
            match self.try_pop() {
                Some(item) => out.push(item),
                None => break,
            }
        }
        out
    }

    /// Drop all queued items without processing them.
    pub fn clear(&self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rounds_capacity_up_to_power_of_two() {
        let rb: RingBuffer<u32> = RingBuffer::new(5);
        assert_eq!(rb.capacity(), 8);
    }

    #[test]
    fn push_pop_preserves_order() {
        let rb: RingBuffer<u32> = RingBuffer::new(4);
        for i in 0..4 {
            assert!(rb.try_push(i).is_ok());
        }
        assert!(rb.try_push(99).is_err());
        for i in 0..4 {
            assert_eq!(rb.try_pop(), Some(i));
        }
        assert_eq!(rb.try_pop(), None);
    }

    #[test]
    fn wraps_around_without_loss() {
        let rb: RingBuffer<u32> = RingBuffer::new(4);
        for round in 0..10 {
            rb.try_push(round).unwrap();
            rb.try_push(round * 100).unwrap();
            assert_eq!(rb.try_pop(), Some(round));
            assert_eq!(rb.try_pop(), Some(round * 100));
        }
    }

    #[test]
    fn concurrent_producer_consumer_preserves_all_items() {
        let rb = Arc::new(RingBuffer::<u64>::new(64));
        let producer = Arc::clone(&rb);
        const N: u64 = 200_000;

        let writer = thread::spawn(move || {
            let mut next = 0u64;
            while next < N {
                if producer.try_push(next).is_ok() {
                    next += 1;
                }
            }
        });

        let mut received = Vec::with_capacity(N as usize);
        while (received.len() as u64) < N {
            if let Some(v) = rb.try_pop() {
                received.push(v);
            }
        }
        writer.join().unwrap();

        for (i, v) in received.iter().enumerate() {
            assert_eq!(*v, i as u64, "no loss, duplication, or reorder");
        }
    }
}
