//! Pre-allocated audio buffer pool (spec §4.B). A fixed count of
//! [`AudioBuffer`]s are allocated once; `acquire()` leases one out via an
//! atomic compare-exchange scan and the lease releases its slot back to the
//! pool on `Drop`. No allocation after construction, and no locking — the
//! scan is a handful of relaxed loads plus one CAS per slot attempt.

use daw_core::AudioBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Slot {
    in_use: AtomicBool,
    buffer: std::cell::UnsafeCell<AudioBuffer>,
}

unsafe impl Sync for Slot {}

struct PoolInner {
    slots: Vec<Slot>,
}

/// A fixed-size pool of `AudioBuffer`s, all `num_channels x max_frames`.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(count: usize, num_channels: usize, max_frames: usize) -> Self {
        let slots = (0..count)
            .map(|_| Slot {
                in_use: AtomicBool::new(false),
                buffer: std::cell::UnsafeCell::new(AudioBuffer::new(num_channels, max_frames)),
            })
            .collect();
        Self { inner: Arc::new(PoolInner { slots }) }
    }

    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Scan for a free slot and lease it. Returns `None` if every slot is
    /// currently leased (the caller must handle exhaustion — this type
    /// never grows itself on the audio thread).
    pub fn acquire(&self) -> Option<BufferLease> {
        for (index, slot) in self.inner.slots.iter().enumerate() {
            if slot
                .in_use
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: we just won exclusive ownership of this slot via
                // the CAS above; no other lease can observe it until this
                // one releases `in_use`.
                let buf = unsafe { &mut *slot.buffer.get() };
                buf.clear();
                return Some(BufferLease { pool: self.inner.clone(), index });
            }
        }
        None
    }
}

/// RAII handle to a leased buffer. Releases its slot back to the pool when
/// dropped, regardless of panic unwinding.
pub struct BufferLease {
    pool: Arc<PoolInner>,
    index: usize,
}

impl BufferLease {
    pub fn get(&self) -> &AudioBuffer {
        // SAFETY: this lease is the sole owner of the slot until Drop.
        unsafe { &*self.pool.slots[self.index].buffer.get() }
    }

    pub fn get_mut(&mut self) -> &mut AudioBuffer {
        unsafe { &mut *self.pool.slots[self.index].buffer.get() }
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        self.pool.slots[self.index].in_use.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_zeroed_buffer() {
        let pool = BufferPool::new(2, 2, 16);
        let mut lease = pool.acquire().unwrap();
        lease.get_mut().channel_mut(0)[0] = 1.0;
        drop(lease);

        let lease2 = pool.acquire().unwrap();
        assert_eq!(lease2.get().channel(0)[0], 0.0, "reacquired slot must be cleared");
    }

    #[test]
    fn exhaustion_returns_none() {
        let pool = BufferPool::new(1, 1, 4);
        let _a = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn drop_releases_slot_for_reuse() {
        let pool = BufferPool::new(1, 1, 4);
        {
            let _a = pool.acquire().unwrap();
            assert!(pool.acquire().is_none());
        }
        assert!(pool.acquire().is_some());
    }
}
