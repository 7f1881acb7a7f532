//! Scratch memory pool shared by layers during initialization.
//!
//! Allocations are handed out as [`ScratchBuffer`] guards. A guard is
//! returned to the pool either explicitly through [`MemPool::free`], which
//! reports bookkeeping errors, or implicitly when it is dropped on an early
//! exit path.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use log::warn;
use parking_lot::Mutex;

use crate::error::MemPoolError;

const F32_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, Default)]
struct PoolState {
    next_id: usize,
    live: HashMap<usize, usize>,
    in_use: usize,
    peak: usize,
    #[cfg(test)]
    fail_next_release: bool,
}

/// Byte-accounted arena for short-lived float scratch buffers.
#[derive(Debug, Default)]
pub struct MemPool {
    capacity: Option<usize>,
    state: Mutex<PoolState>,
}

impl MemPool {
    /// Unbounded pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool that refuses to hold more than `bytes` at once.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Allocates a zeroed buffer of `len` floats.
    pub fn alloc(&self, len: usize) -> Result<ScratchBuffer<'_>, MemPoolError> {
        let bytes = len * F32_BYTES;
        let mut state = self.state.lock();

        if let Some(capacity) = self.capacity {
            let available = capacity.saturating_sub(state.in_use);
            if bytes > available {
                return Err(MemPoolError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id, bytes);
        state.in_use += bytes;
        state.peak = state.peak.max(state.in_use);

        Ok(ScratchBuffer {
            pool: self,
            id,
            data: vec![0.0; len],
            released: false,
        })
    }

    /// Returns `buffer` to the pool.
    ///
    /// Buffers from another pool are rejected. On any error the guard stays
    /// armed and tries again to release itself into its own pool on drop.
    pub fn free(&self, mut buffer: ScratchBuffer<'_>) -> Result<(), MemPoolError> {
        if !std::ptr::eq(buffer.pool, self) {
            return Err(MemPoolError::ForeignBuffer(buffer.id));
        }
        self.release(buffer.id)?;
        buffer.released = true;
        Ok(())
    }

    fn release(&self, id: usize) -> Result<(), MemPoolError> {
        let mut state = self.state.lock();
        #[cfg(test)]
        if std::mem::take(&mut state.fail_next_release) {
            return Err(MemPoolError::UnknownAllocation(id));
        }
        let bytes = state
            .live
            .remove(&id)
            .ok_or(MemPoolError::UnknownAllocation(id))?;
        state.in_use -= bytes;
        Ok(())
    }

    /// Bytes currently handed out.
    pub fn in_use(&self) -> usize {
        self.state.lock().in_use
    }

    /// High-water mark of `in_use` since the pool was created.
    pub fn peak(&self) -> usize {
        self.state.lock().peak
    }

    /// Number of buffers not yet returned.
    pub fn live_allocations(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Byte limit, `None` for an unbounded pool.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Makes the next release report an error, leaving the allocation live.
    #[cfg(test)]
    pub(crate) fn fail_next_release(&self) {
        self.state.lock().fail_next_release = true;
    }
}

/// Float buffer borrowed from a [`MemPool`].
#[derive(Debug)]
pub struct ScratchBuffer<'p> {
    pool: &'p MemPool,
    id: usize,
    data: Vec<f32>,
    released: bool,
}

impl ScratchBuffer<'_> {
    /// Pool-unique allocation id.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Deref for ScratchBuffer<'_> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.pool.release(self.id) {
            warn!("dropping scratch buffer {}: {}", self.id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_accounting() {
        let pool = MemPool::new();
        let buf = pool.alloc(16).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(pool.in_use(), 64);
        assert_eq!(pool.live_allocations(), 1);

        pool.free(buf).unwrap();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.live_allocations(), 0);
        assert_eq!(pool.peak(), 64);
    }

    #[test]
    fn test_drop_releases() {
        let pool = MemPool::new();
        {
            let _a = pool.alloc(8).unwrap();
            let _b = pool.alloc(8).unwrap();
            assert_eq!(pool.live_allocations(), 2);
        }
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.peak(), 64);
    }

    #[test]
    fn test_capacity_exceeded() {
        let pool = MemPool::with_capacity(32);
        let held = pool.alloc(4).unwrap();

        let err = pool.alloc(8).unwrap_err();
        assert_eq!(
            err,
            MemPoolError::OutOfMemory {
                requested: 32,
                available: 16
            }
        );

        drop(held);
        assert!(pool.alloc(8).is_ok());
    }

    #[test]
    fn test_release_unknown_id() {
        let pool = MemPool::new();
        assert_eq!(pool.release(42), Err(MemPoolError::UnknownAllocation(42)));
    }

    #[test]
    fn test_free_rejects_foreign_buffer() {
        let a = MemPool::new();
        let b = MemPool::new();
        let held = b.alloc(4).unwrap();
        let foreign = a.alloc(8).unwrap();
        let foreign_id = foreign.id();

        assert_eq!(b.free(foreign), Err(MemPoolError::ForeignBuffer(foreign_id)));

        // The rejected guard went back to its own pool on drop
        assert_eq!(a.in_use(), 0);
        assert_eq!(a.live_allocations(), 0);
        assert_eq!(b.in_use(), 16);
        assert_eq!(b.live_allocations(), 1);

        b.free(held).unwrap();
        assert_eq!(b.in_use(), 0);
    }

    #[test]
    fn test_failed_free_keeps_guard_armed() {
        let pool = MemPool::new();
        let buf = pool.alloc(8).unwrap();
        let id = buf.id();

        pool.fail_next_release();
        assert_eq!(pool.free(buf), Err(MemPoolError::UnknownAllocation(id)));

        // Drop retried the release after the failed free
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.live_allocations(), 0);
    }

    #[test]
    fn test_buffer_is_writable() {
        let pool = MemPool::new();
        let mut buf = pool.alloc(4).unwrap();
        buf.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&buf[..], &[1.0, 2.0, 3.0, 4.0]);
    }
}
