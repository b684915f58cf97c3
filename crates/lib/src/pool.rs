//! Pooled payload buffers.
//!
//! The socket loop copies each binary, ping and pong payload into a buffer leased from a
//! [`BufferPool`]. The lease is lent to the bridge for exactly one dispatch and goes back to
//! the pool when the [`PooledBuffer`] is dropped, so every exit path releases it once.

use bytes::BytesMut;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Buffers larger than this are not kept on the free list after release.
const MAX_RETAINED_BYTES: usize = 64 * 1024;

/// Allocator that recycles payload buffers between frames.
pub struct BufferPool {
    free: Mutex<Vec<BytesMut>>,
    capacity: usize,
    outstanding: AtomicUsize,
    released: AtomicUsize,
}

impl BufferPool {
    /// New pool keeping at most `capacity` idle buffers.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            outstanding: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }

    /// Check out a buffer holding a copy of `payload`.
    pub fn lease(self: &Arc<Self>, payload: &[u8]) -> PooledBuffer {
        let mut buf = self.free_list().pop().unwrap_or_default();
        buf.clear();
        buf.extend_from_slice(payload);
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    /// Leases not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Total releases since the pool was created.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }

    /// Buffers currently parked on the free list.
    pub fn idle(&self) -> usize {
        self.free_list().len()
    }

    fn give_back(&self, buf: BytesMut) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.released.fetch_add(1, Ordering::AcqRel);
        if buf.capacity() > MAX_RETAINED_BYTES {
            return;
        }
        let mut free = self.free_list();
        if free.len() < self.capacity {
            free.push(buf);
        }
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<BytesMut>> {
        self.free.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity)
            .field("outstanding", &self.outstanding())
            .field("released", &self.released())
            .finish()
    }
}

/// A leased payload. Released back to its pool on drop.
pub struct PooledBuffer {
    buf: Option<BytesMut>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Raw payload bytes.
    pub fn resource(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.resource().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resource().is_empty()
    }

    /// Release now instead of at end of scope.
    pub fn free(self) {}
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.give_back(buf);
        }
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer").field("len", &self.len()).finish()
    }
}
