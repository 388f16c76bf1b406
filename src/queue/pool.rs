//! Reusable field buffers for tab-separated lines
//!
//! A [`FieldBuffer`] holds one `String` per column and is refilled in place
//! for every line, so steady-state parsing does not allocate per token. The
//! [`BufferPool`] is seeded with one buffer per worker; a buffer popped by a
//! worker is owned by it until pushed back.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Fixed-width array of reusable column strings
#[derive(Debug)]
pub struct FieldBuffer {
    fields: Vec<String>,
    len: usize,
}

impl FieldBuffer {
    /// Create a buffer with `width` columns
    pub fn new(width: usize) -> Self {
        Self {
            fields: (0..width).map(|_| String::with_capacity(32)).collect(),
            len: 0,
        }
    }

    /// Number of columns this buffer can hold
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Number of columns filled by the last [`fill`](Self::fill)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split `line` on tabs into the buffer in one left-to-right scan.
    ///
    /// Columns beyond the buffer width are ignored; returns the number of
    /// tokens found in the line.
    pub fn fill(&mut self, line: &str) -> usize {
        let mut count = 0;
        for token in line.split('\t') {
            if count < self.fields.len() {
                let slot = &mut self.fields[count];
                slot.clear();
                slot.push_str(token);
            }
            count += 1;
        }
        self.len = count.min(self.fields.len());
        count
    }

    /// Column `index`, or `""` if the last line was shorter
    pub fn get(&self, index: usize) -> &str {
        if index < self.len {
            &self.fields[index]
        } else {
            ""
        }
    }

    /// Capacity currently held by all columns
    pub fn capacity(&self) -> usize {
        self.fields.iter().map(String::capacity).sum()
    }
}

/// Statistics for the pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Successful pops of a pooled buffer
    pub reused: AtomicU64,

    /// Buffers allocated because the pool was empty after backoff
    pub allocated: AtomicU64,

    /// Pops that found the pool empty
    pub empty_pops: AtomicU64,
}

impl PoolStats {
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn empty_pops(&self) -> u64 {
        self.empty_pops.load(Ordering::Relaxed)
    }
}

/// Number of yields before an empty pool allocates a fresh buffer
const BACKOFF_SPINS: u32 = 16;

/// Thread-safe stack of field buffers
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<FieldBuffer>>,
    width: usize,
    stats: PoolStats,
}

impl BufferPool {
    /// Create a pool pre-seeded with `count` buffers of `width` columns
    pub fn with_capacity(count: usize, width: usize) -> Self {
        let buffers = (0..count).map(|_| FieldBuffer::new(width)).collect();
        Self {
            buffers: Mutex::new(buffers),
            width,
            stats: PoolStats::default(),
        }
    }

    /// Pop a previously released buffer; `None` if the pool is empty
    pub fn pop(&self) -> Option<FieldBuffer> {
        let buffer = self.buffers.lock().pop();
        match buffer {
            Some(_) => self.stats.reused.fetch_add(1, Ordering::Relaxed),
            None => self.stats.empty_pops.fetch_add(1, Ordering::Relaxed),
        };
        buffer
    }

    /// Pop a buffer, yielding a few times if the pool is empty and
    /// allocating a new one as a last resort
    pub fn pop_or_backoff(&self) -> FieldBuffer {
        for _ in 0..BACKOFF_SPINS {
            if let Some(buffer) = self.pop() {
                return buffer;
            }
            thread::yield_now();
        }
        self.stats.allocated.fetch_add(1, Ordering::Relaxed);
        FieldBuffer::new(self.width)
    }

    /// Return a buffer to the pool
    pub fn push(&self, buffer: FieldBuffer) {
        self.buffers.lock().push(buffer);
    }

    /// Buffers currently available
    pub fn available(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fill_and_get() {
        let mut buffer = FieldBuffer::new(4);
        assert_eq!(buffer.fill("a\tb\t\td"), 4);
        assert_eq!(buffer.get(0), "a");
        assert_eq!(buffer.get(2), "");
        assert_eq!(buffer.get(3), "d");

        // Shorter line leaves nothing stale behind
        assert_eq!(buffer.fill("x"), 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.get(0), "x");
        assert_eq!(buffer.get(1), "");
    }

    #[test]
    fn test_fill_ignores_extra_columns() {
        let mut buffer = FieldBuffer::new(2);
        assert_eq!(buffer.fill("a\tb\tc\td"), 4);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(1), "b");
        assert_eq!(buffer.get(2), "");
    }

    #[test]
    fn test_pool_reuse_without_reallocation() {
        let pool = BufferPool::with_capacity(1, 3);

        let mut a = pool.pop().unwrap();
        a.fill("some\tlonger\tcontent that grows the column");
        let capacity = a.capacity();
        assert!(pool.pop().is_none());
        pool.push(a);

        let b = pool.pop().unwrap();
        assert_eq!(b.capacity(), capacity);
        assert_eq!(pool.stats().reused(), 2);
        assert_eq!(pool.stats().empty_pops(), 1);
        assert_eq!(pool.stats().allocated(), 0);
    }

    #[test]
    fn test_backoff_allocates_when_exhausted() {
        let pool = BufferPool::with_capacity(0, 5);
        let buffer = pool.pop_or_backoff();
        assert_eq!(buffer.width(), 5);
        assert_eq!(pool.stats().allocated(), 1);
    }

    #[test]
    fn test_concurrent_pop_push() {
        let pool = Arc::new(BufferPool::with_capacity(4, 19));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for n in 0..1000 {
                        let mut buffer = pool.pop_or_backoff();
                        buffer.fill(&format!("{}\t{}", i, n));
                        assert_eq!(buffer.get(0), i.to_string());
                        pool.push(buffer);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(pool.available() as u64, 4 + pool.stats().allocated());
    }
}
