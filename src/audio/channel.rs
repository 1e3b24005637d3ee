//! Lock-free single-producer / single-consumer channel of interleaved `f32`
//! samples.
//!
//! [`SampleChannel`] owns a fixed-capacity circular buffer addressed by two
//! monotonically increasing cursors.  Storage is indexed with
//! `cursor % capacity`; the cursors themselves are never decremented.
//!
//! Exactly one [`Producer`] and one [`Consumer`] may exist at a time.  The
//! consumer is handed out once at construction; the producer is *claimed*
//! by whichever context feeds the channel (a cpal callback or a decode
//! worker) and released again when that context drops it, so a source can
//! be stopped and restarted without rebuilding the channel.
//!
//! When the buffer is full, new samples are **rejected**, never overwritten:
//! [`Producer::write`] returns how many samples it accepted and the caller
//! accounts for the rest (see [`DropCounter`]).
//!
//! # Example
//!
//! ```rust
//! use spectrum_tap::audio::SampleChannel;
//!
//! let (channel, mut consumer) = SampleChannel::new(4);
//! let mut producer = channel.claim_producer().unwrap();
//!
//! assert_eq!(producer.write(&[1.0, 2.0, 3.0, 4.0, 5.0]), 4); // 5th sample rejected
//!
//! let mut out = [0.0_f32; 8];
//! assert_eq!(consumer.read(&mut out), 4);
//! assert_eq!(&out[..4], &[1.0, 2.0, 3.0, 4.0]);
//! ```

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Shared storage
// ---------------------------------------------------------------------------

struct Shared {
    slots: Box<[UnsafeCell<f32>]>,
    capacity: usize,
    /// Total samples ever published by the producer.
    write_cursor: AtomicUsize,
    /// Total samples ever consumed by the consumer.
    read_cursor: AtomicUsize,
    producer_claimed: AtomicBool,
}

// SAFETY: a slot is only written by the single live `Producer` while it lies
// in the free region `[write_cursor, read_cursor + capacity)` and only read by
// the single live `Consumer` while it lies in `[read_cursor, write_cursor)`.
// The two regions never overlap, and ownership of a region changes hands only
// through a release store on one cursor paired with an acquire load on the
// other side.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn base(&self) -> *mut f32 {
        UnsafeCell::raw_get(self.slots.as_ptr())
    }
}

// ---------------------------------------------------------------------------
// SampleChannel
// ---------------------------------------------------------------------------

/// Cloneable handle to the shared ring.
///
/// The handle itself grants no read or write access; it is used to claim a
/// [`Producer`] and to inspect the cursors for diagnostics.
#[derive(Clone)]
pub struct SampleChannel {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SampleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleChannel")
            .field("capacity", &self.shared.capacity)
            .field("write_cursor", &self.write_cursor())
            .field("read_cursor", &self.read_cursor())
            .finish()
    }
}

impl SampleChannel {
    /// Create a channel holding at most `capacity` samples and return it
    /// together with its one and only [`Consumer`].
    ///
    /// A zero capacity is allowed; such a channel accepts and yields nothing.
    pub fn new(capacity: usize) -> (Self, Consumer) {
        let slots = (0..capacity).map(|_| UnsafeCell::new(0.0_f32)).collect();
        let shared = Arc::new(Shared {
            slots,
            capacity,
            write_cursor: AtomicUsize::new(0),
            read_cursor: AtomicUsize::new(0),
            producer_claimed: AtomicBool::new(false),
        });
        let consumer = Consumer {
            shared: Arc::clone(&shared),
        };
        (Self { shared }, consumer)
    }

    /// Claim the producer side.
    ///
    /// Returns `None` while another [`Producer`] is still alive.
    pub fn claim_producer(&self) -> Option<Producer> {
        self.shared
            .producer_claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Producer {
                shared: Arc::clone(&self.shared),
            })
    }

    /// Maximum number of samples the channel can hold.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Total samples published so far.
    pub fn write_cursor(&self) -> usize {
        self.shared.write_cursor.load(Ordering::Acquire)
    }

    /// Total samples consumed so far.
    pub fn read_cursor(&self) -> usize {
        self.shared.read_cursor.load(Ordering::Acquire)
    }

    /// Samples currently buffered and not yet read.
    ///
    /// This is a snapshot; either side may move it immediately afterwards.
    pub fn len(&self) -> usize {
        let read = self.read_cursor();
        self.write_cursor().wrapping_sub(read)
    }

    /// Returns `true` when no unread samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Write half of a [`SampleChannel`].  Never blocks.
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Append as many of `data` as fit in the free region and return the
    /// number accepted.  Samples past that count are *not* stored.
    pub fn write(&mut self, data: &[f32]) -> usize {
        let shared = &*self.shared;
        let capacity = shared.capacity;
        if capacity == 0 || data.is_empty() {
            return 0;
        }

        let head = shared.write_cursor.load(Ordering::Relaxed);
        let tail = shared.read_cursor.load(Ordering::Acquire);
        let used = head.wrapping_sub(tail);
        let free = capacity.saturating_sub(used);
        let to_write = data.len().min(free);
        if to_write == 0 {
            return 0;
        }

        let start = head % capacity;
        let first = to_write.min(capacity - start);
        // SAFETY: `[head, head + to_write)` lies inside the free region, which
        // the consumer does not touch until the release store below.  The
        // split at `first` keeps both copies inside `slots`.
        unsafe {
            let base = shared.base();
            ptr::copy_nonoverlapping(data.as_ptr(), base.add(start), first);
            ptr::copy_nonoverlapping(data.as_ptr().add(first), base, to_write - first);
        }

        shared
            .write_cursor
            .store(head.wrapping_add(to_write), Ordering::Release);
        to_write
    }

    /// Free slots as seen from the producer side.
    pub fn free(&self) -> usize {
        let head = self.shared.write_cursor.load(Ordering::Relaxed);
        let tail = self.shared.read_cursor.load(Ordering::Acquire);
        self.shared.capacity.saturating_sub(head.wrapping_sub(tail))
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.shared.producer_claimed.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Read half of a [`SampleChannel`].  Never blocks.
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Copy up to `dest.len()` buffered samples into `dest`, oldest first,
    /// and return how many were copied.  Returns 0 when nothing is buffered.
    pub fn read(&mut self, dest: &mut [f32]) -> usize {
        let shared = &*self.shared;
        let capacity = shared.capacity;
        if capacity == 0 || dest.is_empty() {
            return 0;
        }

        let tail = shared.read_cursor.load(Ordering::Relaxed);
        let head = shared.write_cursor.load(Ordering::Acquire);
        let available = head.wrapping_sub(tail);
        let to_read = dest.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let start = tail % capacity;
        let first = to_read.min(capacity - start);
        // SAFETY: `[tail, tail + to_read)` was published by the producer's
        // release store observed above and is not rewritten until the read
        // cursor moves past it.
        unsafe {
            let base = shared.base();
            ptr::copy_nonoverlapping(base.add(start), dest.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(base, dest.as_mut_ptr().add(first), to_read - first);
        }

        shared
            .read_cursor
            .store(tail.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Samples available to read right now.
    pub fn available(&self) -> usize {
        let tail = self.shared.read_cursor.load(Ordering::Relaxed);
        let head = self.shared.write_cursor.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

// ---------------------------------------------------------------------------
// DropCounter
// ---------------------------------------------------------------------------

/// Monotonic count of samples a producer could not place in the channel.
///
/// Cheap to clone; all clones share one counter.  Only [`reset`](Self::reset)
/// (called when acquisition restarts) ever lowers it.
#[derive(Debug, Clone, Default)]
pub struct DropCounter {
    count: Arc<AtomicUsize>,
}

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, samples: usize) {
        if samples > 0 {
            self.count.fetch_add(samples, Ordering::Relaxed);
        }
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Write `data` through `producer` and charge any shortfall to `dropped`.
///
/// Returns the number of samples accepted.
pub fn write_or_drop(producer: &mut Producer, data: &[f32], dropped: &DropCounter) -> usize {
    let written = producer.write(data);
    dropped.add(data.len() - written);
    written
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
