//! Ephemeral ring allocator for per-frame transient data.
//!
//! One large persistently-writable buffer is handed out front to back by a
//! monotonically increasing cursor. The physical offset of a logical cursor
//! value is its distance from the ring's base taken modulo the capacity.
//! There is no per-allocation free: space comes back in bulk when the frame
//! that used it retires (see [`FrameTracker`](crate::frame::FrameTracker)).
//!
//! ```text
//!  logical cursor ──────────────────────────────────────────────────────►
//!  |      lap 0       |      lap 1       |      lap 2       |
//!  [  frame 3 | frame 4 | frame 5 ..waste][ frame 5 | free ...
//!             ▲ synced             ▲ submitted        ▲ cursor
//! ```
//!
//! Everything between `synced` and `submitted` belongs to frames the GPU may
//! still be reading. An allocation that would reach past `synced + capacity`
//! would overwrite them and is refused with
//! [`BackendError::RingExhausted`]. Allocations of the frame currently being
//! recorded are not protected from each other; a frame that outgrows the
//! whole ring wraps over its own data, which is logged.
//!
//! # Example
//!
//! ```ignore
//! let mut ring = EphemeralRing::new(vec![0u8; 1024], 1024);
//!
//! let a = ring.allocate(600, 8)?;
//! let b = ring.allocate(600, 8)?;
//! assert_eq!(a.offset, 0);
//! assert_eq!(b.offset, 0); // 600 + 600 crosses the end, so the ring wraps
//!
//! // At present time, remember how far this frame got.
//! let used = ring.mark_submitted();
//! // Once the frame's fence signals:
//! ring.mark_synced(used);
//! ```

use crate::backend::{BackendError, BackendResult};

/// A sub-allocation from the ephemeral ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingAllocation {
    /// Byte offset into the ring storage.
    pub offset: u64,
    /// Size of the allocation in bytes.
    pub size: u64,
}

impl RingAllocation {
    /// Create a new ring allocation.
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Get the end offset (offset + size).
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Ring of transient GPU memory.
///
/// `S` is the backend's storage for the ring (a mapped GPU buffer, or plain
/// host memory in the dummy backend).
///
/// `EphemeralRing` is NOT thread-safe; it belongs to the submitting thread.
pub struct EphemeralRing<S> {
    storage: S,
    capacity: u64,
    /// Logical cursor value at which the current storage starts.
    base: u64,
    /// Next free logical position.
    cursor: u64,
    /// Cursor value at the last frame submission.
    submitted: u64,
    /// Highest cursor value whose frame is known to have retired.
    synced: u64,
    wrap_count: u64,
}

impl<S> EphemeralRing<S> {
    /// Create a ring over `storage` holding `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(storage: S, capacity: u64) -> Self {
        assert!(capacity > 0, "ephemeral ring capacity cannot be zero");
        Self {
            storage,
            capacity,
            base: 0,
            cursor: 0,
            submitted: 0,
            synced: 0,
            wrap_count: 0,
        }
    }

    /// Ring storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Ring storage, mutably (for writing allocation contents).
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current logical cursor.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Highest logical cursor value known to be retired.
    pub fn synced_cursor(&self) -> u64 {
        self.synced
    }

    /// Number of times an allocation skipped the tail of the ring.
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    /// Bytes between the retired point and the cursor, i.e. still owned by
    /// outstanding or in-recording frames.
    pub fn in_flight(&self) -> u64 {
        self.cursor - self.synced.max(self.base)
    }

    /// Allocate `size` bytes aligned to `alignment`.
    ///
    /// The start is rounded up to `alignment`. If the aligned range would
    /// cross the end of the ring, the remainder of the ring is skipped and
    /// the allocation starts at offset 0.
    ///
    /// # Errors
    ///
    /// [`BackendError::RingExhausted`] if the range would overlap space still
    /// used by an outstanding frame, or if `size` exceeds the capacity.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `alignment` is not a power of two.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> BackendResult<RingAllocation> {
        assert!(size > 0, "ephemeral allocations cannot be empty");
        assert!(
            alignment.is_power_of_two(),
            "alignment must be a power of 2, got {alignment}"
        );

        let exhausted = BackendError::RingExhausted {
            requested: size,
            capacity: self.capacity,
        };
        if size > self.capacity {
            return Err(exhausted);
        }

        let relative = self.cursor - self.base;
        let lap_start = relative - relative % self.capacity;
        let mut begin = align_up(relative % self.capacity, alignment);
        let mut start = lap_start + begin;
        let wrapped = begin + size > self.capacity;
        if wrapped {
            start = lap_start + self.capacity;
            begin = 0;
        }

        let end = self.base + start + size;
        let outstanding = self.submitted > self.synced.max(self.base);
        if outstanding && end > self.synced.max(self.base) + self.capacity {
            return Err(exhausted);
        }
        if end > self.submitted.max(self.base) + self.capacity {
            log::warn!(
                "ephemeral ring ({} bytes) wrapped over allocations of the frame being recorded",
                self.capacity
            );
        }

        if wrapped {
            self.wrap_count += 1;
        }
        self.cursor = end;

        Ok(RingAllocation::new(begin, size))
    }

    /// Record that the frame being recorded was submitted; returns the
    /// cursor value the frame must retire before its space is reused.
    pub fn mark_submitted(&mut self) -> u64 {
        self.submitted = self.cursor;
        self.cursor
    }

    /// Record that every frame up to logical cursor `cursor` has retired.
    pub fn mark_synced(&mut self, cursor: u64) {
        debug_assert!(cursor <= self.cursor, "synced past the ring cursor");
        self.synced = self.synced.max(cursor);
    }

    /// Replace the storage with a fresh ring of `capacity` bytes, returning
    /// the old storage.
    ///
    /// Allocations from the old storage stay valid as long as the returned
    /// value is kept alive; the caller schedules it for deletion once the
    /// frames that used it have retired. Only valid between frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn resize(&mut self, storage: S, capacity: u64) -> S {
        assert!(capacity > 0, "ephemeral ring capacity cannot be zero");
        log::info!(
            "Resizing ephemeral ring: {} -> {} bytes",
            self.capacity,
            capacity
        );

        // The new storage starts empty: nothing before `cursor` lives in it.
        self.base = self.cursor;
        self.submitted = self.cursor;
        self.capacity = capacity;
        self.wrap_count = 0;
        std::mem::replace(&mut self.storage, storage)
    }
}

impl<S> std::fmt::Debug for EphemeralRing<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralRing")
            .field("capacity", &self.capacity)
            .field("base", &self.base)
            .field("cursor", &self.cursor)
            .field("submitted", &self.submitted)
            .field("synced", &self.synced)
            .field("wrap_count", &self.wrap_count)
            .finish()
    }
}

/// Align a value up to the given alignment.
#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

static_assertions::assert_impl_all!(EphemeralRing<Vec<u8>>: Send);
