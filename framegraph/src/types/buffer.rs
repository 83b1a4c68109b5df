//! Buffer types.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Any of the above. Used for retired ephemeral rings.
        const EVERYTHING = Self::VERTEX.bits()
            | Self::INDEX.bits()
            | Self::UNIFORM.bits()
            | Self::STORAGE.bits();
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Where a buffer's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferAllocation<S> {
    /// Sub-range of the shared ephemeral ring. Never destroyed on its own.
    Ring {
        /// Byte offset into the ring.
        offset: u64,
    },
    /// Independent device allocation owned by the buffer.
    Owned(S),
}

/// Backend-side buffer record.
///
/// `S` is the backend's storage type for owned allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer<S> {
    /// Backing allocation.
    pub allocation: BufferAllocation<S>,
    /// Size in bytes.
    pub size: u64,
    /// Logical usage.
    pub usage: BufferUsage,
}

impl<S> Buffer<S> {
    /// Create a buffer living inside the ephemeral ring.
    pub fn ring(offset: u64, size: u64, usage: BufferUsage) -> Self {
        Self {
            allocation: BufferAllocation::Ring { offset },
            size,
            usage,
        }
    }

    /// Create a buffer with its own allocation.
    pub fn owned(storage: S, size: u64, usage: BufferUsage) -> Self {
        Self {
            allocation: BufferAllocation::Owned(storage),
            size,
            usage,
        }
    }

    /// Returns true if the buffer lives inside the ephemeral ring.
    pub fn is_ring_allocated(&self) -> bool {
        matches!(self.allocation, BufferAllocation::Ring { .. })
    }

    /// Byte offset of the buffer inside its backing allocation.
    pub fn offset(&self) -> u64 {
        match self.allocation {
            BufferAllocation::Ring { offset } => offset,
            BufferAllocation::Owned(_) => 0,
        }
    }
}
