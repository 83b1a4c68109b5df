//! Descriptor set layouts and packed descriptor blobs.
//!
//! A descriptor set is bound from a plain `#[repr(C)]` struct of raw handles.
//! The layout lists, in binding order, the type of each descriptor and its
//! byte offset inside that struct.
//!
//! # Example
//!
//! ```ignore
//! #[repr(C)]
//! #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
//! struct GlobalSet {
//!     globals: RawHandle,
//!     color: CombinedSampler,
//! }
//!
//! let layout = backend.create_descriptor_set_layout(&[
//!     DescriptorLayoutEntry::new(DescriptorType::UniformBuffer, offset_of!(GlobalSet, globals)),
//!     DescriptorLayoutEntry::new(DescriptorType::CombinedSampler, offset_of!(GlobalSet, color)),
//! ])?;
//!
//! let set = GlobalSet {
//!     globals: ubo.to_raw(),
//!     color: CombinedSampler::new(texture, sampler),
//! };
//! backend.bind_descriptor_set(0, layout, bytemuck::bytes_of(&set));
//! ```

use bytemuck::{Pod, Zeroable};

use crate::handle::{BufferHandle, SamplerHandle, TextureHandle};

/// Raw handle value as stored in descriptor blobs.
pub type RawHandle = u64;

/// Type of one descriptor in a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Uniform buffer (one raw buffer handle).
    UniformBuffer,
    /// Storage buffer (one raw buffer handle).
    StorageBuffer,
    /// Sampler (one raw sampler handle).
    Sampler,
    /// Sampled texture (one raw texture handle).
    Texture,
    /// Texture plus sampler ([`CombinedSampler`]).
    CombinedSampler,
}

impl DescriptorType {
    /// Bytes this descriptor occupies in a blob.
    pub fn size(&self) -> usize {
        match self {
            Self::CombinedSampler => std::mem::size_of::<CombinedSampler>(),
            _ => std::mem::size_of::<RawHandle>(),
        }
    }
}

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorLayoutEntry {
    /// Descriptor type.
    pub ty: DescriptorType,
    /// Byte offset of the descriptor inside the bound blob.
    pub offset: usize,
}

impl DescriptorLayoutEntry {
    /// Create a layout entry.
    pub fn new(ty: DescriptorType, offset: usize) -> Self {
        Self { ty, offset }
    }
}

/// Texture and sampler bound together.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct CombinedSampler {
    /// Raw texture handle.
    pub texture: RawHandle,
    /// Raw sampler handle.
    pub sampler: RawHandle,
}

impl CombinedSampler {
    /// Pack a texture and sampler.
    pub fn new(texture: TextureHandle, sampler: SamplerHandle) -> Self {
        Self {
            texture: texture.to_raw(),
            sampler: sampler.to_raw(),
        }
    }
}

/// A decoded descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// Uniform or storage buffer.
    Buffer(BufferHandle),
    /// Sampler.
    Sampler(SamplerHandle),
    /// Sampled texture.
    Texture(TextureHandle),
    /// Texture plus sampler.
    CombinedSampler {
        /// Texture.
        texture: TextureHandle,
        /// Sampler.
        sampler: SamplerHandle,
    },
}

/// Address of one descriptor: set index and binding index inside the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorIndex {
    /// Descriptor set index.
    pub set: u32,
    /// Binding index inside the set.
    pub binding: u32,
}

/// Decode `blob` against `layout`, yielding one descriptor per layout entry.
///
/// # Panics
///
/// Panics if an entry reaches past the end of the blob.
pub fn decode_descriptor_set(
    set: u32,
    layout: &[DescriptorLayoutEntry],
    blob: &[u8],
) -> Vec<(DescriptorIndex, Descriptor)> {
    layout
        .iter()
        .enumerate()
        .map(|(binding, entry)| {
            let end = entry.offset + entry.ty.size();
            assert!(
                end <= blob.len(),
                "descriptor {binding} of set {set} reads bytes {}..{end} of a {}-byte blob",
                entry.offset,
                blob.len()
            );
            let bytes = &blob[entry.offset..end];
            let descriptor = match entry.ty {
                DescriptorType::UniformBuffer | DescriptorType::StorageBuffer => {
                    Descriptor::Buffer(BufferHandle::from_raw(bytemuck::pod_read_unaligned(bytes)))
                }
                DescriptorType::Sampler => {
                    Descriptor::Sampler(SamplerHandle::from_raw(bytemuck::pod_read_unaligned(bytes)))
                }
                DescriptorType::Texture => {
                    Descriptor::Texture(TextureHandle::from_raw(bytemuck::pod_read_unaligned(bytes)))
                }
                DescriptorType::CombinedSampler => {
                    let combined: CombinedSampler = bytemuck::pod_read_unaligned(bytes);
                    Descriptor::CombinedSampler {
                        texture: TextureHandle::from_raw(combined.texture),
                        sampler: SamplerHandle::from_raw(combined.sampler),
                    }
                }
            };
            let index = DescriptorIndex {
                set,
                binding: binding as u32,
            };
            (index, descriptor)
        })
        .collect()
}
