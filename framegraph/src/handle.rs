//! Typed generational handles.
//!
//! A [`Handle`] is an opaque, copyable reference into a
//! [`ResourceContainer`](crate::container::ResourceContainer) slot. The kind
//! parameter only exists at the type level, so a buffer handle can't be
//! passed where a texture handle is expected.
//!
//! Handles pack into a single `u64` (`generation << 32 | index`). Live slots
//! always have a non-zero generation, which makes the raw value `0` the
//! invalid handle. The raw form is what gets written into descriptor blobs.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Generational handle to a resource of kind `K`.
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    /// The invalid handle. Never resolves.
    pub const INVALID: Self = Self {
        index: 0,
        generation: 0,
        _kind: PhantomData,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        debug_assert!(generation != 0, "live handles carry a non-zero generation");
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// Slot index of this handle.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns `false` for [`Handle::INVALID`].
    pub fn is_valid(&self) -> bool {
        self.generation != 0
    }

    /// Pack the handle into its raw representation.
    pub fn to_raw(&self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Rebuild a handle from [`to_raw`](Self::to_raw) output.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_raw().hash(state);
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}({}@{})", K::NAME, self.index, self.generation)
        } else {
            write!(f, "{}(invalid)", K::NAME)
        }
    }
}

/// Marker trait for resource kinds.
pub trait ResourceKind: 'static {
    /// Name used in debug output and panic messages.
    const NAME: &'static str;
}

/// Resource kind markers.
pub mod kind {
    use super::ResourceKind;

    macro_rules! resource_kinds {
        ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
            $(
                $(#[$meta])*
                #[derive(Debug)]
                pub enum $name {}

                impl ResourceKind for $name {
                    const NAME: &'static str = stringify!($name);
                }
            )*
        };
    }

    resource_kinds! {
        /// GPU buffer, owned or ring-allocated.
        Buffer,
        /// Sampled texture or render target view.
        Texture,
        /// Texture sampler.
        Sampler,
        /// Graphics pipeline.
        Pipeline,
        /// Descriptor set layout.
        DescriptorSetLayout,
        /// Backend render pass object.
        RenderPass,
        /// Framebuffer binding concrete attachments to a render pass.
        Framebuffer,
        /// Render target image.
        RenderTarget,
    }
}

pub type BufferHandle = Handle<kind::Buffer>;
pub type TextureHandle = Handle<kind::Texture>;
pub type SamplerHandle = Handle<kind::Sampler>;
pub type PipelineHandle = Handle<kind::Pipeline>;
pub type DsLayoutHandle = Handle<kind::DescriptorSetLayout>;
pub type RenderPassHandle = Handle<kind::RenderPass>;
pub type FramebufferHandle = Handle<kind::Framebuffer>;
pub type RenderTargetHandle = Handle<kind::RenderTarget>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        let handle = BufferHandle::INVALID;
        assert!(!handle.is_valid());
        assert_eq!(handle.to_raw(), 0);
        assert_eq!(BufferHandle::default(), handle);
    }

    #[test]
    fn test_raw_roundtrip_keeps_generation() {
        let handle = TextureHandle::new(7, 3);
        let raw = handle.to_raw();
        assert_eq!(raw, (3 << 32) | 7);
        assert_eq!(TextureHandle::from_raw(raw), handle);
    }

    #[test]
    fn test_debug_names_kind() {
        let handle = SamplerHandle::new(2, 1);
        assert_eq!(format!("{handle:?}"), "Sampler(2@1)");
        assert_eq!(format!("{:?}", SamplerHandle::INVALID), "Sampler(invalid)");
    }
}
