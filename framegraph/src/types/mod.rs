//! Common types and descriptors for backend objects.
//!
//! This module contains format enums, usage flags, layouts and the
//! descriptor structs handed to [`Backend`](crate::backend::Backend)
//! creation calls.

mod buffer;
mod descriptor;
mod pipeline;
mod render_pass;
mod texture;

pub use buffer::{Buffer, BufferAllocation, BufferUsage};
pub use descriptor::{
    CombinedSampler, Descriptor, DescriptorIndex, DescriptorLayoutEntry, DescriptorType,
    RawHandle, decode_descriptor_set,
};
pub use pipeline::{PipelineDescriptor, ShaderMacros, VertexAttribute, VertexFormat};
pub use render_pass::{
    AttachmentSignature, ColorAttachmentDescriptor, DepthStencilAttachmentDescriptor,
    FramebufferDescriptor, Layout, MAX_COLOR_RENDERTARGETS, PassBegin, RenderPassDescriptor,
    is_render_pass_compatible,
};
pub use texture::{
    AddressMode, FilterMode, RenderTargetDescriptor, SamplerDescriptor, TextureDescriptor,
    TextureFormat, TextureUsage,
};
