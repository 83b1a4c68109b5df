//! Backend abstraction layer.
//!
//! Every concrete graphics backend implements [`Backend`]. The render graph
//! only talks to this trait, so it runs unchanged on a real device or on the
//! [`DummyBackend`] used in tests.
//!
//! The trait covers three groups of calls:
//!
//! - **Object creation and deletion**: buffers, textures, samplers,
//!   pipelines, descriptor set layouts, render passes, framebuffers and
//!   render targets. All objects are referred to by typed
//!   [`Handle`](crate::handle::Handle)s.
//! - **Frame lifecycle**: `begin_frame` / `present_frame` bracket a frame;
//!   `wait_for_frame` and `wait_for_device_idle` block (bounded) on GPU
//!   completion. These return `Ok(false)` on timeout so the caller can pump
//!   window system events.
//! - **Recording**: render pass scopes, pipeline and resource binding, draws,
//!   blits, MSAA resolves and explicit layout transitions.
//!
//! # Error handling
//!
//! Device failures (out of memory, device or surface loss, pipeline
//! compilation errors) come back as [`BackendError`]. Misuse, such as an
//! invalid handle, recording outside a frame or beginning a render pass with
//! an incompatible framebuffer, panics.

mod descriptor_layouts;
#[cfg(feature = "dummy")]
mod dummy;
mod error;

pub use descriptor_layouts::DescriptorLayoutRegistry;
#[cfg(feature = "dummy")]
pub use dummy::{DummyBackend, DummyCommand, DummyFence};
pub use error::{BackendError, BackendResult};

use crate::config::SwapchainDescriptor;
use crate::handle::{
    BufferHandle, DsLayoutHandle, FramebufferHandle, PipelineHandle, RenderPassHandle,
    RenderTargetHandle, SamplerHandle, TextureHandle,
};
use crate::types::{
    BufferUsage, DescriptorLayoutEntry, FramebufferDescriptor, Layout, PipelineDescriptor,
    RenderPassDescriptor, RenderTargetDescriptor, SamplerDescriptor, TextureDescriptor,
    TextureFormat,
};

/// Contract every graphics backend satisfies.
///
/// The trait is object safe; the render graph accepts `dyn Backend` as well
/// as concrete backends.
pub trait Backend {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    // ------------------------------------------------------------------
    // Object creation
    // ------------------------------------------------------------------

    /// Create a buffer with its own allocation, initialized with `contents`.
    fn create_buffer(&mut self, usage: BufferUsage, contents: &[u8])
    -> BackendResult<BufferHandle>;

    /// Create a buffer inside the ephemeral ring. The handle is valid until
    /// the current frame retires.
    fn create_ephemeral_buffer(
        &mut self,
        usage: BufferUsage,
        contents: &[u8],
    ) -> BackendResult<BufferHandle>;

    /// Create a sampled texture.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a sampler.
    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    /// Compile a pipeline. Failure is reported, never papered over with a
    /// fallback.
    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> BackendResult<PipelineHandle>;

    /// Create a descriptor set layout from an ordered list of bindings.
    fn create_descriptor_set_layout(
        &mut self,
        layout: &[DescriptorLayoutEntry],
    ) -> BackendResult<DsLayoutHandle>;

    /// Create a render pass.
    fn create_render_pass(&mut self, desc: &RenderPassDescriptor)
    -> BackendResult<RenderPassHandle>;

    /// Create a framebuffer binding concrete images to a render pass.
    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle>;

    /// Create a render target image.
    fn create_render_target(
        &mut self,
        desc: &RenderTargetDescriptor,
    ) -> BackendResult<RenderTargetHandle>;

    /// Shader-readable view of a render target in `format`, which must be the
    /// target's format or its additional view format.
    fn render_target_view(&self, target: RenderTargetHandle, format: TextureFormat)
    -> TextureHandle;

    // ------------------------------------------------------------------
    // Object deletion
    //
    // Apart from framebuffers, objects are deleted only once the device is
    // idle (the render graph waits before resetting).
    // ------------------------------------------------------------------

    /// Delete an owned buffer.
    fn delete_buffer(&mut self, handle: BufferHandle);
    /// Delete a texture.
    fn delete_texture(&mut self, handle: TextureHandle);
    /// Delete a sampler.
    fn delete_sampler(&mut self, handle: SamplerHandle);
    /// Delete a pipeline.
    fn delete_pipeline(&mut self, handle: PipelineHandle);
    /// Delete a render pass.
    fn delete_render_pass(&mut self, handle: RenderPassHandle);
    /// Delete a framebuffer.
    ///
    /// Submitted frames may still reference it. Destruction is deferred
    /// until they have retired (see
    /// [`FrameTracker::defer_framebuffer`](crate::frame::FrameTracker::defer_framebuffer)).
    fn delete_framebuffer(&mut self, handle: FramebufferHandle);
    /// Delete a render target and its views.
    fn delete_render_target(&mut self, handle: RenderTargetHandle);

    // ------------------------------------------------------------------
    // Frame lifecycle
    // ------------------------------------------------------------------

    /// Acquire the next frame slot, retiring its previous submission.
    ///
    /// Returns `Ok(false)` on fence timeout. [`BackendError::SurfaceLost`]
    /// means the render graph must be rebuilt for the new drawable size.
    fn begin_frame(&mut self) -> BackendResult<bool>;

    /// Present `image` (which must be in [`Layout::TransferSrc`]) and submit
    /// the frame.
    fn present_frame(&mut self, image: RenderTargetHandle) -> BackendResult<()>;

    /// Wait for frame slot `index` to retire. `Ok(false)` on timeout.
    fn wait_for_frame(&mut self, index: usize) -> BackendResult<bool>;

    /// Wait for every frame slot to retire. `Ok(false)` on timeout.
    fn wait_for_device_idle(&mut self) -> BackendResult<bool>;

    /// Replace the ephemeral ring with one of `size` bytes. Only valid
    /// between frames.
    fn recreate_ring_buffer(&mut self, size: u64) -> BackendResult<()>;

    /// Request swapchain changes, applied at the next `begin_frame`.
    fn set_swapchain_desc(&mut self, desc: &SwapchainDescriptor);

    /// Current drawable size in pixels.
    fn drawable_size(&self) -> (u32, u32);

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Begin a render pass. The framebuffer must be compatible with the pass.
    fn begin_render_pass(&mut self, pass: RenderPassHandle, framebuffer: FramebufferHandle);

    /// End the current render pass.
    fn end_render_pass(&mut self);

    /// Annotate a layout transition of `image`.
    fn layout_transition(&mut self, image: RenderTargetHandle, src: Layout, dest: Layout);

    /// Copy `source` into `dest`.
    fn blit(&mut self, source: RenderTargetHandle, dest: RenderTargetHandle);

    /// Resolve multisampled `source` into single-sampled `dest`.
    fn resolve_msaa(&mut self, source: RenderTargetHandle, dest: RenderTargetHandle);

    /// Set the viewport.
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Set the scissor rectangle. Requires a pipeline with scissor test.
    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Bind a pipeline. Descriptor bindings become dirty.
    fn bind_pipeline(&mut self, pipeline: PipelineHandle);

    /// Bind an index buffer.
    fn bind_index_buffer(&mut self, buffer: BufferHandle, bit16: bool);

    /// Bind a vertex buffer.
    fn bind_vertex_buffer(&mut self, binding: u32, buffer: BufferHandle);

    /// Bind descriptor set `index` from a packed blob of raw handles laid out
    /// as described by `layout`.
    fn bind_descriptor_set(&mut self, index: u32, layout: DsLayoutHandle, data: &[u8]);

    /// Non-indexed draw.
    fn draw(&mut self, first_vertex: u32, vertex_count: u32);

    /// Indexed, instanced draw.
    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32);

    /// Indexed draw starting at `first_index`.
    fn draw_indexed_offset(
        &mut self,
        vertex_count: u32,
        first_index: u32,
        min_index: u32,
        max_index: u32,
    );
}

static_assertions::assert_obj_safe!(Backend);
