//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU, but it implements the full
//! [`Backend`] contract on host memory so the frame graph, the frame tracker
//! and the ephemeral ring can be exercised without hardware:
//!
//! - Buffers and the ephemeral ring have real backing bytes, so uploaded
//!   contents can be inspected with [`DummyBackend::buffer_contents`].
//! - Fences are simulated. By default a submission completes immediately;
//!   with [`DummyBackend::set_auto_signal`] turned off, frames stay
//!   outstanding until [`DummyBackend::signal_all_fences`] is called.
//! - Recording state is validated the way a driver's debug layer would:
//!   recording outside a frame, drawing without a pipeline, a scissor-tested
//!   pipeline without a scissor rect, binding a pipeline against an
//!   incompatible render pass and presenting an image that isn't in
//!   [`Layout::TransferSrc`] all panic.
//! - With debug validation enabled (see
//!   [`RendererConfig::debug`](crate::config::RendererConfig::debug)), every
//!   render target's layout is tracked and each transition, blit, resolve and
//!   render pass is checked against it, and descriptor blobs are checked
//!   against buffer usage.
//! - Every recorded command is appended to a log ([`DummyBackend::commands`])
//!   that is cleared when the next frame begins.
//! - Deleting a framebuffer while a submitted frame may still use it defers
//!   the destruction until that frame retires.
//! - Dropping the backend (or [`DummyBackend::shutdown`]) waits for the
//!   device to go idle and destroys whatever the caller never deleted,
//!   reporting it at warn level.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::DescriptorBindings;
use crate::config::{RendererConfig, SwapchainDescriptor};
use crate::container::ResourceContainer;
use crate::frame::{FenceStatus, FrameResources, FrameTracker};
use crate::handle::{
    BufferHandle, DsLayoutHandle, FramebufferHandle, PipelineHandle, RenderPassHandle,
    RenderTargetHandle, SamplerHandle, TextureHandle, kind,
};
use crate::ring::EphemeralRing;
use crate::types::{
    AttachmentSignature, Buffer, BufferAllocation, BufferUsage, Descriptor, DescriptorIndex,
    DescriptorLayoutEntry, DescriptorType, FramebufferDescriptor, Layout,
    MAX_COLOR_RENDERTARGETS, PipelineDescriptor, RenderPassDescriptor, RenderTargetDescriptor,
    SamplerDescriptor, TextureDescriptor, TextureFormat, is_render_pass_compatible,
};

use super::{Backend, BackendError, BackendResult, DescriptorLayoutRegistry};

/// Alignment of ephemeral allocations.
const EPHEMERAL_ALIGNMENT: u64 = 256;

/// Simulated fence: the sequence number of the submission it guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DummyFence(u64);

/// A command recorded by the dummy backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    BeginRenderPass {
        pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
    },
    EndRenderPass,
    LayoutTransition {
        image: RenderTargetHandle,
        src: Layout,
        dest: Layout,
    },
    Blit {
        source: RenderTargetHandle,
        dest: RenderTargetHandle,
    },
    ResolveMsaa {
        source: RenderTargetHandle,
        dest: RenderTargetHandle,
    },
    SetViewport {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    SetScissorRect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    BindPipeline(PipelineHandle),
    BindIndexBuffer {
        buffer: BufferHandle,
        bit16: bool,
    },
    BindVertexBuffer {
        binding: u32,
        buffer: BufferHandle,
    },
    /// Pending descriptors were flushed before a draw.
    FlushDescriptors {
        count: usize,
    },
    Draw {
        first_vertex: u32,
        vertex_count: u32,
    },
    DrawIndexedInstanced {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexedOffset {
        vertex_count: u32,
        first_index: u32,
    },
    Present(RenderTargetHandle),
}

/// The part of the backend the frame tracker reclaims through.
#[derive(Debug)]
struct DummyDevice {
    buffers: ResourceContainer<Buffer<Vec<u8>>, kind::Buffer>,
    framebuffers: ResourceContainer<DummyFramebuffer, kind::Framebuffer>,
    ring: EphemeralRing<Vec<u8>>,
    /// Ring buffers allocated before the ring was recreated, mapped to the
    /// owned buffer keeping the retired ring storage alive.
    retired_ring_buffers: HashMap<BufferHandle, BufferHandle>,
    /// Sequence number of the next fence.
    next_fence: u64,
    /// Fences with a lower sequence number have signaled.
    completed_fences: u64,
    auto_signal: bool,
    fence_failure: Option<BackendError>,
    fence_timeout: Duration,
}

impl FrameResources for DummyDevice {
    type Fence = DummyFence;

    fn wait_fence(&mut self, fence: &DummyFence) -> BackendResult<FenceStatus> {
        if let Some(err) = self.fence_failure.take() {
            log::warn!("DummyBackend: fence {} wait failed: {}", fence.0, err);
            return Err(err);
        }
        if fence.0 < self.completed_fences {
            Ok(FenceStatus::Signaled)
        } else {
            log::trace!(
                "DummyBackend: fence {} not signaled within {:?}",
                fence.0,
                self.fence_timeout
            );
            Ok(FenceStatus::Timeout)
        }
    }

    fn release_ephemeral(&mut self, buffer: BufferHandle) {
        self.retired_ring_buffers.remove(&buffer);
        self.buffers
            .remove(buffer, |buffer| match buffer.allocation {
                BufferAllocation::Ring { offset } => {
                    log::trace!(
                        "DummyBackend: reclaiming ring buffer at {} ({} bytes)",
                        offset,
                        buffer.size
                    );
                }
                BufferAllocation::Owned(_) => {
                    log::trace!(
                        "DummyBackend: destroying retired buffer ({} bytes)",
                        buffer.size
                    );
                }
            });
    }

    fn release_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.framebuffers.remove(framebuffer, drop);
        log::trace!("DummyBackend: destroying retired framebuffer {framebuffer:?}");
    }

    fn ring_synced(&mut self, cursor: u64) {
        self.ring.mark_synced(cursor);
    }
}

#[derive(Debug)]
struct DummyTexture {
    label: Option<String>,
    width: u32,
    height: u32,
    format: TextureFormat,
    /// Set for render target views.
    render_target: Option<RenderTargetHandle>,
}

#[derive(Debug)]
struct DummyRenderTarget {
    desc: RenderTargetDescriptor,
    layout: Layout,
    views: Vec<(TextureFormat, TextureHandle)>,
}

#[derive(Debug)]
struct DummyFramebuffer {
    desc: FramebufferDescriptor,
    signature: AttachmentSignature,
}

/// Render pass being recorded.
#[derive(Debug, Clone, Copy)]
struct CurrentPass {
    pass: RenderPassHandle,
    framebuffer: FramebufferHandle,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    device: DummyDevice,
    frames: FrameTracker<DummyFence>,
    textures: ResourceContainer<DummyTexture, kind::Texture>,
    samplers: ResourceContainer<SamplerDescriptor, kind::Sampler>,
    pipelines: ResourceContainer<PipelineDescriptor, kind::Pipeline>,
    layouts: DescriptorLayoutRegistry,
    render_passes: ResourceContainer<RenderPassDescriptor, kind::RenderPass>,
    render_targets: ResourceContainer<DummyRenderTarget, kind::RenderTarget>,

    swapchain: SwapchainDescriptor,
    wanted_swapchain: Option<SwapchainDescriptor>,
    drawable_size: (u32, u32),
    surface_lost: bool,
    shader_errors: HashMap<String, String>,

    debug: bool,
    in_frame: bool,
    current_pass: Option<CurrentPass>,
    current_pipeline: Option<PipelineHandle>,
    pipeline_drawn: bool,
    scissor_set: bool,
    descriptors: DescriptorBindings,
    descriptor_flushes: Vec<Vec<(DescriptorIndex, Descriptor)>>,
    commands: Vec<DummyCommand>,
}

impl DummyBackend {
    /// Create a dummy backend.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate.
    pub fn new(config: &RendererConfig) -> Self {
        if let Err(err) = config.validate() {
            panic!("invalid renderer config: {err}");
        }

        let ring_size = config.ephemeral_ring_size;
        let swapchain = config.swapchain;
        log::info!(
            "DummyBackend: created ({}x{}, {} frames in flight, {} byte ephemeral ring)",
            swapchain.width,
            swapchain.height,
            swapchain.num_frames,
            ring_size
        );

        Self {
            device: DummyDevice {
                buffers: ResourceContainer::new(),
                framebuffers: ResourceContainer::new(),
                ring: EphemeralRing::new(vec![0; ring_size as usize], ring_size),
                retired_ring_buffers: HashMap::new(),
                next_fence: 0,
                completed_fences: 0,
                auto_signal: true,
                fence_failure: None,
                fence_timeout: config.fence_timeout,
            },
            frames: FrameTracker::new(swapchain.num_frames as usize),
            textures: ResourceContainer::new(),
            samplers: ResourceContainer::new(),
            pipelines: ResourceContainer::new(),
            layouts: DescriptorLayoutRegistry::new(),
            render_passes: ResourceContainer::new(),
            render_targets: ResourceContainer::new(),
            swapchain,
            wanted_swapchain: None,
            drawable_size: (swapchain.width, swapchain.height),
            surface_lost: false,
            shader_errors: HashMap::new(),
            debug: config.debug,
            in_frame: false,
            current_pass: None,
            current_pipeline: None,
            pipeline_drawn: true,
            scissor_set: false,
            descriptors: DescriptorBindings::new(),
            descriptor_flushes: Vec::new(),
            commands: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Wait for the device to go idle, then destroy every remaining object.
    ///
    /// Anything still alive here was never deleted by its owner and is
    /// reported at warn level. Returns the number of leaked objects. Runs on
    /// drop; calling it again finds nothing left.
    pub fn shutdown(&mut self) -> usize {
        loop {
            match self.frames.wait_for_device_idle(&mut self.device) {
                Ok(true) => break,
                // Simulated submissions always complete eventually.
                Ok(false) => self.signal_all_fences(),
                Err(err) => log::warn!("DummyBackend: device wait failed during shutdown: {err}"),
            }
        }
        assert!(
            self.frames.is_idle(),
            "frames still outstanding after device idle"
        );

        let mut leaked = 0;
        let mut report = |kind: &str, count: usize| {
            if count > 0 {
                log::warn!("DummyBackend: {count} {kind} leaked at shutdown");
            }
            leaked += count;
        };

        let textures = &mut self.textures;
        report("render target(s)", self.render_targets.len());
        self.render_targets.clear_with(|handle, rt| {
            log::debug!("DummyBackend: leaked render target {handle:?} {:?}", rt.desc.label);
            for (_, view) in rt.views {
                textures.remove(view, drop);
            }
        });

        report("texture(s)", self.textures.len());
        self.textures.clear_with(|handle, texture| {
            log::debug!("DummyBackend: leaked texture {handle:?} {:?}", texture.label);
        });

        report("framebuffer(s)", self.device.framebuffers.len());
        self.device
            .framebuffers
            .clear_with(|handle, _| log::debug!("DummyBackend: leaked framebuffer {handle:?}"));

        report("render pass(es)", self.render_passes.len());
        self.render_passes
            .clear_with(|handle, _| log::debug!("DummyBackend: leaked render pass {handle:?}"));

        report("pipeline(s)", self.pipelines.len());
        self.pipelines.clear_with(|handle, desc| {
            log::debug!("DummyBackend: leaked pipeline {handle:?} ({})", desc.vertex_shader);
        });

        report("sampler(s)", self.samplers.len());
        self.samplers
            .clear_with(|handle, _| log::debug!("DummyBackend: leaked sampler {handle:?}"));

        // Ring allocations of an unsubmitted frame are not leaks.
        let owned = self
            .device
            .buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_ring_allocated())
            .count();
        report("buffer(s)", owned);
        self.device.buffers.clear_with(|handle, buffer| {
            if !buffer.is_ring_allocated() {
                log::debug!("DummyBackend: leaked buffer {handle:?} ({} bytes)", buffer.size);
            }
        });
        self.device.retired_ring_buffers.clear();

        self.current_pass = None;
        self.current_pipeline = None;
        leaked
    }

    // ------------------------------------------------------------------
    // Simulation controls
    // ------------------------------------------------------------------

    /// Make submissions complete as soon as they are presented (the
    /// default), or keep them outstanding until
    /// [`signal_all_fences`](Self::signal_all_fences).
    pub fn set_auto_signal(&mut self, enabled: bool) {
        self.device.auto_signal = enabled;
    }

    /// Complete every submission made so far.
    pub fn signal_all_fences(&mut self) {
        self.device.completed_fences = self.device.next_fence;
    }

    /// Make the next fence wait fail with `err`.
    pub fn fail_next_fence_wait(&mut self, err: BackendError) {
        self.device.fence_failure = Some(err);
    }

    /// Simulate losing the surface: the next `begin_frame` fails with
    /// [`BackendError::SurfaceLost`] and the drawable becomes
    /// `width` x `height`.
    pub fn lose_surface(&mut self, width: u32, height: u32) {
        log::info!("DummyBackend: surface lost, drawable is now {width}x{height}");
        self.surface_lost = true;
        self.drawable_size = (width, height);
    }

    /// Make shader `name` fail to compile with `message`.
    pub fn set_shader_error(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.shader_errors.insert(name.into(), message.into());
    }

    /// Force the tracked layout of a render target, e.g. for an external
    /// image produced outside the graph.
    pub fn set_render_target_layout(&mut self, target: RenderTargetHandle, layout: Layout) {
        self.render_targets.get_mut(target).layout = layout;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Contents of a buffer.
    ///
    /// Ring-allocated buffers are read from the ring they were allocated
    /// from, which may have been retired by
    /// [`recreate_ring_buffer`](Backend::recreate_ring_buffer) since.
    pub fn buffer_contents(&self, handle: BufferHandle) -> &[u8] {
        let buffer = self.device.buffers.get(handle);
        match &buffer.allocation {
            BufferAllocation::Ring { offset } => {
                let storage: &[u8] = match self.device.retired_ring_buffers.get(&handle) {
                    Some(&retired) => match &self.device.buffers.get(retired).allocation {
                        BufferAllocation::Owned(bytes) => bytes.as_slice(),
                        BufferAllocation::Ring { .. } => {
                            unreachable!("retired ring storage is an owned buffer")
                        }
                    },
                    None => self.device.ring.storage().as_slice(),
                };
                let start = *offset as usize;
                &storage[start..start + buffer.size as usize]
            }
            BufferAllocation::Owned(bytes) => bytes,
        }
    }

    /// Returns true if `buffer` still resolves.
    pub fn buffer_exists(&self, buffer: BufferHandle) -> bool {
        self.device.buffers.contains(buffer)
    }

    /// Number of live buffers, ring-allocated ones included.
    pub fn buffer_count(&self) -> usize {
        self.device.buffers.len()
    }

    /// Number of live textures, render target views included.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of live pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Number of live render passes.
    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    /// Number of live framebuffers.
    pub fn framebuffer_count(&self) -> usize {
        self.device.framebuffers.len()
    }

    /// Number of live render targets.
    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    /// Tracked layout of a render target.
    pub fn render_target_layout(&self, target: RenderTargetHandle) -> Layout {
        self.render_targets.get(target).layout
    }

    /// Descriptor of a render pass.
    pub fn render_pass_desc(&self, pass: RenderPassHandle) -> &RenderPassDescriptor {
        self.render_passes.get(pass)
    }

    /// Descriptor of a framebuffer.
    pub fn framebuffer_desc(&self, framebuffer: FramebufferHandle) -> &FramebufferDescriptor {
        &self.device.framebuffers.get(framebuffer).desc
    }

    /// Descriptor batches flushed since the current frame began.
    pub fn descriptor_flushes(&self) -> &[Vec<(DescriptorIndex, Descriptor)>] {
        &self.descriptor_flushes
    }

    /// Commands recorded since the current frame began.
    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }

    /// Frame tracker.
    pub fn frame_tracker(&self) -> &FrameTracker<DummyFence> {
        &self.frames
    }

    /// Ephemeral ring.
    pub fn ring(&self) -> &EphemeralRing<Vec<u8>> {
        &self.device.ring
    }

    /// Swapchain currently in effect.
    pub fn swapchain(&self) -> &SwapchainDescriptor {
        &self.swapchain
    }

    /// Descriptor set layouts created so far.
    pub fn layout_registry(&self) -> &DescriptorLayoutRegistry {
        &self.layouts
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&mut self, command: DummyCommand) {
        self.commands.push(command);
    }

    fn assert_recording(&self, what: &str) {
        assert!(self.in_frame, "{what} called outside of a frame");
    }

    fn assert_outside_render_pass(&self, what: &str) {
        self.assert_recording(what);
        assert!(
            self.current_pass.is_none(),
            "{what} called inside a render pass"
        );
    }

    fn bound_pipeline(&self, what: &str) -> &PipelineDescriptor {
        self.assert_recording(what);
        let Some(pipeline) = self.current_pipeline else {
            panic!("{what} called without a bound pipeline");
        };
        self.pipelines.get(pipeline)
    }

    fn assert_can_draw(&self, what: &str, vertex_count: u32) {
        assert!(
            self.current_pass.is_some(),
            "{what} called outside a render pass"
        );
        let pipeline = self.bound_pipeline(what);
        assert!(vertex_count > 0, "{what} with zero vertices");
        assert!(
            !pipeline.scissor_test || self.scissor_set,
            "{what}: pipeline {:?} uses scissor test but no scissor rect was set",
            pipeline.label
        );
    }

    /// Flush pending descriptors if a binding changed, then mark the
    /// pipeline as used.
    fn prepare_draw(&mut self) {
        if let Some(batch) = self.descriptors.take_flush() {
            self.commands.push(DummyCommand::FlushDescriptors { count: batch.len() });
            self.descriptor_flushes.push(batch);
        }
        self.pipeline_drawn = true;
    }

    /// A never-written image (still `Undefined`) satisfies any expectation.
    fn check_layout(&self, target: RenderTargetHandle, expected: Layout, what: &str) {
        if !self.debug || expected == Layout::Undefined {
            return;
        }
        let actual = self.render_targets.get(target).layout;
        if actual == Layout::Undefined {
            return;
        }
        assert_eq!(
            actual,
            expected,
            "{what}: render target {target:?} is in layout {}, expected {}",
            actual.name(),
            expected.name()
        );
    }

    fn set_layout(&mut self, target: RenderTargetHandle, layout: Layout) {
        self.render_targets.get_mut(target).layout = layout;
    }

    fn validate_descriptor_set(&self, set: u32, entries: &[DescriptorLayoutEntry], data: &[u8]) {
        let decoded = crate::types::decode_descriptor_set(set, entries, data);
        for (entry, (index, descriptor)) in entries.iter().zip(decoded) {
            match descriptor {
                Descriptor::Buffer(buffer) => {
                    let usage = self.device.buffers.get(buffer).usage;
                    let required = match entry.ty {
                        DescriptorType::StorageBuffer => BufferUsage::STORAGE,
                        _ => BufferUsage::UNIFORM,
                    };
                    assert!(
                        usage.contains(required),
                        "descriptor {index:?}: buffer {buffer:?} with usage {usage:?} bound as {:?}",
                        entry.ty
                    );
                }
                Descriptor::Sampler(sampler) => {
                    assert!(
                        self.samplers.contains(sampler),
                        "descriptor {index:?}: invalid sampler {sampler:?}"
                    );
                }
                Descriptor::Texture(texture) => {
                    assert!(
                        self.textures.contains(texture),
                        "descriptor {index:?}: invalid texture {texture:?}"
                    );
                }
                Descriptor::CombinedSampler { texture, sampler } => {
                    assert!(
                        self.textures.contains(texture) && self.samplers.contains(sampler),
                        "descriptor {index:?}: invalid combined sampler {texture:?}/{sampler:?}"
                    );
                }
            }
        }
    }

    fn framebuffer_signature(&self, desc: &FramebufferDescriptor) -> AttachmentSignature {
        let mut sample_count = None;
        let mut format_of = |target: RenderTargetHandle| {
            let rt = &self.render_targets.get(target).desc;
            match sample_count {
                None => sample_count = Some(rt.sample_count),
                Some(count) => assert_eq!(
                    count, rt.sample_count,
                    "framebuffer attachments have different sample counts"
                ),
            }
            rt.format
        };

        let colors = desc.colors.map(|target| target.map(&mut format_of));
        let depth_stencil = desc.depth_stencil.map(&mut format_of);
        let Some(sample_count) = sample_count else {
            panic!("framebuffer {:?} has no attachments", desc.label);
        };

        AttachmentSignature {
            sample_count,
            colors,
            depth_stencil,
        }
    }

    /// Apply a pending swapchain change. `Ok(false)` if shrinking the frame
    /// tracker had to wait and timed out.
    fn apply_swapchain(&mut self) -> BackendResult<bool> {
        let Some(wanted) = self.wanted_swapchain else {
            return Ok(true);
        };

        let num_frames = wanted.num_frames.max(1);
        if !self.frames.resize(num_frames as usize, &mut self.device)? {
            return Ok(false);
        }

        let (width, height) = self.drawable_size;
        self.swapchain = SwapchainDescriptor {
            width,
            height,
            num_frames,
            ..wanted
        };
        self.wanted_swapchain = None;
        log::info!(
            "DummyBackend: swapchain {}x{}, {} frames, vsync {:?}, fullscreen {}",
            width,
            height,
            num_frames,
            self.swapchain.vsync,
            self.swapchain.fullscreen
        );
        Ok(true)
    }
}

impl Drop for DummyBackend {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let leaked = self.shutdown();
        log::info!("DummyBackend: destroyed ({leaked} leaked objects)");
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_buffer(
        &mut self,
        usage: BufferUsage,
        contents: &[u8],
    ) -> BackendResult<BufferHandle> {
        assert!(!contents.is_empty(), "buffers cannot be empty");

        let size = contents.len() as u64;
        let (handle, _) = self
            .device
            .buffers
            .add(Buffer::owned(contents.to_vec(), size, usage));
        log::trace!("DummyBackend: creating buffer {handle:?} ({size} bytes, {usage:?})");
        Ok(handle)
    }

    fn create_ephemeral_buffer(
        &mut self,
        usage: BufferUsage,
        contents: &[u8],
    ) -> BackendResult<BufferHandle> {
        assert!(!contents.is_empty(), "buffers cannot be empty");

        let size = contents.len() as u64;
        let allocation = self.device.ring.allocate(size, EPHEMERAL_ALIGNMENT)?;
        let start = allocation.offset as usize;
        self.device.ring.storage_mut()[start..start + contents.len()].copy_from_slice(contents);

        let (handle, _) = self
            .device
            .buffers
            .add(Buffer::ring(allocation.offset, size, usage));
        self.frames.track_ephemeral(handle);
        log::trace!(
            "DummyBackend: creating ephemeral buffer {handle:?} at {} ({size} bytes)",
            allocation.offset
        );
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        assert!(desc.width > 0 && desc.height > 0, "texture has no pixels");
        assert!(desc.mip_level_count > 0, "texture has no mip levels");
        if desc.mip_data.len() > desc.mip_level_count as usize {
            return Err(BackendError::InvalidParameter(format!(
                "{} mip levels of data for a texture with {} levels",
                desc.mip_data.len(),
                desc.mip_level_count
            )));
        }

        let (handle, _) = self.textures.add(DummyTexture {
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            render_target: None,
        });
        log::trace!(
            "DummyBackend: creating texture {:?} {:?} ({}x{}, {:?})",
            handle,
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(handle)
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        let (handle, _) = self.samplers.add(desc.clone());
        log::trace!("DummyBackend: creating sampler {:?} {:?}", handle, desc.label);
        Ok(handle)
    }

    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> BackendResult<PipelineHandle> {
        let label = desc.label.as_deref().unwrap_or("unnamed");
        for shader in [&desc.vertex_shader, &desc.fragment_shader] {
            if shader.is_empty() {
                return Err(BackendError::PipelineCreationFailed(format!(
                    "pipeline {label} is missing a shader"
                )));
            }
            if let Some(message) = self.shader_errors.get(shader.as_str()) {
                return Err(BackendError::PipelineCreationFailed(format!(
                    "pipeline {label}: shader {shader}: {message}"
                )));
            }
        }

        let pass = self.render_passes.get(desc.render_pass);
        if pass.sample_count != desc.sample_count {
            return Err(BackendError::PipelineCreationFailed(format!(
                "pipeline {label} has {} samples, render pass has {}",
                desc.sample_count, pass.sample_count
            )));
        }
        for layout in desc.descriptor_set_layouts.iter().filter(|l| l.is_valid()) {
            self.layouts.get(*layout);
        }

        let (handle, _) = self.pipelines.add(desc.clone());
        log::trace!("DummyBackend: creating pipeline {handle:?} {label}");
        Ok(handle)
    }

    fn create_descriptor_set_layout(
        &mut self,
        layout: &[DescriptorLayoutEntry],
    ) -> BackendResult<DsLayoutHandle> {
        Ok(self.layouts.register(layout))
    }

    fn create_render_pass(
        &mut self,
        desc: &RenderPassDescriptor,
    ) -> BackendResult<RenderPassHandle> {
        assert!(desc.sample_count >= 1, "render pass sample count is zero");
        assert!(
            desc.colors.iter().any(Option::is_some) || desc.depth_stencil.is_some(),
            "render pass {:?} has no attachments",
            desc.label
        );
        for color in desc.colors.iter().flatten() {
            assert!(
                !color.format.is_depth_stencil(),
                "color attachment with depth format {:?}",
                color.format
            );
            assert!(
                !matches!(color.final_layout, Layout::Undefined | Layout::TransferDst),
                "render pass {:?} leaves a color attachment in layout {}",
                desc.label,
                color.final_layout.name()
            );
        }
        if let Some(depth) = &desc.depth_stencil {
            assert!(
                depth.format.is_depth_stencil(),
                "depth attachment with color format {:?}",
                depth.format
            );
        }

        let (handle, _) = self.render_passes.add(desc.clone());
        log::trace!(
            "DummyBackend: creating render pass {:?} {:?}",
            handle,
            desc.label
        );
        Ok(handle)
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle> {
        assert!(
            self.render_passes.contains(desc.render_pass),
            "framebuffer {:?} created for invalid render pass {:?}",
            desc.label,
            desc.render_pass
        );
        let signature = self.framebuffer_signature(desc);

        let (handle, _) = self.device.framebuffers.add(DummyFramebuffer {
            desc: desc.clone(),
            signature,
        });
        log::trace!(
            "DummyBackend: creating framebuffer {:?} {:?}",
            handle,
            desc.label
        );
        Ok(handle)
    }

    fn create_render_target(
        &mut self,
        desc: &RenderTargetDescriptor,
    ) -> BackendResult<RenderTargetHandle> {
        assert!(desc.width > 0 && desc.height > 0, "render target has no pixels");
        assert!(desc.sample_count >= 1, "render target sample count is zero");

        let (handle, _) = self.render_targets.add(DummyRenderTarget {
            desc: desc.clone(),
            layout: Layout::Undefined,
            views: Vec::new(),
        });

        let formats = std::iter::once(desc.format).chain(desc.additional_view_format);
        let views = formats
            .map(|format| {
                let (view, _) = self.textures.add(DummyTexture {
                    label: desc.label.clone(),
                    width: desc.width,
                    height: desc.height,
                    format,
                    render_target: Some(handle),
                });
                (format, view)
            })
            .collect();
        self.render_targets.get_mut(handle).views = views;

        log::trace!(
            "DummyBackend: creating render target {:?} {:?} ({}x{}, {:?}, {} samples)",
            handle,
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            desc.sample_count
        );
        Ok(handle)
    }

    fn render_target_view(
        &self,
        target: RenderTargetHandle,
        format: TextureFormat,
    ) -> TextureHandle {
        let rt = self.render_targets.get(target);
        match rt.views.iter().find(|(f, _)| *f == format) {
            Some(&(_, view)) => view,
            None => panic!(
                "render target {:?} {:?} has no {:?} view",
                target, rt.desc.label, format
            ),
        }
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        self.device.buffers.remove(handle, |buffer| {
            assert!(
                !buffer.is_ring_allocated(),
                "ring-allocated buffers are reclaimed with their frame"
            );
        });
        log::trace!("DummyBackend: deleting buffer {handle:?}");
    }

    fn delete_texture(&mut self, handle: TextureHandle) {
        let texture = self.textures.remove(handle, |texture| texture);
        assert!(
            texture.render_target.is_none(),
            "render target views are deleted with their render target"
        );
        log::trace!(
            "DummyBackend: deleting texture {:?} {:?} ({}x{}, {:?})",
            handle,
            texture.label,
            texture.width,
            texture.height,
            texture.format
        );
    }

    fn delete_sampler(&mut self, handle: SamplerHandle) {
        self.samplers.remove(handle, drop);
        log::trace!("DummyBackend: deleting sampler {handle:?}");
    }

    fn delete_pipeline(&mut self, handle: PipelineHandle) {
        assert!(
            self.current_pipeline != Some(handle),
            "deleting the bound pipeline"
        );
        self.pipelines.remove(handle, drop);
        log::trace!("DummyBackend: deleting pipeline {handle:?}");
    }

    fn delete_render_pass(&mut self, handle: RenderPassHandle) {
        self.render_passes.remove(handle, drop);
        log::trace!("DummyBackend: deleting render pass {handle:?}");
    }

    fn delete_framebuffer(&mut self, handle: FramebufferHandle) {
        assert!(
            self.device.framebuffers.contains(handle),
            "deleting unknown framebuffer {handle:?}"
        );
        match self.frames.defer_framebuffer(handle) {
            Some(handle) => {
                self.device.framebuffers.remove(handle, drop);
                log::trace!("DummyBackend: deleting framebuffer {handle:?}");
            }
            None => log::trace!("DummyBackend: deferring deletion of framebuffer {handle:?}"),
        }
    }

    fn delete_render_target(&mut self, handle: RenderTargetHandle) {
        let rt = self.render_targets.remove(handle, |rt| rt);
        for (_, view) in rt.views {
            self.textures.remove(view, drop);
        }
        log::trace!(
            "DummyBackend: deleting render target {:?} {:?}",
            handle,
            rt.desc.label
        );
    }

    fn begin_frame(&mut self) -> BackendResult<bool> {
        crate::profile_function!();
        assert!(!self.in_frame, "begin_frame called twice without present_frame");

        if self.surface_lost {
            self.surface_lost = false;
            let (width, height) = self.drawable_size;
            self.swapchain.width = width;
            self.swapchain.height = height;
            return Err(BackendError::SurfaceLost);
        }
        if !self.apply_swapchain()? {
            return Ok(false);
        }
        if !self.frames.begin_frame(&mut self.device)? {
            return Ok(false);
        }

        self.in_frame = true;
        self.current_pass = None;
        self.current_pipeline = None;
        self.pipeline_drawn = true;
        self.scissor_set = false;
        self.descriptors.clear();
        self.descriptor_flushes.clear();
        self.commands.clear();
        Ok(true)
    }

    fn present_frame(&mut self, image: RenderTargetHandle) -> BackendResult<()> {
        crate::profile_function!();
        self.assert_outside_render_pass("present_frame");

        let layout = self.render_targets.get(image).layout;
        assert_eq!(
            layout,
            Layout::TransferSrc,
            "presented image {image:?} must be in TransferSrc, not {}",
            layout.name()
        );
        self.record(DummyCommand::Present(image));

        let fence = DummyFence(self.device.next_fence);
        self.device.next_fence += 1;
        if self.device.auto_signal {
            self.device.completed_fences = self.device.next_fence;
        }

        let cursor = self.device.ring.mark_submitted();
        crate::profile_plot!("Ephemeral ring in flight", self.device.ring.in_flight());
        self.frames.present_frame(fence, cursor);
        self.in_frame = false;

        crate::frame_mark!();
        Ok(())
    }

    fn wait_for_frame(&mut self, index: usize) -> BackendResult<bool> {
        if !self.frames.frame(index).is_outstanding() {
            return Ok(true);
        }
        self.frames.wait_for_frame(index, &mut self.device)
    }

    fn wait_for_device_idle(&mut self) -> BackendResult<bool> {
        assert!(
            !self.in_frame,
            "cannot wait for device idle while recording a frame"
        );
        self.frames.wait_for_device_idle(&mut self.device)
    }

    fn recreate_ring_buffer(&mut self, size: u64) -> BackendResult<()> {
        assert!(
            !self.in_frame,
            "the ephemeral ring can only be recreated between frames"
        );
        if size == 0 {
            return Err(BackendError::InvalidParameter(
                "ephemeral ring size cannot be zero".to_string(),
            ));
        }

        let old = self.device.ring.resize(vec![0; size as usize], size);
        let old_size = old.len() as u64;
        // The old ring lives until the frames that used it have retired.
        let (retired, _) = self.device.buffers.add(Buffer::owned(
            old,
            old_size,
            BufferUsage::EVERYTHING,
        ));
        self.frames.track_ephemeral(retired);

        let device = &mut self.device;
        for (buffer, _) in device.buffers.iter().filter(|(_, b)| b.is_ring_allocated()) {
            device.retired_ring_buffers.entry(buffer).or_insert(retired);
        }
        Ok(())
    }

    fn set_swapchain_desc(&mut self, desc: &SwapchainDescriptor) {
        let current = self.wanted_swapchain.as_ref().unwrap_or(&self.swapchain);
        if current == desc {
            return;
        }
        // The simulated window follows the requested size.
        self.drawable_size = (desc.width, desc.height);
        self.wanted_swapchain = Some(*desc);
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.drawable_size
    }

    fn begin_render_pass(&mut self, pass: RenderPassHandle, framebuffer: FramebufferHandle) {
        self.assert_outside_render_pass("begin_render_pass");

        let pass_desc = self.render_passes.get(pass);
        let fb = self.device.framebuffers.get(framebuffer);
        assert!(
            is_render_pass_compatible(&pass_desc.signature(), &fb.signature),
            "framebuffer {:?} is not compatible with render pass {:?}",
            fb.desc.label,
            pass_desc.label
        );

        let mut attachments = Vec::with_capacity(MAX_COLOR_RENDERTARGETS);
        for (color, target) in pass_desc.colors.iter().zip(fb.desc.colors) {
            if let (Some(color), Some(target)) = (color, target) {
                attachments.push((target, color.initial_layout));
            }
        }
        for (target, initial) in attachments {
            self.check_layout(target, initial, "begin_render_pass");
            self.set_layout(target, Layout::ColorAttachment);
        }

        self.current_pass = Some(CurrentPass { pass, framebuffer });
        self.current_pipeline = None;
        self.pipeline_drawn = true;
        self.record(DummyCommand::BeginRenderPass { pass, framebuffer });
    }

    fn end_render_pass(&mut self) {
        self.assert_recording("end_render_pass");
        let Some(current) = self.current_pass.take() else {
            panic!("end_render_pass called outside a render pass");
        };

        let pass_desc = self.render_passes.get(current.pass);
        let fb = self.device.framebuffers.get(current.framebuffer);
        let finals: Vec<_> = pass_desc
            .colors
            .iter()
            .zip(fb.desc.colors)
            .filter_map(|(color, target)| Some((target?, color.as_ref()?.final_layout)))
            .collect();
        for (target, layout) in finals {
            self.set_layout(target, layout);
        }

        self.current_pipeline = None;
        self.record(DummyCommand::EndRenderPass);
    }

    fn layout_transition(&mut self, image: RenderTargetHandle, src: Layout, dest: Layout) {
        self.assert_outside_render_pass("layout_transition");
        assert!(
            dest != Layout::Undefined,
            "cannot transition {image:?} to Undefined"
        );
        self.check_layout(image, src, "layout_transition");
        self.set_layout(image, dest);
        self.record(DummyCommand::LayoutTransition { image, src, dest });
    }

    fn blit(&mut self, source: RenderTargetHandle, dest: RenderTargetHandle) {
        self.assert_outside_render_pass("blit");
        self.check_layout(source, Layout::TransferSrc, "blit source");
        self.check_layout(dest, Layout::TransferDst, "blit destination");
        self.record(DummyCommand::Blit { source, dest });
    }

    fn resolve_msaa(&mut self, source: RenderTargetHandle, dest: RenderTargetHandle) {
        self.assert_outside_render_pass("resolve_msaa");
        let src_desc = &self.render_targets.get(source).desc;
        let dst_desc = &self.render_targets.get(dest).desc;
        assert!(
            src_desc.sample_count > 1,
            "resolve source {:?} is not multisampled",
            src_desc.label
        );
        assert_eq!(
            dst_desc.sample_count, 1,
            "resolve destination {:?} is multisampled",
            dst_desc.label
        );
        assert_eq!(
            src_desc.format, dst_desc.format,
            "resolve between different formats"
        );

        self.check_layout(source, Layout::TransferSrc, "resolve source");
        self.check_layout(dest, Layout::TransferDst, "resolve destination");
        self.record(DummyCommand::ResolveMsaa { source, dest });
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.assert_recording("set_viewport");
        self.record(DummyCommand::SetViewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let pipeline = self.bound_pipeline("set_scissor_rect");
        assert!(
            pipeline.scissor_test,
            "set_scissor_rect: pipeline {:?} has no scissor test",
            pipeline.label
        );
        self.scissor_set = true;
        self.record(DummyCommand::SetScissorRect {
            x,
            y,
            width,
            height,
        });
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.assert_recording("bind_pipeline");
        let Some(current) = self.current_pass else {
            panic!("bind_pipeline called outside a render pass");
        };
        assert!(
            self.pipeline_drawn,
            "pipeline {:?} was bound but never drawn with",
            self.current_pipeline
        );

        let desc = self.pipelines.get(pipeline);
        let pipeline_pass = self.render_passes.get(desc.render_pass);
        let current_pass = self.render_passes.get(current.pass);
        assert!(
            is_render_pass_compatible(&pipeline_pass.signature(), &current_pass.signature()),
            "pipeline {:?} bound against incompatible render pass {:?}",
            desc.label,
            current_pass.label
        );

        self.current_pipeline = Some(pipeline);
        self.pipeline_drawn = false;
        self.scissor_set = false;
        self.descriptors.mark_dirty();
        self.record(DummyCommand::BindPipeline(pipeline));
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, bit16: bool) {
        self.bound_pipeline("bind_index_buffer");
        let usage = self.device.buffers.get(buffer).usage;
        assert!(
            !self.debug || usage.contains(BufferUsage::INDEX),
            "buffer {buffer:?} bound as index buffer without INDEX usage"
        );
        self.record(DummyCommand::BindIndexBuffer { buffer, bit16 });
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: BufferHandle) {
        self.bound_pipeline("bind_vertex_buffer");
        let usage = self.device.buffers.get(buffer).usage;
        assert!(
            !self.debug || usage.contains(BufferUsage::VERTEX),
            "buffer {buffer:?} bound as vertex buffer without VERTEX usage"
        );
        self.record(DummyCommand::BindVertexBuffer { binding, buffer });
    }

    fn bind_descriptor_set(&mut self, index: u32, layout: DsLayoutHandle, data: &[u8]) {
        let pipeline = self.bound_pipeline("bind_descriptor_set");
        if let Some(&expected) = pipeline.descriptor_set_layouts.get(index as usize)
            && expected.is_valid()
        {
            assert_eq!(
                expected, layout,
                "descriptor set {index} does not match the pipeline's layout"
            );
        }

        let entries = self.layouts.get(layout);
        if self.debug {
            self.validate_descriptor_set(index, entries, data);
        }
        self.descriptors.write_set(index, entries, data);
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.assert_can_draw("draw", vertex_count);
        self.prepare_draw();
        self.record(DummyCommand::Draw {
            first_vertex,
            vertex_count,
        });
    }

    fn draw_indexed_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        self.assert_can_draw("draw_indexed_instanced", vertex_count);
        assert!(instance_count > 0, "draw_indexed_instanced with zero instances");
        self.prepare_draw();
        self.record(DummyCommand::DrawIndexedInstanced {
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed_offset(
        &mut self,
        vertex_count: u32,
        first_index: u32,
        min_index: u32,
        max_index: u32,
    ) {
        self.assert_can_draw("draw_indexed_offset", vertex_count);
        assert!(
            min_index <= max_index,
            "draw_indexed_offset index range {min_index}..={max_index} is empty"
        );
        self.prepare_draw();
        self.record(DummyCommand::DrawIndexedOffset {
            vertex_count,
            first_index,
        });
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send);
