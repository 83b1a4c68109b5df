//! Render graph infrastructure.
//!
//! A [`RenderGraph`] is a linear list of operations declared once and
//! rendered every frame. The graph:
//!
//! - Creates the render targets, render passes and framebuffers it needs
//! - Infers every color attachment's initial and final layout
//! - Inserts the transitions around blits and MSAA resolves
//! - Presents the designated target
//!
//! Operations run strictly in declaration order. There is no reordering or
//! merging of passes.
//!
//! # Lifecycle
//!
//! ```text
//!  Invalid ──reset──► Building ──build──► Ready ──render──► Rendering
//!                        ▲                  │ ▲                 │
//!                        └──────reset───────┘ └─────────────────┘
//! ```
//!
//! Any change to a participating target's size, format or sample count, or
//! to the pass topology, needs a full `reset` and rebuild. So does surface
//! loss.
//!
//! # Example
//!
//! ```ignore
//! use redlilium_framegraph::graph::{PassDesc, RenderGraph};
//!
//! let mut graph = RenderGraph::new();
//! graph.reset(&mut backend, || window.pump_events())?;
//!
//! graph.render_target(Rt::Scene, RenderTargetDescriptor::new(w, h, TextureFormat::Rgba8Unorm));
//! graph.render_target(Rt::Final, RenderTargetDescriptor::new(w, h, TextureFormat::Rgba8Unorm));
//! graph.render_pass(
//!     Pass::Scene,
//!     PassDesc::new().with_color(0, Rt::Scene, PassBegin::Clear, [0.0; 4]),
//!     |_, _, backend| draw_scene(backend),
//! );
//! graph.render_pass(
//!     Pass::Final,
//!     PassDesc::new()
//!         .with_color(0, Rt::Final, PassBegin::Clear, [0.0; 4])
//!         .with_input(Rt::Scene),
//!     |_, res, backend| tonemap(backend, res.view(Rt::Scene)),
//! );
//! graph.present_render_target(Rt::Final);
//! graph.build(&mut backend)?;
//!
//! loop {
//!     if backend.begin_frame()? {
//!         graph.render(&mut backend)?;
//!     }
//! }
//! ```

mod layout;
mod operation;
mod pass;
mod resources;
mod target;

pub use layout::{
    AttachmentLayouts, LayoutMismatch, OperationLayouts, infer_layouts, validate_layouts,
};
pub use operation::Operation;
pub use pass::{ColorTarget, DEFAULT_CLEAR_DEPTH, DepthTarget, PassDesc};
pub use resources::PassResources;
pub use target::Rendertarget;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::backend::{Backend, BackendError, BackendResult};
use crate::cache::PipelineCache;
use crate::handle::{FramebufferHandle, PipelineHandle, RenderPassHandle, RenderTargetHandle};
use crate::types::{
    ColorAttachmentDescriptor, DepthStencilAttachmentDescriptor, FramebufferDescriptor, Layout,
    MAX_COLOR_RENDERTARGETS, PipelineDescriptor, RenderPassDescriptor, RenderTargetDescriptor,
    TextureFormat,
};

/// Requirements on pass and rendertarget ids.
///
/// Implemented for every small copyable key, typically a field-less enum.
pub trait GraphId: Copy + Eq + Hash + Debug + Send + 'static {}

impl<T: Copy + Eq + Hash + Debug + Send + 'static> GraphId for T {}

/// Callback recording the contents of a render pass.
pub type PassCallback<P, R, B> = Box<dyn FnMut(P, &PassResources<R>, &mut B) + Send>;

/// Lifecycle state of a [`RenderGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphState {
    /// Fresh, or a build or reset failed. Only `reset` is allowed.
    #[default]
    Invalid,
    /// Accepting declarations.
    Building,
    /// Built; can be rendered.
    Ready,
    /// Inside `render`.
    Rendering,
}

/// A declared render pass and the backend objects built for it.
struct PassNode<P, R, B: ?Sized> {
    desc: PassDesc<R>,
    callback: PassCallback<P, R, B>,
    render_pass_desc: Option<RenderPassDescriptor>,
    handle: Option<RenderPassHandle>,
    framebuffer: Option<FramebufferHandle>,
}

/// Declarative frame graph.
///
/// `P` and `R` are the caller's pass and rendertarget ids. `B` is the
/// backend type, `dyn Backend` included.
pub struct RenderGraph<P, R, B: ?Sized> {
    state: GraphState,
    rendertargets: HashMap<R, Rendertarget>,
    passes: HashMap<P, PassNode<P, R, B>>,
    operations: Vec<Operation<P, R>>,
    present_target: Option<R>,
    /// Passes whose framebuffer is built per render.
    deferred_passes: Vec<P>,
    pipelines: PipelineCache,
    current_pass: Option<P>,
}

impl<P: GraphId, R: GraphId, B: Backend + ?Sized> Default for RenderGraph<P, R, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: GraphId, R: GraphId, B: Backend + ?Sized> RenderGraph<P, R, B> {
    /// Create an empty graph in the [`GraphState::Invalid`] state.
    pub fn new() -> Self {
        Self {
            state: GraphState::Invalid,
            rendertargets: HashMap::new(),
            passes: HashMap::new(),
            operations: Vec::new(),
            present_target: None,
            deferred_passes: Vec::new(),
            pipelines: PipelineCache::new(),
            current_pass: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state
    }

    fn assert_state(&self, allowed: &[GraphState], what: &str) {
        assert!(
            allowed.contains(&self.state),
            "RenderGraph::{what} called in state {:?}",
            self.state
        );
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Wait for the device to go idle, then destroy everything the graph
    /// created and start a new declaration.
    ///
    /// `process_events` is called every time the wait times out. If the wait
    /// fails nothing is destroyed and the graph is left
    /// [`GraphState::Invalid`], so a later `reset` can retry.
    pub fn reset(
        &mut self,
        backend: &mut B,
        mut process_events: impl FnMut(),
    ) -> Result<(), GraphError> {
        self.assert_state(&[GraphState::Invalid, GraphState::Ready], "reset");

        loop {
            match backend.wait_for_device_idle() {
                Ok(true) => break,
                Ok(false) => process_events(),
                Err(err) => {
                    self.state = GraphState::Invalid;
                    return Err(err.into());
                }
            }
        }

        self.pipelines
            .clear_with(|pipeline| backend.delete_pipeline(pipeline));

        for (_, target) in self.rendertargets.drain() {
            if let Rendertarget::Internal {
                handle: Some(handle),
                ..
            } = target
            {
                backend.delete_render_target(handle);
            }
        }

        for (_, node) in self.passes.drain() {
            if let Some(framebuffer) = node.framebuffer {
                backend.delete_framebuffer(framebuffer);
            }
            if let Some(handle) = node.handle {
                backend.delete_render_pass(handle);
            }
        }

        self.operations.clear();
        self.deferred_passes.clear();
        self.present_target = None;
        self.current_pass = None;
        self.state = GraphState::Building;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Declare an internal rendertarget, created by `build`.
    pub fn render_target(&mut self, id: R, desc: RenderTargetDescriptor) {
        self.assert_state(&[GraphState::Building], "render_target");
        let previous = self
            .rendertargets
            .insert(id, Rendertarget::Internal { desc, handle: None });
        assert!(previous.is_none(), "rendertarget {id:?} declared twice");
    }

    /// Declare an external rendertarget, bound before every render with
    /// [`bind_external_rt`](Self::bind_external_rt).
    pub fn external_render_target(
        &mut self,
        id: R,
        format: TextureFormat,
        initial_layout: Layout,
        final_layout: Layout,
    ) {
        self.assert_state(&[GraphState::Building], "external_render_target");
        let previous = self.rendertargets.insert(
            id,
            Rendertarget::External {
                format,
                initial_layout,
                final_layout,
                handle: None,
            },
        );
        assert!(previous.is_none(), "rendertarget {id:?} declared twice");
    }

    /// Append a render pass to the operation list.
    pub fn render_pass(
        &mut self,
        id: P,
        desc: PassDesc<R>,
        callback: impl FnMut(P, &PassResources<R>, &mut B) + Send + 'static,
    ) {
        self.assert_state(&[GraphState::Building], "render_pass");
        assert!(
            !self.passes.contains_key(&id),
            "render pass {id:?} declared twice"
        );

        self.passes.insert(
            id,
            PassNode {
                desc,
                callback: Box::new(callback),
                render_pass_desc: None,
                handle: None,
                framebuffer: None,
            },
        );
        self.operations.push(Operation::RenderPass(id));
    }

    /// Append an MSAA resolve of `source` into `dest`.
    pub fn resolve_msaa(&mut self, source: R, dest: R) {
        self.assert_state(&[GraphState::Building], "resolve_msaa");
        self.operations.push(Operation::resolve_msaa(source, dest));
    }

    /// Append a copy of `source` into `dest`.
    pub fn blit(&mut self, source: R, dest: R) {
        self.assert_state(&[GraphState::Building], "blit");
        self.operations.push(Operation::blit(source, dest));
    }

    /// Present `id` at the end of every render.
    pub fn present_render_target(&mut self, id: R) {
        self.assert_state(&[GraphState::Building], "present_render_target");
        self.present_target = Some(id);
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Resolve layouts and create backend objects.
    ///
    /// On error the graph becomes [`GraphState::Invalid`]; whatever was
    /// created is destroyed by the next `reset`.
    pub fn build(&mut self, backend: &mut B) -> Result<(), GraphError> {
        crate::profile_function!();
        self.assert_state(&[GraphState::Building], "build");
        log::info!("RenderGraph::build start");

        match self.build_inner(backend) {
            Ok(()) => {
                self.state = GraphState::Ready;
                self.log_operations();
                log::info!("RenderGraph::build end");
                Ok(())
            }
            Err(err) => {
                log::warn!("RenderGraph::build failed: {err}");
                self.state = GraphState::Invalid;
                Err(err)
            }
        }
    }

    fn build_inner(&mut self, backend: &mut B) -> Result<(), GraphError> {
        let present = self.present_target.ok_or(GraphError::MissingPresentTarget)?;
        self.check_rendertargets(present)?;

        let external_finals: Vec<_> = self
            .rendertargets
            .iter()
            .filter_map(|(&id, target)| match target {
                Rendertarget::External { final_layout, .. } => Some((id, *final_layout)),
                Rendertarget::Internal { .. } => None,
            })
            .collect();
        let external_initials: Vec<_> = self
            .rendertargets
            .iter()
            .filter_map(|(&id, target)| match target {
                Rendertarget::External { initial_layout, .. } => Some((id, *initial_layout)),
                Rendertarget::Internal { .. } => None,
            })
            .collect();

        crate::profile_scope!("infer_layouts");
        let passes = &self.passes;
        let pass_desc = |id: &P| &passes[id].desc;
        let layouts = infer_layouts(&self.operations, pass_desc, present, external_finals);
        validate_layouts(&self.operations, &layouts, pass_desc, external_initials).map_err(
            |mismatch| GraphError::LayoutMismatch {
                target: format!("{:?}", mismatch.target),
                operation: mismatch.operation,
                expected: mismatch.expected,
                found: mismatch.found,
            },
        )?;

        for target in self.rendertargets.values_mut() {
            if let Rendertarget::Internal { desc, handle } = target {
                *handle = Some(backend.create_render_target(desc)?);
            }
        }

        for (op, op_layouts) in self.operations.iter_mut().zip(&layouts) {
            match (op, op_layouts) {
                (
                    Operation::Blit { final_layout, .. }
                    | Operation::ResolveMsaa { final_layout, .. },
                    OperationLayouts::Transfer(inferred),
                ) => {
                    *final_layout = *inferred;
                }
                (Operation::RenderPass(id), OperationLayouts::RenderPass(colors)) => {
                    let Some(node) = self.passes.get_mut(&*id) else {
                        panic!("unknown render pass {id:?}");
                    };
                    let rp_desc = render_pass_descriptor(&self.rendertargets, &node.desc, colors);
                    node.handle = Some(backend.create_render_pass(&rp_desc)?);
                    node.render_pass_desc = Some(rp_desc);
                }
                _ => unreachable!("operation list and inferred layouts disagree"),
            }
        }

        for op in &self.operations {
            let Operation::RenderPass(id) = *op else {
                continue;
            };
            let node = &self.passes[&id];
            let touches_external = node
                .desc
                .attachments()
                .any(|rt| self.rendertargets[&rt].is_external());

            if touches_external {
                self.deferred_passes.push(id);
            } else {
                let framebuffer =
                    build_framebuffer(backend, &self.rendertargets, node.handle, &node.desc)?;
                if let Some(node) = self.passes.get_mut(&id) {
                    node.framebuffer = Some(framebuffer);
                }
            }
        }

        Ok(())
    }

    /// Every id used by an operation or as the present target must be
    /// declared.
    fn check_rendertargets(&self, present: R) -> Result<(), GraphError> {
        let unknown = |id: R| GraphError::UnknownRendertarget(format!("{id:?}"));
        let known = |id: R| {
            if self.rendertargets.contains_key(&id) {
                Ok(())
            } else {
                Err(unknown(id))
            }
        };

        known(present)?;
        for op in &self.operations {
            match *op {
                Operation::RenderPass(id) => {
                    let desc = &self.passes[&id].desc;
                    for rt in desc.attachments().chain(desc.inputs().iter().copied()) {
                        known(rt)?;
                    }
                }
                Operation::Blit { source, dest, .. }
                | Operation::ResolveMsaa { source, dest, .. } => {
                    known(source)?;
                    known(dest)?;
                }
            }
        }
        Ok(())
    }

    fn log_operations(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for op in &self.operations {
            log::debug!("{op}");
            let Operation::RenderPass(id) = op else {
                continue;
            };
            let node = &self.passes[id];
            if let Some(depth) = node.desc.depth_stencil() {
                log::debug!(" depthStencil {:?}", depth.id);
            }
            if let Some(rp_desc) = &node.render_pass_desc {
                for (slot, (color, resolved)) in
                    node.desc.colors().iter().zip(&rp_desc.colors).enumerate()
                {
                    if let (Some(color), Some(resolved)) = (color, resolved) {
                        log::debug!(
                            " color {}: {:?}\t{}\t{}\t{}",
                            slot,
                            color.id,
                            resolved.pass_begin.name(),
                            resolved.initial_layout.name(),
                            resolved.final_layout.name()
                        );
                    }
                }
            }
            if !node.desc.inputs().is_empty() {
                log::debug!(" inputs:");
                for input in node.desc.inputs() {
                    log::debug!("  {input:?}");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Render
    // ------------------------------------------------------------------

    /// Bind the image of external rendertarget `id` for the next render.
    pub fn bind_external_rt(&mut self, id: R, image: RenderTargetHandle) {
        self.assert_state(&[GraphState::Ready], "bind_external_rt");
        assert!(image.is_valid(), "binding an invalid image to {id:?}");

        match self.rendertargets.get_mut(&id) {
            Some(Rendertarget::External { handle, .. }) => {
                assert!(handle.is_none(), "external rendertarget {id:?} bound twice");
                *handle = Some(image);
            }
            Some(Rendertarget::Internal { .. }) => {
                panic!("rendertarget {id:?} is internal and cannot be bound")
            }
            None => panic!("unknown rendertarget {id:?}"),
        }
    }

    /// Record every operation in order and present.
    ///
    /// Must be called between the backend's `begin_frame` and the next frame.
    ///
    /// # Panics
    ///
    /// Panics if an external rendertarget is not bound.
    pub fn render(&mut self, backend: &mut B) -> Result<(), GraphError> {
        crate::profile_function!();
        self.assert_state(&[GraphState::Ready], "render");
        self.state = GraphState::Rendering;

        for (id, target) in &self.rendertargets {
            assert!(
                target.handle().is_some(),
                "external rendertarget {id:?} is not bound"
            );
        }

        let result = self.render_operations(backend);

        for target in self.rendertargets.values_mut() {
            if let Rendertarget::External { handle, .. } = target {
                *handle = None;
            }
        }
        // The backend keeps these alive until this frame retires.
        for id in &self.deferred_passes {
            if let Some(framebuffer) = self.passes.get_mut(id).and_then(|n| n.framebuffer.take()) {
                backend.delete_framebuffer(framebuffer);
            }
        }

        assert!(self.current_pass.is_none());
        self.state = GraphState::Ready;
        result
    }

    fn render_operations(&mut self, backend: &mut B) -> Result<(), GraphError> {
        for id in &self.deferred_passes {
            let node = &self.passes[id];
            let framebuffer =
                build_framebuffer(backend, &self.rendertargets, node.handle, &node.desc)?;
            if let Some(node) = self.passes.get_mut(id) {
                node.framebuffer = Some(framebuffer);
            }
        }

        for op in &self.operations {
            match *op {
                Operation::Blit {
                    source,
                    dest,
                    final_layout,
                } => {
                    let (source, dest) = (self.image(source), self.image(dest));
                    backend.layout_transition(dest, Layout::Undefined, Layout::TransferDst);
                    backend.blit(source, dest);
                    backend.layout_transition(dest, Layout::TransferDst, final_layout);
                }
                Operation::ResolveMsaa {
                    source,
                    dest,
                    final_layout,
                } => {
                    let (source, dest) = (self.image(source), self.image(dest));
                    backend.layout_transition(dest, Layout::Undefined, Layout::TransferDst);
                    backend.resolve_msaa(source, dest);
                    backend.layout_transition(dest, Layout::TransferDst, final_layout);
                }
                Operation::RenderPass(id) => {
                    assert!(
                        self.current_pass.is_none(),
                        "render pass {id:?} begun inside {:?}",
                        self.current_pass
                    );
                    self.current_pass = Some(id);

                    let Some(node) = self.passes.get_mut(&id) else {
                        panic!("unknown render pass {id:?}");
                    };
                    let (Some(handle), Some(framebuffer)) = (node.handle, node.framebuffer) else {
                        panic!("render pass {id:?} was not built");
                    };

                    backend.begin_render_pass(handle, framebuffer);
                    let resources = pass_resources(backend, &self.rendertargets, &node.desc);
                    (node.callback)(id, &resources, backend);
                    backend.end_render_pass();

                    self.current_pass = None;
                }
            }
        }

        let present = self.image(self.present_target.ok_or(GraphError::MissingPresentTarget)?);
        backend.present_frame(present)?;
        Ok(())
    }

    fn image(&self, id: R) -> RenderTargetHandle {
        match self.rendertargets.get(&id).and_then(Rendertarget::handle) {
            Some(handle) => handle,
            None => panic!("rendertarget {id:?} has no image"),
        }
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    /// Pipeline for `desc` compiled against `pass`'s render pass.
    ///
    /// Equal descriptions share one pipeline until the next `reset`.
    pub fn create_pipeline(
        &mut self,
        backend: &mut B,
        pass: P,
        desc: &PipelineDescriptor,
    ) -> BackendResult<PipelineHandle> {
        self.assert_state(&[GraphState::Ready, GraphState::Rendering], "create_pipeline");
        let Some(render_pass) = self.passes.get(&pass).and_then(|node| node.handle) else {
            panic!("render pass {pass:?} is not part of the graph");
        };

        let desc = desc.clone().with_render_pass(render_pass);
        self.pipelines
            .get_or_create(&desc, |desc| backend.create_pipeline(desc))
    }

    /// Number of cached pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The operation list in execution order, with inferred transfer layouts
    /// once built.
    pub fn operations(&self) -> &[Operation<P, R>] {
        &self.operations
    }

    /// The rendertarget declared as `id`.
    pub fn rendertarget(&self, id: R) -> Option<&Rendertarget> {
        self.rendertargets.get(&id)
    }

    /// Backend render pass description of `pass`, once built.
    pub fn render_pass_desc(&self, pass: P) -> Option<&RenderPassDescriptor> {
        self.passes.get(&pass)?.render_pass_desc.as_ref()
    }

    /// Inferred (initial, final) layouts of `pass`'s color attachments.
    pub fn color_layouts(&self, pass: P) -> [Option<(Layout, Layout)>; MAX_COLOR_RENDERTARGETS] {
        match self.render_pass_desc(pass) {
            Some(desc) => desc
                .colors
                .map(|color| color.map(|c| (c.initial_layout, c.final_layout))),
            None => [None; MAX_COLOR_RENDERTARGETS],
        }
    }

    /// Backend render pass of `pass`, once built.
    pub fn render_pass_handle(&self, pass: P) -> Option<RenderPassHandle> {
        self.passes.get(&pass)?.handle
    }

    /// Framebuffer of `pass`. Passes touching external targets only have
    /// one during `render`.
    pub fn framebuffer(&self, pass: P) -> Option<FramebufferHandle> {
        self.passes.get(&pass)?.framebuffer
    }
}

/// Resolve a declared pass into a backend render pass description.
fn render_pass_descriptor<R: GraphId>(
    rendertargets: &HashMap<R, Rendertarget>,
    desc: &PassDesc<R>,
    colors: &[Option<AttachmentLayouts>; MAX_COLOR_RENDERTARGETS],
) -> RenderPassDescriptor {
    let mut rp_desc = RenderPassDescriptor::new().with_sample_count(desc.sample_count());
    if let Some(label) = desc.label() {
        rp_desc = rp_desc.with_label(label);
    }

    if let Some(depth) = desc.depth_stencil() {
        rp_desc = rp_desc.with_depth_stencil(DepthStencilAttachmentDescriptor {
            format: rendertargets[&depth.id].format(),
            pass_begin: depth.pass_begin,
            clear_depth: depth.clear_depth,
        });
    }

    for (slot, (color, layouts)) in desc.colors().iter().zip(colors).enumerate() {
        if let (Some(color), Some(layouts)) = (color, layouts) {
            rp_desc = rp_desc.with_color(
                slot,
                ColorAttachmentDescriptor {
                    format: rendertargets[&color.id].format(),
                    pass_begin: color.pass_begin,
                    initial_layout: layouts.initial_layout,
                    final_layout: layouts.final_layout,
                    clear_value: color.clear_value,
                },
            );
        }
    }
    rp_desc
}

/// Create the framebuffer binding `desc`'s current images to `render_pass`.
fn build_framebuffer<R: GraphId, B: Backend + ?Sized>(
    backend: &mut B,
    rendertargets: &HashMap<R, Rendertarget>,
    render_pass: Option<RenderPassHandle>,
    desc: &PassDesc<R>,
) -> BackendResult<FramebufferHandle> {
    let image = |id: R| match rendertargets.get(&id).and_then(Rendertarget::handle) {
        Some(handle) => handle,
        None => panic!("rendertarget {id:?} has no image"),
    };
    let Some(render_pass) = render_pass else {
        panic!("framebuffer requested for pass {:?} before its render pass", desc.label());
    };

    let mut fb_desc = FramebufferDescriptor::new(render_pass);
    if let Some(label) = desc.label() {
        fb_desc = fb_desc.with_label(label);
    }
    if let Some(depth) = desc.depth_stencil() {
        fb_desc = fb_desc.with_depth_stencil(image(depth.id));
    }
    for (slot, color) in desc.colors().iter().enumerate() {
        if let Some(color) = color {
            fb_desc = fb_desc.with_color(slot, image(color.id));
        }
    }
    backend.create_framebuffer(&fb_desc)
}

/// Views of every input of a pass.
fn pass_resources<R: GraphId, B: Backend + ?Sized>(
    backend: &B,
    rendertargets: &HashMap<R, Rendertarget>,
    desc: &PassDesc<R>,
) -> PassResources<R> {
    let mut resources = PassResources::new();
    for &input in desc.inputs() {
        let target = &rendertargets[&input];
        let Some(image) = target.handle() else {
            panic!("input {input:?} has no image");
        };

        let format = target.format();
        resources.insert(input, format, backend.render_target_view(image, format));

        if let Some(additional) = target.additional_view_format() {
            assert_ne!(additional, format, "{input:?} repeats its format as additional view");
            resources.insert_additional(
                input,
                additional,
                backend.render_target_view(image, additional),
            );
        }
    }
    resources
}

/// Errors that can occur while building or rendering a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A kept attachment or input finds its target in the wrong layout.
    LayoutMismatch {
        /// Rendertarget id.
        target: String,
        /// Index of the offending operation.
        operation: usize,
        /// Layout the operation needs.
        expected: Layout,
        /// Layout the target is in.
        found: Layout,
    },
    /// An operation uses a rendertarget that was never declared.
    UnknownRendertarget(String),
    /// `build` was called without a present target.
    MissingPresentTarget,
    /// The backend failed.
    Backend(BackendError),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LayoutMismatch {
                target,
                operation,
                expected,
                found,
            } => write!(
                f,
                "operation {operation} expects rendertarget {target} in layout {}, but it is in {}",
                expected.name(),
                found.name()
            ),
            Self::UnknownRendertarget(id) => write!(f, "unknown rendertarget {id}"),
            Self::MissingPresentTarget => write!(f, "render graph has no present target"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for GraphError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

#[cfg(feature = "dummy")]
static_assertions::assert_impl_all!(
    RenderGraph<u32, u32, crate::backend::DummyBackend>: Send
);
