//! Common utilities for frame graph integration tests.
//!
//! This module provides the backend setup, the pass and rendertarget ids and
//! the graph shapes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use redlilium_framegraph::backend::DummyCommand;
use redlilium_framegraph::graph::PassDesc;
use redlilium_framegraph::{
    DummyBackend, PassBegin, RenderGraph, RenderTargetDescriptor, RendererConfig,
    SwapchainDescriptor, TextureFormat,
};

// ============================================================================
// Backend Setup
// ============================================================================

/// Initialize test logging once per process.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();
}

/// Configuration with debug validation on.
pub fn debug_config() -> RendererConfig {
    RendererConfig::default()
        .with_swapchain(SwapchainDescriptor::new(320, 240))
        .with_debug(true)
}

/// Create a dummy backend with debug validation.
pub fn create_backend() -> DummyBackend {
    create_backend_with(debug_config())
}

/// Create a dummy backend from `config`.
pub fn create_backend_with(config: RendererConfig) -> DummyBackend {
    init_logging();
    DummyBackend::new(&config)
}

// ============================================================================
// Graph Ids
// ============================================================================

/// Render pass ids used by the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Scene,
    Post,
    Overlay,
    Ui,
}

/// Rendertarget ids used by the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rt {
    Scene,
    Depth,
    Msaa,
    Final,
    Swapchain,
}

pub type Graph = RenderGraph<Pass, Rt, DummyBackend>;

/// Shared invocation counter for pass callbacks.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Graph Shapes
// ============================================================================

/// Color target description sized to the backend's drawable.
pub fn target(backend: &DummyBackend, format: TextureFormat) -> RenderTargetDescriptor {
    let (width, height) = redlilium_framegraph::Backend::drawable_size(backend);
    RenderTargetDescriptor::new(width, height, format)
}

/// Pass clearing color slot 0 to `id`.
pub fn clear_pass(id: Rt) -> PassDesc<Rt> {
    PassDesc::new().with_color(0, id, PassBegin::Clear, [0.0, 0.0, 0.0, 1.0])
}

/// Scene renders to `Rt::Scene`, Post reads it and renders the presented
/// `Rt::Final`.
pub fn declare_scene_post(graph: &mut Graph, backend: &DummyBackend, calls: &CallCounter) {
    graph.render_target(Rt::Scene, target(backend, TextureFormat::Rgba16Float));
    graph.render_target(Rt::Final, target(backend, TextureFormat::Rgba8Unorm));

    let scene_calls = calls.clone();
    graph.render_pass(
        Pass::Scene,
        clear_pass(Rt::Scene).with_label("scene"),
        move |pass, resources, _| {
            assert_eq!(pass, Pass::Scene);
            assert!(resources.is_empty());
            scene_calls.hit();
        },
    );

    let post_calls = calls.clone();
    graph.render_pass(
        Pass::Post,
        clear_pass(Rt::Final)
            .with_label("post")
            .with_input(Rt::Scene),
        move |pass, resources, _| {
            assert_eq!(pass, Pass::Post);
            assert!(resources.view(Rt::Scene).is_valid());
            post_calls.hit();
        },
    );

    graph.present_render_target(Rt::Final);
}

/// Reset `graph` and build the scene/post shape.
pub fn build_scene_post(graph: &mut Graph, backend: &mut DummyBackend, calls: &CallCounter) {
    graph.reset(backend, || {}).unwrap();
    declare_scene_post(graph, backend, calls);
    graph.build(backend).unwrap();
}

// ============================================================================
// Command Log Helpers
// ============================================================================

/// Variant names of the recorded commands, without handles.
pub fn command_names(backend: &DummyBackend) -> Vec<&'static str> {
    backend
        .commands()
        .iter()
        .map(|command| match command {
            DummyCommand::BeginRenderPass { .. } => "BeginRenderPass",
            DummyCommand::EndRenderPass => "EndRenderPass",
            DummyCommand::LayoutTransition { .. } => "LayoutTransition",
            DummyCommand::Blit { .. } => "Blit",
            DummyCommand::ResolveMsaa { .. } => "ResolveMsaa",
            DummyCommand::SetViewport { .. } => "SetViewport",
            DummyCommand::SetScissorRect { .. } => "SetScissorRect",
            DummyCommand::BindPipeline(_) => "BindPipeline",
            DummyCommand::BindIndexBuffer { .. } => "BindIndexBuffer",
            DummyCommand::BindVertexBuffer { .. } => "BindVertexBuffer",
            DummyCommand::FlushDescriptors { .. } => "FlushDescriptors",
            DummyCommand::Draw { .. } => "Draw",
            DummyCommand::DrawIndexedInstanced { .. } => "DrawIndexedInstanced",
            DummyCommand::DrawIndexedOffset { .. } => "DrawIndexedOffset",
            DummyCommand::Present(_) => "Present",
        })
        .collect()
}
