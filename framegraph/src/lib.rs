//! # RedLilium Frame Graph
//!
//! Frame graph and GPU resource lifecycle core of the RedLilium renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderGraph`] - Linear list of render passes, blits and MSAA resolves
//!   with automatic layout inference
//! - [`Backend`] - Trait for graphics backend implementations, with a
//!   [`DummyBackend`] for testing
//! - [`FrameTracker`] - Multiple frames in flight and deferred reclamation of
//!   per-frame resources
//! - [`EphemeralRing`] - Per-frame ring allocator for transient buffers
//! - [`ResourceContainer`] - Generational handle arena backing every backend
//!   object
//! - [`PipelineCache`] and [`DescriptorBindings`] - Pipeline deduplication and
//!   batched descriptor binding
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_framegraph::{DummyBackend, RenderGraph, RendererConfig};
//!
//! let mut backend = DummyBackend::new(&RendererConfig::default());
//! let mut graph = RenderGraph::new();
//! graph.reset(&mut backend, || {})?;
//! // Declare targets and passes, then:
//! graph.build(&mut backend)?;
//!
//! loop {
//!     match backend.begin_frame() {
//!         Ok(true) => graph.render(&mut backend)?,
//!         Ok(false) => pump_events(),
//!         Err(BackendError::SurfaceLost) => rebuild(&mut graph, &mut backend)?,
//!         Err(err) => return Err(err.into()),
//!     }
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod container;
pub mod frame;
pub mod graph;
pub mod handle;
pub mod profiling;
pub mod ring;
pub mod types;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::DummyBackend;
pub use backend::{Backend, BackendError, BackendResult};
pub use cache::{DescriptorBindings, PipelineCache};
pub use config::{ConfigError, RendererConfig, SwapchainDescriptor, VSync};
pub use container::ResourceContainer;
pub use frame::{FrameResources, FrameTracker};
pub use graph::{GraphError, GraphState, PassDesc, PassResources, RenderGraph};
pub use handle::Handle;
pub use ring::EphemeralRing;
pub use types::{
    BufferUsage, Layout, PassBegin, PipelineDescriptor, RenderTargetDescriptor, TextureFormat,
};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph subsystem.
///
/// Only logs the version; backends need no global setup.
pub fn init() {
    log::info!("RedLilium Frame Graph v{} initialized", VERSION);
}
