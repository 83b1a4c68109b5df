use std::collections::HashMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use redlilium_framegraph::graph::{Operation, PassDesc, infer_layouts, validate_layouts};
use redlilium_framegraph::handle::kind;
use redlilium_framegraph::{
    Backend, DummyBackend, EphemeralRing, GraphState, Layout, PassBegin, RenderGraph,
    RenderTargetDescriptor, RendererConfig, ResourceContainer, TextureFormat,
};

// ---------------------------------------------------------------------------
// Ephemeral ring
// ---------------------------------------------------------------------------

fn bench_ring_allocate(c: &mut Criterion) {
    c.bench_function("ephemeral_ring_allocate_1000x256", |b| {
        let mut ring = EphemeralRing::new(vec![0u8; 1 << 20], 1 << 20);
        b.iter(|| {
            for _ in 0..1000 {
                black_box(ring.allocate(256, 256).ok());
            }
            // Retire the frame at once so the ring never runs dry.
            let used = ring.mark_submitted();
            ring.mark_synced(used);
        });
    });
}

// ---------------------------------------------------------------------------
// Resource container
// ---------------------------------------------------------------------------

fn bench_container_churn(c: &mut Criterion) {
    c.bench_function("resource_container_add_remove_1000", |b| {
        let mut container: ResourceContainer<u64, kind::Buffer> = ResourceContainer::new();
        b.iter(|| {
            let handles: Vec<_> = (0..1000u64).map(|i| container.add(i).0).collect();
            for handle in handles {
                black_box(container.remove(handle, |value| value));
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Layout inference
// ---------------------------------------------------------------------------

/// Pass `i` writes target `i` and samples target `i - 1`.
fn chain(len: u32) -> (Vec<Operation<u32, u32>>, HashMap<u32, PassDesc<u32>>) {
    let operations = (0..len).map(Operation::RenderPass).collect();
    let passes = (0..len)
        .map(|i| {
            let mut desc = PassDesc::new().with_color(0, i, PassBegin::Clear, [0.0; 4]);
            if i > 0 {
                desc = desc.with_input(i - 1);
            }
            (i, desc)
        })
        .collect();
    (operations, passes)
}

fn bench_infer_layouts(c: &mut Criterion) {
    let (operations, passes) = chain(32);
    c.bench_function("layout_inference_32_pass_chain", |b| {
        b.iter(|| {
            let layouts = infer_layouts(&operations, |id| &passes[id], 31, std::iter::empty());
            let valid =
                validate_layouts(&operations, &layouts, |id| &passes[id], std::iter::empty());
            black_box((layouts, valid.is_ok()));
        });
    });
}

// ---------------------------------------------------------------------------
// Full graph on the dummy backend
// ---------------------------------------------------------------------------

fn declare_chain(graph: &mut RenderGraph<u32, u32, DummyBackend>, len: u32) {
    for i in 0..len {
        graph.render_target(i, RenderTargetDescriptor::new(256, 256, TextureFormat::Rgba8Unorm));
        let mut desc = PassDesc::new().with_color(0, i, PassBegin::Clear, [0.0; 4]);
        if i > 0 {
            desc = desc.with_input(i - 1);
        }
        graph.render_pass(i, desc, |_, resources, backend: &mut DummyBackend| {
            black_box(resources.len());
            backend.set_viewport(0, 0, 256, 256);
        });
    }
    graph.present_render_target(len - 1);
}

fn bench_graph_rebuild(c: &mut Criterion) {
    let mut backend = DummyBackend::new(&RendererConfig::default().with_debug(false));
    let mut graph = RenderGraph::new();
    graph.reset(&mut backend, || {}).ok();

    c.bench_function("render_graph_rebuild_16_passes", |b| {
        b.iter(|| {
            if graph.state() != GraphState::Building {
                graph.reset(&mut backend, || {}).ok();
            }
            declare_chain(&mut graph, 16);
            black_box(graph.build(&mut backend).is_ok());
        });
    });
}

fn bench_graph_render(c: &mut Criterion) {
    let mut backend = DummyBackend::new(&RendererConfig::default().with_debug(false));
    let mut graph = RenderGraph::new();
    graph.reset(&mut backend, || {}).ok();
    declare_chain(&mut graph, 16);
    graph.build(&mut backend).ok();

    c.bench_function("render_graph_render_16_passes", |b| {
        b.iter(|| {
            if backend.begin_frame().unwrap_or(false) {
                black_box(graph.render(&mut backend).is_ok());
            }
        });
    });
}

fn bench_present_only(c: &mut Criterion) {
    let mut backend = DummyBackend::new(&RendererConfig::default().with_debug(false));
    let image = backend
        .create_render_target(&RenderTargetDescriptor::new(64, 64, TextureFormat::Bgra8Unorm))
        .ok();
    let Some(image) = image else {
        return;
    };
    backend.set_render_target_layout(image, Layout::TransferSrc);

    c.bench_function("frame_begin_present", |b| {
        b.iter(|| {
            if backend.begin_frame().unwrap_or(false) {
                black_box(backend.present_frame(image).is_ok());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_ring_allocate,
    bench_container_churn,
    bench_infer_layouts,
    bench_graph_rebuild,
    bench_graph_render,
    bench_present_only,
);
criterion_main!(benches);
