//! Frame lifecycle integration tests.
//!
//! These tests drive the dummy backend through whole frames: frame slots,
//! fences, the ephemeral ring and swapchain changes.

mod common;

use common::{create_backend, create_backend_with, debug_config};
use redlilium_framegraph::handle::RenderTargetHandle;
use redlilium_framegraph::{
    Backend, BackendError, BufferUsage, DummyBackend, Layout, RenderTargetDescriptor,
    SwapchainDescriptor, TextureFormat,
};
use rstest::rstest;

/// A render target that can be presented as is.
fn presentable(backend: &mut DummyBackend) -> RenderTargetHandle {
    let image = backend
        .create_render_target(
            &RenderTargetDescriptor::new(32, 32, TextureFormat::Bgra8Unorm).with_label("present"),
        )
        .unwrap();
    backend.set_render_target_layout(image, Layout::TransferSrc);
    image
}

fn config_with_frames(frames: u32) -> redlilium_framegraph::RendererConfig {
    debug_config().with_swapchain(SwapchainDescriptor::new(320, 240).with_num_frames(frames))
}

// ============================================================================
// Ephemeral Ring
// ============================================================================

/// Two 600 byte allocations from a 1024 byte ring: the second one does not
/// fit behind the first and starts over at offset 0.
#[test]
fn test_ring_wraps_inside_a_frame() {
    let mut backend = create_backend_with(debug_config().with_ephemeral_ring_size(1024));
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    let first = backend
        .create_ephemeral_buffer(BufferUsage::UNIFORM, &[1; 600])
        .unwrap();
    let second = backend
        .create_ephemeral_buffer(BufferUsage::UNIFORM, &[2; 600])
        .unwrap();

    assert_eq!(backend.ring().wrap_count(), 1);
    assert_eq!(backend.ring().cursor(), 1024 + 600);
    assert_eq!(backend.buffer_contents(second), &[2; 600][..]);
    // Same-frame allocations alias once the frame outgrows the ring.
    assert_eq!(backend.buffer_contents(first), &[2; 600][..]);

    backend.present_frame(image).unwrap();
}

/// Space used by an outstanding frame is refused until that frame retires.
#[test]
fn test_ring_protects_outstanding_frames() {
    let mut backend = create_backend_with(
        config_with_frames(3).with_ephemeral_ring_size(1024),
    );
    backend.set_auto_signal(false);
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    let frame0 = backend
        .create_ephemeral_buffer(BufferUsage::VERTEX, &[7; 600])
        .unwrap();
    backend.present_frame(image).unwrap();

    assert!(backend.begin_frame().unwrap());
    let err = backend
        .create_ephemeral_buffer(BufferUsage::VERTEX, &[8; 600])
        .unwrap_err();
    assert_eq!(
        err,
        BackendError::RingExhausted {
            requested: 600,
            capacity: 1024
        }
    );
    assert_eq!(backend.buffer_contents(frame0), &[7; 600][..]);
    backend.present_frame(image).unwrap();

    backend.signal_all_fences();
    assert!(backend.wait_for_device_idle().unwrap());
    assert!(!backend.buffer_exists(frame0));
    assert_eq!(backend.ring().synced_cursor(), 600);

    assert!(backend.begin_frame().unwrap());
    let reused = backend
        .create_ephemeral_buffer(BufferUsage::VERTEX, &[9; 600])
        .unwrap();
    assert_eq!(backend.buffer_contents(reused), &[9; 600][..]);
    assert_eq!(backend.ring().wrap_count(), 1);
    backend.present_frame(image).unwrap();
}

/// Oversized allocations fail without touching the ring.
#[test]
fn test_allocation_larger_than_ring() {
    let mut backend = create_backend_with(debug_config().with_ephemeral_ring_size(512));
    assert!(backend.begin_frame().unwrap());

    let err = backend
        .create_ephemeral_buffer(BufferUsage::UNIFORM, &[0; 513])
        .unwrap_err();
    assert!(matches!(err, BackendError::RingExhausted { requested: 513, .. }));
    assert_eq!(backend.ring().cursor(), 0);
}

/// A recreated ring starts empty; the old storage lives until the frame it
/// was retired in has completed.
#[test]
fn test_ring_recreate_between_frames() {
    let mut backend = create_backend_with(config_with_frames(1).with_ephemeral_ring_size(1024));
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    let old = backend
        .create_ephemeral_buffer(BufferUsage::UNIFORM, &[3; 256])
        .unwrap();
    backend.present_frame(image).unwrap();

    backend.recreate_ring_buffer(4096).unwrap();
    assert_eq!(backend.ring().capacity(), 4096);
    // The frame's buffer plus the retired ring storage.
    assert_eq!(backend.buffer_count(), 2);

    assert!(backend.begin_frame().unwrap());
    assert!(!backend.buffer_exists(old));
    assert_eq!(backend.buffer_count(), 1);
    let fresh = backend
        .create_ephemeral_buffer(BufferUsage::UNIFORM, &[4; 4096])
        .unwrap();
    assert_eq!(backend.buffer_contents(fresh), &[4; 4096][..]);
    backend.present_frame(image).unwrap();

    assert!(backend.begin_frame().unwrap());
    assert_eq!(backend.buffer_count(), 0);
}

#[test]
fn test_ring_recreate_rejects_zero_size() {
    let mut backend = create_backend();
    assert!(matches!(
        backend.recreate_ring_buffer(0),
        Err(BackendError::InvalidParameter(_))
    ));
}

// ============================================================================
// Frames In Flight
// ============================================================================

/// With every slot outstanding, `begin_frame` times out instead of blocking,
/// and the oldest frame's buffers are reclaimed once its fence signals.
#[rstest]
#[case::single(1)]
#[case::double(2)]
#[case::triple(3)]
fn test_conservative_reclamation(#[case] frames: u32) {
    let mut backend = create_backend_with(config_with_frames(frames));
    backend.set_auto_signal(false);
    let image = presentable(&mut backend);

    let mut buffers = Vec::new();
    for frame in 0..frames {
        assert!(backend.begin_frame().unwrap(), "frame {frame} should begin");
        buffers.push(
            backend
                .create_ephemeral_buffer(BufferUsage::UNIFORM, &[frame as u8; 64])
                .unwrap(),
        );
        backend.present_frame(image).unwrap();
    }

    // Every slot is waiting on the GPU.
    assert!(!backend.begin_frame().unwrap());
    assert!(!backend.begin_frame().unwrap());
    assert!(buffers.iter().all(|&b| backend.buffer_exists(b)));
    assert_eq!(backend.frame_tracker().last_synced_frame(), None);

    backend.signal_all_fences();
    assert!(backend.begin_frame().unwrap());
    assert!(!backend.buffer_exists(buffers[0]));
    assert!(buffers[1..].iter().all(|&b| backend.buffer_exists(b)));
    assert_eq!(backend.frame_tracker().last_synced_frame(), Some(0));
    backend.present_frame(image).unwrap();
}

#[test]
fn test_slots_are_used_round_robin() {
    let mut backend = create_backend_with(config_with_frames(2));
    let image = presentable(&mut backend);

    let mut slots = Vec::new();
    for _ in 0..5 {
        assert!(backend.begin_frame().unwrap());
        slots.push(backend.frame_tracker().current_index());
        backend.present_frame(image).unwrap();
    }
    assert_eq!(slots, vec![0, 1, 0, 1, 0]);
    assert_eq!(backend.frame_tracker().frame_num(), 5);
}

#[test]
fn test_wait_for_device_idle_times_out() {
    let mut backend = create_backend();
    backend.set_auto_signal(false);
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    backend.present_frame(image).unwrap();

    assert!(!backend.wait_for_device_idle().unwrap());
    assert!(!backend.wait_for_frame(0).unwrap());
    // Slots that were never submitted are trivially complete.
    assert!(backend.wait_for_frame(1).unwrap());

    backend.signal_all_fences();
    assert!(backend.wait_for_device_idle().unwrap());
    assert!(backend.frame_tracker().is_idle());
}

/// A failed fence wait is an error and leaves the slot outstanding.
#[test]
fn test_fence_failure() {
    let mut backend = create_backend_with(config_with_frames(1));
    backend.set_auto_signal(false);
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    backend.present_frame(image).unwrap();

    backend.fail_next_fence_wait(BackendError::FenceWaitFailed("device hung".into()));
    assert_eq!(
        backend.begin_frame(),
        Err(BackendError::FenceWaitFailed("device hung".into()))
    );
    assert!(backend.frame_tracker().frame(0).is_outstanding());

    backend.signal_all_fences();
    assert!(backend.begin_frame().unwrap());
}

// ============================================================================
// Swapchain
// ============================================================================

/// A swapchain change takes effect at the next frame boundary.
#[test]
fn test_swapchain_change_applies_at_begin_frame() {
    let mut backend = create_backend_with(config_with_frames(3));
    let image = presentable(&mut backend);

    assert!(backend.begin_frame().unwrap());
    backend.present_frame(image).unwrap();

    backend.set_swapchain_desc(&SwapchainDescriptor::new(640, 480).with_num_frames(2));
    assert_eq!(backend.drawable_size(), (640, 480));
    assert_eq!(backend.swapchain().width, 320);

    assert!(backend.begin_frame().unwrap());
    assert_eq!(backend.swapchain().width, 640);
    assert_eq!(backend.swapchain().height, 480);
    assert_eq!(backend.frame_tracker().frames_in_flight(), 2);
    backend.present_frame(image).unwrap();
}

#[test]
fn test_surface_loss_is_reported_once() {
    let mut backend = create_backend();
    let image = presentable(&mut backend);

    backend.lose_surface(800, 600);
    assert_eq!(backend.begin_frame(), Err(BackendError::SurfaceLost));
    assert_eq!(backend.drawable_size(), (800, 600));
    assert_eq!(backend.swapchain().width, 800);

    assert!(backend.begin_frame().unwrap());
    backend.present_frame(image).unwrap();
}
