//! Frame tracker for managing multiple frames in flight.
//!
//! [`FrameTracker`] owns a fixed ring of frame slots. Each slot remembers the
//! fence of the submission that last used it, the ephemeral buffers that
//! submission allocated, and how far the ephemeral ring cursor had advanced.
//! A slot is reused only after its fence signals, at which point everything
//! it allocated is reclaimed.
//!
//! # Frame Overlap
//!
//! With 2 frames in flight, the CPU records frame N+1 while the GPU executes
//! frame N:
//!
//! ```text
//! Slot 0: [Frame 0] ──► [Frame 2] ──► [Frame 4] ──►
//! Slot 1: [Frame 1] ──► [Frame 3] ──► [Frame 5] ──►
//!
//! Frame 2: [wait F0 fence] [reclaim F0 buffers] [record] [present]
//! ```
//!
//! # Waiting
//!
//! Fence waits are bounded. A timeout is reported as `Ok(false)`, not as an
//! error: the caller is expected to pump window system events and retry.
//!
//! ```ignore
//! while !backend.begin_frame()? {
//!     window.process_events();
//! }
//! ```
//!
//! The tracker itself does not know how fences are waited on or how buffers
//! are destroyed; the backend supplies that through [`FrameResources`].
//!
//! # Deferred Framebuffers
//!
//! Framebuffers built for a single frame are deleted right after it is
//! presented, while the GPU may still be executing it.
//! [`FrameTracker::defer_framebuffer`] parks them on the newest submission
//! and they are destroyed when that submission retires.

use crate::backend::BackendResult;
use crate::handle::{BufferHandle, FramebufferHandle};

/// Result of polling a frame fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceStatus {
    /// The GPU finished the frame.
    Signaled,
    /// The wait timed out. Retry later.
    Timeout,
}

/// Backend services the tracker needs to retire a frame.
pub trait FrameResources {
    /// Backend fence type.
    type Fence;

    /// Wait (bounded) for `fence`.
    fn wait_fence(&mut self, fence: &Self::Fence) -> BackendResult<FenceStatus>;

    /// Destroy a fence after it signaled.
    fn release_fence(&mut self, fence: Self::Fence) {
        drop(fence);
    }

    /// Reclaim an ephemeral buffer of a retired frame. Ring-allocated buffers
    /// are only forgotten; owned ones are destroyed.
    fn release_ephemeral(&mut self, buffer: BufferHandle);

    /// Destroy a framebuffer whose deletion was deferred to a retired frame.
    fn release_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Every ring allocation before logical cursor `cursor` is free again.
    fn ring_synced(&mut self, cursor: u64);
}

/// One frame slot.
#[derive(Debug)]
pub struct Frame<F> {
    fence: Option<F>,
    ephemeral_buffers: Vec<BufferHandle>,
    deferred_framebuffers: Vec<FramebufferHandle>,
    used_ring_cursor: u64,
    last_frame_num: u64,
    outstanding: bool,
}

impl<F> Frame<F> {
    fn new() -> Self {
        Self {
            fence: None,
            ephemeral_buffers: Vec::new(),
            deferred_framebuffers: Vec::new(),
            used_ring_cursor: 0,
            last_frame_num: 0,
            outstanding: false,
        }
    }

    /// Returns true while the slot's submission has not retired.
    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    /// Ephemeral buffers allocated by the slot's current submission.
    pub fn ephemeral_buffers(&self) -> &[BufferHandle] {
        &self.ephemeral_buffers
    }

    /// Framebuffers destroyed once the slot's submission retires.
    pub fn deferred_framebuffers(&self) -> &[FramebufferHandle] {
        &self.deferred_framebuffers
    }

    /// Frame number of the slot's last submission.
    pub fn last_frame_num(&self) -> u64 {
        self.last_frame_num
    }

    /// Ring cursor at the slot's last submission.
    pub fn used_ring_cursor(&self) -> u64 {
        self.used_ring_cursor
    }
}

/// Fixed set of in-flight frame slots, selected round-robin by frame number.
///
/// `FrameTracker` is **not thread-safe**. It should be owned by the thread
/// that submits work.
#[derive(Debug)]
pub struct FrameTracker<F> {
    frames: Vec<Frame<F>>,
    /// Number of frames presented so far.
    frame_num: u64,
    /// Slot of the frame being recorded (valid while `in_frame`).
    current: usize,
    in_frame: bool,
    /// Ephemeral buffers registered between frames; handed to the next frame
    /// once its slot has been reclaimed.
    carry_over: Vec<BufferHandle>,
    last_synced_frame: Option<u64>,
}

impl<F> FrameTracker<F> {
    /// Create a tracker with `frames_in_flight` slots.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0.
    pub fn new(frames_in_flight: usize) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        Self {
            frames: (0..frames_in_flight).map(|_| Frame::new()).collect(),
            frame_num: 0,
            current: 0,
            in_frame: false,
            carry_over: Vec::new(),
            last_synced_frame: None,
        }
    }

    /// Number of slots.
    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames presented so far.
    pub fn frame_num(&self) -> u64 {
        self.frame_num
    }

    /// Slot index of the frame being recorded, or of the next one.
    pub fn current_index(&self) -> usize {
        if self.in_frame {
            self.current
        } else {
            (self.frame_num % self.frames.len() as u64) as usize
        }
    }

    /// Returns true between `begin_frame` and `present_frame`.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Highest frame number known to be complete on the GPU.
    pub fn last_synced_frame(&self) -> Option<u64> {
        self.last_synced_frame
    }

    /// Access a slot.
    pub fn frame(&self, index: usize) -> &Frame<F> {
        &self.frames[index]
    }

    /// Returns true if no slot is outstanding.
    pub fn is_idle(&self) -> bool {
        self.frames.iter().all(|frame| !frame.outstanding)
    }

    /// Acquire the next slot, retiring its previous submission first.
    ///
    /// Returns `Ok(false)` if the previous submission's fence timed out; the
    /// frame has not begun and the call should be retried.
    ///
    /// # Panics
    ///
    /// Panics if a frame is already being recorded.
    pub fn begin_frame<R>(&mut self, resources: &mut R) -> BackendResult<bool>
    where
        R: FrameResources<Fence = F>,
    {
        assert!(!self.in_frame, "begin_frame called twice without present_frame");

        let index = self.current_index();
        if self.frames[index].outstanding && !self.wait_for_frame(index, resources)? {
            return Ok(false);
        }
        debug_assert!(self.frames[index].ephemeral_buffers.is_empty());
        debug_assert!(self.frames[index].deferred_framebuffers.is_empty());

        let frame = &mut self.frames[index];
        frame.ephemeral_buffers.append(&mut self.carry_over);
        self.current = index;
        self.in_frame = true;

        log::trace!("Beginning frame {} in slot {}", self.frame_num, index);
        Ok(true)
    }

    /// Register an ephemeral buffer with the frame being recorded.
    ///
    /// Outside a frame, the buffer is attached to the next frame.
    pub fn track_ephemeral(&mut self, buffer: BufferHandle) {
        if self.in_frame {
            self.frames[self.current].ephemeral_buffers.push(buffer);
        } else {
            self.carry_over.push(buffer);
        }
    }

    /// Defer the destruction of `framebuffer` until every submission that
    /// may reference it has retired.
    ///
    /// Inside a frame it is attached to the frame being recorded; between
    /// frames to the newest outstanding one. Returns the handle back when no
    /// submission is pending and it can be destroyed right away.
    pub fn defer_framebuffer(
        &mut self,
        framebuffer: FramebufferHandle,
    ) -> Option<FramebufferHandle> {
        let index = if self.in_frame {
            Some(self.current)
        } else {
            // Submissions retire in order, so the newest one outlives the rest.
            (0..self.frames.len())
                .filter(|&i| self.frames[i].outstanding)
                .max_by_key(|&i| self.frames[i].last_frame_num)
        };

        match index {
            Some(index) => {
                self.frames[index].deferred_framebuffers.push(framebuffer);
                None
            }
            None => Some(framebuffer),
        }
    }

    /// Submit the frame being recorded.
    ///
    /// # Panics
    ///
    /// Panics if no frame is being recorded.
    pub fn present_frame(&mut self, fence: F, ring_cursor: u64) {
        assert!(self.in_frame, "present_frame called outside of a frame");

        let frame = &mut self.frames[self.current];
        debug_assert!(!frame.outstanding);
        frame.fence = Some(fence);
        frame.used_ring_cursor = ring_cursor;
        frame.last_frame_num = self.frame_num;
        frame.outstanding = true;

        self.frame_num += 1;
        self.in_frame = false;
    }

    /// Wait for slot `index` to retire and reclaim its resources.
    ///
    /// Returns `Ok(false)` on timeout, leaving the slot outstanding.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not outstanding.
    pub fn wait_for_frame<R>(&mut self, index: usize, resources: &mut R) -> BackendResult<bool>
    where
        R: FrameResources<Fence = F>,
    {
        let frame = &mut self.frames[index];
        assert!(frame.outstanding, "frame slot {index} is not outstanding");

        let Some(fence) = frame.fence.as_ref() else {
            panic!("outstanding frame slot {index} has no fence");
        };

        match resources.wait_fence(fence)? {
            FenceStatus::Timeout => {
                log::trace!(
                    "Timed out waiting for frame {} (slot {})",
                    frame.last_frame_num,
                    index
                );
                return Ok(false);
            }
            FenceStatus::Signaled => {}
        }

        if let Some(fence) = frame.fence.take() {
            resources.release_fence(fence);
        }
        for buffer in frame.ephemeral_buffers.drain(..) {
            resources.release_ephemeral(buffer);
        }
        for framebuffer in frame.deferred_framebuffers.drain(..) {
            resources.release_framebuffer(framebuffer);
        }
        frame.outstanding = false;
        resources.ring_synced(frame.used_ring_cursor);

        let synced = frame.last_frame_num;
        self.last_synced_frame = Some(self.last_synced_frame.map_or(synced, |s| s.max(synced)));

        Ok(true)
    }

    /// Wait for every outstanding slot to retire.
    ///
    /// Returns `Ok(false)` as soon as one wait times out.
    pub fn wait_for_device_idle<R>(&mut self, resources: &mut R) -> BackendResult<bool>
    where
        R: FrameResources<Fence = F>,
    {
        // Oldest submission first.
        let mut pending: Vec<usize> = (0..self.frames.len())
            .filter(|&i| self.frames[i].outstanding)
            .collect();
        pending.sort_by_key(|&i| self.frames[i].last_frame_num);

        for index in pending {
            if !self.wait_for_frame(index, resources)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Change the number of slots.
    ///
    /// Shrinking waits for the device to go idle first; returns `Ok(false)`
    /// if that timed out and nothing changed.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is 0 or a frame is being recorded.
    pub fn resize<R>(&mut self, frames_in_flight: usize, resources: &mut R) -> BackendResult<bool>
    where
        R: FrameResources<Fence = F>,
    {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        assert!(!self.in_frame, "cannot resize frame slots while recording");

        let current = self.frames.len();
        if frames_in_flight < current {
            if !self.wait_for_device_idle(resources)? {
                return Ok(false);
            }
            self.frames.truncate(frames_in_flight);
        } else {
            self.frames.resize_with(frames_in_flight, Frame::new);
        }

        if current != frames_in_flight {
            log::info!("Frames in flight: {current} -> {frames_in_flight}");
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Fences are frame numbers; `signaled` decides which have completed.
    #[derive(Default)]
    struct MockResources {
        signaled: HashSet<u64>,
        fail: bool,
        released: Vec<BufferHandle>,
        released_framebuffers: Vec<FramebufferHandle>,
        synced_cursor: u64,
    }

    impl FrameResources for MockResources {
        type Fence = u64;

        fn wait_fence(&mut self, fence: &u64) -> BackendResult<FenceStatus> {
            if self.fail {
                return Err(crate::backend::BackendError::DeviceLost);
            }
            Ok(if self.signaled.contains(fence) {
                FenceStatus::Signaled
            } else {
                FenceStatus::Timeout
            })
        }

        fn release_ephemeral(&mut self, buffer: BufferHandle) {
            self.released.push(buffer);
        }

        fn release_framebuffer(&mut self, framebuffer: FramebufferHandle) {
            self.released_framebuffers.push(framebuffer);
        }

        fn ring_synced(&mut self, cursor: u64) {
            self.synced_cursor = self.synced_cursor.max(cursor);
        }
    }

    fn buffer(index: u32) -> BufferHandle {
        BufferHandle::from_raw((1 << 32) | u64::from(index))
    }

    fn framebuffer(index: u32) -> FramebufferHandle {
        FramebufferHandle::from_raw((1 << 32) | u64::from(index))
    }

    #[test]
    #[should_panic(expected = "at least 1")]
    fn test_zero_frames_panics() {
        let _ = FrameTracker::<u64>::new(0);
    }

    #[test]
    fn test_round_robin_slots() {
        let mut tracker = FrameTracker::new(2);
        let mut res = MockResources::default();

        for frame in 0..2u64 {
            assert!(tracker.begin_frame(&mut res).unwrap());
            assert_eq!(tracker.current_index(), frame as usize);
            tracker.present_frame(frame, 0);
        }
        assert_eq!(tracker.frame_num(), 2);
        assert!(tracker.frame(0).is_outstanding());
        assert!(tracker.frame(1).is_outstanding());
    }

    #[test]
    fn test_begin_frame_times_out_until_fence_signals() {
        let mut tracker = FrameTracker::new(1);
        let mut res = MockResources::default();

        assert!(tracker.begin_frame(&mut res).unwrap());
        tracker.track_ephemeral(buffer(1));
        tracker.present_frame(0, 600);

        // Fence 0 not signaled: buffers must stay alive.
        assert!(!tracker.begin_frame(&mut res).unwrap());
        assert!(!tracker.in_frame());
        assert!(res.released.is_empty());
        assert_eq!(tracker.frame(0).ephemeral_buffers(), &[buffer(1)]);

        res.signaled.insert(0);
        assert!(tracker.begin_frame(&mut res).unwrap());
        assert_eq!(res.released, vec![buffer(1)]);
        assert_eq!(res.synced_cursor, 600);
        assert_eq!(tracker.last_synced_frame(), Some(0));
    }

    #[test]
    fn test_fence_failure_is_an_error() {
        let mut tracker = FrameTracker::new(1);
        let mut res = MockResources::default();

        tracker.begin_frame(&mut res).unwrap();
        tracker.present_frame(0, 0);

        res.fail = true;
        assert!(tracker.begin_frame(&mut res).is_err());
        assert!(tracker.frame(0).is_outstanding());
    }

    #[test]
    fn test_wait_for_device_idle() {
        let mut tracker = FrameTracker::new(3);
        let mut res = MockResources::default();

        for frame in 0..3u64 {
            tracker.begin_frame(&mut res).unwrap();
            tracker.track_ephemeral(buffer(frame as u32));
            tracker.present_frame(frame, (frame + 1) * 100);
        }

        res.signaled.extend([0, 1]);
        assert!(!tracker.wait_for_device_idle(&mut res).unwrap());
        assert!(!tracker.frame(0).is_outstanding());
        assert!(!tracker.frame(1).is_outstanding());
        assert!(tracker.frame(2).is_outstanding());

        res.signaled.insert(2);
        assert!(tracker.wait_for_device_idle(&mut res).unwrap());
        assert!(tracker.is_idle());
        assert_eq!(res.released, vec![buffer(0), buffer(1), buffer(2)]);
        assert_eq!(res.synced_cursor, 300);
        assert_eq!(tracker.last_synced_frame(), Some(2));
    }

    #[test]
    fn test_buffers_registered_between_frames_go_to_next_frame() {
        let mut tracker = FrameTracker::new(2);
        let mut res = MockResources::default();

        tracker.begin_frame(&mut res).unwrap();
        tracker.present_frame(0, 0);

        tracker.track_ephemeral(buffer(7));
        tracker.begin_frame(&mut res).unwrap();
        assert_eq!(tracker.frame(1).ephemeral_buffers(), &[buffer(7)]);
        tracker.present_frame(1, 0);

        // Retiring frame 0 must not touch the carried-over buffer.
        res.signaled.insert(0);
        tracker.begin_frame(&mut res).unwrap();
        assert!(res.released.is_empty());
    }

    #[test]
    fn test_resize_shrink_waits_for_idle() {
        let mut tracker = FrameTracker::new(3);
        let mut res = MockResources::default();

        tracker.begin_frame(&mut res).unwrap();
        tracker.present_frame(0, 0);

        assert!(!tracker.resize(1, &mut res).unwrap());
        assert_eq!(tracker.frames_in_flight(), 3);

        res.signaled.insert(0);
        assert!(tracker.resize(1, &mut res).unwrap());
        assert_eq!(tracker.frames_in_flight(), 1);

        assert!(tracker.resize(2, &mut res).unwrap());
        assert_eq!(tracker.frames_in_flight(), 2);
    }

    #[test]
    fn test_framebuffer_deleted_without_pending_work_is_returned() {
        let mut tracker = FrameTracker::<u64>::new(2);
        assert_eq!(tracker.defer_framebuffer(framebuffer(1)), Some(framebuffer(1)));
    }

    #[test]
    fn test_deferred_framebuffer_outlives_its_frame() {
        let mut tracker = FrameTracker::new(2);
        let mut res = MockResources::default();

        tracker.begin_frame(&mut res).unwrap();
        tracker.present_frame(0, 0);
        tracker.begin_frame(&mut res).unwrap();
        tracker.present_frame(1, 0);

        // Between frames: parked on the newest submission, slot 1.
        assert_eq!(tracker.defer_framebuffer(framebuffer(3)), None);
        assert_eq!(tracker.frame(1).deferred_framebuffers(), &[framebuffer(3)]);
        assert!(tracker.frame(0).deferred_framebuffers().is_empty());

        res.signaled.insert(0);
        assert!(tracker.begin_frame(&mut res).unwrap());
        assert!(res.released_framebuffers.is_empty());

        // Inside a frame: parked on the frame being recorded.
        assert_eq!(tracker.defer_framebuffer(framebuffer(4)), None);
        assert_eq!(tracker.frame(0).deferred_framebuffers(), &[framebuffer(4)]);
        tracker.present_frame(2, 0);

        res.signaled.extend([1, 2]);
        assert!(tracker.wait_for_device_idle(&mut res).unwrap());
        assert_eq!(res.released_framebuffers, vec![framebuffer(3), framebuffer(4)]);
    }
}
