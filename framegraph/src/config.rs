//! Renderer configuration.
//!
//! [`RendererConfig`] collects the settings a backend is created with. The
//! swapchain part can be changed later through
//! [`Backend::set_swapchain_desc`](crate::backend::Backend::set_swapchain_desc).
//!
//! ```ignore
//! let config = RendererConfig::default()
//!     .with_swapchain(SwapchainDescriptor::new(1920, 1080).with_num_frames(2))
//!     .with_ephemeral_ring_size(4 * 1024 * 1024)
//!     .with_debug(true);
//! config.validate()?;
//! let backend = DummyBackend::new(&config);
//! ```

use std::time::Duration;

use thiserror::Error;

/// Default ephemeral ring size (1 MiB).
pub const DEFAULT_EPHEMERAL_RING_SIZE: u64 = 1024 * 1024;

/// Default number of frames in flight.
pub const DEFAULT_FRAMES_IN_FLIGHT: u32 = 3;

/// Default bound on a single fence wait.
pub const DEFAULT_FENCE_TIMEOUT: Duration = Duration::from_millis(16);

/// Vertical synchronization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VSync {
    /// Present immediately. May tear.
    Off,
    /// Wait for vertical blank.
    #[default]
    On,
    /// Wait for vertical blank, but tear if the frame is late.
    LateSwapTear,
}

impl VSync {
    /// The next mode in Off → On → LateSwapTear order, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::LateSwapTear,
            Self::LateSwapTear => Self::Off,
        }
    }
}

/// Swapchain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapchainDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of swapchain images, which is also the number of frames in
    /// flight.
    pub num_frames: u32,
    /// Vertical synchronization.
    pub vsync: VSync,
    /// Fullscreen or windowed.
    pub fullscreen: bool,
}

impl Default for SwapchainDescriptor {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl SwapchainDescriptor {
    /// Create a windowed descriptor with default frame count and vsync.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            num_frames: DEFAULT_FRAMES_IN_FLIGHT,
            vsync: VSync::default(),
            fullscreen: false,
        }
    }

    /// Set the number of frames in flight.
    pub fn with_num_frames(mut self, num_frames: u32) -> Self {
        self.num_frames = num_frames;
        self
    }

    /// Set the vsync mode.
    pub fn with_vsync(mut self, vsync: VSync) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set fullscreen.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }
}

/// Configuration a backend is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial swapchain.
    pub swapchain: SwapchainDescriptor,
    /// Ephemeral ring size in bytes.
    pub ephemeral_ring_size: u64,
    /// Bound on a single fence wait before `Ok(false)` is returned.
    pub fence_timeout: Duration,
    /// Enable backend debug validation.
    pub debug: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            swapchain: SwapchainDescriptor::default(),
            ephemeral_ring_size: DEFAULT_EPHEMERAL_RING_SIZE,
            fence_timeout: DEFAULT_FENCE_TIMEOUT,
            debug: cfg!(debug_assertions),
        }
    }
}

impl RendererConfig {
    /// Set the swapchain.
    pub fn with_swapchain(mut self, swapchain: SwapchainDescriptor) -> Self {
        self.swapchain = swapchain;
        self
    }

    /// Set the ephemeral ring size.
    pub fn with_ephemeral_ring_size(mut self, size: u64) -> Self {
        self.ephemeral_ring_size = size;
        self
    }

    /// Set the fence wait bound.
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    /// Enable or disable debug validation.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check the configuration for values no backend can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let SwapchainDescriptor {
            width,
            height,
            num_frames,
            ..
        } = self.swapchain;

        if width == 0 || height == 0 {
            return Err(ConfigError::EmptySwapchain { width, height });
        }
        if num_frames == 0 {
            return Err(ConfigError::NoFramesInFlight);
        }
        if self.ephemeral_ring_size == 0 {
            return Err(ConfigError::EmptyEphemeralRing);
        }
        if self.fence_timeout.is_zero() {
            return Err(ConfigError::ZeroFenceTimeout);
        }
        Ok(())
    }
}

/// Invalid [`RendererConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("swapchain size {width}x{height} has no pixels")]
    EmptySwapchain { width: u32, height: u32 },
    #[error("swapchain needs at least one frame in flight")]
    NoFramesInFlight,
    #[error("ephemeral ring size cannot be zero")]
    EmptyEphemeralRing,
    #[error("fence timeout cannot be zero")]
    ZeroFenceTimeout,
}
