//! Backend error types.

/// Errors that can occur in backend operations.
///
/// Misuse of the API (invalid handles, calls in the wrong state) is not
/// reported here; it panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// Pipeline compilation or linking failed.
    PipelineCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The device was lost.
    DeviceLost,
    /// The presentation surface was lost and the graph must be rebuilt.
    SurfaceLost,
    /// Waiting on a frame fence failed.
    FenceWaitFailed(String),
    /// The ephemeral ring has no room that isn't still in use by the GPU.
    RingExhausted {
        /// Requested allocation size in bytes.
        requested: u64,
        /// Ring capacity in bytes.
        capacity: u64,
    },
    /// Invalid parameter.
    InvalidParameter(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::PipelineCreationFailed(msg) => write!(f, "pipeline creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::SurfaceLost => write!(f, "surface lost, needs recreation"),
            Self::FenceWaitFailed(msg) => write!(f, "fence wait failed: {msg}"),
            Self::RingExhausted {
                requested,
                capacity,
            } => write!(
                f,
                "ephemeral ring exhausted: {requested} bytes requested from a {capacity}-byte ring still in use"
            ),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
