//! Rendertargets declared in a graph.

use crate::handle::RenderTargetHandle;
use crate::types::{Layout, RenderTargetDescriptor, TextureFormat};

/// A rendertarget known to the graph.
///
/// Internal targets are created by the graph at build time. External targets
/// are images owned by the caller and bound anew before every render.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendertarget {
    /// Image created and owned by the graph.
    Internal {
        /// Creation descriptor.
        desc: RenderTargetDescriptor,
        /// Backend image, set by `build`.
        handle: Option<RenderTargetHandle>,
    },
    /// Image supplied by the caller.
    External {
        /// Pixel format the image will have.
        format: TextureFormat,
        /// Layout the image is in when it is bound.
        initial_layout: Layout,
        /// Layout the image must be left in.
        final_layout: Layout,
        /// Image bound for the current render.
        handle: Option<RenderTargetHandle>,
    },
}

impl Rendertarget {
    /// Pixel format.
    pub fn format(&self) -> TextureFormat {
        match self {
            Self::Internal { desc, .. } => desc.format,
            Self::External { format, .. } => *format,
        }
    }

    /// Second view format of an internal target.
    pub fn additional_view_format(&self) -> Option<TextureFormat> {
        match self {
            Self::Internal { desc, .. } => desc.additional_view_format,
            Self::External { .. } => None,
        }
    }

    /// Current backend image, if created or bound.
    pub fn handle(&self) -> Option<RenderTargetHandle> {
        match self {
            Self::Internal { handle, .. } | Self::External { handle, .. } => *handle,
        }
    }

    /// Returns true for caller-supplied images.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let internal = Rendertarget::Internal {
            desc: RenderTargetDescriptor::new(8, 8, TextureFormat::Rgba8Unorm)
                .with_additional_view_format(TextureFormat::Rgba8UnormSrgb),
            handle: None,
        };
        assert_eq!(internal.format(), TextureFormat::Rgba8Unorm);
        assert_eq!(
            internal.additional_view_format(),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert!(!internal.is_external());

        let external = Rendertarget::External {
            format: TextureFormat::Bgra8Unorm,
            initial_layout: Layout::Undefined,
            final_layout: Layout::TransferSrc,
            handle: Some(RenderTargetHandle::from_raw((1 << 32) | 4)),
        };
        assert_eq!(external.format(), TextureFormat::Bgra8Unorm);
        assert_eq!(external.additional_view_format(), None);
        assert!(external.is_external());
        assert!(external.handle().is_some());
    }
}
