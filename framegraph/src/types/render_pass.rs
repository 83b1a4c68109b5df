//! Render pass and framebuffer descriptors.
//!
//! A [`RenderPassDescriptor`] only describes formats, begin behaviour and
//! layouts. Concrete images are bound through a [`FramebufferDescriptor`].
//! The two are compatible when their [`AttachmentSignature`]s match, which
//! lets one render pass be reused with different same-format images every
//! frame.

use crate::handle::{RenderPassHandle, RenderTargetHandle};

use super::TextureFormat;

/// Maximum number of color attachments per render pass.
pub const MAX_COLOR_RENDERTARGETS: usize = 4;

/// What happens to an attachment's contents when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassBegin {
    /// Previous contents are irrelevant.
    #[default]
    DontCare,
    /// Previous contents are preserved.
    Keep,
    /// Contents are cleared to the attachment's clear value.
    Clear,
}

impl PassBegin {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DontCare => "DontCare",
            Self::Keep => "Keep",
            Self::Clear => "Clear",
        }
    }
}

/// Logical layout of a render target image.
///
/// Backends map these onto their native image layouts or ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Contents undefined. Valid only as a source layout.
    #[default]
    Undefined,
    /// Writable as a color attachment.
    ColorAttachment,
    /// Readable from shaders.
    ShaderRead,
    /// Source of a transfer (blit, resolve, present).
    TransferSrc,
    /// Destination of a transfer.
    TransferDst,
}

impl Layout {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::ColorAttachment => "ColorAttachment",
            Self::ShaderRead => "ShaderRead",
            Self::TransferSrc => "TransferSrc",
            Self::TransferDst => "TransferDst",
        }
    }
}

/// One resolved color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentDescriptor {
    /// Attachment format.
    pub format: TextureFormat,
    /// Begin behaviour.
    pub pass_begin: PassBegin,
    /// Layout the image is in when the pass begins.
    pub initial_layout: Layout,
    /// Layout the image is left in when the pass ends.
    pub final_layout: Layout,
    /// Clear color, used when `pass_begin` is [`PassBegin::Clear`].
    pub clear_value: [f32; 4],
}

/// Resolved depth/stencil attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachmentDescriptor {
    /// Attachment format.
    pub format: TextureFormat,
    /// Begin behaviour.
    pub pass_begin: PassBegin,
    /// Clear depth, used when `pass_begin` is [`PassBegin::Clear`].
    pub clear_depth: f32,
}

/// Declarative description of a backend render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Sample count of every attachment.
    pub sample_count: u32,
    /// Color attachments by slot.
    pub colors: [Option<ColorAttachmentDescriptor>; MAX_COLOR_RENDERTARGETS],
    /// Depth/stencil attachment.
    pub depth_stencil: Option<DepthStencilAttachmentDescriptor>,
}

impl Default for RenderPassDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            sample_count: 1,
            colors: [None; MAX_COLOR_RENDERTARGETS],
            depth_stencil: None,
        }
    }
}

impl RenderPassDescriptor {
    /// Create an empty single-sampled descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set the color attachment in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn with_color(mut self, slot: usize, attachment: ColorAttachmentDescriptor) -> Self {
        assert!(
            slot < MAX_COLOR_RENDERTARGETS,
            "color slot {slot} out of range"
        );
        self.colors[slot] = Some(attachment);
        self
    }

    /// Set the depth/stencil attachment.
    pub fn with_depth_stencil(mut self, attachment: DepthStencilAttachmentDescriptor) -> Self {
        self.depth_stencil = Some(attachment);
        self
    }

    /// Formats and sample count this pass needs its framebuffers to match.
    pub fn signature(&self) -> AttachmentSignature {
        AttachmentSignature {
            sample_count: self.sample_count,
            colors: self.colors.map(|color| color.map(|c| c.format)),
            depth_stencil: self.depth_stencil.map(|d| d.format),
        }
    }
}

/// Concrete images bound to a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FramebufferDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Render pass this framebuffer is created for.
    pub render_pass: RenderPassHandle,
    /// Color images by slot.
    pub colors: [Option<RenderTargetHandle>; MAX_COLOR_RENDERTARGETS],
    /// Depth/stencil image.
    pub depth_stencil: Option<RenderTargetHandle>,
}

impl FramebufferDescriptor {
    /// Create a framebuffer descriptor for `render_pass`.
    pub fn new(render_pass: RenderPassHandle) -> Self {
        Self {
            render_pass,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bind a color image to `slot`.
    pub fn with_color(mut self, slot: usize, target: RenderTargetHandle) -> Self {
        assert!(
            slot < MAX_COLOR_RENDERTARGETS,
            "color slot {slot} out of range"
        );
        self.colors[slot] = Some(target);
        self
    }

    /// Bind the depth/stencil image.
    pub fn with_depth_stencil(mut self, target: RenderTargetHandle) -> Self {
        self.depth_stencil = Some(target);
        self
    }
}

/// Sample count and per-slot formats of a render pass or framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentSignature {
    /// Sample count.
    pub sample_count: u32,
    /// Color formats by slot.
    pub colors: [Option<TextureFormat>; MAX_COLOR_RENDERTARGETS],
    /// Depth/stencil format.
    pub depth_stencil: Option<TextureFormat>,
}

/// Returns true if a framebuffer with signature `framebuffer` can be used
/// with a render pass with signature `pass`.
///
/// Compatibility requires an equal sample count, the same depth/stencil
/// format (or both absent) and the same format (or both absent) in every
/// color slot.
pub fn is_render_pass_compatible(
    pass: &AttachmentSignature,
    framebuffer: &AttachmentSignature,
) -> bool {
    pass.sample_count == framebuffer.sample_count
        && pass.depth_stencil == framebuffer.depth_stencil
        && pass
            .colors
            .iter()
            .zip(framebuffer.colors.iter())
            .all(|(a, b)| a == b)
}
