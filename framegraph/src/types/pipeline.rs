//! Pipeline descriptors.

use std::collections::BTreeMap;

use crate::handle::{DsLayoutHandle, RenderPassHandle};

/// Preprocessor macros handed to the shader translation layer.
///
/// Ordered so two descriptors with the same macros compare equal regardless
/// of insertion order.
pub type ShaderMacros = BTreeMap<String, String>;

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four 8-bit unsigned normalized values.
    Unorm8x4,
}

/// One vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Vertex buffer binding the attribute reads from.
    pub binding: u32,
    /// Shader location.
    pub location: u32,
    /// Attribute format.
    pub format: VertexFormat,
    /// Byte offset inside a vertex.
    pub offset: u32,
}

/// Full declarative description of a graphics pipeline.
///
/// Equality covers every field, including the render pass the pipeline is
/// compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PipelineDescriptor {
    /// Debug label.
    pub label: Option<String>,
    /// Vertex shader name.
    pub vertex_shader: String,
    /// Fragment shader name.
    pub fragment_shader: String,
    /// Shader macros.
    pub macros: ShaderMacros,
    /// Render pass the pipeline targets.
    pub render_pass: RenderPassHandle,
    /// Vertex attributes.
    pub vertex_attributes: Vec<VertexAttribute>,
    /// Vertex buffer strides by binding.
    pub vertex_strides: BTreeMap<u32, u32>,
    /// Descriptor set layouts by set index.
    pub descriptor_set_layouts: Vec<DsLayoutHandle>,
    /// Alpha blending enabled.
    pub blending: bool,
    /// Depth testing enabled.
    pub depth_test: bool,
    /// Depth writes enabled.
    pub depth_write: bool,
    /// Scissor test enabled. Draws need a scissor rect when set.
    pub scissor_test: bool,
    /// Back-face culling enabled.
    pub cull_faces: bool,
    /// Sample count; must match the render pass.
    pub sample_count: u32,
}

impl PipelineDescriptor {
    /// Create a pipeline descriptor from shader names.
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            sample_count: 1,
            ..Default::default()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a shader macro.
    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.insert(name.into(), value.into());
        self
    }

    /// Set the target render pass.
    pub fn with_render_pass(mut self, render_pass: RenderPassHandle) -> Self {
        self.render_pass = render_pass;
        self
    }

    /// Add a vertex attribute.
    pub fn with_vertex_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.vertex_attributes.push(attribute);
        self
    }

    /// Set the stride of a vertex buffer binding.
    pub fn with_vertex_stride(mut self, binding: u32, stride: u32) -> Self {
        self.vertex_strides.insert(binding, stride);
        self
    }

    /// Set the layout of descriptor set `index`.
    pub fn with_descriptor_set_layout(mut self, index: usize, layout: DsLayoutHandle) -> Self {
        if self.descriptor_set_layouts.len() <= index {
            self.descriptor_set_layouts
                .resize(index + 1, DsLayoutHandle::INVALID);
        }
        self.descriptor_set_layouts[index] = layout;
        self
    }

    /// Enable alpha blending.
    pub fn with_blending(mut self, enabled: bool) -> Self {
        self.blending = enabled;
        self
    }

    /// Enable depth testing and writes.
    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    /// Enable the scissor test.
    pub fn with_scissor_test(mut self, enabled: bool) -> Self {
        self.scissor_test = enabled;
        self
    }

    /// Enable back-face culling.
    pub fn with_cull_faces(mut self, enabled: bool) -> Self {
        self.cull_faces = enabled;
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}
