//! Render pass declarations.
//!
//! A [`PassDesc`] names its attachments by logical rendertarget id. Formats,
//! layouts and the concrete images are resolved when the graph is built.

use crate::types::{MAX_COLOR_RENDERTARGETS, PassBegin};

/// Default depth clear value.
pub const DEFAULT_CLEAR_DEPTH: f32 = 1.0;

/// A color attachment of a declared pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTarget<R> {
    /// Logical rendertarget id.
    pub id: R,
    /// Begin behaviour.
    pub pass_begin: PassBegin,
    /// Clear color. Zero unless `pass_begin` is [`PassBegin::Clear`].
    pub clear_value: [f32; 4],
}

/// The depth/stencil attachment of a declared pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthTarget<R> {
    /// Logical rendertarget id.
    pub id: R,
    /// Begin behaviour.
    pub pass_begin: PassBegin,
    /// Clear depth, used when `pass_begin` is [`PassBegin::Clear`].
    pub clear_depth: f32,
}

/// Declaration of a render pass node.
///
/// # Example
///
/// ```ignore
/// let desc = PassDesc::new()
///     .with_label("scene")
///     .with_depth_stencil(Rt::MainDepth, PassBegin::DontCare)
///     .with_clear_depth(1.0)
///     .with_color(0, Rt::MainColor, PassBegin::Clear, [0.0, 0.0, 0.0, 1.0])
///     .with_sample_count(4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PassDesc<R> {
    label: Option<String>,
    colors: [Option<ColorTarget<R>>; MAX_COLOR_RENDERTARGETS],
    depth_stencil: Option<DepthTarget<R>>,
    sample_count: u32,
    inputs: Vec<R>,
}

impl<R> Default for PassDesc<R> {
    fn default() -> Self {
        Self {
            label: None,
            colors: [const { None }; MAX_COLOR_RENDERTARGETS],
            depth_stencil: None,
            sample_count: 1,
            inputs: Vec::new(),
        }
    }
}

impl<R: Copy + PartialEq + std::fmt::Debug> PassDesc<R> {
    /// Create a single-sampled pass without attachments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the sample count of every attachment.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        assert!(sample_count >= 1, "pass sample count is zero");
        self.sample_count = sample_count;
        self
    }

    /// Write rendertarget `id` as color attachment `slot`.
    ///
    /// `clear_value` is only kept when `pass_begin` is [`PassBegin::Clear`].
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn with_color(
        mut self,
        slot: usize,
        id: R,
        pass_begin: PassBegin,
        clear_value: [f32; 4],
    ) -> Self {
        assert!(
            slot < MAX_COLOR_RENDERTARGETS,
            "color slot {slot} out of range"
        );
        let clear_value = if pass_begin == PassBegin::Clear {
            clear_value
        } else {
            [0.0; 4]
        };
        self.colors[slot] = Some(ColorTarget {
            id,
            pass_begin,
            clear_value,
        });
        self
    }

    /// Use rendertarget `id` as the depth/stencil attachment.
    pub fn with_depth_stencil(mut self, id: R, pass_begin: PassBegin) -> Self {
        let clear_depth = self
            .depth_stencil
            .map_or(DEFAULT_CLEAR_DEPTH, |depth| depth.clear_depth);
        self.depth_stencil = Some(DepthTarget {
            id,
            pass_begin,
            clear_depth,
        });
        self
    }

    /// Clear the depth attachment to `value` when the pass begins.
    ///
    /// # Panics
    ///
    /// Panics if no depth attachment was set.
    pub fn with_clear_depth(mut self, value: f32) -> Self {
        let Some(depth) = self.depth_stencil.as_mut() else {
            panic!("clear depth set on pass {:?} without a depth attachment", self.label);
        };
        depth.pass_begin = PassBegin::Clear;
        depth.clear_depth = value;
        self
    }

    /// Read rendertarget `id` from shaders during this pass.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already an input.
    pub fn with_input(mut self, id: R) -> Self {
        assert!(
            !self.inputs.contains(&id),
            "rendertarget {id:?} is already an input of pass {:?}",
            self.label
        );
        self.inputs.push(id);
        self
    }

    /// Debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sample count.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Color attachments by slot.
    pub fn colors(&self) -> &[Option<ColorTarget<R>>; MAX_COLOR_RENDERTARGETS] {
        &self.colors
    }

    /// Depth/stencil attachment.
    pub fn depth_stencil(&self) -> Option<&DepthTarget<R>> {
        self.depth_stencil.as_ref()
    }

    /// Input rendertargets in declaration order.
    pub fn inputs(&self) -> &[R] {
        &self.inputs
    }

    /// Every rendertarget written by the pass, depth first.
    pub fn attachments(&self) -> impl Iterator<Item = R> + '_ {
        self.depth_stencil
            .iter()
            .map(|depth| depth.id)
            .chain(self.colors.iter().flatten().map(|color| color.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_value_only_kept_for_clear() {
        let desc = PassDesc::new()
            .with_color(0, "a", PassBegin::Clear, [1.0, 0.0, 0.0, 1.0])
            .with_color(1, "b", PassBegin::Keep, [1.0, 0.0, 0.0, 1.0]);

        assert_eq!(desc.colors()[0].unwrap().clear_value, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(desc.colors()[1].unwrap().clear_value, [0.0; 4]);
        assert!(desc.colors()[2].is_none());
    }

    #[test]
    fn test_clear_depth() {
        let desc = PassDesc::new().with_depth_stencil("depth", PassBegin::DontCare);
        let depth = desc.depth_stencil().unwrap();
        assert_eq!(depth.pass_begin, PassBegin::DontCare);
        assert_eq!(depth.clear_depth, DEFAULT_CLEAR_DEPTH);

        let desc = desc.with_clear_depth(0.0);
        let depth = desc.depth_stencil().unwrap();
        assert_eq!(depth.pass_begin, PassBegin::Clear);
        assert_eq!(depth.clear_depth, 0.0);
    }

    #[test]
    fn test_attachments_lists_depth_first() {
        let desc = PassDesc::new()
            .with_color(1, "color", PassBegin::DontCare, [0.0; 4])
            .with_depth_stencil("depth", PassBegin::Clear)
            .with_input("history");

        assert_eq!(desc.attachments().collect::<Vec<_>>(), vec!["depth", "color"]);
        assert_eq!(desc.inputs(), &["history"]);
        assert_eq!(desc.sample_count(), 1);
    }

    #[test]
    #[should_panic(expected = "already an input")]
    fn test_duplicate_input_panics() {
        let _ = PassDesc::new().with_input("a").with_input("a");
    }

    #[test]
    #[should_panic(expected = "without a depth attachment")]
    fn test_clear_depth_without_depth_panics() {
        let _ = PassDesc::<&str>::new().with_clear_depth(1.0);
    }
}
