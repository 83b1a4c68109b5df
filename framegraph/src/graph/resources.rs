//! Views handed to render pass callbacks.

use std::collections::HashMap;
use std::hash::Hash;

use crate::handle::TextureHandle;
use crate::types::TextureFormat;

/// Shader-readable views of the input rendertargets of one pass.
///
/// Every input is reachable by id alone, by id and its own format, and by id
/// and its additional view format if it has one.
#[derive(Debug)]
pub struct PassResources<R> {
    views: HashMap<(R, Option<TextureFormat>), TextureHandle>,
}

impl<R> Default for PassResources<R> {
    fn default() -> Self {
        Self {
            views: HashMap::new(),
        }
    }
}

impl<R: Copy + Eq + Hash + std::fmt::Debug> PassResources<R> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the default view of input `id`.
    pub(crate) fn insert(&mut self, id: R, format: TextureFormat, view: TextureHandle) {
        self.views.insert((id, Some(format)), view);
        self.views.entry((id, None)).or_insert(view);
    }

    /// Register the additional view of input `id`.
    pub(crate) fn insert_additional(&mut self, id: R, format: TextureFormat, view: TextureHandle) {
        self.views.insert((id, Some(format)), view);
    }

    /// Default view of input `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an input of the pass.
    pub fn view(&self, id: R) -> TextureHandle {
        match self.try_view(id, None) {
            Some(view) => view,
            None => panic!("rendertarget {id:?} is not an input of this pass"),
        }
    }

    /// View of input `id` in `format`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an input or has no view in `format`.
    pub fn view_as(&self, id: R, format: TextureFormat) -> TextureHandle {
        match self.try_view(id, Some(format)) {
            Some(view) => view,
            None => panic!("rendertarget {id:?} has no {format:?} view in this pass"),
        }
    }

    /// View of input `id` in `format`, or its default view for `None`.
    pub fn try_view(&self, id: R, format: Option<TextureFormat>) -> Option<TextureHandle> {
        self.views.get(&(id, format)).copied()
    }

    /// Number of distinct (id, format) keys, default keys included.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns true if the pass has no inputs.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
