//! Descriptor set layout registry.
//!
//! Layouts live as long as the backend that created them. Identical binding
//! lists share one handle, so pipelines created from equal descriptions keep
//! comparing equal.

use crate::container::ResourceContainer;
use crate::handle::{DsLayoutHandle, kind};
use crate::types::DescriptorLayoutEntry;

/// Per-backend store of descriptor set layouts.
#[derive(Debug, Default)]
pub struct DescriptorLayoutRegistry {
    layouts: ResourceContainer<Vec<DescriptorLayoutEntry>, kind::DescriptorSetLayout>,
}

impl DescriptorLayoutRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entries`, returning the existing handle if an identical
    /// layout is already known.
    ///
    /// # Panics
    ///
    /// Panics if `entries` is empty.
    pub fn register(&mut self, entries: &[DescriptorLayoutEntry]) -> DsLayoutHandle {
        assert!(!entries.is_empty(), "descriptor set layout has no bindings");

        if let Some((handle, _)) = self
            .layouts
            .iter()
            .find(|(_, existing)| existing.as_slice() == entries)
        {
            return handle;
        }

        let (handle, _) = self.layouts.add(entries.to_vec());
        log::trace!(
            "Registered descriptor set layout {:?} with {} bindings",
            handle,
            entries.len()
        );
        handle
    }

    /// Bindings of `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this registry.
    pub fn get(&self, handle: DsLayoutHandle) -> &[DescriptorLayoutEntry] {
        self.layouts.get(handle)
    }

    /// Number of distinct layouts.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns true if no layout is registered.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
