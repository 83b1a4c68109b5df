//! Pipeline deduplication and batched descriptor binding.
//!
//! [`PipelineCache`] hands out one backend pipeline per distinct
//! [`PipelineDescriptor`]. The descriptor includes the backend render pass,
//! so the same shaders used in two passes are two entries. The cache is a
//! plain list: it only grows to (passes x quality variants) entries.
//!
//! [`DescriptorBindings`] is the pending descriptor state of a backend.
//! Binding a set only updates the pending map; the first draw after a
//! change takes the whole map in one batch.
//!
//! ```text
//! bind_pipeline ──► mark_dirty
//! bind_descriptor_set(0) ──► write_set ─┐
//! bind_descriptor_set(1) ──► write_set ─┤ pending map
//! draw ──► take_flush ◄─────────────────┘ Some(batch), dirty cleared
//! draw ──► take_flush                     None
//! ```

use std::collections::BTreeMap;

use crate::backend::BackendResult;
use crate::handle::PipelineHandle;
use crate::types::{Descriptor, DescriptorIndex, DescriptorLayoutEntry, PipelineDescriptor};

/// Cache of created pipelines keyed by their full description.
#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: Vec<(PipelineDescriptor, PipelineHandle)>,
}

impl PipelineCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a pipeline by description.
    pub fn get(&self, desc: &PipelineDescriptor) -> Option<PipelineHandle> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == desc)
            .map(|&(_, handle)| handle)
    }

    /// Return the cached pipeline for `desc`, creating it with `create` on a
    /// miss. A failed creation is not cached.
    pub fn get_or_create(
        &mut self,
        desc: &PipelineDescriptor,
        create: impl FnOnce(&PipelineDescriptor) -> BackendResult<PipelineHandle>,
    ) -> BackendResult<PipelineHandle> {
        if let Some(handle) = self.get(desc) {
            return Ok(handle);
        }

        let handle = create(desc)?;
        log::debug!(
            "Cached pipeline {:?} ({} entries)",
            desc.label.as_deref().unwrap_or("unnamed"),
            self.entries.len() + 1
        );
        self.entries.push((desc.clone(), handle));
        Ok(handle)
    }

    /// Number of cached pipelines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand every cached pipeline to `delete` and empty the cache.
    pub fn clear_with(&mut self, mut delete: impl FnMut(PipelineHandle)) {
        for (_, handle) in self.entries.drain(..) {
            delete(handle);
        }
    }
}

/// Pending descriptor bindings.
#[derive(Debug, Default)]
pub struct DescriptorBindings {
    pending: BTreeMap<DescriptorIndex, Descriptor>,
    dirty: bool,
}

impl DescriptorBindings {
    /// Create an empty, clean binding state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next flush, e.g. after a pipeline bind.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true if the next draw must flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Decode `blob` against `layout` into the pending map as set `set`.
    ///
    /// Entries of other sets are untouched.
    pub fn write_set(&mut self, set: u32, layout: &[DescriptorLayoutEntry], blob: &[u8]) {
        for (index, descriptor) in crate::types::decode_descriptor_set(set, layout, blob) {
            self.pending.insert(index, descriptor);
        }
        self.dirty = true;
    }

    /// Pending descriptor at `index`.
    pub fn get(&self, index: DescriptorIndex) -> Option<&Descriptor> {
        self.pending.get(&index)
    }

    /// Take the whole pending map as one batch if anything changed since the
    /// last flush.
    pub fn take_flush(&mut self) -> Option<Vec<(DescriptorIndex, Descriptor)>> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.pending.iter().map(|(&i, &d)| (i, d)).collect())
    }

    /// Drop every pending binding.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::handle::{BufferHandle, SamplerHandle};
    use crate::types::DescriptorType;

    fn pipeline(index: u64) -> PipelineHandle {
        PipelineHandle::from_raw((1 << 32) | index)
    }

    // ========================================================================
    // PipelineCache
    // ========================================================================

    #[test]
    fn test_equal_descriptions_share_a_pipeline() {
        let mut cache = PipelineCache::new();
        let mut created = 0;
        let desc = PipelineDescriptor::new("blit", "blit").with_label("blit");

        for _ in 0..3 {
            let handle = cache
                .get_or_create(&desc, |_| {
                    created += 1;
                    Ok(pipeline(created))
                })
                .unwrap();
            assert_eq!(handle, pipeline(1));
        }
        assert_eq!(created, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_macros_distinguish_pipelines() {
        let mut cache = PipelineCache::new();
        let low = PipelineDescriptor::new("smaa", "smaa").with_macro("QUALITY", "LOW");
        let high = PipelineDescriptor::new("smaa", "smaa").with_macro("QUALITY", "HIGH");

        let a = cache.get_or_create(&low, |_| Ok(pipeline(1))).unwrap();
        let b = cache.get_or_create(&high, |_| Ok(pipeline(2))).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_creation_is_not_cached() {
        let mut cache = PipelineCache::new();
        let desc = PipelineDescriptor::new("broken", "broken");

        let err = cache
            .get_or_create(&desc, |_| {
                Err(BackendError::PipelineCreationFailed("syntax error".into()))
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::PipelineCreationFailed(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_with_deletes_everything() {
        let mut cache = PipelineCache::new();
        cache
            .get_or_create(&PipelineDescriptor::new("a", "a"), |_| Ok(pipeline(1)))
            .unwrap();
        cache
            .get_or_create(&PipelineDescriptor::new("b", "b"), |_| Ok(pipeline(2)))
            .unwrap();

        let mut deleted = Vec::new();
        cache.clear_with(|handle| deleted.push(handle));
        assert_eq!(deleted, vec![pipeline(1), pipeline(2)]);
        assert!(cache.is_empty());
    }

    // ========================================================================
    // DescriptorBindings
    // ========================================================================

    fn ubo_blob(buffer: BufferHandle) -> Vec<u8> {
        bytemuck::bytes_of(&buffer.to_raw()).to_vec()
    }

    #[test]
    fn test_flush_once_per_change() {
        let mut bindings = DescriptorBindings::new();
        let layout = [DescriptorLayoutEntry::new(DescriptorType::UniformBuffer, 0)];
        let ubo = BufferHandle::from_raw((1 << 32) | 3);

        assert!(bindings.take_flush().is_none());

        bindings.write_set(0, &layout, &ubo_blob(ubo));
        let batch = bindings.take_flush().unwrap();
        assert_eq!(
            batch,
            vec![(DescriptorIndex { set: 0, binding: 0 }, Descriptor::Buffer(ubo))]
        );

        // Second draw with unchanged state.
        assert!(bindings.take_flush().is_none());

        // A pipeline bind forces a full rebind of the same state.
        bindings.mark_dirty();
        assert_eq!(bindings.take_flush().unwrap().len(), 1);
    }

    #[test]
    fn test_sets_are_merged_into_one_batch() {
        let mut bindings = DescriptorBindings::new();
        let ubo = BufferHandle::from_raw((1 << 32) | 3);
        let sampler = SamplerHandle::from_raw((1 << 32) | 5);

        bindings.write_set(
            0,
            &[DescriptorLayoutEntry::new(DescriptorType::UniformBuffer, 0)],
            &ubo_blob(ubo),
        );
        bindings.write_set(
            1,
            &[DescriptorLayoutEntry::new(DescriptorType::Sampler, 0)],
            bytemuck::bytes_of(&sampler.to_raw()),
        );

        let batch = bindings.take_flush().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].0, DescriptorIndex { set: 1, binding: 0 });
        assert_eq!(batch[1].1, Descriptor::Sampler(sampler));
    }

    #[test]
    fn test_rebinding_overwrites_pending_entry() {
        let mut bindings = DescriptorBindings::new();
        let layout = [DescriptorLayoutEntry::new(DescriptorType::UniformBuffer, 0)];
        let first = BufferHandle::from_raw((1 << 32) | 1);
        let second = BufferHandle::from_raw((1 << 32) | 2);

        bindings.write_set(0, &layout, &ubo_blob(first));
        bindings.write_set(0, &layout, &ubo_blob(second));

        let index = DescriptorIndex { set: 0, binding: 0 };
        assert_eq!(bindings.get(index), Some(&Descriptor::Buffer(second)));
        assert_eq!(bindings.take_flush().unwrap().len(), 1);

        bindings.clear();
        assert!(bindings.get(index).is_none());
        assert!(!bindings.is_dirty());
    }
}
