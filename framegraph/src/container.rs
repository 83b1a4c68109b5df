//! Handle-indexed storage for backend objects.
//!
//! [`ResourceContainer`] is the single owner of every backend object of one
//! type. Objects are addressed by [`Handle`]s; a slot freed by
//! [`remove`](ResourceContainer::remove) is recycled by a later
//! [`add`](ResourceContainer::add) with a bumped generation, so stale handles
//! never resolve to the new occupant.
//!
//! # Example
//!
//! ```ignore
//! let mut buffers: ResourceContainer<DummyBuffer, kind::Buffer> = ResourceContainer::new();
//!
//! let (handle, buffer) = buffers.add(DummyBuffer::default());
//! buffer.size = 256;
//!
//! assert_eq!(buffers.get(handle).size, 256);
//!
//! buffers.remove(handle, |buffer| log::trace!("destroying {} bytes", buffer.size));
//! assert!(buffers.try_get(handle).is_none());
//! ```

use std::fmt;

use crate::handle::{Handle, ResourceKind};

struct Slot<T> {
    /// Generation of the current (or next) occupant. Never zero.
    generation: u32,
    value: Option<T>,
}

/// Arena of `T` addressed by `Handle<K>`.
pub struct ResourceContainer<T, K> {
    slots: Vec<Slot<T>>,
    /// Recyclable slot indices (LIFO stack).
    free_list: Vec<u32>,
    count: usize,
    _kind: std::marker::PhantomData<fn() -> K>,
}

impl<T, K: ResourceKind> ResourceContainer<T, K> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            count: 0,
            _kind: std::marker::PhantomData,
        }
    }

    /// Store `value` in a free slot and return its handle plus a mutable
    /// reference for further initialization.
    pub fn add(&mut self, value: T) -> (Handle<K>, &mut T) {
        self.count += 1;

        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len())
                    .unwrap_or_else(|_| panic!("{} container exhausted", K::NAME));
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.value.is_none());
        let handle = Handle::new(index, slot.generation);
        let value = slot.value.insert(value);
        (handle, value)
    }

    /// Resolve a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid, stale, or was never issued by this
    /// container.
    pub fn get(&self, handle: Handle<K>) -> &T {
        match self.try_get(handle) {
            Some(value) => value,
            None => invalid_handle(handle),
        }
    }

    /// Resolve a handle mutably.
    ///
    /// # Panics
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut(&mut self, handle: Handle<K>) -> &mut T {
        match self.slot_mut(handle) {
            Some(slot) => match slot.value.as_mut() {
                Some(value) => value,
                None => invalid_handle(handle),
            },
            None => invalid_handle(handle),
        }
    }

    /// Resolve a handle, returning `None` instead of panicking.
    pub fn try_get(&self, handle: Handle<K>) -> Option<&T> {
        if !handle.is_valid() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Returns `true` if the handle currently resolves.
    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.try_get(handle).is_some()
    }

    /// Take the value out of its slot, hand it to `finalizer` and release the
    /// slot. The finalizer must destroy whatever backend state the value
    /// owns.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not resolve.
    pub fn remove<R>(&mut self, handle: Handle<K>, finalizer: impl FnOnce(T) -> R) -> R {
        let Some(slot) = self.slot_mut(handle) else {
            invalid_handle(handle)
        };
        let Some(value) = slot.value.take() else {
            invalid_handle(handle)
        };

        slot.generation = next_generation(slot.generation);
        self.free_list.push(handle.index());
        self.count -= 1;

        finalizer(value)
    }

    /// Finalize every live value and empty the container.
    ///
    /// Handles issued before the call never resolve afterwards.
    pub fn clear_with(&mut self, mut finalizer: impl FnMut(Handle<K>, T)) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                let handle = Handle::new(index as u32, slot.generation);
                slot.generation = next_generation(slot.generation);
                self.free_list.push(index as u32);
                finalizer(handle, value);
            }
        }
        self.count = 0;
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no value is live.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate over live values with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    fn slot_mut(&mut self, handle: Handle<K>) -> Option<&mut Slot<T>> {
        if !handle.is_valid() {
            return None;
        }
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }
}

impl<T, K: ResourceKind> Default for ResourceContainer<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: ResourceKind> fmt::Debug for ResourceContainer<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceContainer")
            .field("kind", &K::NAME)
            .field("len", &self.count)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

#[cold]
#[track_caller]
fn invalid_handle<K: ResourceKind>(handle: Handle<K>) -> ! {
    panic!("invalid {} handle: {:?}", K::NAME, handle)
}

static_assertions::assert_impl_all!(ResourceContainer<Vec<u8>, crate::handle::kind::Buffer>: Send, Sync);
