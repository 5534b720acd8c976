// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registries of boxed layouter and layer instances.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::arena::SlotAllocator;
use crate::error::Error;
use crate::handle::SlotHandle;

/// Handles paired with optional boxed instances.
///
/// A handle is created first and the instance set later, so an instance can
/// be constructed knowing its own handle.
pub(crate) struct Registry<H, T: ?Sized> {
    slots: SlotAllocator<H>,
    instances: Vec<Option<Box<T>>>,
}

impl<H: SlotHandle, T: ?Sized> Registry<H, T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotAllocator::new(),
            instances: Vec::new(),
        }
    }

    pub(crate) fn create(&mut self) -> Result<H, Error> {
        let handle = self.slots.allocate()?;
        let i = handle.id() as usize;
        if i == self.instances.len() {
            self.instances.push(None);
        } else {
            self.instances[i] = None;
        }
        Ok(handle)
    }

    /// Stores the instance of a valid handle.
    pub(crate) fn set(&mut self, handle: H, instance: Box<T>) {
        debug_assert!(self.slots.is_valid(handle), "stale handle {handle:?}");
        self.instances[handle.id() as usize] = Some(instance);
    }

    /// Frees a handle and drops its instance. Returns `false` if the handle
    /// wasn't valid.
    pub(crate) fn remove(&mut self, handle: H) -> bool {
        if !self.slots.release(handle) {
            return false;
        }
        self.instances[handle.id() as usize] = None;
        true
    }

    pub(crate) fn is_valid(&self, handle: H) -> bool {
        self.slots.is_valid(handle)
    }

    pub(crate) fn get(&self, handle: H) -> Option<&T> {
        if !self.slots.is_valid(handle) {
            return None;
        }
        self.instances[handle.id() as usize].as_deref()
    }

    pub(crate) fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if !self.slots.is_valid(handle) {
            return None;
        }
        self.instances[handle.id() as usize].as_deref_mut()
    }

    /// Instance at slot `idx`, if the slot is live and has one.
    pub(crate) fn get_at_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.instances.get_mut(idx)?.as_deref_mut()
    }

    /// Live instances in handle order.
    pub(crate) fn instances(&self) -> impl Iterator<Item = &T> + '_ {
        self.instances.iter().filter_map(|i| i.as_deref())
    }

    pub(crate) fn len(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn used_count(&self) -> usize {
        self.slots.used_count()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use super::*;
    use crate::handle::LayerHandle;

    #[test]
    fn registry_instances_follow_handles() {
        let mut registry = Registry::<LayerHandle, u32>::new();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_eq!(registry.get(a), None);

        registry.set(a, Box::new(10));
        registry.set(b, Box::new(20));
        *registry.get_mut(b).unwrap() += 1;
        assert_eq!(registry.instances().copied().collect::<Vec<_>>(), [10, 21]);

        assert!(registry.remove(a));
        assert_eq!(registry.get(a), None);
        assert_eq!(registry.used_count(), 1);

        // The recycled slot starts without an instance.
        let c = registry.create().unwrap();
        assert_eq!(c, LayerHandle::new(0, 2));
        assert_eq!(registry.get(c), None);
        assert_eq!(registry.get_at_mut(1).copied(), Some(21));
    }
}
