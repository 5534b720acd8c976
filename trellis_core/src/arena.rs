// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation-counted slot arena with a FIFO free list.
//!
//! A [`SlotArena`] hands out [`SlotHandle`]s for records attached to nodes.
//! Slots live in struct-of-arrays storage: the attached node, the generation,
//! and the free-list link each get their own array, so [`nodes`] and
//! [`generations`] are plain slices that consumers can scan in bulk.
//!
//! # Recycling
//!
//! Removed slots are appended to the tail of the free list and new
//! allocations pop from its head. Reuse is therefore spread over all free
//! slots before any single slot comes back, which maximizes the number of
//! add/remove cycles before a generation counter runs out.
//!
//! Generations start at `1` and increment modulo `1 << GENERATION_BITS` on
//! every removal. When a counter wraps to `0` the slot is *disabled*: it
//! stays in storage and counts towards [`capacity`], but is never linked into
//! the free list again, so old handles can never alias a new record.
//!
//! The same recycling applies to node, layouter and layer ids, which have no
//! attached node.
//!
//! [`nodes`]: SlotArena::nodes
//! [`generations`]: SlotArena::generations
//! [`capacity`]: SlotArena::capacity

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, violation};
use crate::handle::{NodeHandle, SlotHandle};

/// Sentinel index for "no free slot".
const NO_FREE: u32 = u32::MAX;

/// Next generation after `generation`, wrapping to `0` past the handle's
/// generation range.
fn next_generation<H: SlotHandle>(generation: u16) -> u16 {
    let mask = (1_u32 << H::GENERATION_BITS) - 1;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "masked to at most 16 bits"
    )]
    let next = ((u32::from(generation) + 1) & mask) as u16;
    next
}

/// Generation-checked id allocator with a FIFO free list.
///
/// This is the recycling core of [`SlotArena`], also used on its own for
/// node, layouter and layer ids. Freed ids are appended to the tail of the
/// free list and allocations pop from its head. An id whose generation wraps
/// to `0` is retired instead of being linked again.
#[derive(Debug)]
pub(crate) struct SlotAllocator<H> {
    generations: Vec<u16>,
    used: Vec<bool>,
    // Only meaningful for slots on the free list.
    next: Vec<u32>,
    first_free: u32,
    last_free: u32,
    used_count: usize,
    _handle: PhantomData<H>,
}

impl<H: SlotHandle> SlotAllocator<H> {
    pub(crate) fn new() -> Self {
        const {
            assert!(
                H::GENERATION_BITS <= 16,
                "generations are stored in 16 bits"
            );
        }
        Self {
            generations: Vec::new(),
            used: Vec::new(),
            next: Vec::new(),
            first_free: NO_FREE,
            last_free: NO_FREE,
            used_count: 0,
            _handle: PhantomData,
        }
    }

    /// Hands out the oldest free id, or a fresh one with generation `1`.
    pub(crate) fn allocate(&mut self) -> Result<H, Error> {
        let idx = if self.first_free != NO_FREE {
            let idx = self.first_free;
            if self.first_free == self.last_free {
                self.first_free = NO_FREE;
                self.last_free = NO_FREE;
            } else {
                self.first_free = self.next[idx as usize];
            }
            self.next[idx as usize] = NO_FREE;
            idx
        } else {
            let len = self.generations.len();
            if len >= H::capacity_limit() {
                return Err(violation(Error::capacity_exceeded::<H>()));
            }
            self.generations.push(1);
            self.used.push(false);
            self.next.push(NO_FREE);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "len is below the id capacity limit"
            )]
            let idx = len as u32;
            idx
        };

        self.used[idx as usize] = true;
        self.used_count += 1;
        Ok(H::from_parts(idx, self.generations[idx as usize]))
    }

    /// Frees a live handle. Returns `false` if it wasn't valid.
    pub(crate) fn release(&mut self, handle: H) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        self.release_at(handle.id());
        true
    }

    /// Frees a live slot. The caller has validated `idx`.
    fn release_at(&mut self, idx: u32) {
        let i = idx as usize;
        let generation = next_generation::<H>(self.generations[i]);
        self.generations[i] = generation;
        self.used[i] = false;
        self.used_count -= 1;

        // A wrapped generation retires the slot for good.
        if generation == 0 {
            return;
        }

        self.next[i] = NO_FREE;
        if self.last_free == NO_FREE {
            self.first_free = idx;
        } else {
            self.next[self.last_free as usize] = idx;
        }
        self.last_free = idx;
    }

    /// Whether `handle` names a live slot. Null handles, generation `0`,
    /// out-of-range ids and stale generations are all invalid.
    pub(crate) fn is_valid(&self, handle: H) -> bool {
        let i = handle.id() as usize;
        handle.generation() != 0
            && i < self.generations.len()
            && self.used[i]
            && self.generations[i] == handle.generation()
    }

    /// Whether slot `idx` currently holds a live handle.
    pub(crate) fn is_used(&self, idx: u32) -> bool {
        self.used.get(idx as usize).copied().unwrap_or(false)
    }

    /// Handle of the live slot at `idx`.
    pub(crate) fn handle_at(&self, idx: u32) -> Option<H> {
        self.is_used(idx)
            .then(|| H::from_parts(idx, self.generations[idx as usize]))
    }

    pub(crate) fn len(&self) -> usize {
        self.generations.len()
    }

    pub(crate) fn used_count(&self) -> usize {
        self.used_count
    }

    pub(crate) fn generations(&self) -> &[u16] {
        &self.generations
    }

    /// Free slot ids from head to tail.
    #[cfg(test)]
    fn free_list(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut idx = self.first_free;
        while idx != NO_FREE {
            out.push(idx);
            idx = self.next[idx as usize];
        }
        out
    }
}

/// Generation-checked storage of node attachments.
pub struct SlotArena<H: SlotHandle> {
    slots: SlotAllocator<H>,
    // Null exactly for free and disabled slots.
    nodes: Vec<NodeHandle>,
}

impl<H: SlotHandle> fmt::Debug for SlotArena<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("capacity", &self.capacity())
            .field("used", &self.used_count())
            .field("first_free", &self.slots.first_free)
            .field("last_free", &self.slots.last_free)
            .finish_non_exhaustive()
    }
}

impl<H: SlotHandle> Default for SlotArena<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SlotHandle> SlotArena<H> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotAllocator::new(),
            nodes: Vec::new(),
        }
    }

    /// Attaches a new slot to `node` and returns its handle.
    ///
    /// Reuses the oldest free slot if there is one, keeping its already
    /// incremented generation. Otherwise appends a slot with generation `1`.
    ///
    /// # Errors
    ///
    /// [`Error::NullNode`] if `node` is null, [`Error::CapacityExceeded`] if
    /// every addressable slot is taken.
    pub fn add(&mut self, node: NodeHandle) -> Result<H, Error> {
        if node.is_null() {
            return Err(violation(Error::NullNode));
        }

        let handle = self.slots.allocate()?;
        let idx = handle.id() as usize;
        if idx == self.nodes.len() {
            self.nodes.push(node);
        } else {
            self.nodes[idx] = node;
        }
        Ok(handle)
    }

    /// Detaches the slot named by `handle` and returns the node it was
    /// attached to.
    ///
    /// Returns `None` without touching anything if the handle is invalid.
    /// Owners map that to the error of their own handle kind.
    pub fn remove(&mut self, handle: H) -> Option<NodeHandle> {
        if !self.is_handle_valid(handle) {
            return None;
        }
        Some(self.remove_at(handle.id()))
    }

    /// Whether `handle` names a live slot in this arena.
    ///
    /// The null handle, out-of-range ids, generation `0` and generations
    /// that don't match the slot's current one are all invalid.
    #[must_use]
    pub fn is_handle_valid(&self, handle: H) -> bool {
        self.slots.is_valid(handle)
    }

    /// Returns the node a valid slot is attached to.
    #[must_use]
    pub fn node(&self, handle: H) -> Option<NodeHandle> {
        self.is_handle_valid(handle)
            .then(|| self.nodes[handle.id() as usize])
    }

    /// Total number of slots ever allocated, including free and disabled
    /// ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live slots.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.slots.used_count()
    }

    /// Attached node for every slot, [`NodeHandle::NULL`] for free and
    /// disabled ones.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    /// Current generation for every slot. Disabled slots read `0`.
    #[inline]
    #[must_use]
    pub fn generations(&self) -> &[u16] {
        self.slots.generations()
    }

    /// Iterates over live slots as `(handle, node)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (H, NodeHandle)> + '_ {
        self.nodes
            .iter()
            .zip(self.slots.generations())
            .enumerate()
            .filter(|(_, (node, _))| !node.is_null())
            .map(|(idx, (&node, &generation))| {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "ids are below the id capacity limit"
                )]
                let idx = idx as u32;
                (H::from_parts(idx, generation), node)
            })
    }

    /// Removes every live slot whose node generation no longer matches
    /// `node_handle_generations`.
    ///
    /// A node id outside of `node_handle_generations` counts as removed.
    /// Returns a mask with `capacity()` entries, `true` for every slot that
    /// was removed by this call.
    pub fn clean_nodes(&mut self, node_handle_generations: &[u16]) -> Vec<bool> {
        let mut removed = vec![false; self.nodes.len()];
        for idx in 0..self.nodes.len() {
            let node = self.nodes[idx];
            if node.is_null() {
                continue;
            }
            let current = node_handle_generations.get(node.id() as usize).copied();
            if current != Some(node.generation()) {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "ids are below the id capacity limit"
                )]
                let slot = idx as u32;
                self.remove_at(slot);
                removed[idx] = true;
            }
        }
        removed
    }

    /// Frees a live slot. The caller has validated `idx`.
    fn remove_at(&mut self, idx: u32) -> NodeHandle {
        self.slots.release_at(idx);
        core::mem::replace(&mut self.nodes[idx as usize], NodeHandle::NULL)
    }

    #[cfg(test)]
    fn free_list(&self) -> Vec<u32> {
        self.slots.free_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{LayerHandle, LayouterDataHandle};

    type Arena = SlotArena<LayouterDataHandle>;

    fn node(id: u32) -> NodeHandle {
        NodeHandle::new(id, 1)
    }

    fn disabled_count(arena: &Arena) -> usize {
        arena.generations().iter().filter(|&&g| g == 0).count()
    }

    #[test]
    fn add_and_remove_round_trip() {
        let mut arena = Arena::new();
        let h = arena.add(node(5)).unwrap();
        assert!(arena.is_handle_valid(h));
        assert_eq!(arena.node(h), Some(node(5)));

        assert_eq!(arena.remove(h), Some(node(5)));
        assert!(!arena.is_handle_valid(h));
        assert_eq!(arena.node(h), None);
        assert_eq!(arena.remove(h), None);
    }

    #[test]
    fn first_allocation_has_generation_one() {
        let mut arena = Arena::new();
        let h = arena.add(node(0)).unwrap();
        assert_eq!(h.id(), 0);
        assert_eq!(h.generation(), 1);
    }

    #[test]
    fn recycling_is_fifo() {
        let mut arena = Arena::new();
        let h0 = arena.add(node(10)).unwrap();
        let h1 = arena.add(node(11)).unwrap();
        let h2 = arena.add(node(12)).unwrap();
        let h3 = arena.add(node(13)).unwrap();
        for (i, h) in [h0, h1, h2, h3].into_iter().enumerate() {
            assert_eq!(h.id() as usize, i);
            assert_eq!(h.generation(), 1);
        }

        arena.remove(h3).unwrap();
        arena.remove(h0).unwrap();
        arena.remove(h2).unwrap();
        assert_eq!(arena.free_list(), [3, 0, 2]);
        assert_eq!(arena.used_count(), 1);

        let e = arena.add(node(14)).unwrap();
        let f = arena.add(node(15)).unwrap();
        let g = arena.add(node(16)).unwrap();
        assert_eq!((e.id(), e.generation()), (3, 2));
        assert_eq!((f.id(), f.generation()), (0, 2));
        assert_eq!((g.id(), g.generation()), (2, 2));

        assert_eq!(arena.capacity(), 4);
        assert_eq!(arena.used_count(), 4);
        assert!(arena.free_list().is_empty());
        assert!(arena.is_handle_valid(h1));
        assert!(!arena.is_handle_valid(h0));
    }

    #[test]
    fn generation_increments_once_per_cycle() {
        let mut arena = Arena::new();
        let mut h = arena.add(node(1)).unwrap();
        for expected in 2..100 {
            arena.remove(h).unwrap();
            h = arena.add(node(1)).unwrap();
            assert_eq!(h.id(), 0);
            assert_eq!(h.generation(), expected);
        }
    }

    #[test]
    fn exhausted_generation_disables_slot() {
        let mut arena = Arena::new();
        let mut h = arena.add(node(1)).unwrap();
        let cycles = (1 << LayouterDataHandle::GENERATION_BITS) - 1;
        for _ in 0..cycles - 1 {
            arena.remove(h).unwrap();
            h = arena.add(node(1)).unwrap();
            assert_eq!(h.id(), 0);
        }
        assert_eq!(h.generation(), 4095);

        // The last cycle retires slot 0 and has to allocate a new one.
        arena.remove(h).unwrap();
        let fresh = arena.add(node(1)).unwrap();
        assert_eq!(fresh.id(), 1);
        assert_eq!(fresh.generation(), 1);

        assert_eq!(arena.generations()[0], 0);
        assert!(arena.nodes()[0].is_null());
        assert!(!arena.is_handle_valid(LayouterDataHandle::new(0, 0)));
        assert!(!arena.is_handle_valid(h));
        assert_eq!(arena.capacity(), 2);
        assert_eq!(arena.used_count(), 1);
        assert_eq!(disabled_count(&arena), 1);

        // Further cycles never touch the disabled slot again.
        arena.remove(fresh).unwrap();
        let again = arena.add(node(2)).unwrap();
        assert_eq!(again.id(), 1);
        assert_eq!(arena.capacity(), 2);
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn null_node_is_rejected() {
        let mut arena = Arena::new();
        assert_eq!(arena.add(NodeHandle::NULL), Err(Error::NullNode));
        assert_eq!(arena.capacity(), 0);
        assert_eq!(arena.used_count(), 0);
    }

    #[test]
    fn null_and_out_of_range_handles_are_invalid() {
        let mut arena = Arena::new();
        assert!(!arena.is_handle_valid(LayouterDataHandle::NULL));
        let h = arena.add(node(0)).unwrap();
        assert!(!arena.is_handle_valid(LayouterDataHandle::NULL));
        assert!(!arena.is_handle_valid(LayouterDataHandle::new(1, 1)));
        assert!(!arena.is_handle_valid(LayouterDataHandle::new(h.id(), 2)));
    }

    #[test]
    fn free_slot_with_current_generation_is_invalid() {
        let mut arena = Arena::new();
        let h = arena.add(node(0)).unwrap();
        arena.remove(h).unwrap();
        // Never handed out, but matches the stored generation.
        assert!(!arena.is_handle_valid(LayouterDataHandle::new(0, 2)));
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn capacity_is_capped() {
        let mut arena = Arena::new();
        let limit = LayouterDataHandle::capacity_limit();
        for _ in 0..limit {
            arena.add(node(1)).unwrap();
        }
        assert_eq!(arena.capacity(), limit);
        assert_eq!(
            arena.add(node(1)),
            Err(Error::CapacityExceeded { limit: 1 << 20 })
        );
        assert_eq!(arena.capacity(), limit);
        assert_eq!(arena.used_count(), limit);
    }

    #[test]
    fn used_plus_free_plus_disabled_is_capacity() {
        let mut arena = Arena::new();
        let mut handles: Vec<_> = (0..16).map(|i| arena.add(node(i)).unwrap()).collect();
        for h in handles.drain(..).step_by(3) {
            arena.remove(h).unwrap();
        }
        let extra = arena.add(node(100)).unwrap();
        arena.remove(extra).unwrap();

        let free = arena.free_list().len();
        assert_eq!(
            arena.used_count(),
            arena.capacity() - free - disabled_count(&arena)
        );
        assert_eq!(arena.iter().count(), arena.used_count());
    }

    #[test]
    fn clean_nodes_removes_stale_attachments() {
        let mut arena = Arena::new();
        let a = arena.add(NodeHandle::new(0, 1)).unwrap();
        let b = arena.add(NodeHandle::new(1, 1)).unwrap();
        let c = arena.add(NodeHandle::new(2, 3)).unwrap();
        let d = arena.add(NodeHandle::new(9, 1)).unwrap();

        // Node 1 was recycled, node 9 is beyond the generation view.
        let removed = arena.clean_nodes(&[1, 2, 3]);
        assert_eq!(removed, [false, true, false, true]);
        assert!(arena.is_handle_valid(a));
        assert!(!arena.is_handle_valid(b));
        assert!(arena.is_handle_valid(c));
        assert!(!arena.is_handle_valid(d));
        assert_eq!(arena.used_count(), 2);
        assert_eq!(arena.free_list(), [1, 3]);
    }

    #[test]
    fn iter_yields_live_slots() {
        let mut arena = Arena::new();
        let a = arena.add(node(7)).unwrap();
        let b = arena.add(node(8)).unwrap();
        arena.remove(a).unwrap();
        let live: Vec<_> = arena.iter().collect();
        assert_eq!(live, [(b, node(8))]);
    }

    #[cfg(feature = "strict")]
    #[test]
    #[should_panic(expected = "node handle is null")]
    fn strict_null_node_panics() {
        let _ = Arena::new().add(NodeHandle::NULL);
    }

    #[cfg(feature = "strict")]
    #[test]
    #[should_panic(expected = "can only have at most 256 slots")]
    fn strict_capacity_panics() {
        let mut slots = SlotAllocator::<LayerHandle>::new();
        for _ in 0..=256 {
            let _ = slots.allocate();
        }
    }

    #[test]
    fn allocator_recycles_oldest_first() {
        let mut slots = SlotAllocator::<NodeHandle>::new();
        let a = slots.allocate().unwrap();
        let b = slots.allocate().unwrap();
        let c = slots.allocate().unwrap();
        assert!(slots.release(c));
        assert!(slots.release(a));
        assert!(!slots.release(a));
        assert_eq!(slots.free_list(), [2, 0]);

        assert_eq!(slots.allocate().unwrap(), NodeHandle::new(2, 2));
        assert_eq!(slots.allocate().unwrap(), NodeHandle::new(0, 2));
        assert!(slots.is_valid(b));
        assert!(!slots.is_valid(NodeHandle::NULL));
        assert_eq!(slots.used_count(), 3);
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn allocator_retires_wrapped_slot() {
        let mut slots = SlotAllocator::<LayerHandle>::new();
        // 8 generation bits: generations 1..=255 are usable.
        for _ in 0..255 {
            let handle = slots.allocate().unwrap();
            assert_eq!(handle.id(), 0);
            assert!(slots.release(handle));
        }
        assert_eq!(slots.generations()[0], 0);
        assert!(slots.free_list().is_empty());
        assert_eq!(slots.allocate().unwrap(), LayerHandle::new(1, 1));
        assert!(!slots.is_valid(LayerHandle::new(0, 0)));
        assert_eq!(slots.handle_at(0), None);
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn allocator_capacity_limit() {
        let mut slots = SlotAllocator::<LayerHandle>::new();
        for _ in 0..256 {
            slots.allocate().unwrap();
        }
        assert_eq!(
            slots.allocate(),
            Err(Error::CapacityExceeded { limit: 256 })
        );
        assert_eq!(slots.len(), 256);
    }

    /// A handle using the full 16 bits for its generation.
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct WideHandle(u32);

    impl fmt::Debug for WideHandle {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "WideHandle({}@gen{})", self.id(), self.generation())
        }
    }

    impl SlotHandle for WideHandle {
        const ID_BITS: u32 = 16;
        const GENERATION_BITS: u32 = 16;
        const NULL: Self = Self(0);

        fn from_parts(id: u32, generation: u16) -> Self {
            Self((id << 16) | u32::from(generation))
        }

        fn id(self) -> u32 {
            self.0 >> 16
        }

        fn generation(self) -> u16 {
            #[expect(clippy::cast_possible_truncation, reason = "low 16 bits")]
            let generation = self.0 as u16;
            generation
        }
    }

    #[test]
    fn sixteen_generation_bits_wrap_without_overflow() {
        let mut arena = SlotArena::<WideHandle>::new();
        let mut h = arena.add(node(1)).unwrap();
        for _ in 0..u16::MAX - 1 {
            arena.remove(h).unwrap();
            h = arena.add(node(1)).unwrap();
            assert_eq!(h.id(), 0);
        }
        assert_eq!(h.generation(), u16::MAX);

        arena.remove(h).unwrap();
        assert_eq!(arena.generations()[0], 0);
        let fresh = arena.add(node(1)).unwrap();
        assert_eq!(fresh, WideHandle::from_parts(1, 1));
        assert!(!arena.is_handle_valid(h));
    }
}
