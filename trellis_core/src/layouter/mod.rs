// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layouters: layout records attached to nodes, and the per-frame lifecycle
//! that recomputes node offsets and sizes from them.
//!
//! A layouter is split in two halves:
//!
//! - [`LayouterBase`] owns all persistent state: the layouter's own
//!   [`LayouterHandle`], a [`SlotArena`] of layouts, the dirty
//!   [`LayouterStates`] and the last UI size. Layout algorithms call
//!   [`add`](LayouterBase::add) and [`remove`](LayouterBase::remove) on it to
//!   build their public APIs.
//! - The [`Layouter`] trait is the algorithm. Implementors provide
//!   [`do_update`](Layouter::do_update) and optionally the
//!   [`do_set_size`](Layouter::do_set_size) and
//!   [`do_clean`](Layouter::do_clean) hooks; the provided
//!   [`set_size`](Layouter::set_size), [`clean_nodes`](Layouter::clean_nodes)
//!   and [`update`](Layouter::update) validate their inputs, keep the state
//!   flags in order and then dispatch to the hooks.
//!
//! # Frame pipeline
//!
//! ```text
//!   set_size(size)              at least once, and whenever the UI resizes
//!        │
//!        ▼
//!   clean_nodes(generations)    drops layouts of removed nodes ──► do_clean
//!        │
//!        ▼
//!   update(ids, top_level, parents, offsets, sizes) ──► do_update
//! ```
//!
//! The state flags are advisory. They tell the host whether calling
//! [`update`](Layouter::update) this frame is worthwhile, but `update` itself
//! always runs the algorithm and always clears them.

mod snap;

use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use bitflags::bitflags;
use hashbrown::HashMap;
use kurbo::{Size, Vec2};

use crate::arena::SlotArena;
use crate::error::{Error, violation};
use crate::handle::{LayoutHandle, LayouterDataHandle, LayouterHandle, NodeHandle};

pub use snap::{SnapLayouter, Snaps};

bitflags! {
    /// Pending work of a layouter.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayouterStates: u8 {
        /// [`Layouter::update`] needs to be called to refresh the layouts.
        const NEEDS_UPDATE = 1 << 0;
        /// Layouts were added or removed. Implies [`Self::NEEDS_UPDATE`].
        const NEEDS_ASSIGNMENT_UPDATE = Self::NEEDS_UPDATE.bits() | 1 << 1;
    }
}

bitflags! {
    /// Static capabilities of a layouter.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayouterFeatures: u8 {
        /// At most one layout per node. [`LayouterBase::add`] rejects a
        /// second layout for the same node.
        const UNIQUE_LAYOUTS = 1 << 0;
    }
}

/// Persistent state shared by every layouter implementation.
pub struct LayouterBase {
    handle: LayouterHandle,
    features: LayouterFeatures,
    layouts: SlotArena<LayouterDataHandle>,
    state: LayouterStates,
    size: Option<Size>,
    // Node id -> layout id, maintained only with `UNIQUE_LAYOUTS`.
    unique: Option<HashMap<u32, u32>>,
}

impl fmt::Debug for LayouterBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayouterBase")
            .field("handle", &self.handle)
            .field("features", &self.features)
            .field("state", &self.state)
            .field("size", &self.size)
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}

impl LayouterBase {
    /// Creates an empty base for the layouter identified by `handle`.
    ///
    /// `features` must match what the owning [`Layouter::features`] reports;
    /// [`UserInterface::set_layouter_instance`] rejects a layouter where they
    /// differ.
    ///
    /// [`UserInterface::set_layouter_instance`]: crate::UserInterface::set_layouter_instance
    #[must_use]
    pub fn new(handle: LayouterHandle, features: LayouterFeatures) -> Self {
        Self {
            handle,
            features,
            layouts: SlotArena::new(),
            state: LayouterStates::empty(),
            size: None,
            unique: features
                .contains(LayouterFeatures::UNIQUE_LAYOUTS)
                .then(HashMap::new),
        }
    }

    /// The layouter's own identity.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> LayouterHandle {
        self.handle
    }

    /// Features this base was created with.
    #[inline]
    #[must_use]
    pub fn features(&self) -> LayouterFeatures {
        self.features
    }

    /// Pending work.
    #[inline]
    #[must_use]
    pub fn state(&self) -> LayouterStates {
        self.state
    }

    /// The last size passed to [`Layouter::set_size`], if any.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Flags the layouter as needing an update, for example after a layout
    /// property changed.
    pub fn set_needs_update(&mut self) {
        self.state |= LayouterStates::NEEDS_UPDATE;
    }

    /// Attaches a new layout to `node`.
    ///
    /// Sets [`LayouterStates::NEEDS_ASSIGNMENT_UPDATE`].
    ///
    /// # Errors
    ///
    /// [`Error::NullNode`], [`Error::CapacityExceeded`], or with
    /// [`LayouterFeatures::UNIQUE_LAYOUTS`] [`Error::DuplicateLayout`] if the
    /// node already has a layout here.
    pub fn add(&mut self, node: NodeHandle) -> Result<LayoutHandle, Error> {
        // A stale entry left by a removed node with the same id doesn't count.
        if self.unique.is_some() && !node.is_null() && self.layout_for_node(node).is_some() {
            return Err(violation(Error::DuplicateLayout { node }));
        }

        let data = self.layouts.add(node)?;
        if let Some(unique) = &mut self.unique {
            unique.insert(node.id(), data.id());
        }
        self.state |= LayouterStates::NEEDS_ASSIGNMENT_UPDATE;
        Ok(LayoutHandle::new(self.handle, data))
    }

    /// Removes a layout.
    ///
    /// Sets [`LayouterStates::NEEDS_ASSIGNMENT_UPDATE`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid in this layouter.
    pub fn remove(&mut self, layout: LayoutHandle) -> Result<(), Error> {
        if layout.layouter() != self.handle {
            return Err(violation(Error::invalid_layout(layout)));
        }
        self.remove_data(layout.data())
    }

    /// Removes a layout given just its data part.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `data` isn't valid in this layouter.
    pub fn remove_data(&mut self, data: LayouterDataHandle) -> Result<(), Error> {
        let Some(node) = self.layouts.remove(data) else {
            return Err(violation(Error::invalid_layout(LayoutHandle::new(
                self.handle,
                data,
            ))));
        };
        if let Some(unique) = &mut self.unique
            && unique.get(&node.id()) == Some(&data.id())
        {
            unique.remove(&node.id());
        }
        self.state |= LayouterStates::NEEDS_ASSIGNMENT_UPDATE;
        Ok(())
    }

    /// Whether `layout` is owned by this layouter and names a live slot.
    #[must_use]
    pub fn is_handle_valid(&self, layout: LayoutHandle) -> bool {
        !layout.is_null()
            && layout.layouter() == self.handle
            && self.layouts.is_handle_valid(layout.data())
    }

    /// Whether `data` names a live slot.
    #[must_use]
    pub fn is_data_handle_valid(&self, data: LayouterDataHandle) -> bool {
        self.layouts.is_handle_valid(data)
    }

    /// The node a layout is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid in this layouter.
    pub fn node(&self, layout: LayoutHandle) -> Result<NodeHandle, Error> {
        if layout.layouter() != self.handle {
            return Err(violation(Error::invalid_layout(layout)));
        }
        self.node_data(layout.data())
    }

    /// The node a layout is attached to, given just its data part.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `data` isn't valid in this layouter.
    pub fn node_data(&self, data: LayouterDataHandle) -> Result<NodeHandle, Error> {
        self.layouts.node(data).ok_or_else(|| {
            violation(Error::invalid_layout(LayoutHandle::new(self.handle, data)))
        })
    }

    /// The layout attached to `node`, for layouters with
    /// [`LayouterFeatures::UNIQUE_LAYOUTS`].
    #[must_use]
    pub fn layout_for_node(&self, node: NodeHandle) -> Option<LayoutHandle> {
        let id = *self.unique.as_ref()?.get(&node.id())?;
        let data = LayouterDataHandle::new(id, self.layouts.generations()[id as usize]);
        (self.layouts.node(data) == Some(node)).then(|| LayoutHandle::new(self.handle, data))
    }

    /// Total number of layout slots, including free and disabled ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layouts.capacity()
    }

    /// Number of live layouts.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.layouts.used_count()
    }

    /// Attached node per layout id, null for free and disabled slots.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeHandle] {
        self.layouts.nodes()
    }

    /// Generation per layout id.
    #[inline]
    #[must_use]
    pub fn generations(&self) -> &[u16] {
        self.layouts.generations()
    }

    /// Iterates over live layouts.
    pub fn layouts(&self) -> impl Iterator<Item = (LayoutHandle, NodeHandle)> + '_ {
        self.layouts
            .iter()
            .map(|(data, node)| (LayoutHandle::new(self.handle, data), node))
    }

    fn clean_nodes(&mut self, node_handle_generations: &[u16]) -> Vec<bool> {
        let removed = self.layouts.clean_nodes(node_handle_generations);
        if let Some(unique) = &mut self.unique {
            unique.retain(|_, id| !removed.get(*id as usize).copied().unwrap_or(false));
        }
        removed
    }
}

/// A layout algorithm.
///
/// Only [`base`](Self::base), [`base_mut`](Self::base_mut),
/// [`features`](Self::features) and [`do_update`](Self::do_update) are
/// required. The provided [`set_size`](Self::set_size),
/// [`clean_nodes`](Self::clean_nodes) and [`update`](Self::update) drive the
/// hooks and aren't meant to be overridden.
pub trait Layouter: Any {
    /// Shared layouter state.
    fn base(&self) -> &LayouterBase;

    /// Shared layouter state, mutably.
    fn base_mut(&mut self) -> &mut LayouterBase;

    /// Static capabilities. Must not change over the instance's lifetime,
    /// and must equal [`LayouterBase::features`], which is what
    /// [`LayouterBase::add`] enforces.
    fn features(&self) -> LayouterFeatures;

    /// Called from [`set_size`](Self::set_size) with a validated size.
    ///
    /// Layouters whose results depend on the UI size should call
    /// [`LayouterBase::set_needs_update`] from here.
    fn do_set_size(&mut self, size: Size) {
        _ = size;
    }

    /// Called from [`clean_nodes`](Self::clean_nodes) with a mask of the
    /// layout ids that were just removed. The mask may be all `false`.
    fn do_clean(&mut self, layout_ids_to_remove: &[bool]) {
        _ = layout_ids_to_remove;
    }

    /// Computes layouts.
    ///
    /// `layout_ids_to_update` has [`capacity`](LayouterBase::capacity)
    /// entries. Each top-level id roots a subtree that doesn't depend on
    /// any other top-level subtree, so they can be processed in any order.
    /// The node views are indexed by node id and shared with other
    /// layouters. Offsets are relative to the parent node.
    ///
    /// Every flagged layout's node must get its offset and size written (or
    /// deliberately kept), and entries of unrelated nodes must stay
    /// untouched.
    fn do_update(
        &mut self,
        layout_ids_to_update: &[bool],
        top_level_layout_ids: &[u32],
        node_parents: &[NodeHandle],
        node_offsets: &mut [Vec2],
        node_sizes: &mut [Size],
    );

    /// The layouter's own identity.
    fn handle(&self) -> LayouterHandle {
        self.base().handle()
    }

    /// Pending work.
    fn state(&self) -> LayouterStates {
        self.base().state()
    }

    /// Sets the UI size and forwards it to [`do_set_size`](Self::do_set_size).
    ///
    /// Doesn't change the state flags by itself.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSize`] if either dimension is zero.
    fn set_size(&mut self, size: Size) -> Result<(), Error> {
        if size.width == 0.0 || size.height == 0.0 {
            return Err(violation(Error::ZeroSize { size }));
        }
        self.base_mut().size = Some(size);
        self.do_set_size(size);
        Ok(())
    }

    /// Removes every layout attached to a node whose generation no longer
    /// matches `node_handle_generations`, then calls
    /// [`do_clean`](Self::do_clean).
    ///
    /// Unlike [`LayouterBase::remove`], this doesn't set
    /// [`LayouterStates::NEEDS_ASSIGNMENT_UPDATE`]; the host already knows
    /// nodes were removed. Returns the number of removed layouts.
    fn clean_nodes(&mut self, node_handle_generations: &[u16]) -> usize {
        let removed = self.base_mut().clean_nodes(node_handle_generations);
        self.do_clean(&removed);
        removed.iter().filter(|&&r| r).count()
    }

    /// Validates the inputs, clears the state flags and calls
    /// [`do_update`](Self::do_update), even if nothing is flagged.
    ///
    /// # Errors
    ///
    /// [`Error::SizeNotSet`] before the first [`set_size`](Self::set_size),
    /// [`Error::BitsetSizeMismatch`] if `layout_ids_to_update` doesn't have
    /// [`capacity`](LayouterBase::capacity) entries,
    /// [`Error::ViewSizeMismatch`] if the node views differ in length.
    fn update(
        &mut self,
        layout_ids_to_update: &[bool],
        top_level_layout_ids: &[u32],
        node_parents: &[NodeHandle],
        node_offsets: &mut [Vec2],
        node_sizes: &mut [Size],
    ) -> Result<(), Error> {
        let base = self.base();
        if base.size.is_none() {
            return Err(violation(Error::SizeNotSet));
        }
        if layout_ids_to_update.len() != base.capacity() {
            return Err(violation(Error::BitsetSizeMismatch {
                expected: base.capacity(),
                actual: layout_ids_to_update.len(),
            }));
        }
        if node_offsets.len() != node_parents.len() || node_sizes.len() != node_parents.len() {
            return Err(violation(Error::ViewSizeMismatch {
                parents: node_parents.len(),
                offsets: node_offsets.len(),
                sizes: node_sizes.len(),
            }));
        }

        self.base_mut().state = LayouterStates::empty();
        self.do_update(
            layout_ids_to_update,
            top_level_layout_ids,
            node_parents,
            node_offsets,
            node_sizes,
        );
        Ok(())
    }
}
