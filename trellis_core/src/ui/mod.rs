// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host side: a node tree plus registries of layouters and layers, and
//! the frame pipeline that drives them.
//!
//! Nodes live in struct-of-arrays storage addressed by [`NodeHandle`]s.
//! Freed node ids are recycled oldest-first, and their generation is bumped
//! so layouts and data still attached to the old node can be found and
//! dropped by [`UserInterface::clean`].
//!
//! Layouters and layers are registered in two steps. A handle is created
//! first, then an instance constructed with that handle is set:
//!
//! ```
//! use kurbo::{Insets, Size, Vec2};
//! use trellis_core::layouter::{SnapLayouter, Snaps};
//! use trellis_core::ui::{NodeFlags, UserInterface};
//! use trellis_core::NodeHandle;
//!
//! let mut ui = UserInterface::new(Size::new(200.0, 100.0)).unwrap();
//! let handle = ui.create_layouter().unwrap();
//! ui.set_layouter_instance(SnapLayouter::new(handle)).unwrap();
//!
//! let node = ui
//!     .create_node(NodeHandle::NULL, Vec2::ZERO, Size::ZERO, NodeFlags::empty())
//!     .unwrap();
//! ui.layouter_mut::<SnapLayouter>(handle)
//!     .unwrap()
//!     .add(node, Snaps::FILL, Insets::uniform(10.0))
//!     .unwrap();
//!
//! ui.update().unwrap();
//! assert_eq!(ui.node_size(node), Ok(Size::new(180.0, 80.0)));
//! assert_eq!(ui.node_absolute_offset(node), Ok(Vec2::new(10.0, 10.0)));
//! ```

mod slots;
mod traverse;
mod update;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use bitflags::bitflags;
use kurbo::{Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::arena::SlotAllocator;
use crate::dirty;
use crate::error::{Error, violation};
use crate::handle::{DataHandle, LayerHandle, LayoutHandle, LayouterHandle, NodeHandle};
use crate::layer::{Layer, LayerStates};
use crate::layouter::{Layouter, LayouterStates};

use slots::Registry;

pub use traverse::Children;

/// Sentinel for an absent sibling or child link.
const INVALID: u32 = u32::MAX;

bitflags! {
    /// Per-node flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node and its whole subtree are hidden. Hidden nodes are
        /// neither laid out nor passed to layers.
        const HIDDEN = 1 << 0;
    }
}

bitflags! {
    /// Pending work of a [`UserInterface`].
    ///
    /// Each state includes the ones it implies, so testing with
    /// [`contains`](Self::contains) answers "does this work need doing".
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UserInterfaceStates: u8 {
        /// Layer data need refreshing.
        const NEEDS_DATA_UPDATE = 1 << 0;
        /// Layer data were attached or removed.
        const NEEDS_DATA_ATTACHMENT_UPDATE = Self::NEEDS_DATA_UPDATE.bits() | 1 << 1;
        /// Layouters need to run.
        const NEEDS_LAYOUT_UPDATE = Self::NEEDS_DATA_UPDATE.bits() | 1 << 2;
        /// Layouts were added or removed.
        const NEEDS_LAYOUT_ASSIGNMENT_UPDATE = Self::NEEDS_LAYOUT_UPDATE.bits() | 1 << 3;
        /// Nodes were added, or their flags changed.
        const NEEDS_NODE_UPDATE = Self::NEEDS_LAYOUT_ASSIGNMENT_UPDATE.bits()
            | Self::NEEDS_DATA_ATTACHMENT_UPDATE.bits()
            | 1 << 4;
        /// Nodes were removed and attached layouts and data need cleaning.
        const NEEDS_NODE_CLEAN = Self::NEEDS_NODE_UPDATE.bits() | 1 << 5;
    }
}

/// A tree of nodes with layouters and layers attached.
pub struct UserInterface {
    size: Size,
    state: UserInterfaceStates,
    frame_index: u64,

    // -- Allocation --
    nodes: SlotAllocator<NodeHandle>,

    // -- Topology --
    node_parent: Vec<NodeHandle>,
    first_child: Vec<u32>,
    next_sibling: Vec<u32>,
    prev_sibling: Vec<u32>,

    // -- Local properties (set by callers and layouters) --
    node_offset: Vec<Vec2>,
    node_size: Vec<Size>,
    node_flags: Vec<NodeFlags>,

    // -- Computed properties (written by update) --
    absolute_offset: Vec<Vec2>,
    effective_hidden: Vec<bool>,

    // -- Dirty tracking --
    dirty: DirtyTracker<u32>,

    // -- Attachments --
    layouters: Registry<LayouterHandle, dyn Layouter>,
    layers: Registry<LayerHandle, dyn Layer>,
}

impl fmt::Debug for UserInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInterface")
            .field("size", &self.size)
            .field("state", &self.state)
            .field("frame_index", &self.frame_index)
            .field("nodes", &self.nodes.used_count())
            .field("layouters", &self.layouters.used_count())
            .field("layers", &self.layers.used_count())
            .finish_non_exhaustive()
    }
}

impl UserInterface {
    /// Creates an empty UI of the given size.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSize`] if either dimension is zero.
    pub fn new(size: Size) -> Result<Self, Error> {
        check_size(size)?;
        Ok(Self {
            size,
            state: UserInterfaceStates::empty(),
            frame_index: 0,
            nodes: SlotAllocator::new(),
            node_parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            node_offset: Vec::new(),
            node_size: Vec::new(),
            node_flags: Vec::new(),
            absolute_offset: Vec::new(),
            effective_hidden: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            layouters: Registry::new(),
            layers: Registry::new(),
        })
    }

    // -- Size --

    /// Current UI size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resizes the UI and forwards the size to every layouter.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroSize`] if either dimension is zero.
    pub fn set_size(&mut self, size: Size) -> Result<(), Error> {
        check_size(size)?;
        self.size = size;
        for i in 0..self.layouters.len() {
            if let Some(layouter) = self.layouters.get_at_mut(i) {
                layouter.set_size(size)?;
            }
        }
        self.state |= UserInterfaceStates::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Pending work, including what layouters and layers report.
    #[must_use]
    pub fn state(&self) -> UserInterfaceStates {
        let mut state = self.state;
        for layouter in self.layouters.instances() {
            let s = layouter.state();
            if s.contains(LayouterStates::NEEDS_ASSIGNMENT_UPDATE) {
                state |= UserInterfaceStates::NEEDS_LAYOUT_ASSIGNMENT_UPDATE;
            } else if s.contains(LayouterStates::NEEDS_UPDATE) {
                state |= UserInterfaceStates::NEEDS_LAYOUT_UPDATE;
            }
        }
        for layer in self.layers.instances() {
            let s = layer.state();
            if s.contains(LayerStates::NEEDS_ATTACHMENT_UPDATE) {
                state |= UserInterfaceStates::NEEDS_DATA_ATTACHMENT_UPDATE;
            } else if s.contains(LayerStates::NEEDS_DATA_UPDATE) {
                state |= UserInterfaceStates::NEEDS_DATA_UPDATE;
            }
        }
        state
    }

    /// Number of completed updates.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    // -- Nodes --

    /// Creates a node, as a root if `parent` is null or as the last child of
    /// `parent` otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `parent` is neither null nor valid,
    /// [`Error::CapacityExceeded`] if every node id is taken.
    pub fn create_node(
        &mut self,
        parent: NodeHandle,
        offset: Vec2,
        size: Size,
        flags: NodeFlags,
    ) -> Result<NodeHandle, Error> {
        if !parent.is_null() && !self.is_node_valid(parent) {
            return Err(violation(Error::invalid_node(parent)));
        }

        let handle = self.nodes.allocate()?;
        let idx = handle.id();
        let i = idx as usize;
        if i == self.node_parent.len() {
            self.node_parent.push(parent);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.node_offset.push(offset);
            self.node_size.push(size);
            self.node_flags.push(flags);
            self.absolute_offset.push(Vec2::ZERO);
            self.effective_hidden.push(false);
        } else {
            // Reuse a freed slot.
            self.node_parent[i] = parent;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.node_offset[i] = offset;
            self.node_size[i] = size;
            self.node_flags[i] = flags;
            self.absolute_offset[i] = Vec2::ZERO;
            self.effective_hidden[i] = false;
        }

        if !parent.is_null() {
            let p = parent.id();
            self.link_last_child(p, idx);
            let _ = self.dirty.add_dependency(idx, p, dirty::PLACEMENT);
        }
        self.dirty.mark_with(idx, dirty::PLACEMENT, &EagerPolicy);
        self.state |= UserInterfaceStates::NEEDS_NODE_UPDATE;
        Ok(handle)
    }

    /// Removes a node together with all its descendants.
    ///
    /// Layouts and data attached to the removed nodes stay until the next
    /// [`clean`](Self::clean) or [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn remove_node(&mut self, node: NodeHandle) -> Result<(), Error> {
        self.check_node(node)?;

        if !self.node_parent[node.id() as usize].is_null() {
            self.unlink_from_parent(node.id());
        }

        let mut stack = Vec::from([node.id()]);
        while let Some(idx) = stack.pop() {
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }

            let i = idx as usize;
            self.dirty.remove_key(idx);
            self.node_parent[i] = NodeHandle::NULL;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            if let Some(handle) = self.nodes.handle_at(idx) {
                self.nodes.release(handle);
            }
        }

        self.state |= UserInterfaceStates::NEEDS_NODE_CLEAN;
        Ok(())
    }

    /// Whether `node` names a live node.
    #[must_use]
    pub fn is_node_valid(&self, node: NodeHandle) -> bool {
        !node.is_null() && self.nodes.is_valid(node)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_used_count(&self) -> usize {
        self.nodes.used_count()
    }

    /// Total number of node slots, including free and retired ones.
    #[must_use]
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Generation per node id. Layouters and layers compare against this to
    /// find layouts and data attached to removed nodes.
    #[must_use]
    pub fn node_handle_generations(&self) -> &[u16] {
        self.nodes.generations()
    }

    /// Parent per node id, null for roots and free slots.
    #[must_use]
    pub fn node_parents(&self) -> &[NodeHandle] {
        &self.node_parent
    }

    /// Offset relative to the parent per node id.
    #[must_use]
    pub fn node_offsets(&self) -> &[Vec2] {
        &self.node_offset
    }

    /// Size per node id.
    #[must_use]
    pub fn node_sizes(&self) -> &[Size] {
        &self.node_size
    }

    /// Absolute offset per node id, as of the last update.
    #[must_use]
    pub fn absolute_node_offsets(&self) -> &[Vec2] {
        &self.absolute_offset
    }

    /// Parent of a node, null for a root.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn node_parent(&self, node: NodeHandle) -> Result<NodeHandle, Error> {
        self.check_node(node)?;
        Ok(self.node_parent[node.id() as usize])
    }

    /// Direct children of a node, in creation order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn children(&self, node: NodeHandle) -> Result<Children<'_>, Error> {
        self.check_node(node)?;
        Ok(Children::new(self, self.first_child[node.id() as usize]))
    }

    /// Offset of a node relative to its parent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn node_offset(&self, node: NodeHandle) -> Result<Vec2, Error> {
        self.check_node(node)?;
        Ok(self.node_offset[node.id() as usize])
    }

    /// Sets the offset of a node relative to its parent.
    ///
    /// Layouters overwrite this for nodes they lay out.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn set_node_offset(&mut self, node: NodeHandle, offset: Vec2) -> Result<(), Error> {
        self.check_node(node)?;
        self.node_offset[node.id() as usize] = offset;
        self.dirty.mark_with(node.id(), dirty::PLACEMENT, &EagerPolicy);
        self.state |= UserInterfaceStates::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Size of a node.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn node_size(&self, node: NodeHandle) -> Result<Size, Error> {
        self.check_node(node)?;
        Ok(self.node_size[node.id() as usize])
    }

    /// Sets the size of a node.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn set_node_size(&mut self, node: NodeHandle, size: Size) -> Result<(), Error> {
        self.check_node(node)?;
        self.node_size[node.id() as usize] = size;
        self.state |= UserInterfaceStates::NEEDS_LAYOUT_UPDATE;
        Ok(())
    }

    /// Flags of a node.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn node_flags(&self, node: NodeHandle) -> Result<NodeFlags, Error> {
        self.check_node(node)?;
        Ok(self.node_flags[node.id() as usize])
    }

    /// Sets the flags of a node.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn set_node_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), Error> {
        self.check_node(node)?;
        self.node_flags[node.id() as usize] = flags;
        // Hidden propagates to the subtree together with placement.
        self.dirty.mark_with(node.id(), dirty::PLACEMENT, &EagerPolicy);
        self.state |= UserInterfaceStates::NEEDS_NODE_UPDATE;
        Ok(())
    }

    /// Absolute offset of a node, as of the last update.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn node_absolute_offset(&self, node: NodeHandle) -> Result<Vec2, Error> {
        self.check_node(node)?;
        Ok(self.absolute_offset[node.id() as usize])
    }

    /// Whether a node or any of its ancestors is hidden, as of the last
    /// update.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNode`] if `node` isn't valid.
    pub fn is_node_effectively_hidden(&self, node: NodeHandle) -> Result<bool, Error> {
        self.check_node(node)?;
        Ok(self.effective_hidden[node.id() as usize])
    }

    // -- Layouters --

    /// Reserves a layouter handle. Pass it to the layouter's constructor and
    /// then to [`set_layouter_instance`](Self::set_layouter_instance).
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExceeded`] if every layouter id is taken.
    pub fn create_layouter(&mut self) -> Result<LayouterHandle, Error> {
        self.layouters.create()
    }

    /// Registers a layouter under the handle it was constructed with, and
    /// passes it the current UI size.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayouter`] if the instance's handle isn't valid,
    /// [`Error::InstanceAlreadySet`] if the handle already has an instance,
    /// [`Error::FeaturesMismatch`] if [`Layouter::features`] disagrees with
    /// the features its base was created with.
    pub fn set_layouter_instance<T: Layouter>(&mut self, instance: T) -> Result<&mut T, Error> {
        let handle = instance.handle();
        if !self.layouters.is_valid(handle) {
            return Err(violation(Error::invalid_layouter(handle)));
        }
        if self.layouters.get(handle).is_some() {
            return Err(violation(Error::InstanceAlreadySet {
                handle: handle.bits(),
            }));
        }
        let reported = instance.features();
        let base = instance.base().features();
        if reported != base {
            return Err(violation(Error::FeaturesMismatch {
                layouter: handle,
                reported,
                base,
            }));
        }

        let mut instance = Box::new(instance);
        instance.set_size(self.size)?;
        self.layouters.set(handle, instance);
        self.state |= UserInterfaceStates::NEEDS_LAYOUT_ASSIGNMENT_UPDATE;
        self.layouter_mut::<T>(handle)
    }

    /// Whether `handle` names a live layouter, with or without an instance.
    #[must_use]
    pub fn is_layouter_valid(&self, handle: LayouterHandle) -> bool {
        self.layouters.is_valid(handle)
    }

    /// A registered layouter, type-erased.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayouter`] if `handle` isn't valid or has no instance.
    pub fn layouter_dyn(&self, handle: LayouterHandle) -> Result<&dyn Layouter, Error> {
        self.layouters
            .get(handle)
            .ok_or_else(|| violation(Error::invalid_layouter(handle)))
    }

    /// A registered layouter.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayouter`] if `handle` isn't valid or has no instance,
    /// [`Error::LayouterTypeMismatch`] if it isn't a `T`.
    pub fn layouter<T: Layouter>(&self, handle: LayouterHandle) -> Result<&T, Error> {
        let instance: &dyn Any = self.layouter_dyn(handle)?;
        instance
            .downcast_ref::<T>()
            .ok_or_else(|| violation(Error::LayouterTypeMismatch { layouter: handle }))
    }

    /// A registered layouter, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`layouter`](Self::layouter).
    pub fn layouter_mut<T: Layouter>(&mut self, handle: LayouterHandle) -> Result<&mut T, Error> {
        let instance: &mut dyn Any = self
            .layouters
            .get_mut(handle)
            .ok_or_else(|| violation(Error::invalid_layouter(handle)))?;
        instance
            .downcast_mut::<T>()
            .ok_or_else(|| violation(Error::LayouterTypeMismatch { layouter: handle }))
    }

    /// Removes a layouter and drops its instance with all its layouts.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayouter`] if `handle` isn't valid.
    pub fn remove_layouter(&mut self, handle: LayouterHandle) -> Result<(), Error> {
        if !self.layouters.remove(handle) {
            return Err(violation(Error::invalid_layouter(handle)));
        }
        self.state |= UserInterfaceStates::NEEDS_LAYOUT_ASSIGNMENT_UPDATE;
        Ok(())
    }

    /// Whether `layout` names a live layout in a registered layouter.
    #[must_use]
    pub fn is_layout_valid(&self, layout: LayoutHandle) -> bool {
        self.layouters
            .get(layout.layouter())
            .is_some_and(|layouter| layouter.base().is_handle_valid(layout))
    }

    /// The node a layout is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid.
    pub fn layout_node(&self, layout: LayoutHandle) -> Result<NodeHandle, Error> {
        self.layouters
            .get(layout.layouter())
            .ok_or_else(|| violation(Error::invalid_layout(layout)))?
            .base()
            .node(layout)
    }

    // -- Layers --

    /// Reserves a layer handle. Pass it to the layer's constructor and then
    /// to [`set_layer_instance`](Self::set_layer_instance).
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExceeded`] if every layer id is taken.
    pub fn create_layer(&mut self) -> Result<LayerHandle, Error> {
        self.layers.create()
    }

    /// Registers a layer under the handle it was constructed with.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayer`] if the instance's handle isn't valid,
    /// [`Error::InstanceAlreadySet`] if the handle already has an instance.
    pub fn set_layer_instance<T: Layer>(&mut self, instance: T) -> Result<&mut T, Error> {
        let handle = instance.handle();
        if !self.layers.is_valid(handle) {
            return Err(violation(Error::invalid_layer(handle)));
        }
        if self.layers.get(handle).is_some() {
            return Err(violation(Error::InstanceAlreadySet {
                handle: handle.bits(),
            }));
        }

        self.layers.set(handle, Box::new(instance));
        self.state |= UserInterfaceStates::NEEDS_DATA_ATTACHMENT_UPDATE;
        self.layer_mut::<T>(handle)
    }

    /// Whether `handle` names a live layer, with or without an instance.
    #[must_use]
    pub fn is_layer_valid(&self, handle: LayerHandle) -> bool {
        self.layers.is_valid(handle)
    }

    /// A registered layer, type-erased.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayer`] if `handle` isn't valid or has no instance.
    pub fn layer_dyn(&self, handle: LayerHandle) -> Result<&dyn Layer, Error> {
        self.layers
            .get(handle)
            .ok_or_else(|| violation(Error::invalid_layer(handle)))
    }

    /// A registered layer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayer`] if `handle` isn't valid or has no instance,
    /// [`Error::LayerTypeMismatch`] if it isn't a `T`.
    pub fn layer<T: Layer>(&self, handle: LayerHandle) -> Result<&T, Error> {
        let instance: &dyn Any = self.layer_dyn(handle)?;
        instance
            .downcast_ref::<T>()
            .ok_or_else(|| violation(Error::LayerTypeMismatch { layer: handle }))
    }

    /// A registered layer, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`layer`](Self::layer).
    pub fn layer_mut<T: Layer>(&mut self, handle: LayerHandle) -> Result<&mut T, Error> {
        let instance: &mut dyn Any = self
            .layers
            .get_mut(handle)
            .ok_or_else(|| violation(Error::invalid_layer(handle)))?;
        instance
            .downcast_mut::<T>()
            .ok_or_else(|| violation(Error::LayerTypeMismatch { layer: handle }))
    }

    /// Removes a layer and drops its instance with all its data.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayer`] if `handle` isn't valid.
    pub fn remove_layer(&mut self, handle: LayerHandle) -> Result<(), Error> {
        if !self.layers.remove(handle) {
            return Err(violation(Error::invalid_layer(handle)));
        }
        self.state |= UserInterfaceStates::NEEDS_DATA_ATTACHMENT_UPDATE;
        Ok(())
    }

    /// Whether `data` names live data in a registered layer.
    #[must_use]
    pub fn is_data_valid(&self, data: DataHandle) -> bool {
        self.layers
            .get(data.layer())
            .is_some_and(|layer| layer.base().is_handle_valid(data))
    }

    /// The node data is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid.
    pub fn data_node(&self, data: DataHandle) -> Result<NodeHandle, Error> {
        self.layers
            .get(data.layer())
            .ok_or_else(|| violation(Error::invalid_data(data)))?
            .base()
            .node(data)
    }

    // -- Internal helpers --

    fn check_node(&self, node: NodeHandle) -> Result<(), Error> {
        if self.is_node_valid(node) {
            Ok(())
        } else {
            Err(violation(Error::invalid_node(node)))
        }
    }

    /// Appends `c` to the child list of `p`.
    fn link_last_child(&mut self, p: u32, c: u32) {
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.node_parent[idx as usize].id();
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.node_parent[idx as usize] = NodeHandle::NULL;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

fn check_size(size: Size) -> Result<(), Error> {
    if size.width == 0.0 || size.height == 0.0 {
        return Err(violation(Error::ZeroSize { size }));
    }
    Ok(())
}
