// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layers: data attached to nodes that consumes the computed layout.
//!
//! Layers mirror [`layouter`](crate::layouter): [`LayerBase`] owns a
//! [`SlotArena`] of data records plus [`LayerStates`], and the [`Layer`]
//! trait provides the validated [`clean_nodes`](Layer::clean_nodes) and
//! [`update`](Layer::update) entry points that dispatch to the
//! implementation's hooks. Layers run after layouters, with absolute node
//! offsets.

mod quad;

use core::any::Any;

use bitflags::bitflags;
use kurbo::{Size, Vec2};

use crate::arena::SlotArena;
use crate::error::{Error, violation};
use crate::handle::{DataHandle, LayerDataHandle, LayerHandle, NodeHandle};

pub use quad::QuadLayer;

bitflags! {
    /// Pending work of a layer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayerStates: u8 {
        /// [`Layer::update`] needs to be called to refresh the data.
        const NEEDS_DATA_UPDATE = 1 << 0;
        /// Data were attached or removed. Implies
        /// [`Self::NEEDS_DATA_UPDATE`].
        const NEEDS_ATTACHMENT_UPDATE = Self::NEEDS_DATA_UPDATE.bits() | 1 << 1;
    }
}

/// Persistent state shared by every layer implementation.
#[derive(Debug)]
pub struct LayerBase {
    handle: LayerHandle,
    data: SlotArena<LayerDataHandle>,
    state: LayerStates,
}

impl LayerBase {
    /// Creates an empty base for the layer identified by `handle`.
    #[must_use]
    pub fn new(handle: LayerHandle) -> Self {
        Self {
            handle,
            data: SlotArena::new(),
            state: LayerStates::empty(),
        }
    }

    /// The layer's own identity.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> LayerHandle {
        self.handle
    }

    /// Pending work.
    #[inline]
    #[must_use]
    pub fn state(&self) -> LayerStates {
        self.state
    }

    /// Flags the layer as needing a data update.
    pub fn set_needs_update(&mut self) {
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
    }

    /// Attaches new data to `node`.
    ///
    /// # Errors
    ///
    /// [`Error::NullNode`] or [`Error::CapacityExceeded`].
    pub fn create(&mut self, node: NodeHandle) -> Result<DataHandle, Error> {
        let data = self.data.add(node)?;
        self.state |= LayerStates::NEEDS_ATTACHMENT_UPDATE;
        Ok(DataHandle::new(self.handle, data))
    }

    /// Removes data.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid in this layer.
    pub fn remove(&mut self, data: DataHandle) -> Result<(), Error> {
        if data.layer() != self.handle || self.data.remove(data.data()).is_none() {
            return Err(violation(Error::invalid_data(data)));
        }
        self.state |= LayerStates::NEEDS_ATTACHMENT_UPDATE;
        Ok(())
    }

    /// Whether `data` is owned by this layer and names a live slot.
    #[must_use]
    pub fn is_handle_valid(&self, data: DataHandle) -> bool {
        !data.is_null() && data.layer() == self.handle && self.data.is_handle_valid(data.data())
    }

    /// The node data is attached to.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid in this layer.
    pub fn node(&self, data: DataHandle) -> Result<NodeHandle, Error> {
        if data.layer() != self.handle {
            return Err(violation(Error::invalid_data(data)));
        }
        self.data
            .node(data.data())
            .ok_or_else(|| violation(Error::invalid_data(data)))
    }

    /// Total number of data slots, including free and disabled ones.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Number of live data.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.data.used_count()
    }

    /// Attached node per data id, null for free and disabled slots.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[NodeHandle] {
        self.data.nodes()
    }

    /// Generation per data id.
    #[inline]
    #[must_use]
    pub fn generations(&self) -> &[u16] {
        self.data.generations()
    }
}

/// Consumes node layout to produce per-data output.
pub trait Layer: Any {
    /// Shared layer state.
    fn base(&self) -> &LayerBase;

    /// Shared layer state, mutably.
    fn base_mut(&mut self) -> &mut LayerBase;

    /// Called from [`clean_nodes`](Self::clean_nodes) with a mask of the
    /// data ids that were just removed.
    fn do_clean(&mut self, data_ids_to_remove: &[bool]) {
        _ = data_ids_to_remove;
    }

    /// Refreshes flagged data. Offsets are absolute and the views are
    /// indexed by node id.
    fn do_update(&mut self, data_ids_to_update: &[bool], node_offsets: &[Vec2], node_sizes: &[Size]);

    /// The layer's own identity.
    fn handle(&self) -> LayerHandle {
        self.base().handle()
    }

    /// Pending work.
    fn state(&self) -> LayerStates {
        self.base().state()
    }

    /// Removes all data attached to nodes whose generation no longer
    /// matches `node_handle_generations`, then calls
    /// [`do_clean`](Self::do_clean). Returns the number of removed data.
    fn clean_nodes(&mut self, node_handle_generations: &[u16]) -> usize {
        let removed = self.base_mut().data.clean_nodes(node_handle_generations);
        self.do_clean(&removed);
        removed.iter().filter(|&&r| r).count()
    }

    /// Validates the inputs, clears the state flags and calls
    /// [`do_update`](Self::do_update).
    ///
    /// # Errors
    ///
    /// [`Error::BitsetSizeMismatch`] if `data_ids_to_update` doesn't have
    /// [`capacity`](LayerBase::capacity) entries,
    /// [`Error::ViewSizeMismatch`] if the node views differ in length.
    fn update(
        &mut self,
        data_ids_to_update: &[bool],
        node_offsets: &[Vec2],
        node_sizes: &[Size],
    ) -> Result<(), Error> {
        let capacity = self.base().capacity();
        if data_ids_to_update.len() != capacity {
            return Err(violation(Error::BitsetSizeMismatch {
                expected: capacity,
                actual: data_ids_to_update.len(),
            }));
        }
        if node_offsets.len() != node_sizes.len() {
            return Err(violation(Error::ViewSizeMismatch {
                parents: node_offsets.len(),
                offsets: node_offsets.len(),
                sizes: node_sizes.len(),
            }));
        }

        self.base_mut().state = LayerStates::empty();
        self.do_update(data_ids_to_update, node_offsets, node_sizes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    struct Counting {
        base: LayerBase,
        updated: Vec<Vec<bool>>,
    }

    impl Layer for Counting {
        fn base(&self) -> &LayerBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut LayerBase {
            &mut self.base
        }

        fn do_update(&mut self, data_ids_to_update: &[bool], _: &[Vec2], _: &[Size]) {
            self.updated.push(data_ids_to_update.to_vec());
        }
    }

    fn counting() -> Counting {
        Counting {
            base: LayerBase::new(LayerHandle::new(0, 1)),
            updated: Vec::new(),
        }
    }

    #[test]
    fn create_flags_attachment_update() {
        let mut layer = counting();
        let data = layer.base_mut().create(NodeHandle::new(2, 1)).unwrap();
        assert_eq!(data.layer(), layer.handle());
        assert_eq!(layer.state(), LayerStates::NEEDS_ATTACHMENT_UPDATE);
        assert_eq!(layer.base().node(data), Ok(NodeHandle::new(2, 1)));
        assert!(!layer.base().is_handle_valid(DataHandle::NULL));

        layer.update(&[true], &[Vec2::ZERO; 3], &[Size::ZERO; 3]).unwrap();
        assert_eq!(layer.state(), LayerStates::empty());
        assert_eq!(layer.updated, [vec![true]]);
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn foreign_data_is_rejected() {
        let mut layer = counting();
        let data = layer.base_mut().create(NodeHandle::new(0, 1)).unwrap();
        let foreign = DataHandle::new(LayerHandle::new(1, 1), data.data());
        assert!(!layer.base().is_handle_valid(foreign));
        assert!(layer.base_mut().remove(foreign).is_err());
        assert!(layer.base().is_handle_valid(data));
        layer.base_mut().remove(data).unwrap();
        assert!(!layer.base().is_handle_valid(data));
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn update_validates_inputs() {
        let mut layer = counting();
        layer.base_mut().create(NodeHandle::new(0, 1)).unwrap();
        assert_eq!(
            layer.update(&[], &[Vec2::ZERO], &[Size::ZERO]),
            Err(Error::BitsetSizeMismatch {
                expected: 1,
                actual: 0
            })
        );
        assert!(layer.update(&[true], &[Vec2::ZERO], &[]).is_err());
        assert!(layer.updated.is_empty());
    }

    #[test]
    fn clean_nodes_drops_stale_data() {
        let mut layer = counting();
        let kept = layer.base_mut().create(NodeHandle::new(0, 1)).unwrap();
        let stale = layer.base_mut().create(NodeHandle::new(1, 1)).unwrap();
        assert_eq!(layer.clean_nodes(&[1, 3]), 1);
        assert!(layer.base().is_handle_valid(kept));
        assert!(!layer.base().is_handle_valid(stale));
    }
}
