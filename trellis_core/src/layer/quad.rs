// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A layer producing one padded rectangle per data.

use alloc::vec::Vec;

use kurbo::{Insets, Rect, Size, Vec2};

use super::{Layer, LayerBase};
use crate::error::{Error, violation};
use crate::handle::{DataHandle, LayerHandle, NodeHandle};

/// Produces an absolute [`Rect`] for every data, inset from its node's
/// bounds by a per-data padding.
///
/// Rectangles are refreshed by [`Layer::update`]; data whose node was hidden
/// at the time keep their previous rectangle.
#[derive(Debug)]
pub struct QuadLayer {
    base: LayerBase,
    paddings: Vec<Insets>,
    rects: Vec<Rect>,
}

impl QuadLayer {
    /// Creates an empty layer for the given handle.
    #[must_use]
    pub fn new(handle: LayerHandle) -> Self {
        Self {
            base: LayerBase::new(handle),
            paddings: Vec::new(),
            rects: Vec::new(),
        }
    }

    /// Attaches a quad to `node`.
    ///
    /// # Errors
    ///
    /// Same as [`LayerBase::create`].
    pub fn create(&mut self, node: NodeHandle, padding: Insets) -> Result<DataHandle, Error> {
        let data = self.base.create(node)?;
        let id = data.data().id() as usize;
        if id >= self.paddings.len() {
            self.paddings.resize(id + 1, Insets::ZERO);
            self.rects.resize(id + 1, Rect::ZERO);
        }
        self.paddings[id] = padding;
        self.rects[id] = Rect::ZERO;
        Ok(data)
    }

    /// Removes a quad.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid here.
    pub fn remove(&mut self, data: DataHandle) -> Result<(), Error> {
        self.base.remove(data)
    }

    /// Padding of a quad.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid here.
    pub fn padding(&self, data: DataHandle) -> Result<Insets, Error> {
        Ok(self.paddings[self.index(data)?])
    }

    /// Changes the padding of a quad.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid here.
    pub fn set_padding(&mut self, data: DataHandle, padding: Insets) -> Result<(), Error> {
        let id = self.index(data)?;
        self.paddings[id] = padding;
        self.base.set_needs_update();
        Ok(())
    }

    /// Absolute rectangle of a quad as of the last update.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if `data` isn't valid here.
    pub fn rect(&self, data: DataHandle) -> Result<Rect, Error> {
        Ok(self.rects[self.index(data)?])
    }

    fn index(&self, data: DataHandle) -> Result<usize, Error> {
        if !self.base.is_handle_valid(data) {
            return Err(violation(Error::invalid_data(data)));
        }
        Ok(data.data().id() as usize)
    }
}

impl Layer for QuadLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayerBase {
        &mut self.base
    }

    fn do_clean(&mut self, data_ids_to_remove: &[bool]) {
        for (id, _) in data_ids_to_remove.iter().enumerate().filter(|(_, r)| **r) {
            self.paddings[id] = Insets::ZERO;
            self.rects[id] = Rect::ZERO;
        }
    }

    fn do_update(&mut self, data_ids_to_update: &[bool], node_offsets: &[Vec2], node_sizes: &[Size]) {
        let nodes = self.base.nodes();
        for (id, _) in data_ids_to_update.iter().enumerate().filter(|(_, f)| **f) {
            let node = nodes[id].id() as usize;
            let bounds = Rect::from_origin_size(node_offsets[node].to_point(), node_sizes[node]);
            let p = self.paddings[id];
            self.rects[id] = Rect::new(
                bounds.x0 + p.x0,
                bounds.y0 + p.y0,
                bounds.x1 - p.x1,
                bounds.y1 - p.y1,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_is_node_bounds_minus_padding() {
        let mut layer = QuadLayer::new(LayerHandle::new(0, 1));
        let data = layer
            .create(NodeHandle::new(1, 1), Insets::new(1.0, 2.0, 3.0, 4.0))
            .unwrap();
        assert_eq!(layer.rect(data), Ok(Rect::ZERO));

        let offsets = [Vec2::ZERO, Vec2::new(10.0, 20.0)];
        let sizes = [Size::ZERO, Size::new(30.0, 40.0)];
        layer.update(&[true], &offsets, &sizes).unwrap();
        assert_eq!(layer.rect(data), Ok(Rect::new(11.0, 22.0, 37.0, 56.0)));
    }

    #[test]
    fn unflagged_data_keep_their_rect() {
        let mut layer = QuadLayer::new(LayerHandle::new(0, 1));
        let data = layer.create(NodeHandle::new(0, 1), Insets::ZERO).unwrap();
        layer
            .update(&[true], &[Vec2::new(1.0, 1.0)], &[Size::new(2.0, 2.0)])
            .unwrap();
        layer
            .update(&[false], &[Vec2::ZERO], &[Size::new(9.0, 9.0)])
            .unwrap();
        assert_eq!(layer.rect(data), Ok(Rect::new(1.0, 1.0, 3.0, 3.0)));
    }

    #[test]
    fn set_padding_flags_update() {
        let mut layer = QuadLayer::new(LayerHandle::new(0, 1));
        let data = layer.create(NodeHandle::new(0, 1), Insets::ZERO).unwrap();
        layer.update(&[true], &[Vec2::ZERO], &[Size::ZERO]).unwrap();
        assert!(layer.state().is_empty());

        layer.set_padding(data, Insets::uniform(1.0)).unwrap();
        assert!(!layer.state().is_empty());
        assert_eq!(layer.padding(data), Ok(Insets::uniform(1.0)));
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn removed_data_is_rejected() {
        let mut layer = QuadLayer::new(LayerHandle::new(0, 1));
        let data = layer.create(NodeHandle::new(0, 1), Insets::ZERO).unwrap();
        layer.remove(data).unwrap();
        assert!(layer.rect(data).is_err());
        assert!(layer.set_padding(data, Insets::ZERO).is_err());
        assert!(!layer.base().is_handle_valid(data));
        assert!(!layer.base().is_handle_valid(DataHandle::NULL));
    }
}
