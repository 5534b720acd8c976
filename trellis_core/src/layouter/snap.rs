// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edge-snapping layouter.

use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;
use hashbrown::HashMap;
use kurbo::{Insets, Size, Vec2};

use super::{Layouter, LayouterBase, LayouterFeatures};
use crate::error::{Error, violation};
use crate::handle::{LayoutHandle, LayouterHandle, NodeHandle};

bitflags! {
    /// Which edges of the parent a node snaps to.
    ///
    /// On each axis, snapping to both edges stretches the node to fill the
    /// parent, snapping to one edge aligns it there with its own size, and
    /// snapping to neither centers it.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Snaps: u8 {
        /// Left edge.
        const LEFT = 1 << 0;
        /// Right edge.
        const RIGHT = 1 << 1;
        /// Top edge.
        const TOP = 1 << 2;
        /// Bottom edge.
        const BOTTOM = 1 << 3;
        /// Stretch horizontally.
        const FILL_X = Self::LEFT.bits() | Self::RIGHT.bits();
        /// Stretch vertically.
        const FILL_Y = Self::TOP.bits() | Self::BOTTOM.bits();
        /// Stretch in both directions.
        const FILL = Self::FILL_X.bits() | Self::FILL_Y.bits();
    }
}

/// Places nodes relative to the edges of their parent node, or of the UI for
/// root nodes.
///
/// Each layout has [`Snaps`] and margin [`Insets`]. The node's own size is
/// used on axes where it isn't stretched, so it has to be set on the node
/// beforehand.
#[derive(Debug)]
pub struct SnapLayouter {
    base: LayouterBase,
    snaps: Vec<Snaps>,
    margins: Vec<Insets>,
    ui_size: Size,
}

impl SnapLayouter {
    /// Capabilities of every snap layouter.
    pub const FEATURES: LayouterFeatures = LayouterFeatures::UNIQUE_LAYOUTS;

    /// Creates an empty layouter for the given handle.
    #[must_use]
    pub fn new(handle: LayouterHandle) -> Self {
        Self {
            base: LayouterBase::new(handle, Self::FEATURES),
            snaps: Vec::new(),
            margins: Vec::new(),
            ui_size: Size::ZERO,
        }
    }

    /// Snaps `node` to its parent.
    ///
    /// # Errors
    ///
    /// Same as [`LayouterBase::add`].
    pub fn add(
        &mut self,
        node: NodeHandle,
        snaps: Snaps,
        margin: Insets,
    ) -> Result<LayoutHandle, Error> {
        let layout = self.base.add(node)?;
        let id = layout.data().id() as usize;
        if id >= self.snaps.len() {
            self.snaps.resize(id + 1, Snaps::empty());
            self.margins.resize(id + 1, Insets::ZERO);
        }
        self.snaps[id] = snaps;
        self.margins[id] = margin;
        Ok(layout)
    }

    /// Removes a layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid here.
    pub fn remove(&mut self, layout: LayoutHandle) -> Result<(), Error> {
        self.base.remove(layout)
    }

    /// Snaps of a layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid here.
    pub fn snaps(&self, layout: LayoutHandle) -> Result<Snaps, Error> {
        Ok(self.snaps[self.index(layout)?])
    }

    /// Changes the snaps of a layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid here.
    pub fn set_snaps(&mut self, layout: LayoutHandle, snaps: Snaps) -> Result<(), Error> {
        let id = self.index(layout)?;
        self.snaps[id] = snaps;
        self.base.set_needs_update();
        Ok(())
    }

    /// Margin of a layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid here.
    pub fn margin(&self, layout: LayoutHandle) -> Result<Insets, Error> {
        Ok(self.margins[self.index(layout)?])
    }

    /// Changes the margin of a layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLayout`] if `layout` isn't valid here.
    pub fn set_margin(&mut self, layout: LayoutHandle, margin: Insets) -> Result<(), Error> {
        let id = self.index(layout)?;
        self.margins[id] = margin;
        self.base.set_needs_update();
        Ok(())
    }

    fn index(&self, layout: LayoutHandle) -> Result<usize, Error> {
        if !self.base.is_handle_valid(layout) {
            return Err(violation(Error::invalid_layout(layout)));
        }
        Ok(layout.data().id() as usize)
    }

    /// Writes the offset and size of the node of layout `id`.
    fn place(&self, id: usize, parents: &[NodeHandle], offsets: &mut [Vec2], sizes: &mut [Size]) {
        let node = self.base.nodes()[id].id() as usize;
        let parent = parents[node];
        let container = if parent.is_null() {
            self.ui_size
        } else {
            sizes[parent.id() as usize]
        };
        let snaps = self.snaps[id];
        let margin = self.margins[id];

        let (x, width) = snap_axis(
            snaps.contains(Snaps::LEFT),
            snaps.contains(Snaps::RIGHT),
            container.width,
            sizes[node].width,
            margin.x0,
            margin.x1,
        );
        let (y, height) = snap_axis(
            snaps.contains(Snaps::TOP),
            snaps.contains(Snaps::BOTTOM),
            container.height,
            sizes[node].height,
            margin.y0,
            margin.y1,
        );
        offsets[node] = Vec2::new(x, y);
        sizes[node] = Size::new(width, height);
    }
}

/// Offset and extent along one axis.
fn snap_axis(start: bool, end: bool, container: f64, size: f64, m0: f64, m1: f64) -> (f64, f64) {
    match (start, end) {
        (true, true) => (m0, (container - m0 - m1).max(0.0)),
        (true, false) => (m0, size),
        (false, true) => (container - size - m1, size),
        (false, false) => ((container + m0 - m1 - size) * 0.5, size),
    }
}

impl Layouter for SnapLayouter {
    fn base(&self) -> &LayouterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayouterBase {
        &mut self.base
    }

    fn features(&self) -> LayouterFeatures {
        Self::FEATURES
    }

    fn do_set_size(&mut self, size: Size) {
        // Root placements depend on the UI size.
        if size != self.ui_size {
            self.ui_size = size;
            self.base.set_needs_update();
        }
    }

    fn do_clean(&mut self, layout_ids_to_remove: &[bool]) {
        for (id, _) in layout_ids_to_remove.iter().enumerate().filter(|(_, r)| **r) {
            self.snaps[id] = Snaps::empty();
            self.margins[id] = Insets::ZERO;
        }
    }

    fn do_update(
        &mut self,
        layout_ids_to_update: &[bool],
        top_level_layout_ids: &[u32],
        node_parents: &[NodeHandle],
        node_offsets: &mut [Vec2],
        node_sizes: &mut [Size],
    ) {
        let nodes = self.base.nodes();

        // Node id -> flagged layout id.
        let mut layout_of: HashMap<u32, u32> = HashMap::new();
        for (id, _) in layout_ids_to_update.iter().enumerate().filter(|(_, f)| **f) {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "layout ids fit in 20 bits"
            )]
            let id = id as u32;
            layout_of.insert(nodes[id as usize].id(), id);
        }

        // Layout id -> flagged layouts whose nearest laid-out ancestor it is.
        let mut children: Vec<Vec<u32>> = vec![Vec::new(); layout_ids_to_update.len()];
        for (&node, &id) in &layout_of {
            let mut parent = node_parents[node as usize];
            while !parent.is_null() {
                if let Some(&ancestor) = layout_of.get(&parent.id()) {
                    children[ancestor as usize].push(id);
                    break;
                }
                parent = node_parents[parent.id() as usize];
            }
        }
        for list in &mut children {
            list.sort_unstable();
        }

        // Parent sizes are final before their children are placed.
        let mut stack: Vec<u32> = Vec::new();
        for &top in top_level_layout_ids {
            stack.push(top);
            while let Some(id) = stack.pop() {
                self.place(id as usize, node_parents, node_offsets, node_sizes);
                stack.extend(children[id as usize].iter().rev());
            }
        }
    }
}
