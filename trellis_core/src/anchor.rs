// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A node bound to the user interface it lives in.
//!
//! Widget code usually wants three things at once: the interface, the node it
//! draws into, and the layout that positions that node. [`Anchor`] carries
//! them together after checking that they agree. It owns no slot state; the
//! node and layout stay owned by the [`UserInterface`] and its layouters.

use kurbo::{Size, Vec2};

use crate::error::{Error, violation};
use crate::handle::{LayoutHandle, NodeHandle};
use crate::ui::{NodeFlags, UserInterface};

/// A checked `(node, layout)` pair together with the interface they belong
/// to.
///
/// The node is always valid at construction. The layout is optional; when
/// present it is attached to exactly this node.
pub struct Anchor<'ui> {
    ui: &'ui mut UserInterface,
    node: NodeHandle,
    layout: Option<LayoutHandle>,
}

impl core::fmt::Debug for Anchor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Anchor")
            .field("node", &self.node)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl<'ui> Anchor<'ui> {
    /// Binds an existing node, and optionally its layout.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidNode`] if `node` isn't live in `ui`.
    /// - [`Error::InvalidLayout`] if `layout` isn't live in `ui`.
    /// - [`Error::LayoutNodeMismatch`] if `layout` is attached to another
    ///   node.
    pub fn new(
        ui: &'ui mut UserInterface,
        node: NodeHandle,
        layout: Option<LayoutHandle>,
    ) -> Result<Self, Error> {
        if !ui.is_node_valid(node) {
            return Err(violation(Error::invalid_node(node)));
        }
        if let Some(layout) = layout {
            if !ui.is_layout_valid(layout) {
                return Err(violation(Error::invalid_layout(layout)));
            }
            let actual = ui.layout_node(layout)?;
            if actual != node {
                return Err(violation(Error::LayoutNodeMismatch {
                    layout,
                    expected: node,
                    actual,
                }));
            }
        }
        Ok(Self { ui, node, layout })
    }

    /// Creates a new node under `parent` (or a root, if `parent` is null)
    /// and binds it without a layout.
    ///
    /// # Errors
    ///
    /// Same as [`UserInterface::create_node`].
    pub fn create(
        ui: &'ui mut UserInterface,
        parent: NodeHandle,
        offset: Vec2,
        size: Size,
        flags: NodeFlags,
    ) -> Result<Self, Error> {
        let node = ui.create_node(parent, offset, size, flags)?;
        Ok(Self {
            ui,
            node,
            layout: None,
        })
    }

    /// The interface the node lives in.
    #[must_use]
    pub fn ui(&self) -> &UserInterface {
        self.ui
    }

    /// The interface the node lives in, mutably.
    pub fn ui_mut(&mut self) -> &mut UserInterface {
        self.ui
    }

    /// The bound node.
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        self.node
    }

    /// The bound layout, if any.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> Option<LayoutHandle> {
        self.layout
    }

    /// The bound layout.
    ///
    /// # Errors
    ///
    /// [`Error::NullLayout`] if the anchor has no layout.
    pub fn layout_handle(&self) -> Result<LayoutHandle, Error> {
        self.layout.ok_or_else(|| violation(Error::NullLayout))
    }
}

impl From<&Anchor<'_>> for NodeHandle {
    fn from(anchor: &Anchor<'_>) -> Self {
        anchor.node
    }
}

impl TryFrom<&Anchor<'_>> for LayoutHandle {
    type Error = Error;

    fn try_from(anchor: &Anchor<'_>) -> Result<Self, Error> {
        anchor.layout_handle()
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Insets;

    use super::*;
    use crate::layouter::{SnapLayouter, Snaps};

    fn setup() -> (UserInterface, NodeHandle, NodeHandle, LayoutHandle) {
        let mut ui = UserInterface::new(Size::new(100.0, 100.0)).unwrap();
        let a = ui
            .create_node(NodeHandle::NULL, Vec2::ZERO, Size::ZERO, NodeFlags::empty())
            .unwrap();
        let b = ui
            .create_node(NodeHandle::NULL, Vec2::ZERO, Size::ZERO, NodeFlags::empty())
            .unwrap();
        let handle = ui.create_layouter().unwrap();
        let layout = ui
            .set_layouter_instance(SnapLayouter::new(handle))
            .unwrap()
            .add(a, Snaps::FILL, Insets::ZERO)
            .unwrap();
        (ui, a, b, layout)
    }

    #[test]
    fn binds_node_and_layout() {
        let (mut ui, a, _, layout) = setup();
        let anchor = Anchor::new(&mut ui, a, Some(layout)).unwrap();
        assert_eq!(anchor.node(), a);
        assert_eq!(anchor.layout(), Some(layout));
        assert_eq!(NodeHandle::from(&anchor), a);
        assert_eq!(LayoutHandle::try_from(&anchor), Ok(layout));
        assert_eq!(anchor.ui().layout_node(layout), Ok(a));
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn layout_on_another_node_is_rejected() {
        let (mut ui, a, b, layout) = setup();
        assert_eq!(
            Anchor::new(&mut ui, b, Some(layout)).unwrap_err(),
            Error::LayoutNodeMismatch {
                layout,
                expected: b,
                actual: a,
            }
        );
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn stale_node_or_layout_is_rejected() {
        let (mut ui, a, b, layout) = setup();
        ui.layouter_mut::<SnapLayouter>(layout.layouter())
            .unwrap()
            .remove(layout)
            .unwrap();
        assert_eq!(
            Anchor::new(&mut ui, a, Some(layout)).unwrap_err(),
            Error::invalid_layout(layout)
        );

        ui.remove_node(b).unwrap();
        assert_eq!(
            Anchor::new(&mut ui, b, None).unwrap_err(),
            Error::invalid_node(b)
        );
    }

    #[test]
    fn create_makes_a_child_without_layout() {
        let (mut ui, a, _, _) = setup();
        let mut anchor = Anchor::create(
            &mut ui,
            a,
            Vec2::new(1.0, 2.0),
            Size::new(3.0, 4.0),
            NodeFlags::empty(),
        )
        .unwrap();
        let node = anchor.node();
        assert_eq!(anchor.layout(), None);
        anchor
            .ui_mut()
            .set_node_size(node, Size::new(5.0, 5.0))
            .unwrap();
        assert_eq!(ui.node_parent(node), Ok(a));
        assert_eq!(ui.node_size(node), Ok(Size::new(5.0, 5.0)));
    }

    #[cfg(not(feature = "strict"))]
    #[test]
    fn missing_layout_has_no_layout_handle() {
        let (mut ui, _, b, _) = setup();
        let anchor = Anchor::new(&mut ui, b, None).unwrap();
        assert_eq!(anchor.layout_handle(), Err(Error::NullLayout));
        assert_eq!(LayoutHandle::try_from(&anchor), Err(Error::NullLayout));
    }
}
