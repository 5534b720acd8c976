// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::{INVALID, UserInterface};
use crate::handle::NodeHandle;

/// An iterator over the direct children of a node.
///
/// Created by [`UserInterface::children`].
#[derive(Debug)]
pub struct Children<'a> {
    ui: &'a UserInterface,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(ui: &'a UserInterface, first: u32) -> Self {
        Self { ui, current: first }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.ui.next_sibling[idx as usize];
        Some(NodeHandle::new(
            idx,
            self.ui.nodes.generations()[idx as usize],
        ))
    }
}
