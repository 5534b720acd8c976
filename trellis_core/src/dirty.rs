// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel for node placement.
//!
//! The [`UserInterface`](crate::ui::UserInterface) tracks which nodes need
//! their absolute offset and effective visibility recomputed through
//! [`understory_dirty`]. Every child node has a dependency edge on its parent
//! in the [`PLACEMENT`] channel, and marks use
//! [`EagerPolicy`](understory_dirty::EagerPolicy), so marking a node also
//! marks its whole subtree.
//!
//! The channel is marked when a node is created or re-flagged, when its
//! offset is set, and for every node whose layout was recomputed by a
//! layouter. It is drained in dependency order during the offsets phase of
//! [`UserInterface::update`](crate::ui::UserInterface::update), which means
//! parents are always resolved before their children.

use understory_dirty::Channel;

/// Node offset or hidden flag changed; requires absolute offset and
/// effective hidden recomputation for the node's subtree.
pub const PLACEMENT: Channel = Channel::new(0);
