// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract-violation errors.
//!
//! Every error in this crate is a caller bug rather than a transient runtime
//! condition. A failing call returns the error and leaves all state
//! untouched. With the `strict` feature enabled, the violation panics at the
//! call site instead.

use core::fmt;

use kurbo::Size;

use crate::handle::{
    DataHandle, LayerHandle, LayoutHandle, LayouterHandle, NodeHandle, SlotHandle,
};
use crate::layouter::LayouterFeatures;

/// A contract violation reported by a slot arena, layouter, layer or the
/// user interface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// A node handle is null, stale or out of range.
    InvalidNode {
        /// Decoded id.
        id: u32,
        /// Decoded generation.
        generation: u16,
    },
    /// A layouter handle does not name a live layouter.
    InvalidLayouter {
        /// Decoded id.
        id: u32,
        /// Decoded generation.
        generation: u16,
    },
    /// A layout handle is null, stale, out of range or owned by another
    /// layouter.
    InvalidLayout {
        /// Decoded layouter data id.
        id: u32,
        /// Decoded layouter data generation.
        generation: u16,
    },
    /// A layer handle does not name a live layer.
    InvalidLayer {
        /// Decoded id.
        id: u32,
        /// Decoded generation.
        generation: u16,
    },
    /// A data handle is null, stale, out of range or owned by another layer.
    InvalidData {
        /// Decoded layer data id.
        id: u32,
        /// Decoded layer data generation.
        generation: u16,
    },
    /// A null node was passed where a node is required.
    NullNode,
    /// A null layout was requested from an anchor that has none.
    NullLayout,
    /// Adding a slot would exceed the addressable capacity.
    CapacityExceeded {
        /// The capacity limit that was hit.
        limit: usize,
    },
    /// A size with a zero dimension was passed.
    ZeroSize {
        /// The rejected size.
        size: Size,
    },
    /// `update` was called before any `set_size`.
    SizeNotSet,
    /// An id bitset does not have exactly `capacity()` entries.
    BitsetSizeMismatch {
        /// Expected number of entries.
        expected: usize,
        /// Actual number of entries.
        actual: usize,
    },
    /// Node parent, offset and size views differ in length.
    ViewSizeMismatch {
        /// Length of the parent view.
        parents: usize,
        /// Length of the offset view.
        offsets: usize,
        /// Length of the size view.
        sizes: usize,
    },
    /// A layouter with unique layouts already has a layout for this node.
    DuplicateLayout {
        /// The node that already has a layout.
        node: NodeHandle,
    },
    /// A layout is valid but attached to a different node.
    LayoutNodeMismatch {
        /// The layout.
        layout: LayoutHandle,
        /// The node it was expected to be attached to.
        expected: NodeHandle,
        /// The node it is actually attached to.
        actual: NodeHandle,
    },
    /// A layouter exists but is not of the requested type.
    LayouterTypeMismatch {
        /// The layouter.
        layouter: LayouterHandle,
    },
    /// A layouter reports different features than its base was created
    /// with.
    FeaturesMismatch {
        /// The layouter.
        layouter: LayouterHandle,
        /// What [`Layouter::features`](crate::layouter::Layouter::features)
        /// returns.
        reported: LayouterFeatures,
        /// What the base enforces.
        base: LayouterFeatures,
    },
    /// A layer exists but is not of the requested type.
    LayerTypeMismatch {
        /// The layer.
        layer: LayerHandle,
    },
    /// An instance is already registered for this handle.
    InstanceAlreadySet {
        /// Raw bits of the handle.
        handle: u16,
    },
}

impl Error {
    pub(crate) fn invalid_node(handle: NodeHandle) -> Self {
        Self::InvalidNode {
            id: handle.id(),
            generation: handle.generation(),
        }
    }

    pub(crate) fn invalid_layouter(handle: LayouterHandle) -> Self {
        Self::InvalidLayouter {
            id: handle.id(),
            generation: handle.generation(),
        }
    }

    pub(crate) fn invalid_layout(handle: LayoutHandle) -> Self {
        Self::InvalidLayout {
            id: handle.data().id(),
            generation: handle.data().generation(),
        }
    }

    pub(crate) fn invalid_layer(handle: LayerHandle) -> Self {
        Self::InvalidLayer {
            id: handle.id(),
            generation: handle.generation(),
        }
    }

    pub(crate) fn invalid_data(handle: DataHandle) -> Self {
        Self::InvalidData {
            id: handle.data().id(),
            generation: handle.data().generation(),
        }
    }

    pub(crate) fn capacity_exceeded<H: SlotHandle>() -> Self {
        Self::CapacityExceeded {
            limit: H::capacity_limit(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidNode { id, generation } => {
                write!(f, "invalid node handle {id}@gen{generation}")
            }
            Self::InvalidLayouter { id, generation } => {
                write!(f, "invalid layouter handle {id}@gen{generation}")
            }
            Self::InvalidLayout { id, generation } => {
                write!(f, "invalid layout handle {id}@gen{generation}")
            }
            Self::InvalidLayer { id, generation } => {
                write!(f, "invalid layer handle {id}@gen{generation}")
            }
            Self::InvalidData { id, generation } => {
                write!(f, "invalid data handle {id}@gen{generation}")
            }
            Self::NullNode => f.write_str("node handle is null"),
            Self::NullLayout => f.write_str("layout handle is null"),
            Self::CapacityExceeded { limit } => {
                write!(f, "can only have at most {limit} slots")
            }
            Self::ZeroSize { size } => {
                write!(f, "expected a non-zero size, got {}x{}", size.width, size.height)
            }
            Self::SizeNotSet => f.write_str("user interface size wasn't set"),
            Self::BitsetSizeMismatch { expected, actual } => {
                write!(f, "expected id bitset of size {expected}, got {actual}")
            }
            Self::ViewSizeMismatch {
                parents,
                offsets,
                sizes,
            } => write!(
                f,
                "expected node parent, offset and size views to have the same size, \
                 got {parents}, {offsets} and {sizes}"
            ),
            Self::DuplicateLayout { node } => write!(f, "{node:?} already has a layout"),
            Self::LayoutNodeMismatch {
                layout,
                expected,
                actual,
            } => write!(f, "{layout:?} is attached to {actual:?}, not {expected:?}"),
            Self::LayouterTypeMismatch { layouter } => {
                write!(f, "{layouter:?} is not of the requested type")
            }
            Self::FeaturesMismatch {
                layouter,
                reported,
                base,
            } => write!(
                f,
                "{layouter:?} reports features {reported:?} but its base enforces {base:?}"
            ),
            Self::LayerTypeMismatch { layer } => {
                write!(f, "{layer:?} is not of the requested type")
            }
            Self::InstanceAlreadySet { handle } => {
                write!(f, "instance for handle {handle:#06x} already set")
            }
        }
    }
}

impl core::error::Error for Error {}

/// Routes a contract violation to the configured reporting mode.
///
/// With the `strict` feature this panics with the error message. Otherwise
/// the error is handed back for the caller to return.
#[inline]
#[track_caller]
pub(crate) fn violation(error: Error) -> Error {
    #[cfg(feature = "strict")]
    panic!("{error}");
    #[cfg(not(feature = "strict"))]
    error
}
