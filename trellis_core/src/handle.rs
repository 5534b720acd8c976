// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handle types and their bit-packing.
//!
//! Every handle packs a slot index (the *id*) into its low bits and a
//! generation counter into the bits above it. A handle with all bits zero is
//! the null handle of its kind. Generations start at `1`, so a live handle is
//! never null.
//!
//! | Handle                 | Repr  | Id bits | Generation bits |
//! |------------------------|-------|---------|-----------------|
//! | [`NodeHandle`]         | `u32` | 20      | 12              |
//! | [`LayouterHandle`]     | `u16` | 8       | 8               |
//! | [`LayouterDataHandle`] | `u32` | 20      | 12              |
//! | [`LayerHandle`]        | `u16` | 8       | 8               |
//! | [`LayerDataHandle`]    | `u32` | 20      | 12              |
//!
//! [`LayoutHandle`] and [`DataHandle`] are composites: a data handle in the
//! low 32 bits and the handle of the owning layouter or layer in bits 32..48.
//!
//! Encoding is total and unchecked. Values wider than the declared bit widths
//! are truncated; staying within capacity is the caller's job.

use core::fmt;

/// Number of id bits in a [`NodeHandle`].
pub const NODE_HANDLE_ID_BITS: u32 = 20;
/// Number of generation bits in a [`NodeHandle`].
pub const NODE_HANDLE_GENERATION_BITS: u32 = 12;
/// Number of id bits in a [`LayouterHandle`].
pub const LAYOUTER_HANDLE_ID_BITS: u32 = 8;
/// Number of generation bits in a [`LayouterHandle`].
pub const LAYOUTER_HANDLE_GENERATION_BITS: u32 = 8;
/// Number of id bits in a [`LayouterDataHandle`].
pub const LAYOUTER_DATA_HANDLE_ID_BITS: u32 = 20;
/// Number of generation bits in a [`LayouterDataHandle`].
pub const LAYOUTER_DATA_HANDLE_GENERATION_BITS: u32 = 12;
/// Number of id bits in a [`LayerHandle`].
pub const LAYER_HANDLE_ID_BITS: u32 = 8;
/// Number of generation bits in a [`LayerHandle`].
pub const LAYER_HANDLE_GENERATION_BITS: u32 = 8;
/// Number of id bits in a [`LayerDataHandle`].
pub const LAYER_DATA_HANDLE_ID_BITS: u32 = 20;
/// Number of generation bits in a [`LayerDataHandle`].
pub const LAYER_DATA_HANDLE_GENERATION_BITS: u32 = 12;

const fn mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// A handle made of an id and a generation, usable as a slot key.
///
/// Implemented by every non-composite handle. [`SlotArena`](crate::arena::SlotArena)
/// is generic over it, so layouters and layers share one allocator.
pub trait SlotHandle: Copy + Eq + fmt::Debug {
    /// Number of bits used by the id.
    const ID_BITS: u32;
    /// Number of bits used by the generation.
    const GENERATION_BITS: u32;
    /// The null handle.
    const NULL: Self;

    /// Packs an id and a generation into a handle.
    fn from_parts(id: u32, generation: u16) -> Self;

    /// Returns the id part.
    fn id(self) -> u32;

    /// Returns the generation part.
    fn generation(self) -> u16;

    /// Maximum number of slots addressable by this handle kind.
    #[inline]
    #[must_use]
    fn capacity_limit() -> usize {
        1 << Self::ID_BITS
    }
}

macro_rules! slot_handle {
    (
        $(#[$meta:meta])*
        $name:ident($repr:ty), $id_bits:expr, $generation_bits:expr
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($repr);

        impl $name {
            /// The null handle.
            pub const NULL: Self = Self(0);

            /// Packs an id and a generation into a handle.
            #[inline]
            #[must_use]
            #[allow(
                trivial_numeric_casts,
                clippy::cast_possible_truncation,
                reason = "both parts are masked to fit the representation"
            )]
            pub const fn new(id: u32, generation: u16) -> Self {
                let id = id & mask($id_bits);
                let generation = (generation as u32) & mask($generation_bits);
                Self((id | (generation << $id_bits)) as $repr)
            }

            /// Returns the id (slot index) part.
            #[inline]
            #[must_use]
            #[allow(trivial_numeric_casts, reason = "the representation may already be u32")]
            pub const fn id(self) -> u32 {
                (self.0 as u32) & mask($id_bits)
            }

            /// Returns the generation part.
            #[inline]
            #[must_use]
            #[allow(
                trivial_numeric_casts,
                clippy::cast_possible_truncation,
                reason = "the generation is masked to at most 12 bits"
            )]
            pub const fn generation(self) -> u16 {
                (((self.0 as u32) >> $id_bits) & mask($generation_bits)) as u16
            }

            /// Returns the raw bits.
            #[inline]
            #[must_use]
            pub const fn bits(self) -> $repr {
                self.0
            }

            /// Creates a handle from raw bits.
            #[inline]
            #[must_use]
            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// Whether this is the null handle.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl SlotHandle for $name {
            const ID_BITS: u32 = $id_bits;
            const GENERATION_BITS: u32 = $generation_bits;
            const NULL: Self = Self(0);

            #[inline]
            fn from_parts(id: u32, generation: u16) -> Self {
                $name::new(id, generation)
            }

            #[inline]
            fn id(self) -> u32 {
                $name::id(self)
            }

            #[inline]
            fn generation(self) -> u16 {
                $name::generation(self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_null() {
                    write!(f, "{}::NULL", stringify!($name))
                } else {
                    write!(
                        f,
                        "{}({}@gen{})",
                        stringify!($name),
                        self.id(),
                        self.generation()
                    )
                }
            }
        }
    };
}

slot_handle!(
    /// A handle to a node in a [`UserInterface`](crate::ui::UserInterface).
    NodeHandle(u32),
    NODE_HANDLE_ID_BITS,
    NODE_HANDLE_GENERATION_BITS
);

slot_handle!(
    /// The identity of a layouter instance inside a user interface.
    LayouterHandle(u16),
    LAYOUTER_HANDLE_ID_BITS,
    LAYOUTER_HANDLE_GENERATION_BITS
);

slot_handle!(
    /// A layout slot inside one layouter, without the layouter identity.
    LayouterDataHandle(u32),
    LAYOUTER_DATA_HANDLE_ID_BITS,
    LAYOUTER_DATA_HANDLE_GENERATION_BITS
);

slot_handle!(
    /// The identity of a data layer instance inside a user interface.
    LayerHandle(u16),
    LAYER_HANDLE_ID_BITS,
    LAYER_HANDLE_GENERATION_BITS
);

slot_handle!(
    /// A data slot inside one layer, without the layer identity.
    LayerDataHandle(u32),
    LAYER_DATA_HANDLE_ID_BITS,
    LAYER_DATA_HANDLE_GENERATION_BITS
);

/// A layout handle: a [`LayouterDataHandle`] tagged with its owning
/// [`LayouterHandle`].
///
/// Valid only while both the layouter identity and the slot generation match.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutHandle(u64);

impl LayoutHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Combines a layouter handle and a layouter data handle.
    #[inline]
    #[must_use]
    pub const fn new(layouter: LayouterHandle, data: LayouterDataHandle) -> Self {
        Self(((layouter.bits() as u64) << 32) | data.bits() as u64)
    }

    /// Returns the layouter part.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bits 32..48 hold exactly a u16 layouter handle"
    )]
    pub const fn layouter(self) -> LayouterHandle {
        LayouterHandle::from_bits((self.0 >> 32) as u16)
    }

    /// Returns the layouter data part.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the low 32 bits hold the data handle"
    )]
    pub const fn data(self) -> LayouterDataHandle {
        LayouterDataHandle::from_bits(self.0 as u32)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for LayoutHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("LayoutHandle::NULL");
        }
        let layouter = self.layouter();
        let data = self.data();
        write!(
            f,
            "LayoutHandle({}@gen{}, {}@gen{})",
            layouter.id(),
            layouter.generation(),
            data.id(),
            data.generation()
        )
    }
}

/// A data handle: a [`LayerDataHandle`] tagged with its owning [`LayerHandle`].
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataHandle(u64);

impl DataHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Combines a layer handle and a layer data handle.
    #[inline]
    #[must_use]
    pub const fn new(layer: LayerHandle, data: LayerDataHandle) -> Self {
        Self(((layer.bits() as u64) << 32) | data.bits() as u64)
    }

    /// Returns the layer part.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bits 32..48 hold exactly a u16 layer handle"
    )]
    pub const fn layer(self) -> LayerHandle {
        LayerHandle::from_bits((self.0 >> 32) as u16)
    }

    /// Returns the layer data part.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the low 32 bits hold the data handle"
    )]
    pub const fn data(self) -> LayerDataHandle {
        LayerDataHandle::from_bits(self.0 as u32)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("DataHandle::NULL");
        }
        let layer = self.layer();
        let data = self.data();
        write!(
            f,
            "DataHandle({}@gen{}, {}@gen{})",
            layer.id(),
            layer.generation(),
            data.id(),
            data.generation()
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn node_handle_packs_id_and_generation() {
        let h = NodeHandle::new(0xabcde, 0x123);
        assert_eq!(h.id(), 0xabcde);
        assert_eq!(h.generation(), 0x123);
        assert_eq!(h.bits(), 0x123a_bcde);
    }

    #[test]
    fn out_of_range_parts_are_truncated() {
        let h = LayouterHandle::new(0x1ff, 0x1ff);
        assert_eq!(h.id(), 0xff);
        assert_eq!(h.generation(), 0xff);

        let h = LayouterDataHandle::new(1 << 20, 1 << 12);
        assert!(h.is_null());
    }

    #[test]
    fn null_handles() {
        assert!(NodeHandle::NULL.is_null());
        assert!(LayoutHandle::NULL.is_null());
        assert!(DataHandle::NULL.is_null());
        assert!(!NodeHandle::new(0, 1).is_null());
        assert_eq!(<LayerDataHandle as SlotHandle>::NULL, LayerDataHandle::NULL);
    }

    #[test]
    fn layout_handle_embeds_layouter() {
        let layouter = LayouterHandle::new(3, 7);
        let data = LayouterDataHandle::new(12345, 4000);
        let layout = LayoutHandle::new(layouter, data);
        assert_eq!(layout.layouter(), layouter);
        assert_eq!(layout.data(), data);
        assert_eq!(layout.bits() >> 48, 0);
    }

    #[test]
    fn data_handle_embeds_layer() {
        let layer = LayerHandle::new(255, 255);
        let data = LayerDataHandle::new(0xfffff, 0xfff);
        let handle = DataHandle::new(layer, data);
        assert_eq!(handle.layer(), layer);
        assert_eq!(handle.data(), data);
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", NodeHandle::new(3, 1)), "NodeHandle(3@gen1)");
        assert_eq!(format!("{:?}", NodeHandle::NULL), "NodeHandle::NULL");
        assert_eq!(
            format!(
                "{:?}",
                LayoutHandle::new(LayouterHandle::new(1, 2), LayouterDataHandle::new(3, 4))
            ),
            "LayoutHandle(1@gen2, 3@gen4)"
        );
    }

    #[test]
    fn capacity_limit_follows_id_bits() {
        assert_eq!(LayouterDataHandle::capacity_limit(), 1 << 20);
        assert_eq!(LayouterHandle::capacity_limit(), 256);
    }
}
