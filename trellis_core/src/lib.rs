// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree, layouters and layers for retained-mode user interfaces.
//!
//! `trellis_core` keeps a tree of nodes (offset, size, flags) and lets
//! pluggable *layouters* assign node offsets and sizes, and pluggable
//! *layers* attach data that consumes the result. It is `no_std` compatible
//! (with `alloc`). All identities are packed generational handles, so stale
//! references are detected instead of aliasing recycled slots.
//!
//! # Architecture
//!
//! Every frame the host runs one pass of the pipeline:
//!
//! ```text
//!   UserInterface::set_size ──► Layouter::set_size (each)
//!                                      │
//!   UserInterface::update              ▼
//!       │
//!       ├─► clean   ──► Layouter::clean_nodes / Layer::clean_nodes
//!       ├─► layout  ──► Layouter::update ──► node offsets and sizes
//!       ├─► offsets ──► absolute offsets (dirty tracker, parents first)
//!       └─► data    ──► Layer::update
//! ```
//!
//! **[`handle`]**: bit-packed handles and their encode/decode functions.
//!
//! **[`arena`]**: [`SlotArena`](arena::SlotArena), the generation-counted
//! slot allocator with a FIFO free list shared by layouters and layers.
//!
//! **[`layouter`]**: [`LayouterBase`](layouter::LayouterBase) state machine
//! and the [`Layouter`](layouter::Layouter) trait, plus the built-in
//! [`SnapLayouter`](layouter::SnapLayouter).
//!
//! **[`layer`]**: the same for per-node data, with the built-in
//! [`QuadLayer`](layer::QuadLayer).
//!
//! **[`ui`]**: [`UserInterface`], owning the node tree and the layouter and
//! layer registries, and driving the pipeline.
//!
//! **[`anchor`]**: [`Anchor`], a checked `(node, layout)` pair bound to its
//! interface.
//!
//! **[`dirty`]**: dirty-tracking channels via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! pipeline instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `strict` (disabled by default): Contract violations panic instead of
//!   returning an [`Error`].

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod anchor;
pub mod arena;
pub mod dirty;
pub mod error;
pub mod handle;
pub mod layer;
pub mod layouter;
pub mod trace;
pub mod ui;

pub use anchor::Anchor;
pub use error::Error;
pub use handle::{
    DataHandle, LayerDataHandle, LayerHandle, LayoutHandle, LayouterDataHandle, LayouterHandle,
    NodeHandle, SlotHandle,
};
pub use ui::UserInterface;
