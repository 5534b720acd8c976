// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the update pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`UserInterface::update_traced`](crate::ui::UserInterface::update_traced)
//! calls at each stage. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects per-phase counts during an update and
//! produces a [`FrameSummary`] at the end.
//!
//! The core crate has no clock, so events carry no timestamps. Sinks that
//! want durations stamp events on arrival.

use crate::error::Error;
use crate::handle::{LayerHandle, LayouterHandle};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the update pipeline is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Removing layouts and data attached to removed nodes.
    Clean,
    /// Running layouters.
    Layout,
    /// Recomputing absolute node offsets.
    Offsets,
    /// Updating layer data.
    Data,
}

impl PhaseKind {
    /// Lowercase name, for printing.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Layout => "layout",
            Self::Offsets => "offsets",
            Self::Data => "data",
        }
    }
}

/// The owner of the slots removed by a clean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CleanTarget {
    /// Layouts of a layouter.
    Layouter(LayouterHandle),
    /// Data of a layer.
    Layer(LayerHandle),
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Update counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Update counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted for every layouter and layer visited by the clean phase.
#[derive(Clone, Copy, Debug)]
pub struct NodesCleanedEvent {
    /// Update counter.
    pub frame_index: u64,
    /// Whose slots were cleaned.
    pub target: CleanTarget,
    /// Number of slots removed.
    pub removed: usize,
}

/// Emitted after a layouter's update ran.
#[derive(Clone, Copy, Debug)]
pub struct LayouterUpdateEvent {
    /// Update counter.
    pub frame_index: u64,
    /// The layouter.
    pub layouter: LayouterHandle,
    /// Number of layouts flagged for update.
    pub layouts: usize,
    /// Number of top-level layouts among them.
    pub top_level: usize,
}

/// Emitted after a layer's update ran.
#[derive(Clone, Copy, Debug)]
pub struct LayerUpdateEvent {
    /// Update counter.
    pub frame_index: u64,
    /// The layer.
    pub layer: LayerHandle,
    /// Number of data flagged for update.
    pub data: usize,
}

/// Emitted when the pipeline aborts on a contract violation.
#[derive(Clone, Copy, Debug)]
pub struct ViolationEvent {
    /// Update counter.
    pub frame_index: u64,
    /// The violation.
    pub error: Error,
}

/// Per-update summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Update counter.
    pub frame_index: u64,
    /// Layouts and data removed by the clean phase.
    pub cleaned: usize,
    /// Layouters whose update ran.
    pub layouters_updated: usize,
    /// Layouts passed to layouter updates.
    pub layouts_updated: usize,
    /// Nodes whose absolute offset was recomputed.
    pub nodes_placed: usize,
    /// Layers whose update ran.
    pub layers_updated: usize,
    /// Data passed to layer updates.
    pub data_updated: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the update pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of a pipeline phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pipeline phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called for every layouter and layer visited by the clean phase.
    fn on_nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        _ = e;
    }

    /// Called after a layouter's update ran.
    fn on_layouter_update(&mut self, e: &LayouterUpdateEvent) {
        _ = e;
    }

    /// Called after a layer's update ran.
    fn on_layer_update(&mut self, e: &LayerUpdateEvent) {
        _ = e;
    }

    /// Called when the pipeline aborts on a contract violation.
    fn on_violation(&mut self, e: &ViolationEvent) {
        _ = e;
    }

    /// Called with a per-update summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NodesCleanedEvent`].
    #[inline]
    pub fn nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_nodes_cleaned(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayouterUpdateEvent`].
    #[inline]
    pub fn layouter_update(&mut self, e: &LayouterUpdateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layouter_update(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayerUpdateEvent`].
    #[inline]
    pub fn layer_update(&mut self, e: &LayerUpdateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_update(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ViolationEvent`].
    #[inline]
    pub fn violation(&mut self, e: &ViolationEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_violation(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates per-phase counts during an update and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    summary: FrameSummary,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given update.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            summary: FrameSummary {
                frame_index,
                ..FrameSummary::default()
            },
        }
    }

    /// Records a clean of one layouter or layer.
    pub fn nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        self.summary.cleaned += e.removed;
    }

    /// Records a layouter update.
    pub fn layouter_update(&mut self, e: &LayouterUpdateEvent) {
        self.summary.layouters_updated += 1;
        self.summary.layouts_updated += e.layouts;
    }

    /// Records the number of nodes placed in the offsets phase.
    pub fn nodes_placed(&mut self, count: usize) {
        self.summary.nodes_placed += count;
    }

    /// Records a layer update.
    pub fn layer_update(&mut self, e: &LayerUpdateEvent) {
        self.summary.layers_updated += 1;
        self.summary.data_updated += e.data;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn layouter_event(layouts: usize) -> LayouterUpdateEvent {
        LayouterUpdateEvent {
            frame_index: 3,
            layouter: LayouterHandle::new(0, 1),
            layouts,
            top_level: 1,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Clean,
        });
        sink.on_layouter_update(&layouter_event(2));
        sink.on_frame_summary(&FrameSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Layout,
        });
        tracer.violation(&ViolationEvent {
            frame_index: 0,
            error: Error::SizeNotSet,
        });
    }

    #[test]
    fn phase_names() {
        assert_eq!(PhaseKind::Clean.name(), "clean");
        assert_eq!(PhaseKind::Offsets.name(), "offsets");
    }

    #[test]
    fn summary_builder_accumulates() {
        let mut builder = FrameSummaryBuilder::new(3);
        builder.nodes_cleaned(&NodesCleanedEvent {
            frame_index: 3,
            target: CleanTarget::Layouter(LayouterHandle::new(0, 1)),
            removed: 2,
        });
        builder.nodes_cleaned(&NodesCleanedEvent {
            frame_index: 3,
            target: CleanTarget::Layer(LayerHandle::new(0, 1)),
            removed: 1,
        });
        builder.layouter_update(&layouter_event(4));
        builder.layouter_update(&layouter_event(1));
        builder.nodes_placed(6);
        builder.layer_update(&LayerUpdateEvent {
            frame_index: 3,
            layer: LayerHandle::new(0, 1),
            data: 5,
        });

        let summary = builder.finish();
        assert_eq!(
            summary,
            FrameSummary {
                frame_index: 3,
                cleaned: 3,
                layouters_updated: 2,
                layouts_updated: 5,
                nodes_placed: 6,
                layers_updated: 1,
                data_updated: 5,
            }
        );
    }

    #[test]
    fn summary_builder_empty_is_zero() {
        let summary = FrameSummaryBuilder::new(9).finish();
        assert_eq!(summary.frame_index, 9);
        assert_eq!(summary.layouts_updated, 0);
        assert_eq!(summary.nodes_placed, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            layouts: Vec<usize>,
        }
        impl TraceSink for RecordingSink {
            fn on_layouter_update(&mut self, e: &LayouterUpdateEvent) {
                self.layouts.push(e.layouts);
            }
        }

        let mut sink = RecordingSink {
            layouts: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.layouter_update(&layouter_event(7));
        drop(tracer);
        assert_eq!(sink.layouts, &[7]);
    }
}
