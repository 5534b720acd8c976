// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Phase end
//! lines include the wall-clock time spent in the phase.

use std::io::Write;
use std::time::Instant;

use trellis_core::trace::{
    CleanTarget, FrameSummary, LayerUpdateEvent, LayouterUpdateEvent, NodesCleanedEvent,
    PhaseBeginEvent, PhaseEndEvent, TraceSink, ViolationEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    phase_start: Option<Instant>,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("phase_start", &self.phase_start)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            phase_start: None,
        }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.phase_start = Some(Instant::now());
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let us = self
            .phase_start
            .take()
            .map_or(0.0, |t| t.elapsed().as_secs_f64() * 1e6);
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} took {us:.1}µs",
            e.frame_index,
            e.phase.name(),
        );
    }

    fn on_nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        let target = match e.target {
            CleanTarget::Layouter(h) => format!("{h:?}"),
            CleanTarget::Layer(h) => format!("{h:?}"),
        };
        let _ = writeln!(
            self.writer,
            "[clean] frame={} {target} removed={}",
            e.frame_index, e.removed,
        );
    }

    fn on_layouter_update(&mut self, e: &LayouterUpdateEvent) {
        let _ = writeln!(
            self.writer,
            "[layouter] frame={} {:?} layouts={} top_level={}",
            e.frame_index, e.layouter, e.layouts, e.top_level,
        );
    }

    fn on_layer_update(&mut self, e: &LayerUpdateEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] frame={} {:?} data={}",
            e.frame_index, e.layer, e.data,
        );
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        let _ = writeln!(
            self.writer,
            "[violation] frame={} {}",
            e.frame_index, e.error,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} cleaned={} layouters={} layouts={} \
             placed={} layers={} data={}",
            s.frame_index,
            s.cleaned,
            s.layouters_updated,
            s.layouts_updated,
            s.nodes_placed,
            s.layers_updated,
            s.data_updated,
        );
    }
}
