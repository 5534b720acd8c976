// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Pipeline events carry no time of
//! their own, so every record is stamped with the nanoseconds elapsed since
//! the recorder was created. [`decode`] reads them back as an iterator of
//! [`Record`].
//!
//! Violations store the error's display text.

use std::time::Instant;

use trellis_core::trace::{
    CleanTarget, FrameSummary, LayerUpdateEvent, LayouterUpdateEvent, NodesCleanedEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, ViolationEvent,
};
use trellis_core::{LayerHandle, LayouterHandle};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PHASE_BEGIN: u8 = 1;
const TAG_PHASE_END: u8 = 2;
const TAG_NODES_CLEANED: u8 = 3;
const TAG_LAYOUTER_UPDATE: u8 = 4;
const TAG_LAYER_UPDATE: u8 = 5;
const TAG_VIOLATION: u8 = 6;
const TAG_FRAME_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    start: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    /// Writes the tag and the timestamp that start every record.
    fn begin(&mut self, tag: u8) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "u64 nanoseconds cover centuries of recording"
        )]
        let elapsed = self.start.elapsed().as_nanos() as u64;
        self.write_u8(tag);
        self.write_u64(elapsed);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "counts capped at u32::MAX for recording"
        )]
        let v = v.min(u32::MAX as usize) as u32;
        self.write_u32(v);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Clean => 0,
            PhaseKind::Layout => 1,
            PhaseKind::Offsets => 2,
            PhaseKind::Data => 3,
        });
    }

    fn write_target(&mut self, t: CleanTarget) {
        match t {
            CleanTarget::Layouter(h) => {
                self.write_u8(0);
                self.write_u16(h.bits());
            }
            CleanTarget::Layer(h) => {
                self.write_u8(1);
                self.write_u16(h.bits());
            }
        }
    }

    fn write_str(&mut self, s: &str) {
        self.write_count(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }
}

impl TraceSink for RecorderSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        self.begin(TAG_NODES_CLEANED);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
        self.write_count(e.removed);
    }

    fn on_layouter_update(&mut self, e: &LayouterUpdateEvent) {
        self.begin(TAG_LAYOUTER_UPDATE);
        self.write_u64(e.frame_index);
        self.write_u16(e.layouter.bits());
        self.write_count(e.layouts);
        self.write_count(e.top_level);
    }

    fn on_layer_update(&mut self, e: &LayerUpdateEvent) {
        self.begin(TAG_LAYER_UPDATE);
        self.write_u64(e.frame_index);
        self.write_u16(e.layer.bits());
        self.write_count(e.data);
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        self.begin(TAG_VIOLATION);
        self.write_u64(e.frame_index);
        self.write_str(&e.error.to_string());
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.begin(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_count(s.cleaned);
        self.write_count(s.layouters_updated);
        self.write_count(s.layouts_updated);
        self.write_count(s.nodes_placed);
        self.write_count(s.layers_updated);
        self.write_count(s.data_updated);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`NodesCleanedEvent`].
    NodesCleaned(NodesCleanedEvent),
    /// A [`LayouterUpdateEvent`].
    LayouterUpdate(LayouterUpdateEvent),
    /// A [`LayerUpdateEvent`].
    LayerUpdate(LayerUpdateEvent),
    /// A [`ViolationEvent`], with the error as text.
    Violation {
        /// Frame counter.
        frame_index: u64,
        /// Display text of the error.
        message: String,
    },
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// A decoded event and the time it was recorded at.
#[derive(Clone, Debug)]
pub struct Record {
    /// Nanoseconds since the recorder was created.
    pub timestamp: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let bytes = self.data.get(self.pos..self.pos.checked_add(n)?)?;
        self.pos += n;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes(self.take(2)?.try_into().ok()?))
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|v| v as usize)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Clean,
            1 => PhaseKind::Layout,
            2 => PhaseKind::Offsets,
            _ => PhaseKind::Data,
        })
    }

    fn read_target(&mut self) -> Option<CleanTarget> {
        let kind = self.read_u8()?;
        let bits = self.read_u16()?;
        Some(if kind == 0 {
            CleanTarget::Layouter(LayouterHandle::from_bits(bits))
        } else {
            CleanTarget::Layer(LayerHandle::from_bits(bits))
        })
    }

    fn read_str(&mut self) -> Option<String> {
        let len = self.read_count()?;
        let bytes = self.take(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin(PhaseBeginEvent {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
            }),
            TAG_PHASE_END => RecordedEvent::PhaseEnd(PhaseEndEvent {
                frame_index: self.read_u64()?,
                phase: self.read_phase()?,
            }),
            TAG_NODES_CLEANED => RecordedEvent::NodesCleaned(NodesCleanedEvent {
                frame_index: self.read_u64()?,
                target: self.read_target()?,
                removed: self.read_count()?,
            }),
            TAG_LAYOUTER_UPDATE => RecordedEvent::LayouterUpdate(LayouterUpdateEvent {
                frame_index: self.read_u64()?,
                layouter: LayouterHandle::from_bits(self.read_u16()?),
                layouts: self.read_count()?,
                top_level: self.read_count()?,
            }),
            TAG_LAYER_UPDATE => RecordedEvent::LayerUpdate(LayerUpdateEvent {
                frame_index: self.read_u64()?,
                layer: LayerHandle::from_bits(self.read_u16()?),
                data: self.read_count()?,
            }),
            TAG_VIOLATION => RecordedEvent::Violation {
                frame_index: self.read_u64()?,
                message: self.read_str()?,
            },
            TAG_FRAME_SUMMARY => RecordedEvent::FrameSummary(FrameSummary {
                frame_index: self.read_u64()?,
                cleaned: self.read_count()?,
                layouters_updated: self.read_count()?,
                layouts_updated: self.read_count()?,
                nodes_placed: self.read_count()?,
                layers_updated: self.read_count()?,
                data_updated: self.read_count()?,
            }),
            _ => return None, // unknown tag, stop iteration
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let timestamp = self.read_u64()?;
        let event = self.decode_event(tag)?;
        Some(Record { timestamp, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
