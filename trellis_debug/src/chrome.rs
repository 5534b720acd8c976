// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use trellis_core::trace::CleanTarget;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration events, everything else instant events.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = record.timestamp as f64 / 1000.0;
        let event = match record.event {
            RecordedEvent::PhaseBegin(e) => json!({
                "ph": "B",
                "name": e.phase.name(),
                "cat": "Frame",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::PhaseEnd(e) => json!({
                "ph": "E",
                "name": e.phase.name(),
                "cat": "Frame",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::NodesCleaned(e) => {
                let (kind, id) = match e.target {
                    CleanTarget::Layouter(h) => ("layouter", h.id()),
                    CleanTarget::Layer(h) => ("layer", h.id()),
                };
                json!({
                    "ph": "i",
                    "name": "NodesCleaned",
                    "cat": "Clean",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        kind: id,
                        "removed": e.removed,
                    }
                })
            }
            RecordedEvent::LayouterUpdate(e) => json!({
                "ph": "i",
                "name": "LayouterUpdate",
                "cat": "Layout",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame_index": e.frame_index,
                    "layouter": e.layouter.id(),
                    "layouts": e.layouts,
                    "top_level": e.top_level,
                }
            }),
            RecordedEvent::LayerUpdate(e) => json!({
                "ph": "i",
                "name": "LayerUpdate",
                "cat": "Data",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame_index": e.frame_index,
                    "layer": e.layer.id(),
                    "data": e.data,
                }
            }),
            RecordedEvent::Violation {
                frame_index,
                message,
            } => json!({
                "ph": "i",
                "name": "Violation",
                "cat": "Error",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": frame_index,
                    "message": message,
                }
            }),
            RecordedEvent::FrameSummary(s) => json!({
                "ph": "i",
                "name": "FrameSummary",
                "cat": "Summary",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": s.frame_index,
                    "cleaned": s.cleaned,
                    "layouters_updated": s.layouters_updated,
                    "layouts_updated": s.layouts_updated,
                    "nodes_placed": s.nodes_placed,
                    "layers_updated": s.layers_updated,
                    "data_updated": s.data_updated,
                }
            }),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use trellis_core::LayerHandle;
    use trellis_core::trace::{
        NodesCleanedEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
    };

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Clean,
        });
        rec.on_nodes_cleaned(&NodesCleanedEvent {
            frame_index: 0,
            target: CleanTarget::Layer(LayerHandle::new(2, 1)),
            removed: 3,
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Clean,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "clean");

        assert_eq!(parsed[1]["ph"], "i");
        assert_eq!(parsed[1]["args"]["layer"], 2);
        assert_eq!(parsed[1]["args"]["removed"], 3);

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["name"], "clean");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
