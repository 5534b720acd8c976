// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runs traced frames over a small snapped node tree.
//!
//! Builds a window with a header, a sidebar and a list of buttons, laid out
//! by a [`SnapLayouter`] and drawn by a [`QuadLayer`]. Each frame resizes the
//! window, and halfway through the buttons are removed. Events go to both a
//! [`PrettyPrintSink`] on stdout and a [`RecorderSink`], which is then
//! exported as a Chrome trace JSON file.

use std::fs::File;
use std::io::BufWriter;

use kurbo::{Insets, Size, Vec2};
use trellis_core::layer::QuadLayer;
use trellis_core::layouter::{SnapLayouter, Snaps};
use trellis_core::trace::{
    FrameSummary, LayerUpdateEvent, LayouterUpdateEvent, NodesCleanedEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, Tracer, ViolationEvent,
};
use trellis_core::ui::{NodeFlags, UserInterface};
use trellis_core::{DataHandle, NodeHandle};

use trellis_debug::pretty::PrettyPrintSink;
use trellis_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 8;
const BUTTON_COUNT: usize = 4;

/// Forwards every event to two sinks.
struct Tee<'a> {
    a: &'a mut dyn TraceSink,
    b: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.a.on_phase_begin(e);
        self.b.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.a.on_phase_end(e);
        self.b.on_phase_end(e);
    }

    fn on_nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
        self.a.on_nodes_cleaned(e);
        self.b.on_nodes_cleaned(e);
    }

    fn on_layouter_update(&mut self, e: &LayouterUpdateEvent) {
        self.a.on_layouter_update(e);
        self.b.on_layouter_update(e);
    }

    fn on_layer_update(&mut self, e: &LayerUpdateEvent) {
        self.a.on_layer_update(e);
        self.b.on_layer_update(e);
    }

    fn on_violation(&mut self, e: &ViolationEvent) {
        self.a.on_violation(e);
        self.b.on_violation(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.a.on_frame_summary(s);
        self.b.on_frame_summary(s);
    }
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- tree --------------------------------------------------------------
    let mut ui = UserInterface::new(Size::new(640.0, 480.0)).expect("non-zero size");
    let node = |ui: &mut UserInterface, parent: NodeHandle, size: Size| {
        ui.create_node(parent, Vec2::ZERO, size, NodeFlags::empty())
            .expect("node capacity")
    };
    let window = node(&mut ui, NodeHandle::NULL, Size::ZERO);
    let header = node(&mut ui, window, Size::new(0.0, 40.0));
    let sidebar = node(&mut ui, window, Size::new(160.0, 0.0));
    let buttons: Vec<NodeHandle> = (0..BUTTON_COUNT)
        .map(|_| node(&mut ui, sidebar, Size::new(0.0, 24.0)))
        .collect();

    let layouter = ui.create_layouter().expect("layouter capacity");
    let snap = ui
        .set_layouter_instance(SnapLayouter::new(layouter))
        .expect("fresh layouter");
    snap.add(window, Snaps::FILL, Insets::ZERO).expect("layout");
    snap.add(header, Snaps::FILL_X | Snaps::TOP, Insets::ZERO)
        .expect("layout");
    snap.add(
        sidebar,
        Snaps::FILL_Y | Snaps::LEFT,
        Insets::new(0.0, 40.0, 0.0, 0.0),
    )
    .expect("layout");
    for (i, &button) in buttons.iter().enumerate() {
        let top = 8.0 + 32.0 * i as f64;
        snap.add(button, Snaps::FILL_X | Snaps::TOP, Insets::new(8.0, top, 8.0, 0.0))
            .expect("layout");
    }

    let layer = ui.create_layer().expect("layer capacity");
    let quads = ui
        .set_layer_instance(QuadLayer::new(layer))
        .expect("fresh layer");
    let header_quad = quads.create(header, Insets::uniform(1.0)).expect("data");
    let mut button_quads: Vec<DataHandle> = buttons
        .iter()
        .map(|&b| quads.create(b, Insets::uniform(2.0)).expect("data"))
        .collect();

    // -- frames ------------------------------------------------------------
    for frame in 0..FRAME_COUNT {
        let width = 640.0 + 40.0 * frame as f64;
        ui.set_size(Size::new(width, 480.0)).expect("non-zero size");

        if frame == FRAME_COUNT / 2 {
            for &button in &buttons[1..] {
                ui.remove_node(button).expect("live node");
            }
            button_quads.truncate(1);
        }

        let mut tee = Tee {
            a: &mut pretty,
            b: &mut recorder,
        };
        ui.update_traced(&mut Tracer::new(&mut tee))
            .expect("well-formed frame");

        let quads = ui.layer::<QuadLayer>(layer).expect("quad layer");
        println!(
            "frame {frame}: header={:?} first button={:?}",
            quads.rect(header_quad).expect("live quad"),
            quads.rect(button_quads[0]).expect("live quad"),
        );
    }

    // -- export Chrome trace -----------------------------------------------
    let path = "frame_trace.json";
    let file = File::create(path).expect("failed to create frame_trace.json");
    let mut writer = BufWriter::new(file);
    trellis_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}
