// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame pipeline.
//!
//! [`UserInterface::update`] runs four phases:
//!
//! 1. **Clean**: if nodes were removed, every layouter and layer drops the
//!    layouts and data attached to them.
//! 2. **Layout**: every layouter with pending work (or all of them, if the
//!    UI itself needs a layout update) gets exactly one
//!    [`Layouter::update`](crate::layouter::Layouter::update) call, in handle
//!    order. The ids to update are all layouts on live, visible nodes; the
//!    top-level ids are those whose node has no laid-out ancestor in the
//!    same layouter. Nodes placed by a layouter are marked in the
//!    [`PLACEMENT`](crate::dirty::PLACEMENT) channel.
//! 3. **Offsets**: the placement channel is drained in dependency order and
//!    each node's absolute offset and effective hidden state is recomputed
//!    from its parent's.
//! 4. **Data**: layers with pending work get their visible data updated with
//!    the absolute offsets.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Vec2;
use understory_dirty::EagerPolicy;

use super::{NodeFlags, UserInterface, UserInterfaceStates};
use crate::dirty;
use crate::error::Error;
use crate::handle::NodeHandle;
use crate::layouter::LayouterBase;
use crate::trace::{
    CleanTarget, FrameSummaryBuilder, LayerUpdateEvent, LayouterUpdateEvent, NodesCleanedEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer, ViolationEvent,
};

impl UserInterface {
    /// Removes layouts and data attached to removed nodes from every
    /// layouter and layer. Returns the number of removed slots.
    ///
    /// Called by [`update`](Self::update) when needed, so calling it
    /// directly is only useful to release memory early.
    pub fn clean(&mut self) -> usize {
        let mut summary = FrameSummaryBuilder::new(self.frame_index);
        self.clean_traced(&mut Tracer::none(), &mut summary);
        summary.finish().cleaned
    }

    /// Runs the frame pipeline.
    ///
    /// # Errors
    ///
    /// Propagates a contract violation reported by a layouter or layer. The
    /// pipeline stops at that point and the pending state is kept.
    pub fn update(&mut self) -> Result<(), Error> {
        self.update_traced(&mut Tracer::none())
    }

    /// Like [`update`](Self::update), emitting trace events to `tracer`.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update). The violation is also reported to
    /// the tracer.
    pub fn update_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<(), Error> {
        let frame_index = self.frame_index;
        let mut summary = FrameSummaryBuilder::new(frame_index);

        let clean_only =
            UserInterfaceStates::NEEDS_NODE_CLEAN.difference(UserInterfaceStates::NEEDS_NODE_UPDATE);
        if self.state.contains(clean_only) {
            phase(tracer, frame_index, PhaseKind::Clean, |tracer| {
                self.clean_traced(tracer, &mut summary);
            });
        }

        let result = phase(tracer, frame_index, PhaseKind::Layout, |tracer| {
            self.layout_traced(tracer, &mut summary)
        });
        if let Err(error) = result {
            tracer.violation(&ViolationEvent { frame_index, error });
            return Err(error);
        }

        phase(tracer, frame_index, PhaseKind::Offsets, |_| {
            let placed = self.place_nodes();
            summary.nodes_placed(placed);
        });

        let result = phase(tracer, frame_index, PhaseKind::Data, |tracer| {
            self.data_traced(tracer, &mut summary)
        });
        if let Err(error) = result {
            tracer.violation(&ViolationEvent { frame_index, error });
            return Err(error);
        }

        self.state = UserInterfaceStates::empty();
        self.frame_index += 1;
        tracer.frame_summary(&summary.finish());
        Ok(())
    }

    fn clean_traced(&mut self, tracer: &mut Tracer<'_>, summary: &mut FrameSummaryBuilder) {
        let generations = self.nodes.generations();
        for i in 0..self.layouters.len() {
            if let Some(layouter) = self.layouters.get_at_mut(i) {
                let e = NodesCleanedEvent {
                    frame_index: self.frame_index,
                    target: CleanTarget::Layouter(layouter.handle()),
                    removed: layouter.clean_nodes(generations),
                };
                tracer.nodes_cleaned(&e);
                summary.nodes_cleaned(&e);
            }
        }
        for i in 0..self.layers.len() {
            if let Some(layer) = self.layers.get_at_mut(i) {
                let e = NodesCleanedEvent {
                    frame_index: self.frame_index,
                    target: CleanTarget::Layer(layer.handle()),
                    removed: layer.clean_nodes(generations),
                };
                tracer.nodes_cleaned(&e);
                summary.nodes_cleaned(&e);
            }
        }
        self.state.remove(
            UserInterfaceStates::NEEDS_NODE_CLEAN.difference(UserInterfaceStates::NEEDS_NODE_UPDATE),
        );
    }

    fn layout_traced(
        &mut self,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) -> Result<(), Error> {
        let needs_layout = self.state.contains(UserInterfaceStates::NEEDS_LAYOUT_UPDATE);
        let hidden = self.hidden_mask();

        for i in 0..self.layouters.len() {
            let Some(layouter) = self.layouters.get_at_mut(i) else {
                continue;
            };
            if !needs_layout && layouter.state().is_empty() {
                continue;
            }

            let (ids, top_level) = layout_ids(
                layouter.base(),
                self.nodes.generations(),
                &self.node_parent,
                &hidden,
            );
            layouter.update(
                &ids,
                &top_level,
                &self.node_parent,
                &mut self.node_offset,
                &mut self.node_size,
            )?;

            let nodes = layouter.base().nodes();
            let mut layouts = 0;
            for (id, _) in ids.iter().enumerate().filter(|(_, f)| **f) {
                self.dirty
                    .mark_with(nodes[id].id(), dirty::PLACEMENT, &EagerPolicy);
                layouts += 1;
            }

            let e = LayouterUpdateEvent {
                frame_index: self.frame_index,
                layouter: layouter.handle(),
                layouts,
                top_level: top_level.len(),
            };
            tracer.layouter_update(&e);
            summary.layouter_update(&e);
        }
        Ok(())
    }

    /// Recomputes absolute offsets and effective hidden state of dirty
    /// nodes, parents first. Returns the number of nodes placed.
    fn place_nodes(&mut self) -> usize {
        let dirty_nodes: Vec<u32> = self
            .dirty
            .drain(dirty::PLACEMENT)
            .affected()
            .deterministic()
            .run()
            .collect();

        let mut placed = 0;
        for &idx in &dirty_nodes {
            if !self.nodes.is_used(idx) {
                continue;
            }
            let i = idx as usize;
            let parent = self.node_parent[i];
            let (parent_offset, parent_hidden) = if parent.is_null() {
                (Vec2::ZERO, false)
            } else {
                let p = parent.id() as usize;
                (self.absolute_offset[p], self.effective_hidden[p])
            };
            self.absolute_offset[i] = parent_offset + self.node_offset[i];
            self.effective_hidden[i] =
                parent_hidden || self.node_flags[i].contains(NodeFlags::HIDDEN);
            placed += 1;
        }
        placed
    }

    fn data_traced(
        &mut self,
        tracer: &mut Tracer<'_>,
        summary: &mut FrameSummaryBuilder,
    ) -> Result<(), Error> {
        let needs_data = self.state.contains(UserInterfaceStates::NEEDS_DATA_UPDATE);

        for i in 0..self.layers.len() {
            let Some(layer) = self.layers.get_at_mut(i) else {
                continue;
            };
            if !needs_data && layer.state().is_empty() {
                continue;
            }

            let ids: Vec<bool> = layer
                .base()
                .nodes()
                .iter()
                .map(|&node| {
                    self.nodes.is_valid(node) && !self.effective_hidden[node.id() as usize]
                })
                .collect();
            layer.update(&ids, &self.absolute_offset, &self.node_size)?;

            let e = LayerUpdateEvent {
                frame_index: self.frame_index,
                layer: layer.handle(),
                data: ids.iter().filter(|&&f| f).count(),
            };
            tracer.layer_update(&e);
            summary.layer_update(&e);
        }
        Ok(())
    }

    /// Hidden state per node id including ancestors, computed from the
    /// current flags.
    fn hidden_mask(&self) -> Vec<bool> {
        let mut hidden = vec![false; self.node_parent.len()];
        for idx in 0..self.node_parent.len() {
            let mut n = idx;
            loop {
                if self.node_flags[n].contains(NodeFlags::HIDDEN) {
                    hidden[idx] = true;
                    break;
                }
                let parent = self.node_parent[n];
                if parent.is_null() {
                    break;
                }
                n = parent.id() as usize;
            }
        }
        hidden
    }
}

/// Brackets `f` with phase begin and end events.
fn phase<R>(
    tracer: &mut Tracer<'_>,
    frame_index: u64,
    phase: PhaseKind,
    f: impl FnOnce(&mut Tracer<'_>) -> R,
) -> R {
    tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
    let result = f(tracer);
    tracer.phase_end(&PhaseEndEvent { frame_index, phase });
    result
}

/// Layout ids to update and top-level layout ids of one layouter.
///
/// A layout is updated if its node is live and visible. It's top-level if
/// no ancestor of its node has an updated layout in the same layouter.
fn layout_ids(
    base: &LayouterBase,
    node_generations: &[u16],
    node_parents: &[NodeHandle],
    hidden: &[bool],
) -> (Vec<bool>, Vec<u32>) {
    let nodes = base.nodes();
    let live = |node: NodeHandle| {
        let i = node.id() as usize;
        !node.is_null()
            && node_generations.get(i) == Some(&node.generation())
            && !hidden[i]
    };

    let ids: Vec<bool> = nodes.iter().map(|&node| live(node)).collect();
    let mut laid_out = vec![false; node_parents.len()];
    for (id, _) in ids.iter().enumerate().filter(|(_, f)| **f) {
        laid_out[nodes[id].id() as usize] = true;
    }

    let mut top_level = Vec::new();
    for (id, _) in ids.iter().enumerate().filter(|(_, f)| **f) {
        let mut parent = node_parents[nodes[id].id() as usize];
        let mut top = true;
        while !parent.is_null() {
            if laid_out[parent.id() as usize] {
                top = false;
                break;
            }
            parent = node_parents[parent.id() as usize];
        }
        if top {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "layout ids fit in 20 bits"
            )]
            let id = id as u32;
            top_level.push(id);
        }
    }
    (ids, top_level)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{Insets, Rect, Size, Vec2};

    use super::*;
    use crate::handle::LayouterHandle;
    use crate::layer::QuadLayer;
    use crate::layouter::{Layouter, LayouterFeatures, SnapLayouter, Snaps};

    fn ui() -> UserInterface {
        UserInterface::new(Size::new(100.0, 50.0)).unwrap()
    }

    fn node(ui: &mut UserInterface, parent: NodeHandle, offset: Vec2, size: Size) -> NodeHandle {
        ui.create_node(parent, offset, size, NodeFlags::empty())
            .unwrap()
    }

    /// Records what the pipeline passes to it.
    struct Spy {
        base: LayouterBase,
        calls: Vec<(Vec<bool>, Vec<u32>)>,
        cleans: usize,
    }

    impl Spy {
        fn new(handle: LayouterHandle) -> Self {
            Self {
                base: LayouterBase::new(handle, LayouterFeatures::empty()),
                calls: Vec::new(),
                cleans: 0,
            }
        }
    }

    impl Layouter for Spy {
        fn base(&self) -> &LayouterBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut LayouterBase {
            &mut self.base
        }

        fn features(&self) -> LayouterFeatures {
            LayouterFeatures::empty()
        }

        fn do_clean(&mut self, _: &[bool]) {
            self.cleans += 1;
        }

        fn do_update(
            &mut self,
            layout_ids_to_update: &[bool],
            top_level_layout_ids: &[u32],
            _: &[NodeHandle],
            _: &mut [Vec2],
            _: &mut [Size],
        ) {
            self.calls
                .push((layout_ids_to_update.to_vec(), top_level_layout_ids.to_vec()));
        }
    }

    fn spy(ui: &mut UserInterface) -> LayouterHandle {
        let handle = ui.create_layouter().unwrap();
        ui.set_layouter_instance(Spy::new(handle)).unwrap();
        handle
    }

    #[test]
    fn absolute_offsets_accumulate_parent_first() {
        let mut ui = ui();
        let a = node(&mut ui, NodeHandle::NULL, Vec2::new(10.0, 5.0), Size::ZERO);
        let b = node(&mut ui, a, Vec2::new(1.0, 2.0), Size::ZERO);
        let c = node(&mut ui, b, Vec2::new(3.0, 3.0), Size::ZERO);
        ui.update().unwrap();

        assert_eq!(ui.node_absolute_offset(c), Ok(Vec2::new(14.0, 10.0)));
        assert_eq!(ui.state(), UserInterfaceStates::empty());

        ui.set_node_offset(a, Vec2::ZERO).unwrap();
        ui.update().unwrap();
        assert_eq!(ui.node_absolute_offset(b), Ok(Vec2::new(1.0, 2.0)));
        assert_eq!(ui.node_absolute_offset(c), Ok(Vec2::new(4.0, 5.0)));
    }

    #[test]
    fn hidden_propagates_to_subtree() {
        let mut ui = ui();
        let a = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        let b = node(&mut ui, a, Vec2::ZERO, Size::ZERO);
        ui.set_node_flags(a, NodeFlags::HIDDEN).unwrap();
        ui.update().unwrap();
        assert_eq!(ui.is_node_effectively_hidden(b), Ok(true));

        ui.set_node_flags(a, NodeFlags::empty()).unwrap();
        ui.update().unwrap();
        assert_eq!(ui.is_node_effectively_hidden(b), Ok(false));
    }

    #[test]
    fn layouter_gets_visible_ids_and_top_level() {
        let mut ui = ui();
        let handle = spy(&mut ui);
        let root = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        let plain = node(&mut ui, root, Vec2::ZERO, Size::ZERO);
        let inner = node(&mut ui, plain, Vec2::ZERO, Size::ZERO);
        let other = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        let hidden = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        ui.set_node_flags(hidden, NodeFlags::HIDDEN).unwrap();

        let spy = ui.layouter_mut::<Spy>(handle).unwrap();
        for n in [inner, root, other, hidden] {
            spy.base_mut().add(n).unwrap();
        }
        ui.update().unwrap();

        let spy = ui.layouter::<Spy>(handle).unwrap();
        assert_eq!(spy.calls.len(), 1);
        assert_eq!(spy.calls[0], (vec![true, true, true, false], vec![1, 2]));
        assert!(spy.state().is_empty());
    }

    #[test]
    fn layouter_runs_only_when_needed() {
        let mut ui = ui();
        let handle = spy(&mut ui);
        ui.update().unwrap();
        assert_eq!(ui.layouter::<Spy>(handle).unwrap().calls.len(), 1);

        // Nothing pending.
        ui.update().unwrap();
        assert_eq!(ui.layouter::<Spy>(handle).unwrap().calls.len(), 1);

        // The layouter itself asks for an update.
        ui.layouter_mut::<Spy>(handle)
            .unwrap()
            .base_mut()
            .set_needs_update();
        assert!(ui.state().contains(UserInterfaceStates::NEEDS_LAYOUT_UPDATE));
        ui.update().unwrap();
        assert_eq!(ui.layouter::<Spy>(handle).unwrap().calls.len(), 2);

        // The UI asks for an update.
        ui.set_size(Size::new(10.0, 10.0)).unwrap();
        ui.update().unwrap();
        assert_eq!(ui.layouter::<Spy>(handle).unwrap().calls.len(), 3);
    }

    #[test]
    fn removed_nodes_are_cleaned_before_layout() {
        let mut ui = ui();
        let handle = spy(&mut ui);
        let a = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        let b = node(&mut ui, a, Vec2::ZERO, Size::ZERO);
        let spy = ui.layouter_mut::<Spy>(handle).unwrap();
        let la = spy.base_mut().add(a).unwrap();
        let lb = spy.base_mut().add(b).unwrap();
        ui.update().unwrap();

        ui.remove_node(a).unwrap();
        assert!(ui.is_layout_valid(la));
        ui.update().unwrap();

        assert!(!ui.is_layout_valid(la));
        assert!(!ui.is_layout_valid(lb));
        let spy = ui.layouter::<Spy>(handle).unwrap();
        assert_eq!(spy.cleans, 1);
        assert_eq!(spy.calls.last(), Some(&(vec![false, false], vec![])));
    }

    #[test]
    fn clean_without_removed_nodes_removes_nothing() {
        let mut ui = ui();
        spy(&mut ui);
        let a = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        ui.update().unwrap();
        assert_eq!(ui.clean(), 0);
        assert!(ui.is_node_valid(a));
    }

    #[test]
    fn snap_layout_feeds_quad_layer() {
        let mut ui = ui();
        let layouter = ui.create_layouter().unwrap();
        ui.set_layouter_instance(SnapLayouter::new(layouter)).unwrap();
        let layer = ui.create_layer().unwrap();
        ui.set_layer_instance(QuadLayer::new(layer)).unwrap();

        let panel = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
        let button = node(&mut ui, panel, Vec2::ZERO, Size::new(20.0, 10.0));
        let snap = ui.layouter_mut::<SnapLayouter>(layouter).unwrap();
        snap.add(panel, Snaps::FILL, Insets::uniform(5.0)).unwrap();
        snap.add(button, Snaps::RIGHT | Snaps::BOTTOM, Insets::ZERO)
            .unwrap();
        let quad = ui
            .layer_mut::<QuadLayer>(layer)
            .unwrap()
            .create(button, Insets::uniform(1.0))
            .unwrap();
        ui.update().unwrap();

        // Panel is 90x40 at (5, 5); button sits in its bottom right corner.
        assert_eq!(ui.node_absolute_offset(button), Ok(Vec2::new(75.0, 35.0)));
        let rect = ui.layer::<QuadLayer>(layer).unwrap().rect(quad);
        assert_eq!(rect, Ok(Rect::new(76.0, 36.0, 94.0, 44.0)));

        // Resizing the UI moves everything along.
        ui.set_size(Size::new(200.0, 100.0)).unwrap();
        ui.update().unwrap();
        assert_eq!(ui.node_absolute_offset(button), Ok(Vec2::new(175.0, 85.0)));
        let rect = ui.layer::<QuadLayer>(layer).unwrap().rect(quad);
        assert_eq!(rect, Ok(Rect::new(176.0, 86.0, 194.0, 94.0)));
    }

    #[test]
    fn hidden_data_keep_previous_output() {
        let mut ui = ui();
        let layer = ui.create_layer().unwrap();
        ui.set_layer_instance(QuadLayer::new(layer)).unwrap();
        let n = node(&mut ui, NodeHandle::NULL, Vec2::new(1.0, 1.0), Size::new(2.0, 2.0));
        let quad = ui
            .layer_mut::<QuadLayer>(layer)
            .unwrap()
            .create(n, Insets::ZERO)
            .unwrap();
        ui.update().unwrap();

        ui.set_node_flags(n, NodeFlags::HIDDEN).unwrap();
        ui.set_node_offset(n, Vec2::new(9.0, 9.0)).unwrap();
        ui.update().unwrap();
        let rect = ui.layer::<QuadLayer>(layer).unwrap().rect(quad);
        assert_eq!(rect, Ok(Rect::new(1.0, 1.0, 3.0, 3.0)));
    }

    #[cfg(feature = "trace")]
    mod traced {
        use super::*;
        use crate::trace::{FrameSummary, TraceSink};

        #[derive(Default)]
        struct Counter {
            phases: Vec<PhaseKind>,
            cleaned: usize,
            summaries: Vec<FrameSummary>,
        }

        impl TraceSink for Counter {
            fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
                self.phases.push(e.phase);
            }

            fn on_nodes_cleaned(&mut self, e: &NodesCleanedEvent) {
                self.cleaned += e.removed;
            }

            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.summaries.push(*s);
            }
        }

        #[test]
        fn update_reports_phases_and_summary() {
            let mut ui = ui();
            let handle = spy(&mut ui);
            let a = node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);
            ui.layouter_mut::<Spy>(handle)
                .unwrap()
                .base_mut()
                .add(a)
                .unwrap();
            ui.update().unwrap();
            ui.remove_node(a).unwrap();

            let mut sink = Counter::default();
            ui.update_traced(&mut Tracer::new(&mut sink)).unwrap();
            assert_eq!(
                sink.phases,
                [
                    PhaseKind::Clean,
                    PhaseKind::Layout,
                    PhaseKind::Offsets,
                    PhaseKind::Data
                ]
            );
            assert_eq!(sink.cleaned, 1);
            assert_eq!(sink.summaries.len(), 1);
            assert_eq!(sink.summaries[0].frame_index, 1);
            assert_eq!(sink.summaries[0].layouters_updated, 1);
            assert_eq!(ui.frame_index(), 2);
        }

        #[test]
        fn clean_phase_is_skipped_without_removals() {
            let mut ui = ui();
            node(&mut ui, NodeHandle::NULL, Vec2::ZERO, Size::ZERO);

            let mut sink = Counter::default();
            ui.update_traced(&mut Tracer::new(&mut sink)).unwrap();
            assert_eq!(sink.phases.first(), Some(&PhaseKind::Layout));
            assert_eq!(sink.summaries[0].nodes_placed, 1);
        }
    }
}
