#![forbid(unsafe_code)]

//! Property tests for the binding against the headless surface.
//!
//! 1. Each batch ends in exactly one surface call: a full reload or one
//!    `apply_batch`.
//! 2. With a configure callback installed, the surface never sees a
//!    reload-items step, and only visible cells are configured.
//! 3. The binding is idle again after every batch with immediate completion.

use std::cell::Cell;
use std::rc::Rc;

use listdelta_core::{ChangeEvent, ItemIndex, Phase, StepKind, deliver_batch};
use listdelta_surface::{HeadlessCell, HeadlessSurface, SurfaceBinding, SurfaceOp};
use proptest::prelude::*;

fn index_strategy() -> impl Strategy<Value = ItemIndex> {
    (0usize..3, 0usize..5).prop_map(|(s, i)| ItemIndex::new(s, i))
}

fn event_strategy() -> impl Strategy<Value = ChangeEvent> {
    prop_oneof![
        1 => Just(ChangeEvent::ReloadRequested),
        1 => (0usize..3).prop_map(|section| ChangeEvent::SectionDeleted { section }),
        2 => (0usize..3).prop_map(|section| ChangeEvent::SectionInserted { section }),
        2 => (0usize..3).prop_map(|section| ChangeEvent::SectionUpdated { section }),
        4 => index_strategy().prop_map(|index| ChangeEvent::ItemInserted { index }),
        4 => index_strategy().prop_map(|index| ChangeEvent::ItemDeleted { index }),
        6 => index_strategy().prop_map(|index| ChangeEvent::ItemUpdated { index }),
        3 => (index_strategy(), index_strategy())
            .prop_map(|(from, to)| ChangeEvent::ItemMoved { from, to }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn one_surface_call_per_batch(
        batches in prop::collection::vec(prop::collection::vec(event_strategy(), 0..15), 1..6),
    ) {
        let mut binding = SurfaceBinding::builder(HeadlessSurface::new()).build();
        for events in &batches {
            let reloads = binding.surface().reload_count();
            let applied = binding.surface().batches_applied();
            deliver_batch(&mut binding, events.iter().copied());
            let delta = (binding.surface().reload_count() - reloads)
                + (binding.surface().batches_applied() - applied);
            prop_assert_eq!(delta, 1);
            prop_assert_eq!(binding.aggregator().phase(), Phase::Idle);
        }
    }

    #[test]
    fn configure_mode_never_reloads_items(
        visible in prop::collection::btree_set(index_strategy(), 0..8),
        events in prop::collection::vec(event_strategy(), 0..25),
    ) {
        let calls = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&calls);

        let mut surface = HeadlessSurface::new();
        for index in &visible {
            surface.show(*index, index.to_string());
        }
        let mut binding = SurfaceBinding::builder(surface)
            .configure_item(move |cell: &mut HeadlessCell, _| {
                cell.configured += 1;
                counter.set(counter.get() + 1);
            })
            .build();

        deliver_batch(&mut binding, events);

        let ops = binding.surface().ops();
        prop_assert!(
            !ops.iter().any(|op| matches!(op, SurfaceOp::Items(StepKind::ReloadItems, _)))
        );
        let configured: u32 = binding.surface().cells().map(|(_, c)| c.configured).sum();
        prop_assert_eq!(configured as usize, calls.get());
        prop_assert!(binding.surface().cells().all(|(index, _)| visible.contains(index)));
    }
}
