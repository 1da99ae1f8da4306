#![forbid(unsafe_code)]

//! End-to-end tests: fetch source, binding, headless surface.
//!
//! Run:
//!   cargo test -p listdelta-surface --test binding_lifecycle

use std::cell::RefCell;
use std::rc::Rc;

use listdelta_core::{
    ChangeEvent, ChangeObserver, ItemIndex, Phase, SequenceError, StepKind, deliver_batch,
};
use listdelta_surface::{
    BindError, CompletionMode, FetchError, FetchSource, HeadlessCell, HeadlessSurface,
    SurfaceBinding, SurfaceOp,
};

/// Fetch source that succeeds or fails as scripted and counts calls.
struct ScriptedSource {
    fail_with: Option<String>,
    fetches: usize,
}

impl ScriptedSource {
    fn ok() -> Self {
        Self {
            fail_with: None,
            fetches: 0,
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            fetches: 0,
        }
    }
}

impl FetchSource for ScriptedSource {
    fn perform_fetch(&mut self) -> Result<(), FetchError> {
        self.fetches += 1;
        match &self.fail_with {
            Some(reason) => Err(FetchError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

fn i(section: usize, item: usize) -> ItemIndex {
    ItemIndex::new(section, item)
}

#[test]
fn bind_fetches_then_reloads() {
    let mut source = ScriptedSource::ok();
    let binding = SurfaceBinding::bind(&mut source, HeadlessSurface::new(), None).unwrap();
    assert_eq!(source.fetches, 1);
    assert_eq!(binding.surface().ops(), &[SurfaceOp::ReloadAll]);
    assert_eq!(binding.aggregator().phase(), Phase::Idle);
}

#[test]
fn failed_fetch_is_reported_and_surface_untouched() {
    let mut source = ScriptedSource::failing("missing entity");
    let err = SurfaceBinding::bind(&mut source, HeadlessSurface::new(), None).unwrap_err();
    assert!(matches!(err, BindError::Fetch(FetchError::Rejected(ref r)) if r == "missing entity"));
    assert_eq!(source.fetches, 1);
}

#[test]
fn incremental_batch_reaches_surface_in_order() {
    let mut source = ScriptedSource::ok();
    let mut binding = SurfaceBinding::bind(&mut source, HeadlessSurface::new(), None).unwrap();
    binding.surface_mut().take_ops();

    deliver_batch(
        &mut binding,
        [
            ChangeEvent::ItemUpdated { index: i(0, 2) },
            ChangeEvent::ItemMoved {
                from: i(0, 5),
                to: i(1, 0),
            },
            ChangeEvent::SectionInserted { section: 3 },
            ChangeEvent::ItemInserted { index: i(3, 0) },
        ],
    );

    assert_eq!(
        binding.surface().ops(),
        &[
            SurfaceOp::Sections(StepKind::InsertSections, vec![3]),
            SurfaceOp::Items(StepKind::DeleteItems, vec![i(0, 5)]),
            SurfaceOp::Items(StepKind::InsertItems, vec![i(1, 0)]),
            SurfaceOp::Items(StepKind::ReloadItems, vec![i(0, 2)]),
        ]
    );
    assert_eq!(binding.aggregator().phase(), Phase::Idle);
}

#[test]
fn section_deletion_reloads_everything() {
    let mut binding = SurfaceBinding::builder(HeadlessSurface::new()).build();
    binding.begin_batch();
    binding.item_inserted(i(0, 0));
    binding.section_deleted(1);
    binding.item_updated(i(0, 3));
    binding.end_batch();

    assert_eq!(binding.surface().ops(), &[SurfaceOp::ReloadAll]);
    assert_eq!(binding.surface().batches_applied(), 0);

    // The next batch starts clean.
    binding.begin_batch();
    binding.item_updated(i(0, 1));
    binding.end_batch();
    assert_eq!(binding.surface().batches_applied(), 1);
}

#[test]
fn visible_updated_cells_are_reconfigured_after_deferred_completion() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);

    let mut surface = HeadlessSurface::new().with_completion(CompletionMode::Deferred);
    surface.show(i(0, 0), "alpha");
    surface.show(i(0, 1), "beta");

    let mut source = ScriptedSource::ok();
    let mut binding = SurfaceBinding::builder(surface)
        .configure_item(move |cell: &mut HeadlessCell, index| {
            cell.configured += 1;
            log.borrow_mut().push(index);
        })
        .bind(&mut source)
        .unwrap();

    binding.begin_batch();
    binding.item_updated(i(0, 1));
    binding.item_updated(i(0, 7));
    binding.end_batch();

    assert!(binding.is_applying());
    assert!(seen.borrow().is_empty());
    assert!(
        !binding
            .surface()
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::Items(StepKind::ReloadItems, _)))
    );

    binding.batch_completed(true);
    assert_eq!(*seen.borrow(), vec![i(0, 1)]);
    assert_eq!(binding.surface().cell(i(0, 1)).map(|c| c.configured), Some(1));
    assert_eq!(binding.surface().cell(i(0, 0)).map(|c| c.configured), Some(0));
}

#[test]
fn interrupted_transaction_skips_reconfigure_but_resets() {
    let mut surface = HeadlessSurface::new().with_completion(CompletionMode::Interrupted);
    surface.show(i(0, 0), "alpha");
    let mut binding = SurfaceBinding::builder(surface)
        .configure_item(|cell: &mut HeadlessCell, _| cell.configured += 1)
        .build();

    binding.begin_batch();
    binding.item_updated(i(0, 0));
    binding.end_batch();
    assert_eq!(binding.surface().cell(i(0, 0)).map(|c| c.configured), Some(0));

    binding.surface_mut().set_completion(CompletionMode::Immediate);
    binding.begin_batch();
    binding.end_batch();
    assert_eq!(binding.surface().cell(i(0, 0)).map(|c| c.configured), Some(0));
}

#[test]
fn reload_request_between_batches_is_rejected() {
    let mut binding = SurfaceBinding::builder(HeadlessSurface::new()).build();
    let err = binding
        .try_on_event(ChangeEvent::ReloadRequested)
        .unwrap_err();
    assert!(matches!(
        err,
        BindError::Sequence(SequenceError::NoActiveBatch {
            operation: "reload_requested",
            phase: Phase::Idle,
        })
    ));

    binding.begin_batch();
    binding.item_inserted(i(0, 0));
    binding.end_batch();
    assert!(binding.surface().ops().iter().all(|op| *op != SurfaceOp::ReloadAll));
}

#[test]
fn event_outside_batch_is_rejected() {
    let mut binding = SurfaceBinding::builder(HeadlessSurface::new()).build();
    let err = binding
        .try_on_event(ChangeEvent::ItemInserted { index: i(0, 0) })
        .unwrap_err();
    assert!(matches!(err, BindError::Sequence(_)));
    assert!(binding.try_end_batch().is_err());
}
