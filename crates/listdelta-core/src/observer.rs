#![forbid(unsafe_code)]

//! Inbound interface for the observing component.

use crate::event::ChangeEvent;
use crate::index::{ItemIndex, SectionIndex};

/// Receiver of change notifications.
///
/// Implementors only need the three required methods; the per-kind
/// methods all route through [`on_event`](Self::on_event). All calls are
/// synchronous and happen on the thread that owns the surface.
pub trait ChangeObserver {
    /// A batch of changes is about to be delivered.
    fn begin_batch(&mut self);

    /// One change inside the current batch.
    fn on_event(&mut self, event: ChangeEvent);

    /// The batch is complete.
    fn end_batch(&mut self);

    fn reload_needed(&mut self) {
        self.on_event(ChangeEvent::ReloadRequested);
    }

    fn section_inserted(&mut self, section: SectionIndex) {
        self.on_event(ChangeEvent::SectionInserted { section });
    }

    fn section_deleted(&mut self, section: SectionIndex) {
        self.on_event(ChangeEvent::SectionDeleted { section });
    }

    fn section_updated(&mut self, section: SectionIndex) {
        self.on_event(ChangeEvent::SectionUpdated { section });
    }

    fn item_inserted(&mut self, index: ItemIndex) {
        self.on_event(ChangeEvent::ItemInserted { index });
    }

    fn item_deleted(&mut self, index: ItemIndex) {
        self.on_event(ChangeEvent::ItemDeleted { index });
    }

    fn item_updated(&mut self, index: ItemIndex) {
        self.on_event(ChangeEvent::ItemUpdated { index });
    }

    fn item_moved(&mut self, from: ItemIndex, to: ItemIndex) {
        self.on_event(ChangeEvent::ItemMoved { from, to });
    }
}

/// Deliver `events` to `observer` as one batch.
pub fn deliver_batch<O>(observer: &mut O, events: impl IntoIterator<Item = ChangeEvent>)
where
    O: ChangeObserver + ?Sized,
{
    observer.begin_batch();
    for event in events {
        observer.on_event(event);
    }
    observer.end_batch();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl ChangeObserver for Log {
        fn begin_batch(&mut self) {
            self.0.push("begin".into());
        }

        fn on_event(&mut self, event: ChangeEvent) {
            self.0.push(event.kind().into());
        }

        fn end_batch(&mut self) {
            self.0.push("end".into());
        }
    }

    #[test]
    fn shorthands_route_through_on_event() {
        let mut log = Log::default();
        log.reload_needed();
        log.section_inserted(0);
        log.section_deleted(0);
        log.section_updated(0);
        log.item_inserted(ItemIndex::new(0, 0));
        log.item_deleted(ItemIndex::new(0, 0));
        log.item_updated(ItemIndex::new(0, 0));
        log.item_moved(ItemIndex::new(0, 0), ItemIndex::new(0, 1));
        assert_eq!(
            log.0,
            vec![
                "reload_requested",
                "section_inserted",
                "section_deleted",
                "section_updated",
                "item_inserted",
                "item_deleted",
                "item_updated",
                "item_moved",
            ]
        );
    }

    #[test]
    fn deliver_batch_brackets_events() {
        let mut log = Log::default();
        deliver_batch(
            &mut log,
            [ChangeEvent::SectionUpdated { section: 2 }, ChangeEvent::ReloadRequested],
        );
        assert_eq!(log.0, vec!["begin", "section_updated", "reload_requested", "end"]);
    }

    #[test]
    fn works_through_dyn() {
        let mut log = Log::default();
        let observer: &mut dyn ChangeObserver = &mut log;
        deliver_batch(observer, std::iter::empty());
        assert_eq!(log.0, vec!["begin", "end"]);
    }
}
