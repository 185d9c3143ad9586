//! # Event bus for reservoir observability.
//!
//! The core publishes one [`Event`] per lifecycle step (allocator spawns,
//! slab deliveries, dispenses, refusals, state changes, terminal stops)
//! onto a [`Bus`]; subscribers consume it through their own receivers.
//!
//! Publishing is fire-and-forget: the core never blocks on, or fails
//! because of, an observer. An event published while nobody is listening
//! is dropped and counted, which keeps "no subscribers were ever wired"
//! distinguishable from "bus wired but quiet" when debugging a silent
//! fount.

pub mod event;

pub use event::{Event, EventKind};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::sync::broadcast;

/// Broadcast channel for reservoir [`Event`]s.
///
/// Cheap to clone; all clones feed the same subscribers and share the
/// unheard-publish counter.
#[derive(Clone)]
pub struct Bus {
    events: broadcast::Sender<Event>,
    unheard: Arc<AtomicU64>,
}

impl Bus {
    /// Creates a new bus holding up to `capacity` undelivered events per
    /// subscriber before the slowest one starts losing the oldest.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            events,
            unheard: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Never blocks. With no active subscriber the event is dropped and
    /// counted instead.
    pub fn publish(&self, ev: Event) {
        if self.events.send(ev).is_err() {
            self.unheard.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Subscribes to the bus and returns a new receiver.
    ///
    /// Only events published after this call are delivered to it.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Number of events published so far with no subscriber listening.
    pub fn unheard(&self) -> u64 {
        self.unheard.load(AtomicOrdering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unheard_publishes_are_counted_not_errors() {
        let bus = Bus::new(8);
        bus.publish(Event::now(EventKind::CoreStopped));
        assert_eq!(bus.unheard(), 1);

        let mut rx = bus.subscribe();
        bus.publish(Event::now(EventKind::Dispensed).with_count(3));
        assert_eq!(bus.unheard(), 1);

        let ev = rx.try_recv().expect("delivered to the live subscriber");
        assert_eq!(ev.kind, EventKind::Dispensed);
        assert_eq!(ev.count, Some(3));
    }

    #[test]
    fn clones_share_the_same_subscribers() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        let clone = bus.clone();
        clone.publish(Event::now(EventKind::Refused).with_count(51));

        let ev = rx.try_recv().expect("publish through a clone reaches us");
        assert_eq!(ev.kind, EventKind::Refused);
        assert_eq!(clone.unheard(), 0);
    }
}
