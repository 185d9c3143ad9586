//! # Runtime events emitted by the reservoir core.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Replenishment events**: allocator spawns and slab deliveries.
//! - **Dispense events**: served requests, refusals, delivery failures.
//! - **Terminal events**: invariant breaches and core stop.
//!
//! The [`Event`] struct carries additional metadata such as worker counts,
//! elapsed spawn time, the state label after a transition, and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so events can be ordered correctly even when consumed
//! out-of-order through async channels.
//!
//! ## Example
//! ```rust
//! use taskfount::{Event, EventKind, StateLabel};
//!
//! let ev = Event::now(EventKind::StateChanged)
//!     .with_state(StateLabel::Low)
//!     .with_count(40);
//!
//! assert_eq!(ev.kind, EventKind::StateChanged);
//! assert_eq!(ev.state, Some(StateLabel::Low));
//! assert_eq!(ev.count, Some(40));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::status::StateLabel;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of reservoir events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Replenishment events ===
    /// One or more slab allocators were spawned.
    AllocatorSpawned,
    /// An allocator delivered a full slab.
    SlabDelivered,

    // === Dispense events ===
    /// Workers were dispensed to a caller.
    Dispensed,
    /// A request exceeded the current inventory and was refused.
    Refused,
    /// Handing a job to one dispensed worker failed.
    DeliverFailed,

    // === State & terminal events ===
    /// The lifecycle label changed.
    StateChanged,
    /// A slab arrived while the reservoir was already full; the core stops.
    Overfull,
    /// The core task stopped.
    CoreStopped,
}

/// Reservoir event with optional metadata.
///
/// ## Fields
///
/// - `seq`: Unique sequence number for ordering (monotonically increasing)
/// - `at`: Wall-clock timestamp (may go backwards due to NTP, use for logging only)
/// - `kind`: Event classification
/// - `state`, `count`, `elapsed`, `error`: Optional metadata
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// State label after the transition (if relevant).
    pub state: Option<StateLabel>,
    /// Worker or allocator count (if relevant).
    pub count: Option<usize>,
    /// Elapsed spawn time of a delivered slab (if relevant).
    pub elapsed: Option<Duration>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            count: None,
            elapsed: None,
            error: None,
        }
    }

    /// Attaches a state label.
    pub fn with_state(mut self, state: StateLabel) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a worker or allocator count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches an elapsed duration.
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }
}
