//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging custom event
//! handlers (logging, metrics, audit) into the reservoir.
//!
//! Each subscriber passed to
//! [`Fount::with_subscribers`](crate::Fount::with_subscribers) gets a
//! dedicated listener task consuming the event bus, so slow subscribers
//! never block the core or each other.
//!
//! ## Rules
//! - `on_event()` runs in the subscriber's listener task, not in the core.
//! - Events are processed sequentially per subscriber (FIFO order).
//! - Handle errors internally; do not panic.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for reservoir observability.
///
/// Receives events from the bus via a dedicated listener task.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Use async I/O and return promptly; a slow subscriber only delays its
    /// own queue, but it still pays for what it awaits.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name for logging and metrics.
    ///
    /// Keep short and descriptive (e.g., "metrics", "audit").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
