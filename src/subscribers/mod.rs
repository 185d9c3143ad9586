pub mod log;
pub mod subscriber;

pub use log::LogWriter;
pub use subscriber::Subscribe;

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::events::Event;

/// Spawns a listener task that feeds bus events to one subscriber.
///
/// The listener exits when the bus closes. A lagged receiver skips the
/// overwritten events and keeps consuming.
pub(crate) fn spawn_listener(mut rx: broadcast::Receiver<Event>, sub: Arc<dyn Subscribe>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => sub.on_event(&ev).await,
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    });
}
