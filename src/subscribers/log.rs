use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Base subscriber that logs events to stdout.
///
/// Useful for demos and debugging.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::AllocatorSpawned => {
                println!("[allocator-spawned] count={:?}", e.count);
            }
            EventKind::SlabDelivered => {
                println!(
                    "[slab-delivered] workers={:?} elapsed={:?}",
                    e.count, e.elapsed
                );
            }
            EventKind::Dispensed => {
                println!("[dispensed] workers={:?}", e.count);
            }
            EventKind::Refused => {
                println!("[refused] requested={:?}", e.count);
            }
            EventKind::DeliverFailed => {
                println!("[deliver-failed] err={:?}", e.error);
            }
            EventKind::StateChanged => {
                if let Some(state) = e.state {
                    println!("[state] {state}");
                }
            }
            EventKind::Overfull => {
                println!("[overfull] err={:?}", e.error);
            }
            EventKind::CoreStopped => {
                println!("[core-stopped] err={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
