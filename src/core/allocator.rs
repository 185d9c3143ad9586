//! # Slab allocator task.
//!
//! A short-lived background producer: it invokes the factory's `spawn_one`
//! until it has a full slab, measures the total elapsed time, and posts a
//! single [`Slab`] into the core's delivery channel. Exactly one delivery
//! per allocator.
//!
//! Allocators live inside the core's `JoinSet`, so they are aborted when
//! the core goes away and a panicking factory surfaces at the core's
//! `join_next` instead of dying silently.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::core::state::Slab;
use crate::factory::WorkerFactory;
use crate::worker::{Tether, Worker};

/// Produces one full slab and delivers it to the core.
///
/// Workers are tethered as they are spawned, so a slab abandoned mid-fill
/// (core teardown) takes its workers down with it.
pub(crate) async fn fill_slab<F: WorkerFactory>(
    factory: Arc<F>,
    tether: Tether,
    slab_size: usize,
    deliveries: mpsc::Sender<Slab<Worker<F::Msg>>>,
) {
    let started = Instant::now();
    let mut workers = Vec::with_capacity(slab_size);
    for _ in 0..slab_size {
        workers.push(factory.spawn_one(&tether).await);
    }

    // The send only fails when the core is already gone; the slab (and its
    // workers) are dropped with it.
    let _ = deliveries
        .send(Slab {
            workers,
            elapsed: started.elapsed(),
        })
        .await;
}
