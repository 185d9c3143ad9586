//! # Reservoir core actor.
//!
//! The core is a single-threaded cooperative actor: it owns the state
//! record exclusively and processes one event to completion before the
//! next. Requests arrive FIFO over the mailbox; slab deliveries arrive
//! over their own channel and serialize at the same `select!`; allocator
//! tasks live in a `JoinSet` so a factory panic is observed here instead
//! of vanishing.
//!
//! ```text
//!  FountHandle ──Request──►┐
//!                          ├──► CoreActor ──spawn──► fill_slab (xN)
//!  fill_slab ────Slab─────►┘        │                    │
//!                                   └──── Bus events     └─spawn_one──► workers
//! ```
//!
//! ## Rules
//! - No handler awaits: dispense, delivery, and status all run to
//!   completion synchronously. The only `.await`s sit in the `select!`.
//! - Every dispensed worker is unlinked exactly once, immediately before
//!   the reply is sent.
//! - A slab arriving in the full state, or a panicking factory, terminates
//!   the actor with the corresponding [`FountError`]; resident workers die
//!   with it, in-flight allocators are aborted by the `JoinSet`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::FountConfig;
use crate::core::allocator::fill_slab;
use crate::core::state::{Dispense, FountState, Slab};
use crate::error::{DeliverError, FountError};
use crate::events::{Bus, Event, EventKind};
use crate::factory::WorkerFactory;
use crate::status::{FountStatus, StateLabel};
use crate::worker::{Tether, Worker};

/// One request from the facade, with its reply channel.
pub(crate) enum Request<M> {
    Get {
        n: usize,
        reply: oneshot::Sender<Vec<Worker<M>>>,
    },
    Task {
        msgs: Vec<M>,
        reply: oneshot::Sender<Vec<Result<Worker<M>, DeliverError>>>,
    },
    Status {
        reply: oneshot::Sender<FountStatus>,
    },
    RatePerSlab {
        reply: oneshot::Sender<f64>,
    },
    RatePerWorker {
        reply: oneshot::Sender<f64>,
    },
}

pub(crate) struct CoreActor<F: WorkerFactory> {
    factory: Arc<F>,
    state: FountState<Worker<F::Msg>>,
    bus: Bus,
    tether: Tether,
    requests: mpsc::Receiver<Request<F::Msg>>,
    deliveries: mpsc::Receiver<Slab<Worker<F::Msg>>>,
    deliveries_tx: mpsc::Sender<Slab<Worker<F::Msg>>>,
    allocators: JoinSet<()>,
}

impl<F: WorkerFactory> CoreActor<F> {
    pub(crate) fn new(
        factory: Arc<F>,
        config: &FountConfig,
        bus: Bus,
        token: CancellationToken,
        requests: mpsc::Receiver<Request<F::Msg>>,
    ) -> Self {
        let (deliveries_tx, deliveries) = mpsc::channel(config.depth);
        Self {
            factory,
            state: FountState::new(config.slab_size, config.depth),
            bus,
            tether: Tether::new(token),
            requests,
            deliveries,
            deliveries_tx,
            allocators: JoinSet::new(),
        }
    }

    /// Runs the actor until shutdown, mailbox closure, or an invariant
    /// breach.
    pub(crate) async fn run(mut self, token: CancellationToken) -> Result<(), FountError> {
        // Initial fill: one allocator per target slab, all in the background.
        self.spawn_allocators(self.state.depth());

        let result = loop {
            tokio::select! {
                _ = token.cancelled() => break Ok(()),

                // Disabled while the set is empty (`join_next` yields `None`).
                Some(res) = self.allocators.join_next() => {
                    if let Err(join_err) = res {
                        if join_err.is_panic() {
                            break Err(FountError::AllocatorPanicked);
                        }
                    }
                }

                slab = self.deliveries.recv() => {
                    // A sender half lives on `self`, so this channel cannot
                    // close while the actor runs.
                    let Some(slab) = slab else { break Ok(()) };
                    if let Err(err) = self.absorb(slab) {
                        break Err(err);
                    }
                }

                req = self.requests.recv() => {
                    // All facade handles dropped: wind down.
                    let Some(req) = req else { break Ok(()) };
                    self.handle(req);
                }
            }
        };

        match &result {
            Ok(()) => self.bus.publish(Event::now(EventKind::CoreStopped)),
            Err(err) => self.bus.publish(
                Event::now(EventKind::CoreStopped).with_error(err.to_string()),
            ),
        }
        // Dropping `self` drops the resident workers (their tethers close)
        // and aborts any allocator still in flight.
        result
    }

    fn handle(&mut self, req: Request<F::Msg>) {
        match req {
            Request::Get { n, reply } => {
                let workers = self.dispense(n);
                let _ = reply.send(workers);
            }
            Request::Task { msgs, reply } => {
                let requested = msgs.len();
                let workers = self.dispense(requested);
                if workers.is_empty() && requested > 0 {
                    let _ = reply.send(Vec::new());
                    return;
                }
                let outcomes = workers
                    .into_iter()
                    .zip(msgs)
                    .map(|(mut worker, msg)| match self.factory.deliver(&mut worker, msg) {
                        Ok(()) => Ok(worker),
                        Err(err) => {
                            self.bus.publish(
                                Event::now(EventKind::DeliverFailed).with_error(err.to_string()),
                            );
                            Err(err)
                        }
                    })
                    .collect();
                let _ = reply.send(outcomes);
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::RatePerSlab { reply } => {
                let _ = reply.send(self.state.rate_per_slab());
            }
            Request::RatePerWorker { reply } => {
                let _ = reply.send(self.state.rate_per_worker());
            }
        }
    }

    /// Dispenses `n` workers, flips their ownership, and schedules the
    /// replacement allocators. Returns an empty vector on refusal.
    fn dispense(&mut self, n: usize) -> Vec<Worker<F::Msg>> {
        let before = self.state.label();
        match self.state.dispense(n) {
            Dispense::Refused => {
                self.bus.publish(Event::now(EventKind::Refused).with_count(n));
                Vec::new()
            }
            Dispense::Served { mut workers, refill } => {
                // Ownership flip: severed exactly once per worker, before
                // the reply leaves the core.
                for worker in &mut workers {
                    worker.unlink();
                }
                self.spawn_allocators(refill);
                if !workers.is_empty() {
                    self.bus
                        .publish(Event::now(EventKind::Dispensed).with_count(workers.len()));
                }
                self.note_transition(before);
                workers
            }
        }
    }

    fn absorb(&mut self, slab: Slab<Worker<F::Msg>>) -> Result<(), FountError> {
        let before = self.state.label();
        let count = slab.workers.len();
        let elapsed = slab.elapsed;
        match self.state.absorb(slab) {
            Ok(()) => {
                self.bus.publish(
                    Event::now(EventKind::SlabDelivered)
                        .with_count(count)
                        .with_elapsed(elapsed),
                );
                self.note_transition(before);
                Ok(())
            }
            Err(err) => {
                self.bus
                    .publish(Event::now(EventKind::Overfull).with_error(err.to_string()));
                Err(err)
            }
        }
    }

    fn spawn_allocators(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        for _ in 0..count {
            let factory = Arc::clone(&self.factory);
            let tether = self.tether.clone();
            let deliveries = self.deliveries_tx.clone();
            let slab_size = self.state.slab_size();
            self.allocators
                .spawn(fill_slab(factory, tether, slab_size, deliveries));
        }
        self.state.note_spawned(count);
        self.bus
            .publish(Event::now(EventKind::AllocatorSpawned).with_count(count));
    }

    fn note_transition(&self, before: StateLabel) {
        let after = self.state.label();
        if after != before {
            self.bus
                .publish(Event::now(EventKind::StateChanged).with_state(after));
        }
    }

    fn status(&self) -> FountStatus {
        FountStatus {
            state: self.state.label(),
            factory: self.factory.name().to_string(),
            fount_count: self.state.fount_count(),
            num_slabs: self.state.num_slabs(),
            slab_size: self.state.slab_size(),
            depth: self.state.depth(),
            max_workers: self.state.depth() * self.state.slab_size(),
            worker_count: self.state.worker_count(),
        }
    }
}
