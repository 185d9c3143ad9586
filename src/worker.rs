//! # Worker handles and the core tether.
//!
//! A worker is a live tokio task that waits idle inside the reservoir and
//! runs **exactly one job** after it has been dispensed. Its lifetime has
//! two phases:
//!
//! ```text
//!           spawn_one                     dispense                 job
//!  factory ──────────► idle (tethered) ──────────► independent ────────► done
//!                        │                 ▲
//!                        │ core stops      │ link released
//!                        ▼                 │ (ownership flip)
//!                      exits ──────────────┘
//! ```
//!
//! - **Idle phase**: the worker task watches the core's cancellation token
//!   and its link channel. If the core stops, or the core drops the handle
//!   without dispensing, the worker exits without running anything.
//! - **Independent phase**: entered when the core releases the link at
//!   dispense time. From here the worker no longer watches the core; it
//!   waits for its one job, runs it, and finishes.
//!
//! [`Tether`] is what the core hands the factory: it carries the core's
//! token and the worker id counter, and [`Tether::spawn`] builds the
//! channels and the task. A factory cannot produce an unlinked worker.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::DeliverError;

/// Identity of one worker, unique within a fount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Handle to one live worker task.
///
/// While the handle sits inside the reservoir the worker is tethered to the
/// core: dropping the handle or stopping the core makes the worker exit.
/// The core severs the tether exactly once when the worker is dispensed;
/// after that the worker only waits for its one job.
#[derive(Debug)]
pub struct Worker<M> {
    id: WorkerId,
    link: Option<oneshot::Sender<()>>,
    job: Option<oneshot::Sender<M>>,
}

impl<M> Worker<M> {
    /// Returns this worker's identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns `true` while the worker is still tethered to the core.
    ///
    /// Every worker in a dispensed reply reports `false`.
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Severs the tether to the core.
    ///
    /// Called by the core immediately before replying; the `Option` makes
    /// the release exactly-once.
    pub(crate) fn unlink(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.send(());
        }
    }

    /// Hands the worker its one job.
    ///
    /// # Errors
    /// - [`DeliverError::Occupied`] if a job was already dispatched.
    /// - [`DeliverError::Gone`] if the worker task is no longer running.
    pub fn dispatch(&mut self, msg: M) -> Result<(), DeliverError> {
        let slot = self.job.take().ok_or(DeliverError::Occupied)?;
        slot.send(msg).map_err(|_| DeliverError::Gone)
    }
}

/// The core's end of the worker lifeline, handed to the factory.
///
/// Cheap to clone; all clones share the core token and the id counter.
#[derive(Clone)]
pub struct Tether {
    core: CancellationToken,
    ids: Arc<AtomicU64>,
}

impl Tether {
    pub(crate) fn new(core: CancellationToken) -> Self {
        Self {
            core,
            ids: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawns one worker task and returns its handle, already tethered.
    ///
    /// `work` runs at most once, with the job the worker eventually
    /// receives after dispense. Factories call this from
    /// [`WorkerFactory::spawn_one`](crate::WorkerFactory::spawn_one).
    pub fn spawn<M, F, Fut>(&self, work: F) -> Worker<M>
    where
        M: Send + 'static,
        F: FnOnce(M) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (link_tx, link_rx) = oneshot::channel::<()>();
        let (job_tx, job_rx) = oneshot::channel::<M>();
        let id = WorkerId(self.ids.fetch_add(1, AtomicOrdering::Relaxed));
        let core = self.core.clone();

        tokio::spawn(async move {
            // Idle phase. The biased order makes a release that raced with
            // core shutdown win: a dispensed worker is already independent.
            tokio::select! {
                biased;
                released = link_rx => {
                    if released.is_err() {
                        // Handle dropped while resident: die with the core.
                        return;
                    }
                }
                _ = core.cancelled() => return,
            }

            // Independent phase: one job, then done.
            if let Ok(msg) = job_rx.await {
                work(msg).await;
            }
        });

        Worker {
            id,
            link: Some(link_tx),
            job: Some(job_tx),
        }
    }
}
