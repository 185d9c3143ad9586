//! # Public facade over the reservoir core.
//!
//! [`Fount`] owns the core task; [`FountHandle`] is the cheap, cloneable
//! request surface. Every call is a oneshot round-trip through the core's
//! mailbox, guarded by the configured reply timeout (500 ms by default).
//!
//! A request larger than the current inventory is answered with an empty
//! reply: backpressure, not an error. Callers that need workers *now*
//! branch on the empty case; callers that can wait retry later.
//!
//! ## Example
//! ```no_run
//! use taskfount::{FnFactory, Fount, FountConfig};
//!
//! # async fn demo() -> Result<(), taskfount::FountError> {
//! let factory = FnFactory::new("greeter", |name: String| async move {
//!     println!("hello, {name}");
//! });
//! let fount = Fount::new(factory, FountConfig::default())?;
//!
//! if let Some(mut worker) = fount.handle().get_one().await? {
//!     let _ = worker.dispatch("world".to_string());
//! }
//! fount.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::FountConfig;
use crate::core::actor::{CoreActor, Request};
use crate::error::{DeliverError, FountError};
use crate::events::Bus;
use crate::factory::WorkerFactory;
use crate::status::FountStatus;
use crate::subscribers::{Subscribe, spawn_listener};
use crate::worker::Worker;

/// Mailbox depth for facade requests. Requests queue FIFO; the bound only
/// limits how far callers can run ahead of the core.
const REQUEST_QUEUE: usize = 64;

/// A pre-allocated worker reservoir.
///
/// Owns the core actor; dropping or [`shutdown`](Fount::shutdown)ting the
/// fount takes all resident workers and in-flight allocators down with it.
/// Dispensed workers are independent and unaffected.
pub struct Fount<F: WorkerFactory> {
    handle: FountHandle<F::Msg>,
    token: CancellationToken,
    core: JoinHandle<Result<(), FountError>>,
}

impl<F: WorkerFactory> Fount<F> {
    /// Builds a fount and starts filling it in the background.
    ///
    /// Returns immediately; the reservoir settles toward full as the
    /// initial allocators deliver their slabs.
    ///
    /// # Errors
    /// [`FountError::InvalidConfig`] when the geometry constraints are
    /// violated.
    pub fn new(factory: F, config: FountConfig) -> Result<Self, FountError> {
        Self::with_subscribers(factory, config, Vec::new())
    }

    /// Like [`Fount::new`], with event subscribers attached before the
    /// first allocator spawns.
    pub fn with_subscribers(
        factory: F,
        config: FountConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, FountError> {
        config.validate()?;

        let bus = Bus::new(config.bus_capacity);
        for sub in subscribers {
            spawn_listener(bus.subscribe(), sub);
        }

        let token = CancellationToken::new();
        let (requests, mailbox) = mpsc::channel(REQUEST_QUEUE);
        let actor = CoreActor::new(Arc::new(factory), &config, bus, token.clone(), mailbox);
        let core = tokio::spawn(actor.run(token.clone()));

        Ok(Self {
            handle: FountHandle {
                requests,
                reply_timeout: config.reply_timeout,
            },
            token,
            core,
        })
    }

    /// Returns a cloneable request handle.
    pub fn handle(&self) -> FountHandle<F::Msg> {
        self.handle.clone()
    }

    /// Stops the core and reports how it ended.
    ///
    /// Resident workers die with the core; workers dispensed earlier are
    /// unaffected. Surfaces a terminal [`FountError::Overfull`] or
    /// [`FountError::AllocatorPanicked`] if the core had already stopped
    /// on an invariant breach.
    pub async fn shutdown(self) -> Result<(), FountError> {
        self.token.cancel();
        match self.core.await {
            Ok(result) => result,
            Err(_) => Err(FountError::Closed),
        }
    }
}

/// Cloneable request surface of a [`Fount`].
///
/// All clones talk to the same core; requests are serviced in arrival
/// order.
pub struct FountHandle<M> {
    requests: mpsc::Sender<Request<M>>,
    reply_timeout: std::time::Duration,
}

impl<M> Clone for FountHandle<M> {
    fn clone(&self) -> Self {
        Self {
            requests: self.requests.clone(),
            reply_timeout: self.reply_timeout,
        }
    }
}

impl<M: Send + 'static> FountHandle<M> {
    /// Dispenses one worker, or `None` when the reservoir cannot serve.
    pub async fn get_one(&self) -> Result<Option<Worker<M>>, FountError> {
        Ok(self.get_many(1).await?.pop())
    }

    /// Dispenses exactly `n` workers, or an empty vector when the current
    /// inventory is smaller than `n` (backpressure).
    pub async fn get_many(&self, n: usize) -> Result<Vec<Worker<M>>, FountError> {
        self.call(|reply| Request::Get { n, reply }).await
    }

    /// Dispenses one worker and hands it `msg`.
    ///
    /// `None` on refusal; `Some(Err(_))` when the worker was dispensed but
    /// delivery failed.
    pub async fn task_one(
        &self,
        msg: M,
    ) -> Result<Option<Result<Worker<M>, DeliverError>>, FountError> {
        Ok(self.task_many(vec![msg]).await?.pop())
    }

    /// Dispenses one worker per message and delivers position-wise.
    ///
    /// An empty vector means the whole batch was refused. Otherwise every
    /// slot holds either the worker (job delivered) or the delivery error
    /// for that position; one failed delivery never aborts the rest.
    pub async fn task_many(
        &self,
        msgs: Vec<M>,
    ) -> Result<Vec<Result<Worker<M>, DeliverError>>, FountError> {
        self.call(|reply| Request::Task { msgs, reply }).await
    }

    /// Returns the labeled status snapshot.
    pub async fn status(&self) -> Result<FountStatus, FountError> {
        self.call(|reply| Request::Status { reply }).await
    }

    /// Average microseconds one allocator spent producing a currently-held
    /// slab (the fount's time counts iff the fount is non-empty).
    pub async fn spawn_rate_per_slab(&self) -> Result<f64, FountError> {
        self.call(|reply| Request::RatePerSlab { reply }).await
    }

    /// Average spawn microseconds per currently-held worker.
    pub async fn spawn_rate_per_process(&self) -> Result<f64, FountError> {
        self.call(|reply| Request::RatePerWorker { reply }).await
    }

    async fn call<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Request<M>,
    ) -> Result<R, FountError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(make(tx))
            .await
            .map_err(|_| FountError::Closed)?;

        match time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(FountError::Closed),
            Err(_) => Err(FountError::ReplyTimeout {
                timeout: self.reply_timeout,
            }),
        }
    }
}
