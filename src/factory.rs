//! # Worker factory contract.
//!
//! Defines [`WorkerFactory`], the user-supplied capability the reservoir
//! consumes, and [`FnFactory`], a closure-backed implementation for the
//! common case.
//!
//! ## Rules
//! - [`WorkerFactory::spawn_one`] runs on an allocator task, never on the
//!   core, and must return a worker tethered through the given [`Tether`]
//!   (building the worker with [`Tether::spawn`] guarantees this).
//! - [`WorkerFactory::deliver`] is synchronous: the core invokes it while
//!   servicing a request and must not await. The default implementation is
//!   a non-blocking handoff via [`Worker::dispatch`].
//! - A factory that panics fails the allocator and with it the core. That
//!   is a bug in the factory, not a runtime condition to recover from.

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DeliverError;
use crate::worker::{Tether, Worker};

/// User-supplied capability producing workers one at a time.
#[async_trait]
pub trait WorkerFactory: Send + Sync + 'static {
    /// The one-shot job type workers accept.
    type Msg: Send + 'static;

    /// Produces one live, tethered worker.
    ///
    /// Runs on an allocator task; it may await (connection setup, warmup)
    /// without affecting request service.
    async fn spawn_one(&self, tether: &Tether) -> Worker<Self::Msg>;

    /// Hands a job to a dispensed worker.
    ///
    /// Invoked by the core after the ownership flip; must not block.
    /// Failures are reported in the affected slot of the batch reply.
    fn deliver(&self, worker: &mut Worker<Self::Msg>, msg: Self::Msg) -> Result<(), DeliverError> {
        worker.dispatch(msg)
    }

    /// Returns the factory name for status snapshots and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed factory implementation.
///
/// Wraps a job handler `Fn(M) -> Fut`; every spawned worker runs a fresh
/// future built from the shared handler when its job arrives.
///
/// ## Example
/// ```
/// use taskfount::FnFactory;
///
/// let factory = FnFactory::new("printer", |line: String| async move {
///     println!("{line}");
/// });
/// assert_eq!(taskfount::WorkerFactory::name(&factory), "printer");
/// ```
pub struct FnFactory<M, F> {
    name: Cow<'static, str>,
    job: Arc<F>,
    _msg: PhantomData<fn(M)>,
}

impl<M, F> FnFactory<M, F> {
    /// Creates a new closure-backed factory.
    pub fn new(name: impl Into<Cow<'static, str>>, job: F) -> Self {
        Self {
            name: name.into(),
            job: Arc::new(job),
            _msg: PhantomData,
        }
    }
}

#[async_trait]
impl<M, F, Fut> WorkerFactory for FnFactory<M, F>
where
    M: Send + 'static,
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Msg = M;

    async fn spawn_one(&self, tether: &Tether) -> Worker<M> {
        let job = Arc::clone(&self.job);
        tether.spawn(move |msg| async move { (job)(msg).await })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
