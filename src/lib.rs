//! # taskfount
//!
//! **Taskfount** is a pre-allocated worker reservoir: it keeps a stock of
//! live, ready-to-use one-shot worker tasks and dispenses them on demand.
//! The reservoir refills itself in the background, slab by slab; when
//! demand outruns the refill rate, requests are refused with an empty
//! reply, giving callers a clean backpressure signal instead of
//! over-committing the host.
//!
//! ## Features
//!
//! | Area            | Description                                                  | Key types / traits                |
//! |-----------------|--------------------------------------------------------------|-----------------------------------|
//! | **Dispensing**  | Take 1..n pre-spawned workers, with or without a job.        | [`Fount`], [`FountHandle`]        |
//! | **Factories**   | Plug in how workers are spawned and how jobs reach them.     | [`WorkerFactory`], [`FnFactory`]  |
//! | **Workers**     | One-shot handles with two-phase ownership.                   | [`Worker`], [`Tether`]            |
//! | **Status**      | Labeled snapshots and spawn-rate statistics.                 | [`FountStatus`], [`StateLabel`]   |
//! | **Observability**| Hook into reservoir lifecycle events.                       | [`Subscribe`], [`Event`]          |
//! | **Errors**      | Typed errors for the runtime, delivery, and registry.        | [`FountError`], [`DeliverError`]  |
//! | **Naming**      | Share a reservoir under a process-wide name.                 | [`Registry`]                      |
//!
//! ## How it works
//!
//! Workers are produced `slab_size` at a time by short-lived background
//! allocator tasks and stacked as slabs under a partial top (the "fount").
//! The core is a single-threaded actor: requests and slab deliveries
//! serialize at its mailbox, and each is handled to completion. While a
//! worker sits in the reservoir its lifetime is tethered to the core: if
//! the core stops, idle workers die with it. The moment a worker is
//! dispensed the tether is severed and the worker answers to its caller
//! alone.
//!
//! ```no_run
//! use taskfount::{FnFactory, Fount, FountConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = FnFactory::new("mailer", |rcpt: String| async move {
//!         println!("sending to {rcpt}");
//!     });
//!
//!     let fount = Fount::new(factory, FountConfig::default())?;
//!     let handle = fount.handle();
//!
//!     // Hand three workers their jobs in one round-trip.
//!     let sent = handle
//!         .task_many(vec!["a@x".into(), "b@x".into(), "c@x".into()])
//!         .await?;
//!     if sent.is_empty() {
//!         println!("reservoir drained, try again later");
//!     }
//!
//!     fount.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
mod factory;
mod fount;
mod registry;
mod status;
mod worker;

mod core;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use config::FountConfig;
pub use error::{DeliverError, FountError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use factory::{FnFactory, WorkerFactory};
pub use fount::{Fount, FountHandle};
pub use registry::Registry;
pub use status::{FountStatus, StateLabel};
pub use subscribers::{LogWriter, Subscribe};
pub use worker::{Tether, Worker, WorkerId};
