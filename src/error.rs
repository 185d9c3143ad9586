//! # Error types used by the fount runtime.
//!
//! This module defines three error enums:
//!
//! - [`FountError`] errors raised by the reservoir runtime itself.
//! - [`DeliverError`] per-worker failures when handing a job to a worker.
//! - [`RegistryError`] errors from the named-instance registry.
//!
//! All types provide `as_label` helpers for logs and metrics.
//!
//! A refused request is **not** an error: demand exceeding the current
//! inventory is answered with an empty reply, which is the backpressure
//! signal callers are expected to branch on.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the fount runtime.
///
/// [`FountError::Overfull`] and [`FountError::AllocatorPanicked`] are
/// invariant breaches: they terminate the core and surface from
/// [`Fount::shutdown`](crate::Fount::shutdown). The rest are facade-level
/// conditions; the core is unaffected by them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FountError {
    /// Configuration violated a construction constraint.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which constraint was violated.
        reason: String,
    },

    /// The core task is no longer running.
    #[error("fount core is not running")]
    Closed,

    /// The core did not reply within the facade timeout.
    ///
    /// The core will still service the request when it reaches it; only the
    /// caller stopped waiting.
    #[error("no reply within {timeout:?}")]
    ReplyTimeout {
        /// The configured reply timeout.
        timeout: Duration,
    },

    /// A slab was delivered while the reservoir was already full.
    #[error("slab delivered while full ({num_slabs} slabs, fount of {fount_count})")]
    Overfull {
        /// Slabs held when the extra slab arrived.
        num_slabs: usize,
        /// Fount size when the extra slab arrived.
        fount_count: usize,
    },

    /// The factory panicked inside an allocator task.
    ///
    /// This is a bug in the factory, not a runtime condition to recover from.
    #[error("worker factory panicked while filling a slab")]
    AllocatorPanicked,
}

impl FountError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FountError::InvalidConfig { .. } => "fount_invalid_config",
            FountError::Closed => "fount_closed",
            FountError::ReplyTimeout { .. } => "fount_reply_timeout",
            FountError::Overfull { .. } => "fount_overfull",
            FountError::AllocatorPanicked => "fount_allocator_panicked",
        }
    }

    /// Indicates whether the error terminated the core.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FountError::Overfull { .. } | FountError::AllocatorPanicked
        )
    }
}

/// # Per-worker delivery failures.
///
/// Returned in the affected position of a `task_many` reply; one failed
/// delivery never aborts the rest of the batch.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverError {
    /// The worker already holds its one job.
    #[error("worker already holds a job")]
    Occupied,

    /// The worker task is no longer running.
    #[error("worker is gone")]
    Gone,
}

impl DeliverError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliverError::Occupied => "deliver_occupied",
            DeliverError::Gone => "deliver_gone",
        }
    }
}

/// # Errors from the named-instance registry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Attempted to register a fount under a name that is already taken.
    #[error("fount '{name}' already registered")]
    NameTaken {
        /// The duplicate name.
        name: String,
    },

    /// Attempted to deregister a name that is not registered.
    #[error("fount '{name}' not found")]
    NotFound {
        /// The missing name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::NameTaken { .. } => "registry_name_taken",
            RegistryError::NotFound { .. } => "registry_not_found",
        }
    }
}
