//! # Reservoir configuration.
//!
//! [`FountConfig`] fixes the reservoir's geometry and facade behavior at
//! construction time: slab size, depth, reply timeout, and event bus
//! capacity. There is no dynamic reconfiguration; changing the geometry
//! means building a new fount.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use taskfount::FountConfig;
//!
//! let mut cfg = FountConfig::default();
//! cfg.slab_size = 20;
//! cfg.depth = 3;
//! cfg.reply_timeout = Duration::from_millis(250);
//!
//! assert_eq!(cfg.max_workers(), 60);
//! assert!(cfg.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::FountError;

/// Construction-time configuration for a [`Fount`](crate::Fount).
///
/// Controls slab geometry, the facade's reply timeout, and event bus capacity.
#[derive(Clone, Debug)]
pub struct FountConfig {
    /// Workers per slab (`>= 1`).
    pub slab_size: usize,
    /// Target total slabs including the partial top (`>= 2`).
    pub depth: usize,
    /// How long a facade call waits for the core's reply.
    pub reply_timeout: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for FountConfig {
    /// Provides a default configuration:
    /// - `slab_size = 10`
    /// - `depth = 5` (capacity 50 workers)
    /// - `reply_timeout = 500ms`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            slab_size: 10,
            depth: 5,
            reply_timeout: Duration::from_millis(500),
            bus_capacity: 1024,
        }
    }
}

impl FountConfig {
    /// Maximum worker inventory: `depth * slab_size`.
    pub fn max_workers(&self) -> usize {
        self.depth * self.slab_size
    }

    /// Checks the geometry constraints.
    ///
    /// Returns [`FountError::InvalidConfig`] when `slab_size < 1` or `depth < 2`.
    pub fn validate(&self) -> Result<(), FountError> {
        if self.slab_size < 1 {
            return Err(FountError::InvalidConfig {
                reason: "slab_size must be at least 1".into(),
            });
        }
        if self.depth < 2 {
            return Err(FountError::InvalidConfig {
                reason: "depth must be at least 2".into(),
            });
        }
        Ok(())
    }
}
