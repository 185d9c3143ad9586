//! # Status snapshot and state labels.
//!
//! [`StateLabel`] is the reservoir's three-state lifecycle label. It is a
//! pure function of the current counts and geometry, but the core also
//! stores it explicitly so transitions are observable on the event bus.
//!
//! [`FountStatus`] is the labeled snapshot returned by
//! [`FountHandle::status`](crate::FountHandle::status).

use std::fmt;

/// Lifecycle label of the reservoir.
///
/// - `Empty`: no workers resident and no slabs held.
/// - `Full`: capacity reached (`fount >= slab_size` and `depth - 1` slabs).
/// - `Low`: any other inventory.
///
/// # Example
/// ```
/// use taskfount::StateLabel;
///
/// assert_eq!(StateLabel::derive(0, 0, 10, 5), StateLabel::Empty);
/// assert_eq!(StateLabel::derive(10, 4, 10, 5), StateLabel::Full);
/// assert_eq!(StateLabel::derive(3, 4, 10, 5), StateLabel::Low);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateLabel {
    /// Nothing resident; every request is refused until a slab lands.
    Empty,
    /// Some inventory, below capacity.
    Low,
    /// Capacity reached; a further slab delivery is an invariant breach.
    Full,
}

impl StateLabel {
    /// Derives the label from the current counts and geometry.
    ///
    /// Pure: the stored label always equals this derivation.
    pub fn derive(fount_count: usize, num_slabs: usize, slab_size: usize, depth: usize) -> Self {
        if fount_count == 0 && num_slabs == 0 {
            StateLabel::Empty
        } else if fount_count >= slab_size && num_slabs == depth - 1 {
            StateLabel::Full
        } else {
            StateLabel::Low
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateLabel::Empty => "empty",
            StateLabel::Low => "low",
            StateLabel::Full => "full",
        }
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Labeled snapshot of the reservoir.
///
/// Counts are consistent with each other at the instant the core serviced
/// the status request.
#[derive(Clone, Debug)]
pub struct FountStatus {
    /// Current lifecycle label.
    pub state: StateLabel,
    /// Name reported by the worker factory.
    pub factory: String,
    /// Workers in the partial top.
    pub fount_count: usize,
    /// Full slabs below the fount.
    pub num_slabs: usize,
    /// Workers per slab.
    pub slab_size: usize,
    /// Target total slabs including the fount.
    pub depth: usize,
    /// Maximum worker inventory: `depth * slab_size`.
    pub max_workers: usize,
    /// Workers currently resident: `fount_count + num_slabs * slab_size`.
    pub worker_count: usize,
}
