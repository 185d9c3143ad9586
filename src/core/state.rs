//! # Reservoir state machine.
//!
//! Pure, synchronous core state: the partial top ("fount"), the LIFO stack
//! of full slabs, the explicit lifecycle label, and the dispense algorithm
//! that satisfies requests of any size from fixed-size slabs plus a
//! partial. Generic over the resident item so the whole case analysis is
//! testable without a runtime; the actor instantiates it with live worker
//! handles.
//!
//! ```text
//!              ┌────────────────────┐
//!   dispense ◄─┤  fount (partial)   │ ◄─ slab lands here when fount empty
//!   (front)    ├────────────────────┤
//!              │  slab  (top)       │ ◄─ otherwise pushed on the stack
//!              │  slab              │
//!              │  slab              │
//!              └────────────────────┘
//! ```
//!
//! ## Rules
//! - Slabs are immutable once delivered: consumed whole or peeled from the
//!   front.
//! - Every partial-fount operation records the elapsed time of the slab the
//!   surviving remainder came from, so spawn-rate statistics stay
//!   meaningful.
//! - [`FountState::dispense`] returns a plan (`workers` + `refill`); the
//!   caller performs the side effects (unlinking, spawning allocators,
//!   publishing events).
//! - Replacement counts are clamped so that
//!   `outstanding + num_slabs + ceil(fount/slab_size)` never exceeds
//!   `depth`; an inbound fount replacement is not provisioned twice.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::FountError;
use crate::status::StateLabel;

/// A full slab: exactly `slab_size` workers plus the time it took one
/// allocator to produce them.
#[derive(Debug)]
pub(crate) struct Slab<W> {
    pub workers: Vec<W>,
    pub elapsed: Duration,
}

/// Result of one dispense.
#[derive(Debug)]
pub(crate) enum Dispense<W> {
    /// Demand exceeded the inventory; nothing changed, nothing respawns.
    Refused,
    /// `workers` leave the reservoir; the caller must spawn `refill`
    /// replacement allocators.
    Served { workers: Vec<W>, refill: usize },
}

/// The reservoir core's state record.
pub(crate) struct FountState<W> {
    slab_size: usize,
    depth: usize,
    fount: VecDeque<W>,
    fount_elapsed: Duration,
    reservoir: Vec<Slab<W>>,
    label: StateLabel,
    outstanding: usize,
}

impl<W> FountState<W> {
    pub(crate) fn new(slab_size: usize, depth: usize) -> Self {
        Self {
            slab_size,
            depth,
            fount: VecDeque::new(),
            fount_elapsed: Duration::ZERO,
            reservoir: Vec::new(),
            label: StateLabel::Empty,
            outstanding: 0,
        }
    }

    pub(crate) fn slab_size(&self) -> usize {
        self.slab_size
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn fount_count(&self) -> usize {
        self.fount.len()
    }

    pub(crate) fn num_slabs(&self) -> usize {
        self.reservoir.len()
    }

    /// Current worker inventory.
    pub(crate) fn worker_count(&self) -> usize {
        self.fount.len() + self.reservoir.len() * self.slab_size
    }

    pub(crate) fn label(&self) -> StateLabel {
        self.label
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Records `count` allocators as in flight.
    pub(crate) fn note_spawned(&mut self, count: usize) {
        self.outstanding += count;
    }

    /// Absorbs one delivered slab.
    ///
    /// Placement: an empty fount is seeded by the slab (and takes its
    /// elapsed time); otherwise the slab is pushed onto the stack. A slab
    /// arriving while full is an invariant breach and stops the core.
    pub(crate) fn absorb(&mut self, slab: Slab<W>) -> Result<(), FountError> {
        if self.label == StateLabel::Full {
            return Err(FountError::Overfull {
                num_slabs: self.reservoir.len(),
                fount_count: self.fount.len(),
            });
        }
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.fount.is_empty() {
            self.fount_elapsed = slab.elapsed;
            self.fount = slab.workers.into();
        } else {
            self.reservoir.push(slab);
        }
        self.relabel();
        Ok(())
    }

    /// Removes `n` workers from the reservoir.
    ///
    /// Case analysis, checked in order:
    /// 1. `n == 0`: empty reply, no change.
    /// 2. `n > total`: refused, no change, no refill.
    /// 3. `n == total`: everything goes, one allocator per consumed slab
    ///    plus one for the fount.
    /// 4. `n < fount`: peel the fount's front, no refill.
    /// 5. `n == fount`: the whole fount, one refill.
    /// 6. `fount < n <= slab_size`: serve from the popped top slab; a
    ///    partial take merges the remainder into the fount.
    /// 7. `n > slab_size`: whole slabs for the bulk, the `n % slab_size`
    ///    excess from the fount, crossing into one more slab when the
    ///    fount cannot cover it.
    pub(crate) fn dispense(&mut self, n: usize) -> Dispense<W> {
        let total = self.worker_count();
        if n == 0 {
            return Dispense::Served {
                workers: Vec::new(),
                refill: 0,
            };
        }
        if n > total {
            return Dispense::Refused;
        }

        let (workers, refill) = if n == total {
            self.take_all()
        } else if n < self.fount.len() {
            (self.peel_fount(n), 0)
        } else if n == self.fount.len() {
            (self.fount.drain(..).collect(), 1)
        } else if n <= self.slab_size {
            // n < total here, so the reservoir cannot be empty.
            let Some(top) = self.reservoir.pop() else {
                return Dispense::Refused;
            };
            if n == self.slab_size {
                (top.workers, 1)
            } else {
                let mut workers = top.workers;
                let rest = workers.split_off(n);
                self.merge_fount(rest, top.elapsed);
                (workers, 1)
            }
        } else {
            let excess = n % self.slab_size;
            let needed = n / self.slab_size;
            let mut refill = needed;

            let mut workers: Vec<W> = if self.fount.len() >= excess {
                // The fount alone covers the excess prefix (drained whole
                // when it matches exactly).
                self.peel_fount(excess)
            } else {
                // Cross into the top slab; its residue becomes the new
                // fount and carries that slab's elapsed time.
                refill += 1;
                let mut prefix: Vec<W> = self.fount.drain(..).collect();
                // fount < excess and n < total leave at least needed + 1
                // slabs on the stack, so this pop and the loop below
                // cannot miss; the fallback is unreachable.
                let Some(top) = self.reservoir.pop() else {
                    return Dispense::Refused;
                };
                let mut front = top.workers;
                let residue = front.split_off(excess - prefix.len());
                prefix.extend(front);
                self.fount = residue.into();
                self.fount_elapsed = top.elapsed;
                prefix
            };

            for _ in 0..needed {
                // n < total bounds needed below the stack size in every
                // branch above; an empty pop here would mean the counts
                // and the sequences already disagree.
                let Some(slab) = self.reservoir.pop() else {
                    return Dispense::Refused;
                };
                workers.extend(slab.workers);
            }
            (workers, refill)
        };

        let refill = refill.min(self.headroom());
        self.relabel();
        Dispense::Served { workers, refill }
    }

    /// Mean elapsed microseconds over the slabs currently held, the
    /// fount's time included iff the fount is non-empty. Rounded to
    /// hundredths; `0.0` when nothing is held.
    pub(crate) fn rate_per_slab(&self) -> f64 {
        let (held, total) = self.held_elapsed();
        if held == 0 {
            return 0.0;
        }
        round2(total as f64 / held as f64)
    }

    /// Total elapsed microseconds divided by the workers currently held.
    /// Rounded to hundredths; `0.0` when nothing is held.
    pub(crate) fn rate_per_worker(&self) -> f64 {
        let count = self.worker_count();
        if count == 0 {
            return 0.0;
        }
        let (_, total) = self.held_elapsed();
        round2(total as f64 / count as f64)
    }

    fn take_all(&mut self) -> (Vec<W>, usize) {
        let refill = self.reservoir.len() + 1;
        let mut workers: Vec<W> = self.fount.drain(..).collect();
        while let Some(slab) = self.reservoir.pop() {
            workers.extend(slab.workers);
        }
        (workers, refill)
    }

    fn peel_fount(&mut self, n: usize) -> Vec<W> {
        self.fount.drain(..n).collect()
    }

    /// Puts a popped slab's remainder on the fount.
    ///
    /// Extends whichever sequence is shorter, so the cost stays bounded by
    /// the smaller side regardless of the current partial's size. Both
    /// branches produce `fount ++ rest`.
    fn merge_fount(&mut self, rest: Vec<W>, elapsed: Duration) {
        if rest.len() > self.fount.len() {
            let mut merged: VecDeque<W> = rest.into();
            for w in self.fount.drain(..).rev() {
                merged.push_front(w);
            }
            self.fount = merged;
        } else {
            self.fount.extend(rest);
        }
        self.fount_elapsed = elapsed;
    }

    /// Allocators that may still be spawned before the inventory ceiling
    /// (`depth` slab-equivalents, counting in-flight allocators and the
    /// partially filled fount) is reached.
    fn headroom(&self) -> usize {
        let provisioned =
            self.outstanding + self.reservoir.len() + self.fount.len().div_ceil(self.slab_size);
        self.depth.saturating_sub(provisioned)
    }

    fn relabel(&mut self) {
        self.label = StateLabel::derive(
            self.fount.len(),
            self.reservoir.len(),
            self.slab_size,
            self.depth,
        );
    }

    fn held_elapsed(&self) -> (usize, u128) {
        let mut held = self.reservoir.len();
        let mut total: u128 = self.reservoir.iter().map(|s| s.elapsed.as_micros()).sum();
        if !self.fount.is_empty() {
            held += 1;
            total += self.fount_elapsed.as_micros();
        }
        (held, total)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
