//! Derived-volume caches.

use std::sync::Arc;

use ndarray::ArrayD;
use stackview_core::ReduceOp;

/// Shared handle to a computed volume.
pub type Volume = Arc<ArrayD<f64>>;

/// One slot per reduction kind.
///
/// Entries survive `unravel` and are only dropped by [`Self::clear`], so
/// switching back to an earlier reduction does not recompute it.
#[derive(Debug, Default, Clone)]
pub struct ReductionCache {
    min: Option<Volume>,
    max: Option<Volume>,
    mean: Option<Volume>,
    std: Option<Volume>,
}

impl ReductionCache {
    fn slot(&self, op: ReduceOp) -> &Option<Volume> {
        match op {
            ReduceOp::Min => &self.min,
            ReduceOp::Max => &self.max,
            ReduceOp::Mean => &self.mean,
            ReduceOp::Std => &self.std,
        }
    }

    fn slot_mut(&mut self, op: ReduceOp) -> &mut Option<Volume> {
        match op {
            ReduceOp::Min => &mut self.min,
            ReduceOp::Max => &mut self.max,
            ReduceOp::Mean => &mut self.mean,
            ReduceOp::Std => &mut self.std,
        }
    }

    /// Cached volume for `op`, if computed.
    #[must_use]
    pub fn get(&self, op: ReduceOp) -> Option<&Volume> {
        self.slot(op).as_ref()
    }

    /// Returns the cached volume for `op`, computing it with `compute` first
    /// if the slot is empty. The flag is true when `compute` ran.
    pub fn get_or_compute<F>(&mut self, op: ReduceOp, compute: F) -> (&Volume, bool)
    where
        F: FnOnce() -> ArrayD<f64>,
    {
        let slot = self.slot_mut(op);
        let computed = slot.is_none();
        let volume = slot.get_or_insert_with(|| Arc::new(compute()));
        (volume, computed)
    }

    /// Number of cached reductions.
    #[must_use]
    pub fn len(&self) -> usize {
        ReduceOp::ALL
            .iter()
            .filter(|&&op| self.slot(op).is_some())
            .count()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached reduction.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
