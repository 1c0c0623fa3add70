//! Per-worker scratch storage for entity contributions.
//!
//! Every assembly worker owns one [`LocalScratch`] holding the mass and
//! damping matrices and the derivative vectors of the entity it is
//! processing. Buffers are reused across entities and never shared between
//! threads.

use crate::error::{Error, Result};
use crate::types::{LocalMatrix, LocalVector};
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Reusable buffers for one entity contribution.
#[derive(Debug, Clone)]
pub struct LocalScratch {
    pub mass: LocalMatrix,
    pub damping: LocalMatrix,
    pub velocity: LocalVector,
    pub acceleration: LocalVector,
    pub previous_acceleration: LocalVector,
}

impl LocalScratch {
    pub fn new() -> Self {
        Self {
            mass: LocalMatrix::zeros(0, 0),
            damping: LocalMatrix::zeros(0, 0),
            velocity: LocalVector::zeros(0),
            acceleration: LocalVector::zeros(0),
            previous_acceleration: LocalVector::zeros(0),
        }
    }
}

impl Default for LocalScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// One [`LocalScratch`] per worker thread.
#[derive(Debug)]
pub struct ScratchPool {
    slots: ThreadLocal<RefCell<LocalScratch>>,
}

impl ScratchPool {
    /// Create a pool with room for every thread of the current rayon pool.
    pub fn new() -> Self {
        Self::with_capacity(rayon::current_num_threads())
    }

    pub fn with_capacity(threads: usize) -> Self {
        Self {
            slots: ThreadLocal::with_capacity(threads),
        }
    }

    /// Run `f` with the calling thread's scratch.
    ///
    /// The scratch stays borrowed while `f` runs. A nested call on the same
    /// thread, for example from rayon work stealing inside `f`, returns
    /// [`Error::Assembly`].
    pub fn with<R>(&self, f: impl FnOnce(&mut LocalScratch) -> Result<R>) -> Result<R> {
        let slot = self.slots.get_or_default();
        let mut scratch = slot.try_borrow_mut().map_err(|_| {
            Error::Assembly("scratch buffers re-entered on the same worker thread".into())
        })?;
        f(&mut scratch)
    }

    /// Number of workers that have touched the pool.
    pub fn n_allocated(&mut self) -> usize {
        self.slots.iter_mut().count()
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}
