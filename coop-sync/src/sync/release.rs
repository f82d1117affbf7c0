use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// A lock that can take back a slot it handed out
pub(crate) trait Release {
    /// Return one slot granted during `generation`
    fn release(self: Rc<Self>, generation: u64);
}

/// Single-use capability returned for every grant. Calling [release](Releaser::release)
/// frees the slot and hands it to the next waiter, if any.
///
/// Releasing is idempotent: only the first call has any effect. Dropping a [Releaser]
/// without calling it keeps the slot held forever; use [into_guard](Releaser::into_guard)
/// to release on drop instead.
///
/// A releaser whose grant predates a `cancel_all` on its lock is inert.
#[must_use = "the slot stays held until the releaser is called"]
pub struct Releaser {
    lock: Rc<dyn Release>,
    generation: u64,
    released: Cell<bool>,
}

impl Releaser {
    pub(crate) fn new(lock: Rc<dyn Release>, generation: u64) -> Self {
        Self {
            lock,
            generation,
            released: Cell::new(false),
        }
    }

    /// Free the slot. Calls after the first are no-ops.
    pub fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        self.lock.clone().release(self.generation);
    }

    /// Whether [release](Releaser::release) has already been called
    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Convert into an RAII guard that releases the slot when dropped
    pub fn into_guard(self) -> ReleaseGuard {
        ReleaseGuard { releaser: self }
    }
}

impl Debug for Releaser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Releaser")
            .field("generation", &self.generation)
            .field("released", &self.released.get())
            .finish()
    }
}

/// An RAII guard that releases its slot when dropped
#[derive(Debug)]
pub struct ReleaseGuard {
    releaser: Releaser,
}

impl ReleaseGuard {
    /// Immediately drops the guard, and consequently releases the slot.
    ///
    /// This function is equivalent to calling [`drop`] on the guard but is more self-documenting.
    pub fn unlock(self) {
        drop(self);
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.releaser.release();
    }
}

/// What a [Semaphore](super::Semaphore) grant resolves to
#[derive(Debug)]
pub struct Ticket {
    /// Frees this grant's slot
    pub releaser: Releaser,
    /// Slots still free right after this grant was made, ie. `max_concurrent - holders`
    /// counting this grant. With two slots the first grant sees 1 and the second sees 0.
    ///
    /// This is not the number of outstanding holders (`capacity - available`).
    pub remaining: usize,
}

impl Ticket {
    /// Shorthand for `self.releaser.release()`
    pub fn release(&self) {
        self.releaser.release();
    }
}
