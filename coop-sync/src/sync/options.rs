use super::queue::{Hook, Hooks};
use crate::error::CancelledError;

/// Configuration for a [Mutex](super::Mutex)
///
/// # Examples
/// ```
/// # use coop_sync::sync::{Mutex, MutexOptions};
/// let mutex = Mutex::with_options(
///     MutexOptions::new()
///         .on_lock(|| println!("locked"))
///         .on_release(|| println!("released")),
/// );
/// # let _ = mutex;
/// ```
pub struct MutexOptions<E = CancelledError> {
    on_lock: Option<Hook>,
    on_release: Option<Hook>,
    on_cancel: Option<Hook>,
    error_cancelled: Option<E>,
}

impl MutexOptions {
    /// Construct [MutexOptions] with no hooks and the default cancellation error
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E> Default for MutexOptions<E> {
    fn default() -> Self {
        Self {
            on_lock: None,
            on_release: None,
            on_cancel: None,
            error_cancelled: None,
        }
    }
}

impl<E> MutexOptions<E> {
    /// Called whenever the mutex is granted to a caller, whether immediately or
    /// after waiting in line
    pub fn on_lock(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_lock = Some(Box::new(hook));
        self
    }

    /// Called the first time a releaser is used
    pub fn on_release(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Called once after every [cancel_all](super::Mutex::cancel_all)
    pub fn on_cancel(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Error delivered to queued waiters on cancellation.
    ///
    /// This also decides the error type of the resulting [Mutex](super::Mutex).
    pub fn error_cancelled<E2>(self, err: E2) -> MutexOptions<E2> {
        MutexOptions {
            on_lock: self.on_lock,
            on_release: self.on_release,
            on_cancel: self.on_cancel,
            error_cancelled: Some(err),
        }
    }

    pub(crate) fn into_parts(self) -> (Hooks, Option<E>) {
        let hooks = Hooks {
            on_grant: self.on_lock,
            on_release: self.on_release,
            on_cancel: self.on_cancel,
        };
        (hooks, self.error_cancelled)
    }
}

/// Configuration for a [Semaphore](super::Semaphore)
pub struct SemaphoreOptions<E = CancelledError> {
    on_acquire: Option<Hook>,
    on_release: Option<Hook>,
    on_cancel: Option<Hook>,
    error_cancelled: Option<E>,
}

impl SemaphoreOptions {
    /// Construct [SemaphoreOptions] with no hooks and the default cancellation error
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E> Default for SemaphoreOptions<E> {
    fn default() -> Self {
        Self {
            on_acquire: None,
            on_release: None,
            on_cancel: None,
            error_cancelled: None,
        }
    }
}

impl<E> SemaphoreOptions<E> {
    /// Called synchronously on every call to [acquire](super::Semaphore::acquire),
    /// before the request is granted or queued.
    ///
    /// Unlike [MutexOptions::on_lock] this does not mean a slot was granted: if the
    /// semaphore was already locked the request is still waiting when this fires.
    pub fn on_acquire(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_acquire = Some(Box::new(hook));
        self
    }

    /// Called the first time a releaser is used
    pub fn on_release(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Called once after every [cancel_all](super::Semaphore::cancel_all)
    pub fn on_cancel(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Error delivered to queued waiters on cancellation.
    ///
    /// This also decides the error type of the resulting [Semaphore](super::Semaphore).
    pub fn error_cancelled<E2>(self, err: E2) -> SemaphoreOptions<E2> {
        SemaphoreOptions {
            on_acquire: self.on_acquire,
            on_release: self.on_release,
            on_cancel: self.on_cancel,
            error_cancelled: Some(err),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<Hook>, Hooks, Option<E>) {
        let hooks = Hooks {
            on_grant: None,
            on_release: self.on_release,
            on_cancel: self.on_cancel,
        };
        (self.on_acquire, hooks, self.error_cancelled)
    }
}
