use super::queue::{Acquire, AdmissionQueue};
use super::release::Releaser;
use super::MutexOptions;
use crate::error::CancelledError;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// An async mutex
///
/// Locks will be acquired in the order they are requested. A lock is requested
/// when [lock](Mutex::lock) is called, so the mutex reports itself locked before
/// the returned future is ever polled.
///
/// `E` is the error delivered to waiters by [cancel_all](Mutex::cancel_all), see
/// [MutexOptions::error_cancelled].
///
/// # Examples
/// ```
/// # use std::rc::Rc;
/// # use coop_sync::sync::Mutex;
/// # coop_sync::initialize();
/// let mutex = Rc::new(Mutex::new());
/// coop_sync::spawn(async move {
///     let releaser = mutex.lock().await.unwrap();
///     // critical section
///     releaser.release();
/// }).detach();
/// # coop_sync::run().unwrap();
/// ```
pub struct Mutex<E = CancelledError> {
    queue: Rc<AdmissionQueue<E>>,
    error_cancelled: Option<E>,
}

impl Mutex {
    /// Construct a new [Mutex] in the unlocked state
    pub fn new() -> Self {
        Self::with_options(MutexOptions::new())
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Mutex<E>
where
    E: Clone + From<CancelledError> + 'static,
{
    /// Construct a new [Mutex] in the unlocked state with the given hooks and cancellation error
    pub fn with_options(options: MutexOptions<E>) -> Self {
        let (hooks, error_cancelled) = options.into_parts();
        Self {
            queue: AdmissionQueue::new(1, hooks),
            error_cancelled,
        }
    }

    /// Acquire the mutex.
    ///
    /// Resolves to a [Releaser] that must be called to unlock the mutex, or to `E`
    /// if the request is cancelled while waiting.
    pub fn lock(&self) -> Lock<E> {
        Lock {
            inner: self.queue.admit(),
        }
    }

    /// Try to acquire the mutex.
    ///
    /// If the mutex could not be acquired at this time return [`None`], otherwise
    /// returns the [Releaser] for the lock. Never queues.
    pub fn try_lock(&self) -> Option<Releaser> {
        self.queue.try_admit().map(|ticket| ticket.releaser)
    }

    /// Lock the mutex, run `f`, then unlock.
    ///
    /// The mutex is unlocked however `f` finishes: returning, failing, panicking or
    /// being dropped mid-await. Errors from `f` are returned as they are; a
    /// cancellation while waiting for the lock is converted into `Ex`.
    pub fn guard<F, Fut, T, Ex>(&self, f: F) -> impl Future<Output = Result<T, Ex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Ex>>,
        Ex: From<E>,
    {
        let lock = self.lock();
        async move {
            let _guard = lock.await?.into_guard();
            f().await
        }
    }

    /// Reject every waiting [lock](Mutex::lock) request with the configured
    /// cancellation error and force the mutex back to unlocked.
    ///
    /// Whoever currently holds the lock keeps running, but their [Releaser] no longer does anything.
    pub fn cancel_all(&self) {
        let err = self
            .error_cancelled
            .clone()
            .unwrap_or_else(|| CancelledError::default().into());
        self.queue.cancel_all(err);
    }

    /// Like [cancel_all](Mutex::cancel_all) but rejects waiters with `err`
    pub fn cancel_all_with(&self, err: E) {
        self.queue.cancel_all(err);
    }

    /// Whether the mutex is currently held or promised to a waiter
    pub fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }

    /// Number of [lock](Mutex::lock) requests waiting in line
    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }
}

/// A [Future] that resolves once the [Mutex] is locked for this caller
#[must_use = "dropping this future gives up the request"]
pub struct Lock<E> {
    inner: Acquire<E>,
}

impl<E: From<CancelledError>> Future for Lock<E> {
    type Output = Result<Releaser, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map_ok(|ticket| ticket.releaser)
    }
}
