use super::queue::{Acquire, AdmissionQueue, Hook};
use super::release::Ticket;
use super::SemaphoreOptions;
use crate::error::{CancelledError, CapacityError};
use std::future::Future;
use std::rc::Rc;

/// The number of concurrent holders a [Semaphore] admits. Always at least 1.
///
/// Built from integers, floats (truncated toward zero) or numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity(usize);

impl Capacity {
    /// The capacity as a plain count
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for Capacity {
    type Error = CapacityError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(CapacityError::NotPositive);
        }
        Ok(Self(value))
    }
}

impl TryFrom<u32> for Capacity {
    type Error = CapacityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from(value as usize)
    }
}

impl TryFrom<i32> for Capacity {
    type Error = CapacityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Capacity {
    type Error = CapacityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(CapacityError::NotPositive);
        }
        Self::try_from(usize::try_from(value).unwrap_or(usize::MAX))
    }
}

impl TryFrom<f64> for Capacity {
    type Error = CapacityError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(CapacityError::NotFinite);
        }
        let value = value.trunc();
        if value < 1.0 {
            return Err(CapacityError::NotPositive);
        }
        // `as` saturates for values past usize::MAX
        Self::try_from(value as usize)
    }
}

impl TryFrom<&str> for Capacity {
    type Error = CapacityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|_| CapacityError::NotANumber(value.to_owned()))?;
        Self::try_from(parsed)
    }
}

/// An async counting semaphore
///
/// Admits up to [max_concurrent](Semaphore::max_concurrent) holders at once. Further
/// requests wait in line and are granted in the order they were made.
///
/// # Examples
/// ```
/// # use std::rc::Rc;
/// # use coop_sync::sync::{Semaphore, Ticket};
/// # coop_sync::initialize();
/// let semaphore = Rc::new(Semaphore::new(2).unwrap());
/// for _ in 0..4 {
///     let semaphore = semaphore.clone();
///     coop_sync::spawn(async move {
///         let Ticket { releaser, remaining } = semaphore.acquire().await.unwrap();
///         assert!(remaining < 2);
///         releaser.release();
///     }).detach();
/// }
/// # coop_sync::run().unwrap();
/// ```
pub struct Semaphore<E = CancelledError> {
    queue: Rc<AdmissionQueue<E>>,
    on_acquire: Option<Hook>,
    error_cancelled: Option<E>,
}

impl Semaphore {
    /// Construct a [Semaphore] admitting `max_concurrent` holders at once
    ///
    /// # Errors
    ///
    /// Returns [CapacityError] if `max_concurrent` is not a positive number
    pub fn new<C>(max_concurrent: C) -> Result<Self, CapacityError>
    where
        C: TryInto<Capacity, Error = CapacityError>,
    {
        Self::with_options(max_concurrent, SemaphoreOptions::new())
    }
}

impl Default for Semaphore {
    /// A semaphore with a single slot
    fn default() -> Self {
        Self::from_capacity(Capacity(1), SemaphoreOptions::new())
    }
}

impl<E> Semaphore<E>
where
    E: Clone + From<CancelledError> + 'static,
{
    /// Construct a [Semaphore] admitting `max_concurrent` holders at once, with the
    /// given hooks and cancellation error
    ///
    /// # Errors
    ///
    /// Returns [CapacityError] if `max_concurrent` is not a positive number
    pub fn with_options<C>(
        max_concurrent: C,
        options: SemaphoreOptions<E>,
    ) -> Result<Self, CapacityError>
    where
        C: TryInto<Capacity, Error = CapacityError>,
    {
        let capacity = max_concurrent.try_into()?;
        Ok(Self::from_capacity(capacity, options))
    }

    fn from_capacity(capacity: Capacity, options: SemaphoreOptions<E>) -> Self {
        let (on_acquire, hooks, error_cancelled) = options.into_parts();
        Self {
            queue: AdmissionQueue::new(capacity.get(), hooks),
            on_acquire,
            error_cancelled,
        }
    }

    /// Request one slot.
    ///
    /// The request is made (and granted if a slot is free) right away. `on_acquire`
    /// fires before anything else, whether or not this request ends up waiting.
    pub fn acquire(&self) -> Acquire<E> {
        if let Some(hook) = &self.on_acquire {
            hook();
        }
        self.queue.admit()
    }

    /// Take a slot only if one is free right now. Never queues.
    pub fn try_acquire(&self) -> Option<Ticket> {
        let ticket = self.queue.try_admit()?;
        if let Some(hook) = &self.on_acquire {
            hook();
        }
        Some(ticket)
    }

    /// Acquire a slot, run `f` with the number of slots left free, then release.
    ///
    /// The slot is released however `f` finishes. Errors from `f` are returned as
    /// they are; a cancellation while waiting is converted into `Ex`.
    pub fn guard<F, Fut, T, Ex>(&self, f: F) -> impl Future<Output = Result<T, Ex>>
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = Result<T, Ex>>,
        Ex: From<E>,
    {
        let acquire = self.acquire();
        async move {
            let Ticket {
                releaser,
                remaining,
            } = acquire.await?;
            let _guard = releaser.into_guard();
            f(remaining).await
        }
    }

    /// Reject every waiting request with the configured cancellation error and
    /// reset to full capacity.
    ///
    /// Current holders are not interrupted, but their releasers no longer do anything.
    pub fn cancel_all(&self) {
        let err = self
            .error_cancelled
            .clone()
            .unwrap_or_else(|| CancelledError::default().into());
        self.queue.cancel_all(err);
    }

    /// Maximum number of concurrent holders
    pub fn max_concurrent(&self) -> usize {
        self.queue.capacity()
    }

    /// Slots that can be granted without waiting
    pub fn available(&self) -> usize {
        self.queue.available()
    }

    /// Number of requests waiting in line
    pub fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    /// Whether every slot is taken
    pub fn is_locked(&self) -> bool {
        self.queue.is_locked()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::task::yield_now;
    use futures::FutureExt;
    use rstest::rstest;
    use std::cell::{Cell, RefCell};

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn admits_exactly_capacity(#[case] capacity: usize) {
        let semaphore = Semaphore::new(capacity).unwrap();
        let tickets = (0..capacity)
            .map(|_| semaphore.try_acquire().unwrap())
            .collect::<Vec<_>>();

        assert!(semaphore.is_locked());
        assert!(semaphore.try_acquire().is_none());

        let mut queued = semaphore.acquire();
        assert!((&mut queued).now_or_never().is_none());
        assert_eq!(1, semaphore.waiting());

        tickets[0].release();
        assert!(queued.now_or_never().unwrap().is_ok());
    }

    #[rstest]
    #[case(5, 5)]
    #[case(5u32, 5)]
    #[case(2.9, 2)]
    #[case(1.0, 1)]
    #[case("3", 3)]
    fn valid_capacities<C>(#[case] input: C, #[case] expected: usize)
    where
        C: TryInto<Capacity, Error = CapacityError>,
    {
        assert_eq!(expected, Semaphore::new(input).unwrap().max_concurrent());
    }

    #[rstest]
    #[case(0, CapacityError::NotPositive)]
    #[case(-1, CapacityError::NotPositive)]
    #[case(0.5, CapacityError::NotPositive)]
    #[case(f64::NAN, CapacityError::NotFinite)]
    #[case(f64::INFINITY, CapacityError::NotFinite)]
    #[case("x", CapacityError::NotANumber("x".to_owned()))]
    fn invalid_capacities<C>(#[case] input: C, #[case] expected: CapacityError)
    where
        C: TryInto<Capacity, Error = CapacityError>,
    {
        assert_eq!(Some(expected), Semaphore::new(input).err());
    }

    #[test]
    fn default_has_one_slot() {
        let semaphore = Semaphore::default();
        assert_eq!(1, semaphore.max_concurrent());
        assert!(!semaphore.is_locked());
    }

    #[test]
    fn third_acquire_waits_for_release() {
        let semaphore = Semaphore::new(2).unwrap();

        let first = semaphore.acquire().now_or_never().unwrap().unwrap();
        let second = semaphore.acquire().now_or_never().unwrap().unwrap();
        assert_eq!(1, first.remaining);
        assert_eq!(0, second.remaining);
        assert_eq!(0, semaphore.available());

        let mut third = semaphore.acquire();
        assert!((&mut third).now_or_never().is_none());

        first.release();
        let third = third.now_or_never().unwrap().unwrap();
        assert_eq!(0, third.remaining);
        // The freed slot went straight to the third request
        assert!(semaphore.is_locked());

        second.release();
        third.release();
        assert_eq!(2, semaphore.available());
    }

    #[test]
    fn double_release_is_noop() {
        let semaphore = Semaphore::new(2).unwrap();
        let ticket = semaphore.try_acquire().unwrap();

        ticket.release();
        ticket.release();
        ticket.releaser.release();

        assert_eq!(2, semaphore.available());
    }

    #[test]
    fn on_acquire_fires_even_when_queued() {
        let acquires = Rc::new(Cell::new(0));
        let semaphore = Semaphore::with_options(
            1,
            SemaphoreOptions::new().on_acquire({
                let acquires = acquires.clone();
                move || acquires.set(acquires.get() + 1)
            }),
        )
        .unwrap();

        let _first = semaphore.acquire();
        let _second = semaphore.acquire();

        assert_eq!(2, acquires.get());
        assert_eq!(1, semaphore.waiting());

        // A failed try_acquire is not an acquisition
        assert!(semaphore.try_acquire().is_none());
        assert_eq!(2, acquires.get());
    }

    #[test]
    fn on_acquire_sees_state_before_request() {
        let seen = Rc::new(RefCell::new(vec![]));
        let semaphore: Rc<RefCell<Option<Rc<Semaphore>>>> = Default::default();
        let options = SemaphoreOptions::new().on_acquire({
            let seen = seen.clone();
            let semaphore = semaphore.clone();
            move || {
                let available = semaphore.borrow().as_ref().map(|s| s.available());
                seen.borrow_mut().push(available);
            }
        });
        let created = Rc::new(Semaphore::with_options(1, options).unwrap());
        *semaphore.borrow_mut() = Some(created.clone());

        let _first = created.acquire();
        let _second = created.acquire();

        assert_eq!(vec![Some(1), Some(0)], *seen.borrow());
        // Break the Rc cycle through the hook
        semaphore.borrow_mut().take();
    }

    #[test]
    fn cancel_all_resets_capacity() {
        let cancels = Rc::new(Cell::new(0));
        let semaphore = Semaphore::with_options(
            2,
            SemaphoreOptions::new()
                .on_cancel({
                    let cancels = cancels.clone();
                    move || cancels.set(cancels.get() + 1)
                })
                .error_cancelled(CancelledError::new("stopping")),
        )
        .unwrap();

        let held = [semaphore.acquire(), semaphore.acquire()]
            .map(|acquire| acquire.now_or_never().unwrap().unwrap());
        let waiters = [semaphore.acquire(), semaphore.acquire()];
        assert_eq!(2, semaphore.waiting());

        semaphore.cancel_all();

        assert_eq!(1, cancels.get());
        assert_eq!(0, semaphore.waiting());
        assert_eq!(2, semaphore.available());
        for waiter in waiters {
            assert_eq!("stopping", waiter.now_or_never().unwrap().unwrap_err().message());
        }

        // Releasing slots granted before the cancellation cannot overfill the semaphore
        for ticket in &held {
            ticket.release();
        }
        assert_eq!(2, semaphore.available());
    }

    #[test]
    fn guard_passes_remaining_and_releases() {
        crate::tests::init_test();

        let semaphore = Rc::new(Semaphore::new(3).unwrap());
        let seen = Rc::new(RefCell::new(vec![]));
        for _ in 0..4 {
            let semaphore = semaphore.clone();
            let seen = seen.clone();
            crate::spawn(async move {
                semaphore
                    .guard(|remaining| async move {
                        seen.borrow_mut().push(remaining);
                        yield_now().await;
                        Ok::<_, CancelledError>(())
                    })
                    .await
                    .unwrap();
            })
            .detach();
        }

        crate::run().unwrap();

        // The fourth request got the slot freed by the first
        assert_eq!(vec![2, 1, 0, 0], *seen.borrow());
        assert_eq!(3, semaphore.available());
    }

    #[test]
    fn concurrency_never_exceeds_capacity() {
        crate::tests::init_test();

        let semaphore = Rc::new(Semaphore::new(3).unwrap());
        let active = Rc::new(Cell::new(0));
        let peak = Rc::new(Cell::new(0));
        for _ in 0..20 {
            let semaphore = semaphore.clone();
            let active = active.clone();
            let peak = peak.clone();
            crate::spawn(async move {
                let ticket = semaphore.acquire().await.unwrap();
                active.set(active.get() + 1);
                peak.set(peak.get().max(active.get()));
                yield_now().await;
                yield_now().await;
                active.set(active.get() - 1);
                ticket.release();
            })
            .detach();
        }

        crate::run().unwrap();

        assert_eq!(3, peak.get());
        assert_eq!(3, semaphore.available());
    }
}
