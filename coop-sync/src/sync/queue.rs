use super::release::{Release, Releaser, Ticket};
use crate::error::CancelledError;
use futures::channel::oneshot;
use futures::ready;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

pub(crate) type Hook = Box<dyn Fn()>;

/// Callbacks fired by an [AdmissionQueue]. Always invoked with no borrow of the queue state held.
#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) on_grant: Option<Hook>,
    pub(crate) on_release: Option<Hook>,
    pub(crate) on_cancel: Option<Hook>,
}

fn fire(hook: &Option<Hook>) {
    if let Some(hook) = hook {
        hook();
    }
}

type Waiter<E> = oneshot::Sender<Result<Ticket, E>>;

struct State<E> {
    capacity: usize,
    /// Slots that can be granted without queueing. Never exceeds `capacity`.
    available: usize,
    /// Bumped by every cancellation. Releasers from older generations are inert.
    generation: u64,
    /// Pending requests in grant order
    waiters: VecDeque<Waiter<E>>,
}

/// Bounded FIFO admission shared by [Mutex](super::Mutex) (capacity 1) and
/// [Semaphore](super::Semaphore).
///
/// Invariant: `waiters` is only non-empty while `available == 0`.
pub(crate) struct AdmissionQueue<E> {
    state: RefCell<State<E>>,
    hooks: Hooks,
}

impl<E: 'static> AdmissionQueue<E> {
    pub(crate) fn new(capacity: usize, hooks: Hooks) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(State {
                capacity,
                available: capacity,
                generation: 0,
                waiters: VecDeque::new(),
            }),
            hooks,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.state.borrow().capacity
    }

    pub(crate) fn available(&self) -> usize {
        self.state.borrow().available
    }

    /// Queued requests whose futures are still alive
    pub(crate) fn waiting(&self) -> usize {
        self.state
            .borrow()
            .waiters
            .iter()
            .filter(|waiter| !waiter.is_canceled())
            .count()
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.state.borrow().available == 0
    }

    /// Queue a request and grant it immediately if a slot is free.
    ///
    /// The grant (if any) happens before this returns, the returned future only delivers it.
    pub(crate) fn admit(self: &Rc<Self>) -> Acquire<E> {
        let (sender, receiver) = oneshot::channel();
        let queued = {
            let mut state = self.state.borrow_mut();
            state.waiters.push_back(sender);
            state.available == 0
        };

        if queued {
            log::trace!("request queued behind {} waiters", self.waiting() - 1);
        } else {
            self.dispatch();
        }

        Acquire::new(receiver)
    }

    /// Grant a slot only if one is free right now
    pub(crate) fn try_admit(self: &Rc<Self>) -> Option<Ticket> {
        let ticket = {
            let mut state = self.state.borrow_mut();
            if state.available == 0 {
                return None;
            }
            self.take_slot(&mut state)
        };

        log::trace!("granted slot, {} remaining", ticket.remaining);
        fire(&self.hooks.on_grant);
        Some(ticket)
    }

    /// Reject every queued waiter with `err` and reset to full capacity.
    ///
    /// Grants already delivered are not revoked, but their releasers stop having any effect.
    pub(crate) fn cancel_all(&self, err: E)
    where
        E: Clone,
    {
        let waiters = {
            let mut state = self.state.borrow_mut();
            state.available = state.capacity;
            state.generation = state.generation.wrapping_add(1);
            std::mem::take(&mut state.waiters)
        };

        log::debug!("cancelling {} waiters", waiters.len());
        for waiter in waiters {
            // A waiter whose future was dropped has nobody left to tell
            let _ = waiter.send(Err(err.clone()));
        }

        fire(&self.hooks.on_cancel);
    }

    fn take_slot(self: &Rc<Self>, state: &mut State<E>) -> Ticket {
        state.available -= 1;
        let lock: Rc<dyn Release> = self.clone();
        Ticket {
            releaser: Releaser::new(lock, state.generation),
            remaining: state.available,
        }
    }

    /// Hand free slots to queued waiters in FIFO order.
    ///
    /// Waiters whose futures were dropped are skipped and their slot goes to the next one.
    /// Sending a grant wakes the waiter, so it never happens while `state` is borrowed.
    fn dispatch(self: &Rc<Self>) {
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.available == 0 {
                    return;
                }
                let Some(waiter) = state.waiters.pop_front() else {
                    return;
                };
                let ticket = (!waiter.is_canceled()).then(|| self.take_slot(&mut state));
                (waiter, ticket)
            };

            let (waiter, Some(ticket)) = next else {
                continue;
            };
            let remaining = ticket.remaining;
            if waiter.send(Ok(ticket)).is_err() {
                self.state.borrow_mut().available += 1;
                continue;
            }

            log::trace!("granted queued request, {remaining} remaining");
            fire(&self.hooks.on_grant);
        }
    }
}

impl<E: 'static> Release for AdmissionQueue<E> {
    fn release(self: Rc<Self>, generation: u64) {
        {
            let mut state = self.state.borrow_mut();
            if state.generation != generation {
                log::debug!("ignoring release of a slot granted before cancellation");
                return;
            }
            state.available += 1;
            debug_assert!(state.available <= state.capacity);
        }

        log::trace!("slot released");
        fire(&self.hooks.on_release);
        self.dispatch();
    }
}

/// A [Future] that resolves once its request has been granted a slot, or fails
/// with `E` if the request was cancelled while queued.
///
/// The request is made when this future is created, not when it is first polled.
/// Dropping it while queued gives up its place in line. Dropping it after it was
/// granted but before it was polled to completion releases the slot.
#[must_use = "dropping this future gives up the request"]
pub struct Acquire<E> {
    receiver: Option<oneshot::Receiver<Result<Ticket, E>>>,
}

impl<E> Acquire<E> {
    fn new(receiver: oneshot::Receiver<Result<Ticket, E>>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }
}

impl<E: From<CancelledError>> Future for Acquire<E> {
    type Output = Result<Ticket, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let receiver = self
            .receiver
            .as_mut()
            .expect("Acquire polled after completion");

        let res = ready!(Pin::new(receiver).poll(cx));
        self.receiver = None;

        // The sender only disappears unanswered when the lock itself is gone
        Poll::Ready(res.unwrap_or_else(|oneshot::Canceled| Err(CancelledError::default().into())))
    }
}

impl<E> Drop for Acquire<E> {
    fn drop(&mut self) {
        let Some(mut receiver) = self.receiver.take() else {
            return;
        };

        receiver.close();
        if let Ok(Some(Ok(ticket))) = receiver.try_recv() {
            log::trace!("returning slot granted to a dropped request");
            ticket.releaser.release();
        }
    }
}
