//! The coop-sync cooperative runtime
//!
//! Everything runs on the thread that owns the [Runtime]. Tasks only give up control
//! at `.await` points, so lock state is never touched by two tasks at once.

use crate::error::RuntimeError;
use crate::job::JobHandle;
use async_task::Runnable;
use std::cell::{Cell, RefCell};
use std::future::Future;

thread_local! {
    pub(crate) static CURRENT: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// Builder to construct a [Runtime]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Construct a new [Builder] with default settings
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set how many tasks a single call to [Runtime::run] may poll before giving up
    pub fn poll_budget(mut self, budget: usize) -> Self {
        self.config.poll_budget = Some(budget);
        self
    }

    /// Build a [Runtime]
    pub fn build(self) -> Runtime {
        Runtime::new(self.config)
    }

    /// Build a [Runtime] and install it as the current thread's runtime, replacing
    /// any previous one
    pub fn apply(self) {
        let runtime = self.build();
        CURRENT.with_borrow_mut(|current| {
            *current = Some(runtime);
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration options for the [Runtime]
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of polls per call to [Runtime::run]. [None] means unbounded.
    ///
    /// Guards against tasks that keep rescheduling themselves forever.
    poll_budget: Option<usize>,
}

/// A very basic futures executor based on a channel. When tasks are woken, they
/// are scheduled by queuing them in the send half of the channel. The executor
/// drains the receive half and executes received tasks.
///
/// When a task is executed, the send half of the channel is passed along via
/// the task's Waker.
pub struct Runtime {
    /// Receives scheduled tasks. When a task is scheduled, the associated future
    /// is ready to make progress. This usually happens when a lock the task is
    /// waiting on has been granted to it.
    scheduled: flume::Receiver<Runnable>,

    /// Send half of the scheduled channel.
    sender: flume::Sender<Runnable>,

    /// Config for the runtime
    config: Config,

    /// Set while a future is being driven by [Runtime::block_on]
    is_blocking: Cell<bool>,
}

impl Runtime {
    pub(crate) fn new(config: Config) -> Self {
        let (sender, scheduled) = flume::unbounded();

        Self {
            scheduled,
            sender,
            config,
            is_blocking: Cell::new(false),
        }
    }

    /// Spawn a new async task that will be polled next time the scheduler runs
    pub fn spawn<F>(&self, future: F) -> JobHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let sender = self.sender.clone();
        let (runnable, task) = async_task::spawn_local(future, move |runnable| {
            // Don't try to send if disconnected, this only happens when runtime is being dropped
            if !sender.is_disconnected() {
                let _ = sender.send(runnable);
            }
        });

        runnable.schedule();

        JobHandle::new(task)
    }

    /// Runs a future to completion, polling other scheduled tasks as needed.
    ///
    /// # Errors
    ///
    /// Returns [RuntimeError::DeadlockDetected] if the future is still pending once
    /// there is nothing left to poll, eg. it waits on a lock nobody will release.
    /// Returns [RuntimeError::NestedBlockOn] if called from inside a blocked-on future.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, RuntimeError>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        if self.is_blocking.replace(true) {
            return Err(RuntimeError::NestedBlockOn);
        }

        let res = self.drive(self.spawn(future));
        self.is_blocking.set(false);
        res
    }

    fn drive<T>(&self, mut handle: JobHandle<T>) -> Result<T, RuntimeError> {
        let mut polled = 0;
        while !handle.is_complete() {
            if !self.try_poll_scheduled(&mut polled)? {
                return Err(RuntimeError::DeadlockDetected);
            }
        }

        handle.take_output().ok_or(RuntimeError::DeadlockDetected)
    }

    /// Poll scheduled tasks until none are ready to make progress
    ///
    /// # Errors
    ///
    /// Returns [RuntimeError::BudgetExhausted] if the configured poll budget runs out first
    pub fn run(&self) -> Result<(), RuntimeError> {
        let mut polled = 0;
        while self.try_poll_scheduled(&mut polled)? {}
        log::trace!("run finished after {polled} polls");

        Ok(())
    }

    /// Poll the next scheduled task, ignoring the poll budget.
    ///
    /// Returns whether there was a task to poll.
    pub fn poll_next(&self) -> bool {
        match self.scheduled.try_recv() {
            Ok(runnable) => {
                runnable.run();
                true
            }
            Err(_) => false,
        }
    }

    /// Attempts to poll the next scheduled task, ensuring that there is budget left
    ///
    /// Returns [Ok(true)] if a task was successfully polled
    /// Returns [Ok(false)] if there are no tasks ready to poll
    /// Returns [Err] if we have run out of budget
    fn try_poll_scheduled(&self, polled: &mut usize) -> Result<bool, RuntimeError> {
        if self.scheduled.is_empty() {
            return Ok(false);
        }

        if self
            .config
            .poll_budget
            .is_some_and(|budget| *polled >= budget)
        {
            return Err(RuntimeError::BudgetExhausted);
        }

        *polled += 1;
        Ok(self.poll_next())
    }
}
