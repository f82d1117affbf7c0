//! See [JobHandle]

use async_task::Task;
use futures::task::noop_waker_ref;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Reference to a [Future] that has been scheduled via [spawn](crate::runtime::Runtime::spawn)
///
/// Dropping a [`JobHandle`] cancels it, which means its future won't be polled again.
/// To drop the [`JobHandle`] handle without canceling it, use [detach()](JobHandle::detach) instead.
/// To cancel a task gracefully and wait until it is fully destroyed, use the [cancel()](JobHandle::cancel) method
///
/// This type implements [Future] to allow awaiting on the result of the spawned task
pub struct JobHandle<T> {
    task: Task<T>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(task: Task<T>) -> Self {
        Self { task }
    }

    /// Cancels the task and waits for it to stop running.
    ///
    /// Returns the task's output if it was completed just before it got canceled, or [`None`] if
    /// it didn't complete.
    ///
    /// While it's possible to simply drop the [`JobHandle`] to cancel it, this is a cleaner way of
    /// canceling because it also waits for the task to stop running.
    pub async fn cancel(self) -> Option<T> {
        self.task.cancel().await
    }

    /// Detaches the task to let it keep running in the background.
    pub fn detach(self) {
        self.task.detach()
    }

    /// Check whether this job has completed
    pub fn is_complete(&self) -> bool {
        self.task.is_finished()
    }

    /// Take the output of a completed job without registering interest in wakeups
    pub(crate) fn take_output(&mut self) -> Option<T> {
        if !self.is_complete() {
            return None;
        }

        let mut cx = Context::from_waker(noop_waker_ref());
        match Pin::new(&mut self.task).poll(&mut cx) {
            Poll::Ready(res) => Some(res),
            Poll::Pending => None,
        }
    }
}

impl<T> Future for JobHandle<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx)
    }
}
