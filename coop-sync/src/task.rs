//! Utilities for cooperating with other tasks

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [yield_now]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Give every other scheduled task a chance to run before continuing
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}
