//! Errors emitted by coop-sync
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};

/// An Error returned by the [crate::runtime::Runtime]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RuntimeError {
    /// The configured poll budget for this call to [run](crate::runtime::Runtime::run) was consumed
    BudgetExhausted,
    /// The future passed to [block_on](crate::runtime::Runtime::block_on) can never complete
    /// because no other task is ready to make progress
    DeadlockDetected,
    /// [block_on](crate::runtime::Runtime::block_on) was called from inside a future that is
    /// already being blocked on
    NestedBlockOn,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::BudgetExhausted => {
                write!(f, "Ran out of poll budget for this run")
            }
            RuntimeError::DeadlockDetected => {
                write!(f, "Blocked future cannot make progress")
            }
            RuntimeError::NestedBlockOn => {
                write!(f, "Cannot block_on multiple futures at once")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Delivered to every queued waiter when a lock is cancelled.
///
/// Locks deliver [`CancelledError::default()`] unless a different error was
/// configured or passed to `cancel_all_with`.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct CancelledError {
    message: Cow<'static, str>,
}

impl CancelledError {
    const DEFAULT_MESSAGE: &'static str = "request for lock canceled";

    /// Construct a cancellation error carrying `message`
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message this error was constructed with
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for CancelledError {
    fn default() -> Self {
        Self {
            message: Cow::Borrowed(Self::DEFAULT_MESSAGE),
        }
    }
}

impl Display for CancelledError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CancelledError {}

/// Returned when a [Semaphore](crate::sync::Semaphore) is constructed with an invalid capacity
#[derive(Debug, PartialEq, Clone)]
pub enum CapacityError {
    /// The value was zero, negative, or truncates to zero
    NotPositive,
    /// The value was NaN or infinite
    NotFinite,
    /// The value could not be interpreted as a number at all
    NotANumber(String),
}

impl Display for CapacityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityError::NotPositive => {
                write!(f, "semaphore must be initialized to a positive value")
            }
            CapacityError::NotFinite => {
                write!(f, "semaphore capacity must be a finite number")
            }
            CapacityError::NotANumber(input) => {
                write!(f, "semaphore capacity {input:?} is not a number")
            }
        }
    }
}

impl std::error::Error for CapacityError {}
