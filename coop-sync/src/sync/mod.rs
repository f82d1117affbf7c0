//! Synchronization primitives for cooperative async contexts
//!
//! [Mutex] and [Semaphore] share one FIFO admission queue: requests are granted in the
//! order they are made, and every grant hands out a [Releaser] that frees the slot.

mod queue;
pub use queue::Acquire;

mod release;
pub use release::*;

mod options;
pub use options::*;

mod mutex;
pub use mutex::*;

mod semaphore;
pub use semaphore::*;
