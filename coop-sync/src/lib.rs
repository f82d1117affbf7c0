#![warn(missing_docs)]
//! FIFO locks for single-threaded cooperative async code
//!
//! [Mutex](sync::Mutex) admits one holder at a time, [Semaphore](sync::Semaphore) up to N.
//! Both grant requests strictly in the order they were made and hand out a
//! [Releaser](sync::Releaser) per grant that must be called to free the slot.
//!
//! # Getting Started
//!
//! Add `coop-sync` to your `Cargo.toml`
//! ```toml
//! [dependencies]
//! coop-sync = "0.1.0"
//! ```
//!
//! Locks work with any single-threaded executor. This crate ships a small one:
//!
//! ```
//! use std::rc::Rc;
//! use coop_sync::sync::Semaphore;
//!
//! coop_sync::initialize();
//!
//! let semaphore = Rc::new(Semaphore::new(2).unwrap());
//! for id in 0..4 {
//!     let semaphore = semaphore.clone();
//!     coop_sync::spawn(async move {
//!         semaphore
//!             .guard(|remaining| async move {
//!                 println!("task {id} running, {remaining} slots left");
//!                 Ok::<_, coop_sync::CancelledError>(())
//!             })
//!             .await
//!     })
//!     .detach();
//! }
//!
//! coop_sync::run().unwrap();
//! ```
//!
//! # The [#[coop_sync::test]][test] macro
//! ```
//! #[coop_sync::test]
//! async fn locks_in_order() {
//!     let mutex = coop_sync::sync::Mutex::new();
//!     mutex.lock().await.unwrap().release();
//! }
//! ```
//!
//! This expands to roughly the following:
//!
//! ```
//! #[test]
//! fn locks_in_order() {
//!     coop_sync::initialize();
//!     coop_sync::block_on(async move {
//!         let mutex = coop_sync::sync::Mutex::new();
//!         mutex.lock().await.unwrap().release();
//!     })
//!     .expect("test future did not complete");
//! }
//! ```

pub mod error;
pub mod job;
pub mod runtime;
pub mod sync;
pub mod task;

pub use coop_sync_macros::test;
pub use error::{CancelledError, CapacityError, RuntimeError};

use crate::job::JobHandle;
use crate::runtime::{Runtime, CURRENT};
use std::future::Future;

/// Install a default [Runtime] on the current thread, replacing any previous one
pub fn initialize() {
    runtime::Builder::new().apply()
}

/// Run `f` with the current thread's [Runtime]
///
/// # Panics
///
/// Panics if no runtime was installed with [initialize] or [runtime::Builder::apply]
pub fn with_runtime<F, R>(f: F) -> R
where
    F: FnOnce(&Runtime) -> R,
{
    CURRENT.with_borrow(|runtime| {
        let runtime = runtime
            .as_ref()
            .expect("coop-sync runtime not initialized, call coop_sync::initialize() first");
        f(runtime)
    })
}

/// Spawn a new async task on the current thread's runtime
pub fn spawn<F>(future: F) -> JobHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    with_runtime(|runtime| runtime.spawn(future))
}

/// Poll tasks on the current thread's runtime until none are ready.
///
/// See [Runtime::run]
pub fn run() -> Result<(), RuntimeError> {
    with_runtime(|runtime| runtime.run())
}

/// Run a future to completion on the current thread's runtime.
///
/// See [Runtime::block_on]
pub fn block_on<F>(future: F) -> Result<F::Output, RuntimeError>
where
    F: Future + 'static,
    F::Output: 'static,
{
    with_runtime(|runtime| runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    pub(crate) fn init_test() {
        crate::initialize();
    }
}
