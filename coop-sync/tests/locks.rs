use coop_sync::sync::{Mutex, MutexOptions, Semaphore, SemaphoreOptions, Ticket};
use coop_sync::task::yield_now;
use coop_sync::CancelledError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[coop_sync::test]
async fn mutex_three_lockers() {
    let mutex = Rc::new(Mutex::new());
    let resolved = Rc::new(Cell::new(0));

    let head = mutex.lock().await.unwrap();
    let mut handles = vec![];
    for _ in 0..3 {
        let mutex = mutex.clone();
        let resolved = resolved.clone();
        handles.push(coop_sync::spawn(async move {
            let releaser = mutex.lock().await.unwrap();
            resolved.set(resolved.get() + 1);
            releaser
        }));
    }

    yield_now().await;
    assert_eq!(0, resolved.get());
    assert_eq!(3, mutex.waiting());

    head.release();
    let first = handles.remove(0).await;
    first.release();
    let second = handles.remove(0).await;
    assert_eq!(2, resolved.get());
    assert!(mutex.is_locked());

    second.release();
    let third = handles.remove(0).await;
    third.release();

    assert_eq!(3, resolved.get());
    assert!(!mutex.is_locked());
}

#[coop_sync::test]
async fn semaphore_two_slots_three_acquirers() {
    let semaphore = Semaphore::new(2).unwrap();

    let Ticket { releaser: first, .. } = semaphore.acquire().await.unwrap();
    let Ticket { remaining, .. } = semaphore.acquire().await.unwrap();
    assert_eq!(0, remaining);
    assert_eq!(0, semaphore.available());

    let third = semaphore.acquire();
    assert_eq!(1, semaphore.waiting());

    first.release();
    let third = third.await.unwrap();
    assert_eq!(0, third.remaining);
    assert!(semaphore.is_locked());
}

#[coop_sync::test]
async fn cancel_wakes_waiting_tasks() {
    let cancelled = Rc::new(Cell::new(false));
    let mutex = Rc::new(Mutex::with_options(MutexOptions::new().on_cancel({
        let cancelled = cancelled.clone();
        move || cancelled.set(true)
    })));
    let _held = mutex.lock().await.unwrap();

    let results = Rc::new(RefCell::new(vec![]));
    for _ in 0..3 {
        let mutex = mutex.clone();
        let results = results.clone();
        coop_sync::spawn(async move {
            let res = mutex.lock().await;
            results.borrow_mut().push(res.map(|_| ()));
        })
        .detach();
    }
    yield_now().await;

    mutex.cancel_all_with(CancelledError::new("gone"));
    yield_now().await;

    assert!(cancelled.get());
    assert_eq!(vec![Err(CancelledError::new("gone")); 3], *results.borrow());
}

#[coop_sync::test]
async fn semaphore_guard_propagates_callback_error() {
    let releases = Rc::new(Cell::new(0));
    let semaphore = Semaphore::with_options(
        1,
        SemaphoreOptions::new().on_release({
            let releases = releases.clone();
            move || releases.set(releases.get() + 1)
        }),
    )
    .unwrap();

    let res = semaphore
        .guard(|_| async {
            Err::<(), _>(GuardError(std::io::Error::other("callback failed")))
        })
        .await;

    assert_eq!("callback failed", res.err().unwrap().0.to_string());
    assert_eq!(1, releases.get());
    assert!(!semaphore.is_locked());
}

struct GuardError(std::io::Error);

impl From<CancelledError> for GuardError {
    fn from(err: CancelledError) -> Self {
        GuardError(std::io::Error::other(err))
    }
}
