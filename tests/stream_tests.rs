//! Execution stream end-to-end tests
//!
//! A started stream feeds every free worker; a stopped stream produces
//! nothing but never interrupts calls already in flight. Dropping a stream
//! stops it, cancels its token, and waits for in-flight calls to return.

use execpool::ExecutionPool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_stream_counts_executions() {
    let pool = ExecutionPool::with_workers(4).expect("valid worker count");
    let executed = Arc::new(AtomicUsize::new(0));
    let cancelled_seen = Arc::new(AtomicUsize::new(0));

    let ex = executed.clone();
    let cs = cancelled_seen.clone();
    let stream = pool.stream(move |cancel| {
        if cancel.is_cancelled() {
            cs.fetch_add(1, Ordering::SeqCst);
        } else {
            ex.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        }
    });

    stream.start();
    thread::sleep(Duration::from_millis(100));
    stream.stop();

    // The stream made progress, and no call observed the cancel flag
    // before stop: cancellation only happens at destruction.
    assert!(executed.load(Ordering::SeqCst) >= 1);
    assert_eq!(cancelled_seen.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stopped_stream_produces_nothing() {
    let pool = ExecutionPool::with_workers(2).expect("valid worker count");
    let executed = Arc::new(AtomicUsize::new(0));
    let ex = executed.clone();
    let stream = pool.stream(move |_cancel| {
        ex.fetch_add(1, Ordering::SeqCst);
    });

    // Never started.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    drop(stream);
}

#[test]
fn test_start_stop_start_round_trip() {
    let pool = ExecutionPool::with_workers(2).expect("valid worker count");
    let executed = Arc::new(AtomicUsize::new(0));
    let ex = executed.clone();
    let stream = pool.stream(move |_cancel| {
        ex.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
    });

    stream.start();
    thread::sleep(Duration::from_millis(30));
    stream.stop();
    let after_first_run = executed.load(Ordering::SeqCst);
    assert!(after_first_run >= 1);

    stream.start();
    assert!(stream.is_started());
    thread::sleep(Duration::from_millis(50));

    // The restarted stream keeps producing; nothing was lost by the
    // stop/start round trip.
    assert!(executed.load(Ordering::SeqCst) > after_first_run);
}

#[test]
fn test_drop_immediately_after_start() {
    let pool = ExecutionPool::with_workers(2).expect("valid worker count");
    let stream = pool.stream(|_cancel| {
        thread::sleep(Duration::from_millis(1));
    });

    stream.start();
    // Must stop production, wait out whatever is in flight, and return.
    drop(stream);
}

#[test]
fn test_drop_waits_for_inflight_call() {
    let pool = ExecutionPool::with_workers(2).expect("valid worker count");
    let finished = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(AtomicBool::new(false));

    let fin = finished.clone();
    let ent = entered.clone();
    let stream = pool.stream(move |_cancel| {
        ent.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        fin.store(true, Ordering::SeqCst);
    });

    stream.start();
    // Wait until at least one call is definitely in flight.
    while !entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    drop(stream);

    // Drop blocked until the in-flight call returned.
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_inflight_call_observes_cancel_on_drop() {
    let pool = ExecutionPool::with_workers(2).expect("valid worker count");
    let saw_cancel = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(AtomicBool::new(false));

    let saw = saw_cancel.clone();
    let ent = entered.clone();
    let stream = pool.stream(move |cancel| {
        ent.store(true, Ordering::SeqCst);
        // Spin until the destructor flips the flag.
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(1));
        }
        saw.store(true, Ordering::SeqCst);
    });

    stream.start();
    while !entered.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }

    // Without the destructor's cancel, the executee would never return and
    // this drop would never complete.
    drop(stream);
    assert!(saw_cancel.load(Ordering::SeqCst));
}
