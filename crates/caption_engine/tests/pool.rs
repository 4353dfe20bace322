use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use caption_engine::{PoolError, WorkerPool};

fn init_logging() {
    job_logging::initialize_for_tests();
}

#[test]
fn zero_sized_pool_is_rejected() {
    assert!(matches!(WorkerPool::new(0), Err(PoolError::ZeroSize)));
}

#[test]
fn runs_every_submitted_task() {
    init_logging();
    let pool = WorkerPool::new(3).unwrap();
    assert_eq!(pool.size(), 3);
    let (tx, rx) = mpsc::channel();
    for n in 0..10 {
        let tx = tx.clone();
        pool.submit(move || tx.send(n).unwrap()).unwrap();
    }
    drop(tx);
    let mut seen: Vec<i32> = rx.iter().collect();
    seen.sort();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

#[test]
fn never_runs_more_tasks_than_workers() {
    init_logging();
    let pool = WorkerPool::new(2).unwrap();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    for _ in 0..6 {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        let done_tx = done_tx.clone();
        pool.submit(move || {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            current.fetch_sub(1, Ordering::SeqCst);
            done_tx.send(()).unwrap();
        })
        .unwrap();
    }
    for _ in 0..6 {
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency was {peak}");
}

#[test]
fn single_worker_starts_tasks_in_submission_order() {
    init_logging();
    let pool = WorkerPool::new(1).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    for n in 0..5 {
        let order = Arc::clone(&order);
        pool.submit(move || order.lock().unwrap().push(n)).unwrap();
    }
    drop(pool);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn panicking_task_does_not_kill_the_worker() {
    init_logging();
    let pool = WorkerPool::new(1).unwrap();
    pool.submit(|| panic!("boom")).unwrap();
    let (tx, rx) = mpsc::channel();
    pool.submit(move || tx.send("still alive").unwrap()).unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "still alive"
    );
}

#[test]
fn counters_track_queued_and_active_tasks() {
    init_logging();
    let pool = WorkerPool::new(1).unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel();
    pool.submit(move || {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    })
    .unwrap();
    pool.submit(|| {}).unwrap();

    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(pool.active(), 1);
    assert_eq!(pool.queued(), 1);

    release_tx.send(()).unwrap();
    drop(pool);
}
