mod common;

use completion_bridge::{Affinity, Progress, Reactor, WorkerPool};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_reactor_progress_preserves_order() {
    common::init_test_logging();

    let reactor = Reactor::new("ui").unwrap();
    let ui = reactor.handle();
    let pool = WorkerPool::new(2).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let progress = {
        let seen = seen.clone();
        let ui = ui.clone();
        Progress::new(Affinity::Affine(ui.clone()), move |percent: u32| {
            seen.lock().unwrap().push((percent, ui.is_current()));
        })
    };

    let producer = {
        let progress = progress.clone();
        pool.run(move || {
            for percent in 1..=100 {
                progress.report(percent);
            }
        })
    };

    producer.block_timeout(Duration::from_secs(5)).unwrap();
    ui.flush().block_timeout(Duration::from_secs(5)).unwrap();

    let seen = seen.lock().unwrap();
    let expected: Vec<_> = (1..=100).map(|percent| (percent, true)).collect();
    assert_eq!(*seen, expected);
}

#[test]
fn test_inline_progress_runs_on_reporting_thread() {
    let reporter = thread::current().id();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let progress = {
        let seen = seen.clone();
        Progress::new(Affinity::Indifferent, move |step: &'static str| {
            seen.lock().unwrap().push((step, thread::current().id()));
        })
    };

    progress.report("download");
    progress.report("unpack");

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("download", reporter), ("unpack", reporter)]
    );
}

#[test]
fn test_detached_progress_delivers_every_report() {
    let pool = WorkerPool::new(4).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let progress = {
        let seen = seen.clone();
        Progress::detached(pool.clone(), move |value: u32| {
            seen.lock().unwrap().push(value);
        })
    };

    for value in 0..50 {
        progress.report(value);
    }

    assert!(common::eventually(Duration::from_secs(5), || {
        seen.lock().unwrap().len() == 50
    }));

    let mut values = seen.lock().unwrap().clone();
    values.sort_unstable();
    assert_eq!(values, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_progress_to_closed_reactor_is_dropped() {
    let reactor = Reactor::new("gone").unwrap();
    let ui = reactor.handle();
    drop(reactor);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let progress = {
        let seen = seen.clone();
        Progress::new(Affinity::Affine(ui), move |value: u32| {
            seen.lock().unwrap().push(value);
        })
    };

    progress.report(1);

    assert!(seen.lock().unwrap().is_empty());
}
