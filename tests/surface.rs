mod common;

use completion_bridge::surface::Snapshot;
use completion_bridge::{Affinity, Reactor, Surface, ThreadTimer, create, current_context_id, delay};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_begin_and_finish_update_snapshot() {
    let surface = Surface::new();
    assert_eq!(surface.snapshot(), Snapshot::default());

    surface.begin();
    assert!(surface.is_loading());
    assert_eq!(surface.current_context_id(), current_context_id());

    surface.finish();
    assert!(!surface.is_loading());
}

#[test]
fn test_observers_see_every_change() {
    let surface = Surface::new();
    let changes = Arc::new(Mutex::new(Vec::new()));

    {
        let changes = changes.clone();
        surface.subscribe(move |snapshot| {
            changes.lock().unwrap().push(snapshot.is_loading);
        });
    }

    let (operation, resolver) = create::<u32>();
    surface.track(&operation, Affinity::Indifferent);
    resolver.resolve(1).unwrap();

    assert_eq!(*changes.lock().unwrap(), vec![true, false]);
}

#[test]
fn test_tracked_operation_finishes_on_reactor() {
    common::init_test_logging();

    let reactor = Reactor::new("ui").unwrap();
    let ui = reactor.handle();
    let timer = ThreadTimer::new().unwrap();
    let surface = Surface::new();

    let started_on = {
        let surface = surface.clone();
        let affinity = Affinity::Affine(ui.clone());
        ui.invoke(move || {
            let operation = delay(&timer, Duration::from_millis(20));
            surface.track(&operation, affinity);
            // Keep the timer alive until the delay has fired.
            operation.block_timeout(Duration::from_secs(5)).map(|_| current_context_id())
        })
        .block_timeout(Duration::from_secs(5))
        .unwrap()
        .unwrap()
    };

    ui.flush().block_timeout(Duration::from_secs(5)).unwrap();

    let snapshot = surface.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.current_context_id, started_on);
}

#[test]
fn test_tracked_operation_finishes_on_resolving_thread() {
    let surface = Surface::new();
    let (operation, resolver) = create::<()>();

    surface.track(&operation, Affinity::Indifferent);
    assert!(surface.is_loading());

    let resolved_on = std::thread::spawn(move || {
        resolver.resolve(()).unwrap();
        current_context_id()
    })
    .join()
    .unwrap();

    let snapshot = surface.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.current_context_id, resolved_on);
}
