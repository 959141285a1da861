mod common;

use completion_bridge::{
    Affinity, Error, ManualTimer, Runtime, RuntimeBuilder, State, current_context_id,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_builder_creation() {
    let rt = RuntimeBuilder::new().build().unwrap();
    drop(rt);
}

#[test]
fn test_builder_simple_future() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let completed = Arc::new(Mutex::new(false));
    let completed_clone = completed.clone();

    rt.block_on(async move {
        *completed_clone.lock().unwrap() = true;
        Ok(())
    })
    .unwrap();

    assert!(*completed.lock().unwrap(), "Future should have completed");
}

#[test]
fn test_builder_immediate_result() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let value = 42;

    let result = rt.block_on(async move { Ok(value) }).unwrap();

    assert_eq!(result, 42, "Future should return correct value");
}

#[test]
fn test_builder_multiple_instances() {
    let rt1 = RuntimeBuilder::new().reactor_name("first").build().unwrap();
    let rt2 = RuntimeBuilder::new().reactor_name("second").build().unwrap();

    let result1 = rt1.block_on(async { Ok(current_context_id()) }).unwrap();
    let result2 = rt2.block_on(async { Ok(current_context_id()) }).unwrap();

    assert!(result1.starts_with("reactor:first#"));
    assert!(result2.starts_with("reactor:second#"));
}

#[test]
fn test_builder_configures_pool() {
    let rt = Runtime::builder()
        .pool_name("crunch")
        .worker_threads(3)
        .build()
        .unwrap();

    assert_eq!(rt.pool().workers(), 3);

    let name = rt
        .pool()
        .run(|| std::thread::current().name().map(str::to_owned))
        .block_timeout(Duration::from_secs(5))
        .unwrap();
    assert!(name.unwrap().starts_with("crunch-"));
}

#[test]
fn test_zero_workers_is_raised_to_one() {
    let rt = RuntimeBuilder::new().worker_threads(0).build().unwrap();

    assert_eq!(rt.pool().workers(), 1);
}

#[test]
fn test_block_on_propagates_error() {
    let rt = Runtime::new().unwrap();

    let result: completion_bridge::Result<u32> =
        rt.block_on(async { Err(Error::fault_message("nope")) });

    assert!(matches!(result, Err(Error::Faulted(_))));
}

#[test]
fn test_block_on_awaits_runtime_delay() {
    common::init_test_logging();

    let rt = Runtime::new().unwrap();
    let delayed = rt.delay(Duration::from_millis(20));
    let ui = rt.reactor();

    let resumed_on_reactor = rt
        .block_on(async move {
            delayed.wait(Affinity::Affine(ui.clone())).await?;
            Ok(ui.is_current())
        })
        .unwrap();

    assert!(resumed_on_reactor);
}

#[test]
fn test_block_on_waits_for_spawned_tasks() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let state = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let state_clone = state.clone();
        let _ = rt.reactor().spawn(async move {
            state_clone.lock().unwrap().push(i);
            Ok(())
        });
    }

    rt.block_on(async { Ok(()) }).unwrap();

    assert_eq!(
        *state.lock().unwrap(),
        vec![0, 1, 2],
        "Spawned tasks should run in order before block_on returns"
    );
}

#[test]
fn test_builder_with_manual_timer() {
    let timer = Arc::new(ManualTimer::new());
    let rt = RuntimeBuilder::new().timer(timer.clone()).build().unwrap();

    let delayed = rt.delay(Duration::from_secs(3));
    assert!(delayed.is_pending());

    timer.advance(Duration::from_secs(3));
    assert_eq!(delayed.state(), State::Completed);
}

#[test]
fn test_runtime_naive_delay_completes() {
    let rt = RuntimeBuilder::new().worker_threads(1).build().unwrap();

    let delayed = rt.delay_naive(Duration::from_millis(20));

    delayed.block_timeout(Duration::from_secs(5)).unwrap();
}
