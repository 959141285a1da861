use completion_bridge::time::timeout;
use completion_bridge::{
    Affinity, Error, ManualTimer, State, Task, ThreadTimer, WorkerPool, create, delay,
};
use std::time::Duration;

#[test]
fn test_timeout_completes_before_deadline() {
    let timer = ThreadTimer::new().unwrap();
    let pool = WorkerPool::new(1).unwrap();

    let work = pool.run(|| {
        std::thread::sleep(Duration::from_millis(10));
        123
    });
    let bounded = timeout(&timer, Duration::from_millis(500), &work);

    let result = bounded.block_timeout(Duration::from_secs(5));
    assert!(
        matches!(result, Ok(v) if v == 123),
        "Timeout should return Ok(123)"
    );
}

#[test]
fn test_timeout_expires() {
    let timer = ThreadTimer::new().unwrap();
    let slow = delay(&timer, Duration::from_millis(300));

    let bounded = timeout(&timer, Duration::from_millis(20), &slow);

    let result = bounded.block_timeout(Duration::from_secs(5));
    assert!(
        matches!(result, Err(Error::TimedOut(_))),
        "Timeout should return an error when deadline is exceeded"
    );
    assert!(slow.is_pending(), "The bounded operation is left untouched");
}

#[test]
fn test_timeout_on_virtual_clock() {
    let timer = ManualTimer::new();
    let (operation, resolver) = create::<&'static str>();
    let bounded = timeout(&timer, Duration::from_secs(2), &operation);

    let flow = Task::start(async move { bounded.wait(Affinity::Indifferent).await });

    timer.advance(Duration::from_secs(1));
    assert!(flow.is_pending());

    timer.advance(Duration::from_secs(1));
    assert!(matches!(flow.block(), Err(Error::TimedOut(_))));

    resolver.resolve("late").unwrap();
    assert_eq!(operation.state(), State::Completed);
    assert!(matches!(flow.block(), Err(Error::TimedOut(_))));
}

#[test]
fn test_timeout_forwards_failure() {
    let timer = ManualTimer::new();
    let (operation, resolver) = create::<u32>();
    let bounded = timeout(&timer, Duration::from_secs(2), &operation);

    resolver.fail(Error::fault_message("lost connection")).unwrap();
    timer.advance(Duration::from_secs(5));

    assert!(matches!(bounded.block(), Err(Error::Faulted(_))));
}
