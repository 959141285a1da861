use completion_bridge::{ManualTimer, ThreadTimer, Timer};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[test]
fn test_thread_timer_fires_after_duration() {
    let timer = ThreadTimer::new().unwrap();
    let (tx, rx) = mpsc::channel();

    let start = Instant::now();
    timer.after(
        Duration::from_millis(50),
        Box::new(move || {
            tx.send(std::thread::current().name().map(str::to_owned))
                .unwrap();
        }),
    );

    let fired_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(
        start.elapsed() >= Duration::from_millis(50),
        "Timer should wait at least the specified duration"
    );
    assert_eq!(fired_on.as_deref(), Some("timer"));
    assert_eq!(timer.pending(), 0);
}

#[test]
fn test_thread_timer_fires_in_deadline_order() {
    let timer = ThreadTimer::new().unwrap();
    let (tx, rx) = mpsc::channel();

    for (label, millis) in [("slow", 80), ("fast", 10), ("medium", 40)] {
        let tx = tx.clone();
        timer.after(
            Duration::from_millis(millis),
            Box::new(move || {
                tx.send(label).unwrap();
            }),
        );
    }

    let order: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(order, vec!["fast", "medium", "slow"]);
}

#[test]
fn test_thread_timer_zero_duration() {
    let timer = ThreadTimer::new().unwrap();
    let (tx, rx) = mpsc::channel();

    timer.after(Duration::ZERO, Box::new(move || tx.send(()).unwrap()));

    assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
}

#[test]
fn test_dropped_thread_timer_never_fires() {
    let timer = ThreadTimer::new().unwrap();
    let (tx, rx) = mpsc::channel::<()>();

    timer.after(Duration::from_millis(20), Box::new(move || tx.send(()).unwrap()));
    drop(timer);

    // The sender is dropped along with the callback.
    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(200)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn test_manual_timer_only_moves_when_advanced() {
    let timer = ManualTimer::new();
    let fired = Arc::new(Mutex::new(Vec::new()));

    for (label, secs) in [("b", 2), ("a", 1), ("c", 2)] {
        let fired = fired.clone();
        timer.after(
            Duration::from_secs(secs),
            Box::new(move || fired.lock().unwrap().push(label)),
        );
    }

    assert_eq!(timer.pending(), 3);
    assert_eq!(timer.advance(Duration::from_millis(999)), 0);
    assert_eq!(timer.advance(Duration::from_millis(1)), 1);
    assert_eq!(timer.advance(Duration::from_secs(1)), 2);

    assert_eq!(*fired.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(timer.now(), Duration::from_secs(2));
}

#[test]
fn test_manual_timer_callback_can_schedule_more() {
    let timer = Arc::new(ManualTimer::new());
    let fired = Arc::new(Mutex::new(0));

    let rearm = {
        let timer = timer.clone();
        let fired = fired.clone();
        move || {
            *fired.lock().unwrap() += 1;
            let fired = fired.clone();
            timer.after(
                Duration::from_secs(1),
                Box::new(move || *fired.lock().unwrap() += 1),
            );
        }
    };
    timer.after(Duration::from_secs(1), Box::new(rearm));

    timer.advance(Duration::from_secs(1));
    assert_eq!(*fired.lock().unwrap(), 1);

    timer.advance(Duration::from_secs(1));
    assert_eq!(*fired.lock().unwrap(), 2);
}

#[test]
fn test_thread_timer_never_fires_unbounded_duration() {
    let timer = ThreadTimer::new().unwrap();
    let (tx, rx) = mpsc::channel::<()>();

    timer.after(
        Duration::MAX,
        Box::new(move || {
            tx.send(()).unwrap();
        }),
    );

    assert_eq!(timer.pending(), 1);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    // The driver keeps serving ordinary deadlines.
    let (done_tx, done_rx) = mpsc::channel();
    timer.after(
        Duration::from_millis(10),
        Box::new(move || {
            done_tx.send("ordinary").unwrap();
        }),
    );
    assert_eq!(
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "ordinary"
    );
    assert_eq!(timer.pending(), 1);
}

#[test]
fn test_manual_timer_saturates_at_unbounded_duration() {
    let timer = ManualTimer::new();
    timer.advance(Duration::from_secs(1));

    let delayed = completion_bridge::delay(&timer, Duration::MAX);
    assert_eq!(timer.advance(Duration::from_secs(1)), 0);
    assert!(delayed.is_pending());

    timer.advance(Duration::MAX);
    assert_eq!(timer.now(), Duration::MAX);
    assert!(!delayed.is_pending());
}
