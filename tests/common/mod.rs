#![allow(dead_code)]

use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Polls `condition` until it holds or `limit` elapses.
pub fn eventually<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }

    condition()
}
