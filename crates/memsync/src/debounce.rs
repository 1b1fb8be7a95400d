//! Trailing-edge debouncing for bursty input streams.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Callback invoked with the latest value once a quiet period elapses.
pub type DebounceCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Coalesces a rapid stream of values into one trailing callback per
/// quiet period.
///
/// `schedule` restarts the timer with the newest value; only the value
/// present when the timer finally expires reaches the callback. There is
/// no leading-edge call and no max-wait cap. The debouncer knows nothing
/// about what the values mean.
pub struct Debouncer {
    delay: Duration,
    callback: DebounceCallback,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer with a fixed quiet period.
    pub fn new(delay: Duration, callback: DebounceCallback) -> Self {
        Self {
            delay,
            callback,
            pending: Mutex::new(None),
        }
    }

    /// Record `value` and (re)start the timer. A previously pending timer
    /// is cancelled without firing.
    pub fn schedule(&self, value: String) {
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(value);
        }));
    }

    /// Cancel any pending timer without invoking the callback.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
