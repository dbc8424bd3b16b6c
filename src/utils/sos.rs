use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative stop signal shared between the playback loop and its caller.
///
/// The scheduler parks on [`SignalOfStop::wait_timeout`] while pacing frames,
/// so a cancellation from another thread interrupts an in-progress wait
/// instead of letting it run to completion.
#[derive(Debug)]
pub struct SignalOfStop {
    // Shared state between clones
    shared: Arc<SharedState>,
}

#[derive(Debug)]
struct SharedState {
    closing: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            shared: Arc::new(SharedState {
                closing: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Request a stop and wake every thread parked on this signal.
    pub fn cancel(&self) {
        self.shared.closing.store(true, Ordering::Relaxed);

        // Lock briefly to synchronize with waiting threads
        let _guard = self.shared.mutex.lock().unwrap();
        self.shared.condvar.notify_all();
    }

    pub fn cancelled(&self) -> bool {
        self.shared.closing.load(Ordering::Relaxed)
    }

    /// Park for up to `timeout`, returning early if the signal is cancelled.
    ///
    /// Returns `true` when the wait ended because of cancellation, `false`
    /// when the full timeout elapsed. Spurious condvar wakeups re-enter the
    /// wait with the remaining time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.mutex.lock().unwrap();

        loop {
            if self.cancelled() {
                return true;
            }

            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return self.cancelled();
            };

            let (reacquired, result) = self
                .shared
                .condvar
                .wait_timeout(guard, remaining)
                .unwrap();
            guard = reacquired;

            if result.timed_out() {
                return self.cancelled();
            }
        }
    }
}

impl Default for SignalOfStop {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SignalOfStop {
    fn clone(&self) -> SignalOfStop {
        SignalOfStop {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_runs_to_timeout_without_cancel() {
        let sos = SignalOfStop::new();
        let start = Instant::now();
        let cancelled = sos.wait_timeout(Duration::from_millis(30));
        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let sos = SignalOfStop::new();
        let remote = sos.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let cancelled = sos.wait_timeout(Duration::from_secs(10));
        handle.join().unwrap();

        assert!(cancelled);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(sos.cancelled());
    }

    #[test]
    fn test_cancelled_signal_returns_immediately() {
        let sos = SignalOfStop::new();
        sos.cancel();
        let start = Instant::now();
        assert!(sos.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
