use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Cooperative cancellation flag shared between a build and whoever wants to
/// abort it. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One-shot event that a background export sets when it finishes.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    done: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let _guard = self.mutex.lock();
        self.done.store(true, Ordering::SeqCst);
        self.condvar.notify_all();
    }

    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Waits until the signal is set or `timeout` elapses.
    ///
    /// Returns `true` if the signal was set.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }

        let guard = match self.mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return self.is_set(),
        };
        match self
            .condvar
            .wait_timeout_while(guard, timeout, |_| !self.is_set())
        {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => self.is_set(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_wait_timeout() {
        let signal = CompletionSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_released_by_set() {
        let signal = Arc::new(CompletionSignal::new());
        let setter = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            setter.set();
        });

        assert!(signal.wait(Duration::from_secs(10)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_already_set() {
        let signal = CompletionSignal::new();
        signal.set();
        let start = Instant::now();
        assert!(signal.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
