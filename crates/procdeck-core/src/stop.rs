use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const WAIT_SLICE: Duration = Duration::from_millis(10);

/// One-shot cooperative stop request.
///
/// Once set it never resets; a worker that wants to run again gets a fresh
/// signal on its next fork. Workers are expected to check it at least once per
/// unit of work and return promptly when it is set.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.token.cancel();
    }

    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sleep for up to `timeout`, waking early once the signal is set.
    ///
    /// Returns whether the signal is set. Workers use this in place of a plain
    /// sleep so a stop request is never starved by the pause between frames.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_set() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_SLICE.min(deadline - now));
        }
    }

    /// Resolves once the signal is set
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
