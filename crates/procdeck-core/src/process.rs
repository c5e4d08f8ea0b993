use crate::DeckError;
use crate::channel::Channel;
use crate::stop::StopSignal;
use async_trait::async_trait;
use std::fmt;

/// OS-level identifier of a worker, when it has one
pub type WorkerId = u32;

/// How a worker's execution context ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Process exited with the given code
    Code(i32),
    /// Process was terminated by a signal
    Signal(i32),
    /// In-process worker returned from its entry point
    Returned,
    /// In-process worker panicked
    Panicked,
    /// Exit was observed but could not be classified
    Unknown,
}

impl WorkerExit {
    pub fn is_clean(&self) -> bool {
        matches!(self, WorkerExit::Code(0) | WorkerExit::Returned)
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Code(code) => write!(f, "exit code {code}"),
            WorkerExit::Signal(signal) => write!(f, "signal {signal}"),
            WorkerExit::Returned => write!(f, "returned"),
            WorkerExit::Panicked => write!(f, "panicked"),
            WorkerExit::Unknown => write!(f, "unknown status"),
        }
    }
}

/// Handle to one running worker
#[async_trait]
pub trait WorkerHandle: Send {
    /// OS process id, if the worker runs in its own process
    fn id(&self) -> Option<WorkerId>;

    /// Entry point the worker was started with
    fn entry_point(&self) -> &str;

    /// Exit status if the worker already ended (non-blocking)
    fn try_exit(&mut self) -> Result<Option<WorkerExit>, DeckError>;

    /// Wait for the worker to end
    async fn wait(&mut self) -> Result<WorkerExit, DeckError>;
}

/// A freshly started worker: its handle plus the supervisor's channel endpoint
pub struct LaunchedWorker {
    pub handle: Box<dyn WorkerHandle>,
    pub channel: Channel,
}

/// Starts workers in an isolated execution context.
///
/// Implementations bind the named entry point to the worker's end of a fresh
/// channel and to `stop`, and hand back the other end. Launching must not block.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, entry_point: &str, stop: &StopSignal) -> Result<LaunchedWorker, DeckError>;

    /// Name used in logs
    fn platform_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_display() {
        assert_eq!(WorkerExit::Code(3).to_string(), "exit code 3");
        assert_eq!(WorkerExit::Signal(9).to_string(), "signal 9");
        assert_eq!(WorkerExit::Panicked.to_string(), "panicked");
    }

    #[test]
    fn test_clean_exits() {
        assert!(WorkerExit::Code(0).is_clean());
        assert!(WorkerExit::Returned.is_clean());
        assert!(!WorkerExit::Code(1).is_clean());
        assert!(!WorkerExit::Signal(15).is_clean());
        assert!(!WorkerExit::Panicked.is_clean());
    }
}
