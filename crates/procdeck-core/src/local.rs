use crate::DeckError;
use crate::channel::Channel;
use crate::process::{LaunchedWorker, WorkerExit, WorkerHandle, WorkerId, WorkerLauncher};
use crate::stop::StopSignal;
use crate::worker::WorkerTable;
use async_trait::async_trait;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

/// Runs workers on dedicated threads of the current process.
///
/// The channel and stop signal are the same types a process worker sees, so
/// entry points behave identically; only isolation differs. Useful for tests
/// and for embedding workers that cannot be re-executed.
pub struct InProcessLauncher {
    table: WorkerTable,
}

impl InProcessLauncher {
    pub fn new(table: WorkerTable) -> Self {
        Self { table }
    }
}

impl WorkerLauncher for InProcessLauncher {
    fn launch(&self, entry_point: &str, stop: &StopSignal) -> Result<LaunchedWorker, DeckError> {
        let entry = self.table.get(entry_point)?;
        let (supervisor_end, mut worker_end) = Channel::pair();
        let (done_tx, done_rx) = oneshot::channel();
        let stop = stop.clone();

        thread::Builder::new()
            .name(format!("worker-{entry_point}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry(&mut worker_end, &stop)));
                drop(worker_end);
                let exit = match outcome {
                    Ok(()) => WorkerExit::Returned,
                    Err(_) => WorkerExit::Panicked,
                };
                let _ = done_tx.send(exit);
            })
            .map_err(|e| DeckError::Spawn(format!("{entry_point}: {e}")))?;

        debug!("Started in-process worker {entry_point}");
        Ok(LaunchedWorker {
            handle: Box::new(ThreadHandle {
                entry_point: entry_point.to_string(),
                done: done_rx,
                exit: None,
            }),
            channel: supervisor_end,
        })
    }

    fn platform_name(&self) -> &'static str {
        "in-process"
    }
}

struct ThreadHandle {
    entry_point: String,
    done: oneshot::Receiver<WorkerExit>,
    exit: Option<WorkerExit>,
}

#[async_trait]
impl WorkerHandle for ThreadHandle {
    fn id(&self) -> Option<WorkerId> {
        None
    }

    fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn try_exit(&mut self) -> Result<Option<WorkerExit>, DeckError> {
        if self.exit.is_none() {
            match self.done.try_recv() {
                Ok(exit) => self.exit = Some(exit),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    warn!("Worker thread {} vanished without reporting", self.entry_point);
                    self.exit = Some(WorkerExit::Unknown);
                }
            }
        }
        Ok(self.exit)
    }

    async fn wait(&mut self) -> Result<WorkerExit, DeckError> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }
        let exit = (&mut self.done).await.unwrap_or(WorkerExit::Unknown);
        self.exit = Some(exit);
        Ok(exit)
    }
}
