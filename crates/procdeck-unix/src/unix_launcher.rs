use async_trait::async_trait;
use procdeck_core::{
    DeckError, LaunchedWorker, StderrMode, StopSignal, WorkerExit, WorkerHandle, WorkerId,
    WorkerLauncher, wire,
};
use std::path::PathBuf;

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Stdio};
    use tokio::process::{Child, Command};
    use tracing::{debug, info};

    /// Unix-specific worker process handle
    pub struct UnixWorkerHandle {
        child: Child,
        entry_point: String,
    }

    impl UnixWorkerHandle {
        pub fn new(child: Child, entry_point: String) -> Self {
            Self { child, entry_point }
        }
    }

    fn exit_from_status(status: ExitStatus) -> WorkerExit {
        if let Some(code) = status.code() {
            WorkerExit::Code(code)
        } else if let Some(signal) = status.signal() {
            WorkerExit::Signal(signal)
        } else {
            WorkerExit::Unknown
        }
    }

    #[async_trait]
    impl WorkerHandle for UnixWorkerHandle {
        fn id(&self) -> Option<WorkerId> {
            self.child.id()
        }

        fn entry_point(&self) -> &str {
            &self.entry_point
        }

        fn try_exit(&mut self) -> Result<Option<WorkerExit>, DeckError> {
            Ok(self.child.try_wait()?.map(exit_from_status))
        }

        async fn wait(&mut self) -> Result<WorkerExit, DeckError> {
            let status = self.child.wait().await?;
            debug!("Worker {} exited with {status}", self.entry_point);
            Ok(exit_from_status(status))
        }
    }

    /// Starts each worker as a child process running `program [args..] <entry>`.
    ///
    /// The child speaks the line-delimited frame protocol on its stdin and
    /// stdout. It is placed in its own process group so terminal signals aimed
    /// at the menu do not reach it; it is only ever stopped cooperatively.
    #[derive(Debug, Clone)]
    pub struct UnixWorkerLauncher {
        program: PathBuf,
        args: Vec<String>,
        stderr: StderrMode,
    }

    impl UnixWorkerLauncher {
        pub fn new(program: impl Into<PathBuf>) -> Self {
            Self {
                program: program.into(),
                args: Vec::new(),
                stderr: StderrMode::default(),
            }
        }

        /// Arguments placed between the program and the entry point name
        pub fn with_args<S: ToString, I: IntoIterator<Item = S>>(mut self, iter: I) -> Self {
            self.args = iter.into_iter().map(|s| s.to_string()).collect();
            self
        }

        pub fn with_stderr(mut self, stderr: StderrMode) -> Self {
            self.stderr = stderr;
            self
        }

        pub fn program(&self) -> &std::path::Path {
            &self.program
        }
    }

    impl WorkerLauncher for UnixWorkerLauncher {
        fn launch(&self, entry_point: &str, stop: &StopSignal) -> Result<LaunchedWorker, DeckError> {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args)
                .arg(entry_point)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(match self.stderr {
                    StderrMode::Discard => Stdio::null(),
                    StderrMode::Inherit => Stdio::inherit(),
                })
                .process_group(0);

            let mut child = cmd.spawn().map_err(|e| {
                DeckError::Spawn(format!("{} {entry_point}: {e}", self.program.display()))
            })?;

            let to_worker = child
                .stdin
                .take()
                .ok_or_else(|| DeckError::Spawn("worker stdin was not captured".to_string()))?;
            let from_worker = child
                .stdout
                .take()
                .ok_or_else(|| DeckError::Spawn("worker stdout was not captured".to_string()))?;

            if let Some(pid) = child.id() {
                info!(
                    "Spawned Unix worker: {} {entry_point} (PID: {pid}) with args: {:?}",
                    self.program.display(),
                    self.args
                );
            }

            let channel = wire::attach(to_worker, from_worker, stop.clone());
            Ok(LaunchedWorker {
                handle: Box::new(UnixWorkerHandle::new(child, entry_point.to_string())),
                channel,
            })
        }

        fn platform_name(&self) -> &'static str {
            "unix"
        }
    }
}

#[cfg(unix)]
pub use unix_impl::{UnixWorkerHandle, UnixWorkerLauncher};
