//! Unix worker processes for procdeck
//!
//! Workers are started as child processes speaking the frame protocol on
//! stdin/stdout, and worker hosts convert termination signals into a
//! cooperative stop.

mod signals;
mod unix_launcher;

pub use signals::install_termination_handlers;
#[cfg(unix)]
pub use unix_launcher::{UnixWorkerHandle, UnixWorkerLauncher};

#[cfg(unix)]
pub struct UnixLauncherFactory;

#[cfg(unix)]
impl UnixLauncherFactory {
    /// Launcher that re-executes `program` with its hidden `worker` subcommand
    pub fn create_launcher(
        program: impl Into<std::path::PathBuf>,
        stderr: procdeck_core::StderrMode,
    ) -> UnixWorkerLauncher {
        UnixWorkerLauncher::new(program)
            .with_args(["worker"])
            .with_stderr(stderr)
    }

    pub fn platform_name() -> &'static str {
        "Unix"
    }
}
