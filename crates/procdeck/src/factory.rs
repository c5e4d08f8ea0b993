use procdeck_core::{DeckConfig, WorkerLauncher};
use std::sync::Arc;

/// Create the platform launcher, which starts workers by re-executing the
/// current binary in worker mode.
pub fn create_launcher(config: &DeckConfig) -> anyhow::Result<Arc<dyn WorkerLauncher>> {
    let program = std::env::current_exe()?;

    #[cfg(unix)]
    {
        let launcher =
            procdeck_unix::UnixLauncherFactory::create_launcher(program, config.worker_stderr);
        tracing::debug!(
            "Using {} launcher for {}",
            launcher.platform_name(),
            launcher.program().display()
        );
        Ok(Arc::new(launcher))
    }

    #[cfg(not(unix))]
    {
        let _ = (program, config);
        anyhow::bail!("worker processes are only supported on unix platforms")
    }
}

/// Name of the platform this build launches workers on
pub fn platform_name() -> &'static str {
    #[cfg(unix)]
    return procdeck_unix::UnixLauncherFactory::platform_name();

    #[cfg(not(unix))]
    return "unsupported";
}
