use procdeck_core::{DeckError, StopSignal};

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{debug, info};

    /// Turn SIGINT and SIGTERM into a cooperative stop of the hosted worker.
    ///
    /// The listeners run on their own thread with a small runtime, since the
    /// worker host itself is synchronous. Returns once both are registered.
    pub fn install_termination_handlers(stop: StopSignal) -> Result<(), DeckError> {
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("procdeck-signals".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let listeners = signal(SignalKind::interrupt())
                        .and_then(|interrupt| Ok((interrupt, signal(SignalKind::terminate())?)));
                    let (mut interrupt, mut terminate) = match listeners {
                        Ok(listeners) => {
                            let _ = ready_tx.send(Ok(()));
                            listeners
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };

                    tokio::select! {
                        _ = interrupt.recv() => info!("SIGINT received, stopping worker"),
                        _ = terminate.recv() => info!("SIGTERM received, stopping worker"),
                        _ = stop.cancelled() => {
                            debug!("Worker stopping, signal listener done");
                            return;
                        }
                    }
                    stop.set();
                });
            })?;

        ready_rx.recv().map_err(|_| {
            DeckError::Other(anyhow::anyhow!(
                "signal listener exited before installing handlers"
            ))
        })??;
        Ok(())
    }

}

#[cfg(unix)]
pub use unix_impl::install_termination_handlers;

#[cfg(not(unix))]
pub fn install_termination_handlers(_stop: StopSignal) -> Result<(), DeckError> {
    Ok(())
}
