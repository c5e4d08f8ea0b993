use crate::DeckError;
use crate::channel::{Channel, Message};
use crate::process::{WorkerExit, WorkerHandle, WorkerLauncher};
use crate::stop::StopSignal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a supervised worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    StopRequested,
}

/// One worker lifetime: created by `fork`, consumed by `stop` or `reap`
struct Instance {
    handle: Box<dyn WorkerHandle>,
    channel: Channel,
    stop: StopSignal,
}

/// Owns the lifecycle of one named worker.
///
/// Every fork gets a brand-new channel and stop signal. After the worker ends,
/// its channel is kept in `retired` until everything the worker sent before
/// exiting has been drained, so late items still reach the display.
pub struct Supervisor {
    name: String,
    entry_point: String,
    launcher: Arc<dyn WorkerLauncher>,
    instance: Option<Instance>,
    retired: Vec<Channel>,
}

impl Supervisor {
    pub fn new(
        name: impl Into<String>,
        entry_point: impl Into<String>,
        launcher: Arc<dyn WorkerLauncher>,
    ) -> Self {
        Self {
            name: name.into(),
            entry_point: entry_point.into(),
            launcher,
            instance: None,
            retired: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn state(&self) -> SupervisorState {
        match &self.instance {
            None => SupervisorState::Idle,
            Some(instance) if instance.stop.is_set() => SupervisorState::StopRequested,
            Some(_) => SupervisorState::Running,
        }
    }

    /// Start a fresh worker. Rejected unless idle.
    pub fn fork(&mut self) -> Result<(), DeckError> {
        if self.instance.is_some() {
            return Err(DeckError::AlreadyRunning(self.name.clone()));
        }

        let stop = StopSignal::new();
        let launched = self.launcher.launch(&self.entry_point, &stop)?;

        match launched.handle.id() {
            Some(pid) => info!(
                "Forked worker {} ({}) via {} (PID: {pid})",
                self.name,
                self.entry_point,
                self.launcher.platform_name()
            ),
            None => info!(
                "Forked worker {} ({}) via {}",
                self.name,
                self.entry_point,
                self.launcher.platform_name()
            ),
        }

        self.instance = Some(Instance {
            handle: launched.handle,
            channel: launched.channel,
            stop,
        });
        Ok(())
    }

    /// Forward an item to the running worker. A no-op otherwise.
    pub fn send(&mut self, item: impl Into<Message>) {
        let Some(instance) = self.instance.as_ref().filter(|i| !i.stop.is_set()) else {
            debug!("Dropping item for {}: worker is not running", self.name);
            return;
        };
        if let Err(e) = instance.channel.send(item) {
            warn!("Could not send to worker {}: {e}", self.name);
        }
    }

    /// Everything the worker has sent since the last drain, without blocking
    pub fn drain_receive(&mut self) -> Vec<Message> {
        let mut items = Vec::new();
        for channel in &mut self.retired {
            drain_into(channel, &mut items);
        }
        self.retired.retain_mut(|channel| !channel.is_exhausted());
        if let Some(instance) = self.instance.as_mut() {
            drain_into(&mut instance.channel, &mut items);
        }
        items
    }

    /// Request a cooperative stop and wait for the worker to exit.
    ///
    /// This is the only blocking operation a supervisor has: the calling task
    /// is held until the worker observes its stop signal. Stopping an idle
    /// supervisor does nothing.
    pub async fn stop(&mut self) -> Result<Option<WorkerExit>, DeckError> {
        let Some(mut instance) = self.instance.take() else {
            debug!("Stop requested for idle worker {}", self.name);
            return Ok(None);
        };

        instance.stop.set();
        info!("Waiting for worker {} to stop", self.name);

        match instance.handle.wait().await {
            Ok(exit) => {
                info!("Worker {} stopped ({exit})", self.name);
                self.retired.push(instance.channel);
                Ok(Some(exit))
            }
            Err(e) => {
                warn!("Failed to join worker {}: {e}", self.name);
                self.instance = Some(instance);
                Err(e)
            }
        }
    }

    /// Live status of the worker; false when idle
    pub fn is_alive(&mut self) -> bool {
        let Some(instance) = self.instance.as_mut() else {
            return false;
        };
        match instance.handle.try_exit() {
            Ok(None) => true,
            Ok(Some(_)) => false,
            Err(e) => {
                warn!("Could not query worker {}: {e}", self.name);
                false
            }
        }
    }

    /// Collect a worker that ended without being asked to.
    ///
    /// Returns its exit status and returns the supervisor to idle; the worker
    /// is not restarted.
    pub fn reap(&mut self) -> Option<WorkerExit> {
        let instance = self.instance.as_mut()?;
        if instance.stop.is_set() {
            return None;
        }
        let exit = match instance.handle.try_exit() {
            Ok(Some(exit)) => exit,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not query worker {}: {e}", self.name);
                return None;
            }
        };

        warn!("Worker {} exited unexpectedly ({exit})", self.name);
        let instance = self.instance.take()?;
        self.retired.push(instance.channel);
        Some(exit)
    }
}

fn drain_into(channel: &mut Channel, items: &mut Vec<Message>) {
    while channel.poll() {
        match channel.receive() {
            Ok(item) => items.push(item),
            Err(e) => {
                debug!("Drain ended early: {e}");
                break;
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.as_ref() {
            warn!(
                "Supervisor for {} dropped with a live worker; requesting stop without waiting",
                self.name
            );
            instance.stop.set();
        }
    }
}
