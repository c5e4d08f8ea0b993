use crate::DeckError;
use crate::channel::Message;
use crate::display::{DisplayState, WorkerStatus};
use crate::process::WorkerLauncher;
use crate::supervisor::{Supervisor, SupervisorState};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Operation a menu choice performs on its worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerAction {
    Start,
    Stop,
    Send(Message),
}

/// A labelled menu entry bound to a worker action
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub action: WorkerAction,
}

impl Choice {
    pub fn new(label: impl Into<String>, action: WorkerAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }

    pub fn start(label: impl Into<String>) -> Self {
        Self::new(label, WorkerAction::Start)
    }

    pub fn stop(label: impl Into<String>) -> Self {
        Self::new(label, WorkerAction::Stop)
    }

    /// A choice that sends its own label to the worker
    pub fn send_label(label: impl Into<String>) -> Self {
        let label = label.into();
        let action = WorkerAction::Send(Message::String(label.clone()));
        Self::new(label, action)
    }
}

pub struct RegistryEntry {
    pub supervisor: Supervisor,
    pub display: DisplayState,
    pub choices: Vec<Choice>,
}

/// Named supervisors with their display state, in registration order.
///
/// Entries are created once and never removed; workers are restarted, not
/// replaced. All access happens from the scheduler's single control thread.
pub struct Registry {
    launcher: Arc<dyn WorkerLauncher>,
    history_capacity: usize,
    names: Vec<String>,
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, history_capacity: usize) -> Self {
        Self {
            launcher,
            history_capacity,
            names: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        entry_point: impl Into<String>,
        choices: Vec<Choice>,
    ) -> Result<(), DeckError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(DeckError::DuplicateName(name));
        }

        let supervisor = Supervisor::new(name.clone(), entry_point, self.launcher.clone());
        info!("Registered worker {name} ({})", supervisor.entry_point());
        self.entries.insert(
            name.clone(),
            RegistryEntry {
                supervisor,
                display: DisplayState::new(self.history_capacity),
                choices,
            },
        );
        self.names.push(name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&RegistryEntry, DeckError> {
        self.entries
            .get(name)
            .ok_or_else(|| DeckError::UnknownName(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut RegistryEntry, DeckError> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| DeckError::UnknownName(name.to_string()))
    }

    /// Worker names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Apply a UI action to the named worker.
    ///
    /// `Stop` holds the caller until the worker has exited.
    pub async fn handle(&mut self, name: &str, action: WorkerAction) -> Result<(), DeckError> {
        let entry = self.get_mut(name)?;
        match action {
            WorkerAction::Start => match entry.supervisor.fork() {
                Ok(()) => {
                    entry.display.set_status(WorkerStatus::Running);
                    Ok(())
                }
                Err(e @ DeckError::AlreadyRunning(_)) => Err(e),
                Err(e) => {
                    entry.display.set_status(WorkerStatus::FailedToStart(e.to_string()));
                    Err(e)
                }
            },
            WorkerAction::Stop => {
                if entry.supervisor.state() == SupervisorState::Idle {
                    return Ok(());
                }
                entry.display.set_status(WorkerStatus::Stopping);
                if let Err(e) = entry.supervisor.stop().await {
                    // the worker is still there; it can be asked again
                    entry.display.set_status(WorkerStatus::Running);
                    return Err(e);
                }
                entry.display.set_status(WorkerStatus::Stopped);
                let late = entry.supervisor.drain_receive();
                entry.display.history.extend(late);
                Ok(())
            }
            WorkerAction::Send(item) => {
                entry.supervisor.send(item);
                Ok(())
            }
        }
    }

    /// One non-blocking polling pass over every worker.
    ///
    /// Drains what each worker sent into its history and relabels workers that
    /// ended without being asked to. Returns the number of items received.
    pub fn tick(&mut self) -> usize {
        let mut received = 0;
        for name in &self.names {
            let Some(entry) = self.entries.get_mut(name) else {
                continue;
            };
            let items = entry.supervisor.drain_receive();
            received += items.len();
            entry.display.history.extend(items);

            if let Some(exit) = entry.supervisor.reap() {
                entry
                    .display
                    .set_status(WorkerStatus::ExitedUnexpectedly(exit));
            }
        }
        received
    }

    /// Stop every live worker, one after another
    pub async fn stop_all(&mut self) {
        for name in &self.names {
            let Some(entry) = self.entries.get_mut(name) else {
                continue;
            };
            if entry.supervisor.state() == SupervisorState::Idle {
                continue;
            }
            entry.display.set_status(WorkerStatus::Stopping);
            match entry.supervisor.stop().await {
                Ok(_) => entry.display.set_status(WorkerStatus::Stopped),
                Err(e) => warn!("Failed to stop worker {name} during shutdown: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::local::InProcessLauncher;
    use crate::process::{LaunchedWorker, WorkerExit, WorkerHandle, WorkerId};
    use crate::stop::StopSignal;
    use crate::worker::WorkerTable;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn count_then_wait(channel: &mut Channel, stop: &StopSignal) {
        for i in 1..=5 {
            let _ = channel.send(i);
        }
        while !stop.wait_timeout(Duration::from_millis(5)) {}
    }

    fn crash(_channel: &mut Channel, _stop: &StopSignal) {
        panic!("sensor unplugged");
    }

    /// A worker whose exit can never be collected
    struct Unjoinable;

    #[async_trait]
    impl WorkerHandle for Unjoinable {
        fn id(&self) -> Option<WorkerId> {
            None
        }

        fn entry_point(&self) -> &str {
            "stuck"
        }

        fn try_exit(&mut self) -> Result<Option<WorkerExit>, DeckError> {
            Ok(None)
        }

        async fn wait(&mut self) -> Result<WorkerExit, DeckError> {
            Err(DeckError::Io(std::io::Error::other("wait failed")))
        }
    }

    struct UnjoinableLauncher;

    impl WorkerLauncher for UnjoinableLauncher {
        fn launch(&self, _entry_point: &str, _stop: &StopSignal) -> Result<LaunchedWorker, DeckError> {
            let (channel, _worker_end) = Channel::pair();
            Ok(LaunchedWorker {
                handle: Box::new(Unjoinable),
                channel,
            })
        }

        fn platform_name(&self) -> &'static str {
            "unjoinable"
        }
    }

    fn registry(capacity: usize) -> Registry {
        let table = WorkerTable::new()
            .with("count", count_then_wait)
            .with("crash", crash);
        Registry::new(Arc::new(InProcessLauncher::new(table)), capacity)
    }

    async fn tick_until(registry: &mut Registry, name: &str, want: usize) {
        for _ in 0..200 {
            registry.tick();
            if registry.get(name).unwrap().display.history.len() >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn history(registry: &Registry, name: &str) -> Vec<Message> {
        registry.get(name).unwrap().display.history.iter().cloned().collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = registry(10);
        registry
            .register("Echo", "count", vec![Choice::start("Start"), Choice::stop("Stop")])
            .unwrap();
        registry.register("Recorder", "count", Vec::new()).unwrap();

        assert_eq!(registry.names(), ["Echo".to_string(), "Recorder".to_string()]);
        assert_eq!(registry.get("Echo").unwrap().choices.len(), 2);
        assert!(matches!(
            registry.register("Echo", "count", Vec::new()),
            Err(DeckError::DuplicateName(name)) if name == "Echo"
        ));
        assert!(matches!(registry.get("Camera"), Err(DeckError::UnknownName(_))));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_send_label_choice() {
        let choice = Choice::send_label("Yup");
        assert_eq!(choice.label, "Yup");
        assert_eq!(choice.action, WorkerAction::Send(json!("Yup")));
    }

    #[tokio::test]
    async fn test_echo_scenario() {
        let mut registry = registry(10);
        registry.register("Echo", "count", Vec::new()).unwrap();

        registry.handle("Echo", WorkerAction::Start).await.unwrap();
        assert_eq!(registry.get("Echo").unwrap().display.label(), "running");

        tick_until(&mut registry, "Echo", 5).await;
        assert_eq!(history(&registry, "Echo"), (1..=5).map(|i| json!(i)).collect::<Vec<_>>());

        registry.handle("Echo", WorkerAction::Stop).await.unwrap();
        let entry = registry.get_mut("Echo").unwrap();
        assert!(!entry.supervisor.is_alive());
        assert_eq!(entry.display.label(), "stopped");
    }

    #[tokio::test]
    async fn test_capacity_truncates_history() {
        let mut registry = registry(3);
        registry.register("Echo", "count", Vec::new()).unwrap();
        registry.handle("Echo", WorkerAction::Start).await.unwrap();

        for _ in 0..40 {
            registry.tick();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(history(&registry, "Echo"), vec![json!(3), json!(4), json!(5)]);
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn test_unknown_name_is_rejected() {
        let mut registry = registry(10);
        let result = registry.handle("Camera", WorkerAction::Start).await;
        assert!(matches!(result, Err(DeckError::UnknownName(_))));
    }

    #[tokio::test]
    async fn test_double_start_keeps_running_label() {
        let mut registry = registry(10);
        registry.register("Echo", "count", Vec::new()).unwrap();
        registry.handle("Echo", WorkerAction::Start).await.unwrap();

        let result = registry.handle("Echo", WorkerAction::Start).await;
        assert!(matches!(result, Err(DeckError::AlreadyRunning(_))));
        assert_eq!(registry.get("Echo").unwrap().display.label(), "running");
        registry.stop_all().await;
        assert_eq!(registry.get("Echo").unwrap().display.label(), "stopped");
    }

    #[tokio::test]
    async fn test_send_and_stop_while_idle() {
        let mut registry = registry(10);
        registry.register("Echo", "count", Vec::new()).unwrap();
        registry
            .handle("Echo", WorkerAction::Send(json!("Yup")))
            .await
            .unwrap();
        registry.handle("Echo", WorkerAction::Stop).await.unwrap();
        assert_eq!(registry.get("Echo").unwrap().display.label(), "stopped");
        assert_eq!(registry.tick(), 0);
    }

    #[tokio::test]
    async fn test_crash_is_relabelled() {
        let mut registry = registry(10);
        registry.register("Sensor", "crash", Vec::new()).unwrap();
        registry.handle("Sensor", WorkerAction::Start).await.unwrap();

        for _ in 0..200 {
            registry.tick();
            if registry.get("Sensor").unwrap().display.label() != "running" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            registry.get("Sensor").unwrap().display.status(),
            &WorkerStatus::ExitedUnexpectedly(WorkerExit::Panicked)
        );

        // the worker can be started again after a crash
        registry.handle("Sensor", WorkerAction::Start).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_stop_restores_running_label() {
        let mut registry = Registry::new(Arc::new(UnjoinableLauncher), 10);
        registry.register("Stuck", "stuck", Vec::new()).unwrap();
        registry.handle("Stuck", WorkerAction::Start).await.unwrap();

        let result = registry.handle("Stuck", WorkerAction::Stop).await;
        assert!(matches!(result, Err(DeckError::Io(_))));
        assert_eq!(registry.get("Stuck").unwrap().display.label(), "running");
    }

    #[tokio::test]
    async fn test_failed_start_is_labelled() {
        let mut registry = registry(10);
        registry.register("Camera", "record", Vec::new()).unwrap();
        let result = registry.handle("Camera", WorkerAction::Start).await;
        assert!(matches!(result, Err(DeckError::UnknownEntryPoint(_))));
        assert!(
            registry
                .get("Camera")
                .unwrap()
                .display
                .label()
                .starts_with("failed to start")
        );
    }
}
