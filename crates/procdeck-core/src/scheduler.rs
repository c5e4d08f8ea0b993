use crate::DeckError;
use crate::registry::{Registry, WorkerAction};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A discrete request coming from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Worker { name: String, action: WorkerAction },
    Quit,
}

/// What an input read produced
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    /// Input changed only what the frontend shows (navigation, resize)
    Redraw,
}

/// Presentation and input side of the menu
#[async_trait(?Send)]
pub trait Frontend {
    /// Next input event. `None` means the input source is gone.
    ///
    /// Must be cancel safe: the scheduler drops this future whenever a tick
    /// fires first.
    async fn next_event(&mut self, registry: &Registry) -> Result<Option<UiEvent>, DeckError>;

    /// Draw the current state; called after every tick and every UI event
    fn render(&mut self, registry: &Registry) -> Result<(), DeckError>;

    /// Show a rejected operation to the user
    fn report(&mut self, _error: &DeckError) {}
}

enum Step {
    Tick,
    Input(Option<UiEvent>),
}

/// Single-threaded refresh loop interleaving fixed-rate ticks with UI input.
///
/// Ticks never block. UI commands run to completion before the next tick, so
/// a `Stop` pauses rendering until the worker has exited.
pub struct Scheduler<F> {
    registry: Registry,
    frontend: F,
    tick_interval: Duration,
}

impl<F: Frontend> Scheduler<F> {
    pub fn new(registry: Registry, frontend: F, tick_interval: Duration) -> Self {
        Self {
            registry,
            frontend,
            tick_interval,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Poll every worker once
    pub fn tick(&mut self) -> usize {
        self.registry.tick()
    }

    /// Run until a quit command or the end of input, then stop every live
    /// worker before returning.
    pub async fn run(&mut self) -> Result<(), DeckError> {
        info!(
            "Scheduler running {} workers every {:?}",
            self.registry.len(),
            self.tick_interval
        );
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.frontend.render(&self.registry)?;

        loop {
            let step = tokio::select! {
                _ = ticker.tick() => Step::Tick,
                event = self.frontend.next_event(&self.registry) => Step::Input(event?),
            };

            match step {
                Step::Tick => {
                    self.tick();
                }
                Step::Input(None) => {
                    info!("Input closed, shutting down");
                    break;
                }
                Step::Input(Some(UiEvent::Redraw)) => {}
                Step::Input(Some(UiEvent::Command(Command::Quit))) => {
                    info!("Quit requested");
                    break;
                }
                Step::Input(Some(UiEvent::Command(Command::Worker { name, action }))) => {
                    debug!("Dispatching {action:?} to {name}");
                    if let Err(e) = self.registry.handle(&name, action).await {
                        warn!("Rejected action for {name}: {e}");
                        self.frontend.report(&e);
                    }
                }
            }

            self.frontend.render(&self.registry)?;
        }

        self.registry.stop_all().await;
        self.tick();
        self.frontend.render(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::local::InProcessLauncher;
    use crate::stop::StopSignal;
    use crate::supervisor::SupervisorState;
    use crate::worker::WorkerTable;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Instant;

    enum Script {
        Pause(Duration),
        Send(UiEvent),
    }

    #[derive(Default)]
    struct ScriptedFrontend {
        script: VecDeque<Script>,
        pause_until: Option<tokio::time::Instant>,
        renders: usize,
        reported: Vec<String>,
    }

    impl ScriptedFrontend {
        fn new(script: Vec<Script>) -> Self {
            Self {
                script: script.into(),
                ..Default::default()
            }
        }
    }

    #[async_trait(?Send)]
    impl Frontend for ScriptedFrontend {
        async fn next_event(&mut self, _registry: &Registry) -> Result<Option<UiEvent>, DeckError> {
            let Some(step) = self.script.front() else {
                return Ok(None);
            };
            match step {
                Script::Pause(duration) => {
                    // survives cancellation by a tick
                    let deadline = *self
                        .pause_until
                        .get_or_insert_with(|| tokio::time::Instant::now() + *duration);
                    tokio::time::sleep_until(deadline).await;
                    self.pause_until = None;
                    self.script.pop_front();
                    Ok(Some(UiEvent::Redraw))
                }
                Script::Send(_) => match self.script.pop_front() {
                    Some(Script::Send(event)) => Ok(Some(event)),
                    _ => Ok(None),
                },
            }
        }

        fn render(&mut self, _registry: &Registry) -> Result<(), DeckError> {
            self.renders += 1;
            Ok(())
        }

        fn report(&mut self, error: &DeckError) {
            self.reported.push(error.to_string());
        }
    }

    fn count_then_wait(channel: &mut Channel, stop: &StopSignal) {
        for i in 1..=5 {
            let _ = channel.send(i);
        }
        while !stop.wait_timeout(Duration::from_millis(5)) {}
    }

    fn registry() -> Registry {
        let table = WorkerTable::new().with("count", count_then_wait);
        let mut registry = Registry::new(Arc::new(InProcessLauncher::new(table)), 10);
        registry.register("Echo", "count", Vec::new()).unwrap();
        registry
    }

    fn worker(name: &str, action: WorkerAction) -> Script {
        Script::Send(UiEvent::Command(Command::Worker {
            name: name.to_string(),
            action,
        }))
    }

    #[tokio::test]
    async fn test_tick_without_workers_is_immediate() {
        let mut scheduler = Scheduler::new(registry(), ScriptedFrontend::default(), Duration::from_millis(10));
        let started = Instant::now();
        for _ in 0..100 {
            assert_eq!(scheduler.tick(), 0);
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_run_collects_history_and_stops_on_quit() {
        let frontend = ScriptedFrontend::new(vec![
            worker("Echo", WorkerAction::Start),
            Script::Pause(Duration::from_millis(200)),
            worker("Echo", WorkerAction::Send(json!("ignored"))),
            Script::Send(UiEvent::Command(Command::Quit)),
        ]);
        let mut scheduler = Scheduler::new(registry(), frontend, Duration::from_millis(5));
        scheduler.run().await.unwrap();

        let entry = scheduler.registry().get("Echo").unwrap();
        let history: Vec<_> = entry.display.history.iter().cloned().collect();
        assert_eq!(history, (1..=5).map(|i| json!(i)).collect::<Vec<_>>());
        assert_eq!(entry.supervisor.state(), SupervisorState::Idle);
        assert_eq!(entry.display.label(), "stopped");
        assert!(scheduler.frontend().renders > 4);
    }

    #[tokio::test]
    async fn test_rejected_actions_are_reported() {
        let frontend = ScriptedFrontend::new(vec![
            worker("Camera", WorkerAction::Start),
            worker("Echo", WorkerAction::Start),
            worker("Echo", WorkerAction::Start),
        ]);
        let mut scheduler = Scheduler::new(registry(), frontend, Duration::from_millis(5));

        // input runs dry without a quit: live workers are still stopped
        scheduler.run().await.unwrap();

        assert_eq!(scheduler.frontend().reported.len(), 2);
        assert!(scheduler.frontend().reported[0].contains("Camera"));
        assert!(scheduler.frontend().reported[1].contains("already running"));
        assert_eq!(
            scheduler.registry().get("Echo").unwrap().supervisor.state(),
            SupervisorState::Idle
        );
    }
}
