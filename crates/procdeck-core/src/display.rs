use crate::channel::Message;
use crate::process::WorkerExit;
use std::collections::VecDeque;

/// Fixed-capacity FIFO that evicts its oldest item on overflow
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Extend<T> for History<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

/// What the menu says about a worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerStatus {
    Stopped,
    Running,
    Stopping,
    ExitedUnexpectedly(WorkerExit),
    FailedToStart(String),
}

impl WorkerStatus {
    pub fn label(&self) -> String {
        match self {
            WorkerStatus::Stopped => "stopped".to_string(),
            WorkerStatus::Running => "running".to_string(),
            WorkerStatus::Stopping => "stopping".to_string(),
            WorkerStatus::ExitedUnexpectedly(exit) => format!("exited unexpectedly ({exit})"),
            WorkerStatus::FailedToStart(reason) => format!("failed to start: {reason}"),
        }
    }
}

/// Per-worker state the frontend renders
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub history: History<Message>,
    status: WorkerStatus,
}

impl DisplayState {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::new(capacity),
            status: WorkerStatus::Stopped,
        }
    }

    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: WorkerStatus) {
        self.status = status;
    }

    pub fn label(&self) -> String {
        self.status.label()
    }

    /// History rendered oldest first, strings unquoted
    pub fn history_lines(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|item| match item {
                Message::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}
