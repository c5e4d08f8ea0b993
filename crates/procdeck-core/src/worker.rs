use crate::DeckError;
use crate::channel::{Channel, Message};
use crate::stop::StopSignal;
use crate::wire::Frame;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Worker body. Runs until it observes `stop` (or finishes on its own), and
/// must be safe to start fresh on every fork.
pub type WorkerEntry = fn(&mut Channel, &StopSignal);

/// Entry points a binary can host, by name
#[derive(Clone, Default)]
pub struct WorkerTable {
    entries: BTreeMap<String, WorkerEntry>,
}

impl WorkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, entry: WorkerEntry) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: WorkerEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Result<WorkerEntry, DeckError> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| DeckError::UnknownEntryPoint(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Host `name` in the current process, talking to the supervisor over
/// stdin/stdout. Called by a binary re-executed in worker mode.
pub fn host_stdio(table: &WorkerTable, name: &str, stop: StopSignal) -> Result<(), DeckError> {
    let entry = table.get(name)?;
    info!("Hosting worker entry point {name} (PID: {})", std::process::id());
    serve(
        entry,
        BufReader::new(std::io::stdin()),
        std::io::stdout(),
        stop,
    )?;
    info!("Worker entry point {name} finished");
    Ok(())
}

/// Run `entry` against frames read from `input` and written to `output`.
///
/// A stop frame, or the end of `input`, sets `stop`. Returns once the entry
/// point has returned and every item it sent has been written.
pub fn serve<R, W>(entry: WorkerEntry, input: R, output: W, stop: StopSignal) -> Result<(), DeckError>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let (to_supervisor_tx, to_supervisor_rx) = mpsc::unbounded_channel();
    let (from_supervisor_tx, from_supervisor_rx) = mpsc::unbounded_channel();

    let reader_stop = stop.clone();
    // not joined: it may sit in a blocking read until the process exits
    thread::Builder::new()
        .name("procdeck-input".to_string())
        .spawn(move || pump_input(input, from_supervisor_tx, reader_stop))?;
    let writer = thread::Builder::new()
        .name("procdeck-output".to_string())
        .spawn(move || pump_output(output, to_supervisor_rx))?;

    let mut channel = Channel::from_parts(to_supervisor_tx, from_supervisor_rx);
    entry(&mut channel, &stop);
    drop(channel);

    writer
        .join()
        .map_err(|_| DeckError::Other(anyhow::anyhow!("worker output pump panicked")))?
        .map_err(DeckError::from)
}

fn pump_input<R: BufRead>(input: R, incoming: UnboundedSender<Message>, stop: StopSignal) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Supervisor input failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Frame::from_line(&line) {
            Ok(Frame::Item { payload }) => {
                // the entry point may already have returned
                let _ = incoming.send(payload);
            }
            Ok(Frame::Stop) => {
                debug!("Stop requested by supervisor");
                stop.set();
            }
            Err(e) => warn!("Skipping malformed supervisor frame {line:?}: {e}"),
        }
    }
    // supervisor closed our input: nobody is left to ask us to stop
    stop.set();
}

fn pump_output<W: Write>(mut output: W, mut outgoing: UnboundedReceiver<Message>) -> std::io::Result<()> {
    while let Some(payload) = outgoing.blocking_recv() {
        let line = Frame::Item { payload }
            .to_line()
            .map_err(std::io::Error::other)?;
        output.write_all(line.as_bytes())?;
        output.flush()?;
    }
    Ok(())
}
