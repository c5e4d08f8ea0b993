//! Demo workers hosted by the procdeck binary

use procdeck_core::{Channel, Choice, DeckError, Message, Registry, StopSignal, WorkerTable};
use std::time::Duration;
use tracing::debug;

pub const RECORDER: &str = "recorder";
pub const CHATTER: &str = "chatter";
pub const ECHO: &str = "echo";
pub const ONESHOT: &str = "oneshot";

const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / 24);
const CHATTER_INTERVAL: Duration = Duration::from_millis(500);
const IDLE_POLL: Duration = Duration::from_millis(50);

const YUP: [&str; 4] = ["yuuuup", "yuuuuup", "yeaup", "yeoop"];
const NOPE: [&str; 4] = ["noooooooe", "noooope", "nope", "nope"];

/// Every entry point the binary can host in worker mode
pub fn worker_table() -> WorkerTable {
    WorkerTable::new()
        .with(RECORDER, record_frames)
        .with(CHATTER, chatter)
        .with(ECHO, echo)
        .with(ONESHOT, oneshot)
}

/// Register the demo menu entries, in menu order
pub fn register_all(registry: &mut Registry) -> Result<(), DeckError> {
    registry.register(
        "Recorder",
        RECORDER,
        vec![
            Choice::start("Start Recording"),
            Choice::stop("Stop Recording"),
        ],
    )?;
    registry.register(
        "Subprocess",
        CHATTER,
        vec![
            Choice::start("Start Subprocess"),
            Choice::send_label("Yup"),
            Choice::send_label("Nope"),
            Choice::stop("Stop Subprocess"),
        ],
    )?;
    registry.register(
        "Echo",
        ECHO,
        vec![Choice::start("Start Echo"), Choice::stop("Stop Echo")],
    )?;
    registry.register(
        "Oneshot",
        ONESHOT,
        vec![Choice::start("Start Oneshot"), Choice::stop("Stop Oneshot")],
    )?;
    Ok(())
}

/// Counts frames at 24 per second, standing in for a camera recording loop
pub fn record_frames(channel: &mut Channel, stop: &StopSignal) {
    let mut frames_recorded: u64 = 0;
    loop {
        frames_recorded += 1;
        if channel.send(frames_recorded).is_err() {
            break;
        }
        if stop.wait_timeout(FRAME_INTERVAL) {
            break;
        }
    }
    debug!("Recorded {frames_recorded} frames");
}

/// Answers in the mood of the last word it was sent, once per interval
pub fn chatter(channel: &mut Channel, stop: &StopSignal) {
    let mut mood: Option<String> = None;
    let mut i = 0;
    loop {
        while channel.poll() {
            match channel.receive() {
                Ok(Message::String(word)) => mood = Some(word),
                Ok(other) => debug!("Ignoring {other}"),
                Err(_) => break,
            }
        }

        let reply = match mood.as_deref() {
            Some("Yup") => Some(YUP[i % YUP.len()]),
            Some("Nope") => Some(NOPE[i % NOPE.len()]),
            _ => None,
        };
        if let Some(reply) = reply {
            if channel.send(reply).is_err() {
                break;
            }
        }

        if stop.wait_timeout(CHATTER_INTERVAL) {
            break;
        }
        i += 1;
    }
}

/// Sends 1 to 5, then idles until stopped
pub fn echo(channel: &mut Channel, stop: &StopSignal) {
    for i in 1..=5 {
        if channel.send(i).is_err() {
            return;
        }
    }
    while !stop.wait_timeout(IDLE_POLL) {}
}

/// Sends a single item and returns without waiting to be stopped
pub fn oneshot(channel: &mut Channel, _stop: &StopSignal) {
    let _ = channel.send("done");
}
