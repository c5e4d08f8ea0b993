//! Line-delimited JSON frames between a supervisor and its worker process.
//!
//! Every frame is one JSON object terminated by `\n`:
//!
//! ```text
//! {"type":"item","payload":42}
//! {"type":"stop"}
//! ```
//!
//! Items flow both ways. `stop` only flows from the supervisor to the worker and
//! mirrors the supervisor's [`StopSignal`] into the worker's own.

use crate::channel::{Channel, Message};
use crate::stop::StopSignal;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Item { payload: Message },
    Stop,
}

impl Frame {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

/// Build the supervisor-side endpoint over a worker's stdin and stdout.
///
/// Spawns two pump tasks on the current runtime: one writes queued items to the
/// worker and, once `stop` is set, flushes what is queued, writes a stop frame
/// and closes the pipe; the other decodes frames from the worker into the
/// endpoint's receive queue until the worker closes its stdout.
pub fn attach<W, R>(to_worker: W, from_worker: R, stop: StopSignal) -> Channel
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(e) = write_frames(to_worker, outgoing_rx, stop).await {
            debug!("Worker input pump ended: {e}");
        }
    });
    tokio::spawn(read_frames(from_worker, incoming_tx));

    Channel::from_parts(outgoing_tx, incoming_rx)
}

async fn write_frames<W>(
    mut io: W,
    mut outgoing: UnboundedReceiver<Message>,
    stop: StopSignal,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            item = outgoing.recv() => match item {
                Some(payload) => write_frame(&mut io, &Frame::Item { payload }).await?,
                None => break,
            },
            _ = stop.cancelled() => {
                while let Ok(payload) = outgoing.try_recv() {
                    write_frame(&mut io, &Frame::Item { payload }).await?;
                }
                write_frame(&mut io, &Frame::Stop).await?;
                break;
            }
        }
    }
    io.shutdown().await
}

async fn write_frame<W: AsyncWrite + Unpin>(io: &mut W, frame: &Frame) -> std::io::Result<()> {
    let line = frame.to_line().map_err(std::io::Error::other)?;
    io.write_all(line.as_bytes()).await?;
    io.flush().await
}

async fn read_frames<R: AsyncRead + Unpin>(io: R, incoming: UnboundedSender<Message>) {
    let mut lines = FramedRead::new(io, LinesCodec::new());
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Worker output pump failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Frame::from_line(&line) {
            Ok(Frame::Item { payload }) => {
                if incoming.send(payload).is_err() {
                    break;
                }
            }
            Ok(Frame::Stop) => debug!("Ignoring stop frame sent by a worker"),
            Err(e) => warn!("Skipping malformed worker frame {line:?}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_frame_lines() {
        let line = Frame::Item { payload: json!(3) }.to_line().unwrap();
        assert_eq!(line, "{\"type\":\"item\",\"payload\":3}\n");
        assert_eq!(Frame::from_line(&line).unwrap(), Frame::Item { payload: json!(3) });

        assert_eq!(Frame::Stop.to_line().unwrap(), "{\"type\":\"stop\"}\n");
        assert_eq!(Frame::from_line("{\"type\":\"stop\"}").unwrap(), Frame::Stop);
    }

    #[test]
    fn test_malformed_frames() {
        assert!(Frame::from_line("frame 12").is_err());
        assert!(Frame::from_line("{\"type\":\"restart\"}").is_err());
        assert!(Frame::from_line("{\"payload\":1}").is_err());
    }

    #[tokio::test]
    async fn test_attach_delivers_worker_items_and_skips_noise() {
        let (to_worker, _worker_stdin) = tokio::io::duplex(1024);
        let (mut worker_stdout, from_worker) = tokio::io::duplex(1024);
        let mut channel = attach(to_worker, from_worker, StopSignal::new());

        worker_stdout
            .write_all(b"{\"type\":\"item\",\"payload\":1}\nnot json\n\n{\"type\":\"item\",\"payload\":\"two\"}\n")
            .await
            .unwrap();
        drop(worker_stdout);

        let mut received = Vec::new();
        for _ in 0..100 {
            while channel.poll() {
                received.push(channel.receive().unwrap());
            }
            if channel.is_exhausted() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(received, vec![json!(1), json!("two")]);
    }

    #[tokio::test]
    async fn test_stop_is_written_after_queued_items() {
        let (to_worker, worker_stdin) = tokio::io::duplex(1024);
        let (_worker_stdout, from_worker) = tokio::io::duplex(1024);
        let stop = StopSignal::new();
        let channel = attach(to_worker, from_worker, stop.clone());

        channel.send("Yup").unwrap();
        stop.set();

        let mut lines = BufReader::new(worker_stdin).lines();
        let mut frames = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            frames.push(Frame::from_line(&line).unwrap());
        }
        assert_eq!(
            frames,
            vec![Frame::Item { payload: json!("Yup") }, Frame::Stop]
        );
        assert!(channel.is_send_closed());
    }
}
