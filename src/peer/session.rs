use std::io;
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::blockchain::ChainStore;
use crate::error::SessionError;
use crate::state::{AppState, Submission};

pub const PROMPT: &str = "Enter a new BPM:";

/// Longest input line a peer may send, excluding the newline.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

const SEND_QUEUE_CAPACITY: usize = 32;

/// One connected peer: reads measurements line by line and, on its own
/// timer, pushes the whole chain back. Both share a single send queue so
/// messages never interleave on the stream.
pub struct PeerSession<S> {
    stream: S,
    state: AppState,
    broadcast_interval: Duration,
}

impl<S> PeerSession<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, state: AppState, broadcast_interval: Duration) -> Self {
        Self {
            stream,
            state,
            broadcast_interval,
        }
    }

    /// Drive the session until EOF, an I/O error, a line that is not a
    /// number or one longer than `MAX_LINE_LENGTH`. Queued output is flushed
    /// before returning.
    pub async fn run(self) -> Result<(), SessionError> {
        let PeerSession {
            stream,
            state,
            broadcast_interval,
        } = self;
        let (reader, writer) = tokio::io::split(stream);
        let (out_tx, out_rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        queue(&out_tx, PROMPT.to_string()).await?;

        let writer = write_loop(writer, out_rx);
        tokio::pin!(writer);
        let input_tx = out_tx.clone();
        let result = tokio::select! {
            res = &mut writer => return res,
            res = input_loop(reader, &state, input_tx) => res,
            res = broadcast_loop(&state.store, broadcast_interval, out_tx) => res,
        };
        // both producers are dropped; the writer drains and shuts down
        let flushed = writer.await;
        result.and(flushed)
    }
}

fn parse_measurement(line: &str) -> Result<i64, SessionError> {
    line.trim().parse().map_err(|e: std::num::ParseIntError| SessionError::Protocol {
        line: line.to_string(),
        reason: e.to_string(),
    })
}

async fn queue(out: &mpsc::Sender<String>, msg: String) -> Result<(), SessionError> {
    out.send(msg)
        .await
        .map_err(|_| SessionError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "send queue closed")))
}

async fn input_loop<R>(
    reader: R,
    state: &AppState,
    out: mpsc::Sender<String>,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                let e = SessionError::LineTooLong {
                    max: MAX_LINE_LENGTH,
                };
                warn!("dropping peer: {e}");
                let _ = queue(&out, format!("\n{e}\n")).await;
                return Err(e);
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };
        let measurement = match parse_measurement(&line) {
            Ok(m) => m,
            Err(e) => {
                // best effort, the session is over either way
                let _ = queue(&out, format!("\n{e}\n")).await;
                return Err(e);
            }
        };
        if let Submission::Accepted(block) = state.submit(measurement).await? {
            debug!("peer appended block #{}", block.index);
        }
        queue(&out, format!("\n{PROMPT}")).await?;
    }
    Ok(())
}

async fn broadcast_loop(
    store: &ChainStore,
    every: Duration,
    out: mpsc::Sender<String>,
) -> Result<(), SessionError> {
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut json = serde_json::to_string(&store.snapshot()).map_err(io::Error::from)?;
        json.push('\n');
        trace!("broadcasting chain snapshot ({} bytes)", json.len());
        queue(&out, json).await?;
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        writer.write_all(msg.as_bytes()).await?;
        writer.flush().await?;
    }
    if let Err(e) = writer.shutdown().await {
        debug!("shutdown after session end failed: {e}");
    }
    Ok(())
}
