// src/process/sink.rs

//! Destinations for a child's stdout/stderr.
//!
//! Output is drained line by line on background tasks while the child runs,
//! so a chatty process can never stall on a full pipe. Every line is copied
//! into each configured sink with its bytes untouched (trailing newline
//! included).

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which stream of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Shared in-memory buffer receiving captured output.
///
/// Cloning yields another handle to the same buffer, so the same buffer can be
/// attached to both stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured bytes as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn append(&self, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }
}

/// Where a copy of the child's output goes.
#[derive(Debug, Clone)]
pub enum OutputSink {
    /// Append to an in-memory buffer.
    Capture(CaptureBuffer),
    /// Mirror to this process's stdout.
    Stdout,
    /// Mirror to this process's stderr.
    Stderr,
    /// Emit each line as an `info` event; shows up in per-test logs.
    Log,
}

impl OutputSink {
    async fn write_line(&self, stream: Stream, command: &str, line: &[u8]) {
        let result = match self {
            OutputSink::Capture(buf) => {
                buf.append(line);
                Ok(())
            }
            OutputSink::Stdout => write_all(tokio::io::stdout(), line).await,
            OutputSink::Stderr => write_all(tokio::io::stderr(), line).await,
            OutputSink::Log => {
                let text = String::from_utf8_lossy(line);
                info!(command = %command, %stream, "{}", text.trim_end_matches(['\r', '\n']));
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(command = %command, %stream, error = %e, "failed to mirror process output");
        }
    }
}

async fn write_all<W>(mut out: W, line: &[u8]) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    out.write_all(line).await?;
    out.flush().await
}

/// Spawn a task copying `reader` into `sinks` until EOF.
///
/// Lines are always logged at `debug`, whether or not any sink is attached.
pub(crate) fn spawn_drain<R>(
    reader: R,
    stream: Stream,
    command: String,
    sinks: Vec<OutputSink>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    debug!(
                        command = %command,
                        %stream,
                        "{}",
                        String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n'])
                    );
                    for sink in &sinks {
                        sink.write_line(stream, &command, &line).await;
                    }
                }
                Err(e) => {
                    warn!(command = %command, %stream, error = %e, "unable to read process output");
                    break;
                }
            }
        }

        debug!(command = %command, %stream, "output drain finished");
    })
}
