//! Cooperative run loop over a byte stream.
//!
//! A background thread owns the input and forwards chunks over a bounded
//! channel; it never touches firmware state. The loop drains the channel
//! without blocking, feeds the firmware, polls the tick, writes replies, then
//! sleeps a short idle interval through the firmware's clock.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use balltrack_traits::{Sensor, Servo};
use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::error::{FirmwareError, Result};
use crate::firmware::Firmware;
use crate::reply::Reply;
use crate::util::duration_ms;

/// Chunk size for reads from the input stream.
const READ_CHUNK: usize = 256;

/// Messages from the input thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Bytes(Vec<u8>),
    Eof,
    Error(String),
}

/// Owns the background reader thread.
///
/// Dropping the reader signals shutdown. The thread is joined when it has
/// already finished; a thread still blocked in `read` is detached.
pub struct InputReader {
    rx: xch::Receiver<Input>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl InputReader {
    pub fn spawn<R: Read + Send + 'static>(mut reader: R) -> Self {
        let (tx, rx) = xch::bounded(64);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("input reader received shutdown signal");
                    break;
                }
                let msg = match reader.read(&mut buf) {
                    Ok(0) => Input::Eof,
                    Ok(n) => Input::Bytes(buf[..n].to_vec()),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => Input::Error(e.to_string()),
                };
                let last = !matches!(msg, Input::Bytes(_));
                if tx.send(msg).is_err() {
                    tracing::debug!("input consumer disconnected, exiting thread");
                    break;
                }
                if last {
                    break;
                }
            }
            tracing::trace!("input reader thread exiting");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn receiver(&self) -> &xch::Receiver<Input> {
        &self.rx
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if !handle.is_finished() {
                tracing::trace!("input reader still blocked in read, detaching");
                return;
            }
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "input reader thread panicked");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunParams {
    /// Stop once the input reaches end of stream.
    pub exit_on_eof: bool,
    /// Stop after this long, measured on the firmware's clock.
    pub max_runtime: Option<Duration>,
    /// Sleep between loop iterations.
    pub idle_sleep: Duration,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            exit_on_eof: false,
            max_runtime: None,
            idle_sleep: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    Eof,
    MaxRuntime,
}

/// Boot the firmware and run until shutdown, EOF (when enabled) or the
/// maximum runtime. The servo is parked on every exit path.
pub fn run<S, V, W>(
    fw: &mut Firmware<S, V>,
    input: &xch::Receiver<Input>,
    out: &mut W,
    shutdown: &AtomicBool,
    params: &RunParams,
) -> Result<StopReason>
where
    S: Sensor,
    V: Servo,
    W: Write,
{
    let mut replies = Vec::new();
    fw.boot(&mut replies);
    let res = run_loop(fw, input, out, shutdown, params, &mut replies);
    fw.park();
    match &res {
        Ok(reason) => tracing::info!(?reason, ticks = fw.ticks(), "firmware stopped"),
        Err(e) => tracing::error!(error = %e, "firmware loop failed"),
    }
    res
}

fn run_loop<S, V, W>(
    fw: &mut Firmware<S, V>,
    input: &xch::Receiver<Input>,
    out: &mut W,
    shutdown: &AtomicBool,
    params: &RunParams,
    replies: &mut Vec<Reply>,
) -> Result<StopReason>
where
    S: Sensor,
    V: Servo,
    W: Write,
{
    write_replies(out, replies)?;
    let started_ms = fw.now_ms();
    let max_ms = params.max_runtime.map(duration_ms);
    let mut eof = false;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(StopReason::Shutdown);
        }
        if max_ms.is_some_and(|max| fw.now_ms().saturating_sub(started_ms) >= max) {
            return Ok(StopReason::MaxRuntime);
        }

        while !eof {
            match input.try_recv() {
                Ok(Input::Bytes(b)) => fw.feed(&b, replies),
                Ok(Input::Eof) => {
                    tracing::debug!("input reached end of stream");
                    eof = true;
                }
                Ok(Input::Error(e)) => {
                    tracing::warn!(error = %e, "input read failed");
                    eof = true;
                }
                Err(xch::TryRecvError::Empty) => break,
                Err(xch::TryRecvError::Disconnected) => eof = true,
            }
        }

        fw.poll(replies);
        write_replies(out, replies)?;

        if eof && params.exit_on_eof {
            return Ok(StopReason::Eof);
        }
        fw.clock().sleep(params.idle_sleep);
    }
}

/// Write and clear pending replies, one per line, then flush.
pub fn write_replies<W: Write>(out: &mut W, replies: &mut Vec<Reply>) -> Result<()> {
    if replies.is_empty() {
        return Ok(());
    }
    for r in replies.drain(..) {
        writeln!(out, "{r}")
            .map_err(|e| FirmwareError::Io(e.to_string()))
            .wrap_err("writing reply")?;
    }
    out.flush()
        .map_err(|e| FirmwareError::Io(e.to_string()))
        .wrap_err("flushing replies")?;
    Ok(())
}
