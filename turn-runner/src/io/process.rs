//! Helpers for running the simulation process with streamed stdout and bounded stderr.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Size of a single stdout read; chunk boundaries fall wherever the pipe splits data.
const CHUNK_BYTES: usize = 8192;

/// How long to wait for stderr to close after killing a timed-out child.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Exit information for a streamed child process.
#[derive(Debug)]
pub struct StreamedOutput {
    /// `None` when the process was killed after the timeout.
    pub status: Option<ExitStatus>,
    pub stdout_bytes: usize,
    pub stderr: Vec<u8>,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl StreamedOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|status| status.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|status| status.code())
    }

    pub fn stderr_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!(
                "\n[stderr truncated {} bytes]\n",
                self.stderr_truncated
            ));
        }
        text
    }
}

/// Run a command, handing each stdout chunk to `on_chunk` as it arrives.
///
/// Stdout is read on a dedicated thread and forwarded over a channel, so `on_chunk`
/// runs on the calling thread in arrival order. Stderr is drained concurrently and
/// kept up to `output_limit_bytes`. If `timeout` elapses first the child is killed.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes = output_limit_bytes))]
pub fn run_command_streaming(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    on_chunk: &mut dyn FnMut(&[u8]),
) -> Result<StreamedOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let deadline = Instant::now() + timeout;
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>();
    let stdout_handle = thread::spawn(move || forward_chunks(stdout, chunk_tx));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut stdout_bytes = 0usize;
    let mut timed_out = false;
    loop {
        match chunk_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(chunk) => {
                stdout_bytes += chunk.len();
                on_chunk(&chunk);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
        }
    }

    let status = if timed_out {
        None
    } else {
        child
            .wait_timeout(deadline.saturating_duration_since(Instant::now()))
            .context("wait for command")?
    };

    let Some(status) = status else {
        warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
        kill_and_reap(&mut child)?;
        // Readers may still hold pipes shared with a grandchild; they exit on their
        // own once every writer is gone.
        drop(stdout_handle);
        let (stderr, stderr_truncated) = join_after_kill(stderr_handle)?;
        return Ok(StreamedOutput {
            status: None,
            stdout_bytes,
            stderr,
            stderr_truncated,
            timed_out: true,
        });
    };

    join_thread(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_thread(stderr_handle).context("join stderr")?;

    if stderr_truncated > 0 {
        warn!(stderr_truncated, "stderr truncated");
    }

    debug!(exit_code = ?status.code(), stdout_bytes, "command finished");
    Ok(StreamedOutput {
        status: Some(status),
        stdout_bytes,
        stderr,
        stderr_truncated,
        timed_out: false,
    })
}

fn kill_and_reap(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")?;
    child.wait().context("wait command after kill")?;
    Ok(())
}

/// Join the stderr reader of a killed child, giving up after [`STDERR_GRACE`].
fn join_after_kill(
    handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>,
) -> Result<(Vec<u8>, usize)> {
    let give_up = Instant::now() + STDERR_GRACE;
    while !handle.is_finished() && Instant::now() < give_up {
        thread::sleep(Duration::from_millis(10));
    }
    if !handle.is_finished() {
        warn!("stderr still open after kill, discarding it");
        return Ok((Vec::new(), 0));
    }
    join_thread(handle).context("join stderr")
}

fn join_thread<T>(handle: thread::JoinHandle<Result<T>>) -> Result<T> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn forward_chunks<R: Read>(mut reader: R, tx: mpsc::Sender<Vec<u8>>) -> Result<()> {
    let mut chunk = [0u8; CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk).context("read stdout")?;
        if n == 0 {
            break;
        }
        if tx.send(chunk[..n].to_vec()).is_err() {
            // Receiver gone (timed out); stop reading.
            break;
        }
    }
    Ok(())
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; CHUNK_BYTES];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
