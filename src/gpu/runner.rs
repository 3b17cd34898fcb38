// External command execution with a per-invocation timeout

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Fixed budget for each external inventory command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why a probe produced no output
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Exit { program: String, status: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Seam between the probes and the host: runs commands and reads files
pub trait CommandRunner {
    /// Run `program` with `args` and return its stdout
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;

    fn read_file(&self, path: &Path) -> Result<String, ProbeError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        (**self).run(program, args)
    }

    fn read_file(&self, path: &Path) -> Result<String, ProbeError> {
        (**self).read_file(path)
    }
}

/// Runs real processes, killing any that outlive the timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn timed_out(&self, program: &str) -> ProbeError {
        ProbeError::Timeout {
            program: program.to_string(),
            timeout: self.timeout,
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout_rx = child.stdout.take().map(drain);
        let stderr_rx = child.stderr.take().map(drain);

        let started = Instant::now();
        let deadline = started + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProbeError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(program));
            }

            thread::sleep(POLL_INTERVAL);
        };

        // A background grandchild can hold the pipes open after the child
        // exits, so reading is bounded by the same deadline.
        let stdout = collect(stdout_rx, deadline).ok_or_else(|| self.timed_out(program))?;
        let stderr = collect(stderr_rx, deadline).unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            debug!(program, stderr = %stderr.trim(), "command failed");
            return Err(ProbeError::Exit {
                program: program.to_string(),
                status: status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn read_file(&self, path: &Path) -> Result<String, ProbeError> {
        std::fs::read_to_string(path).map_err(|source| ProbeError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a drained stream until `deadline`; `None` once it has passed
fn collect(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(rx) = rx else {
        return Some(Vec::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}
