//! Structured subprocess execution with an optional timeout.
//!
//! Used for the CircleCI generator script: the caller blocks until the
//! script completes, but a configured timeout kills a hung run instead of
//! waiting forever.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use wait_timeout::ChildExt;

#[derive(Debug, Clone, Default)]
pub struct ExecService {
    default_timeout: Option<Duration>,
}

impl ExecService {
    /// `default_timeout` of None means wait indefinitely.
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self { default_timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let mut cmd = Command::new(&request.program);
        for arg in &request.args {
            cmd.arg(arg);
        }
        if let Some(ref cwd) = request.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        if request.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn {:?} with args {:?}",
                request.program, request.args
            )
        })?;

        // Drain pipes on threads while waiting: a child writing more than the
        // pipe buffer would otherwise block and the wait would never return.
        let stdout_reader = if request.capture_output {
            child.stdout.take().map(spawn_reader)
        } else {
            None
        };
        let stderr_reader = if request.capture_output {
            child.stderr.take().map(spawn_reader)
        } else {
            None
        };

        let timeout = request.timeout.or(self.default_timeout);
        let started = Instant::now();
        let status = match timeout {
            None => child.wait().context("failed to wait for process")?,
            Some(t) => match child
                .wait_timeout(t)
                .context("failed to wait with timeout")?
            {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_reader.map(join_reader);
                    let stderr = stderr_reader.map(join_reader).unwrap_or_default();
                    let tail = stderr.trim();
                    return Err(if tail.is_empty() {
                        anyhow!("command {:?} timed out after {:?}", request.program, t)
                    } else {
                        anyhow!(
                            "command {:?} timed out after {:?}; stderr so far: {}",
                            request.program,
                            t,
                            tail
                        )
                    });
                }
            },
        };

        let duration = started.elapsed();
        let stdout = stdout_reader.map(join_reader).unwrap_or_default();
        let stderr = stderr_reader.map(join_reader).unwrap_or_default();

        Ok(ExecOutput {
            status,
            duration,
            stdout,
            stderr,
        })
    }
}

fn spawn_reader<R: io::Read + Send + 'static>(mut reader: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = reader.read_to_string(&mut buf);
        buf
    })
}

fn join_reader(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    timeout: Option<Duration>,
    capture_output: bool,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}
