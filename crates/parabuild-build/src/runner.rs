//! External command execution
//!
//! [`CommandRunner`] is the only place where the orchestrator waits on the
//! outside world. [`ProcessRunner`] runs real subprocesses and streams their
//! output through a [`GroupedLogger`]; tests substitute a recording fake.

use crate::error::{BuildError, Result};
use crate::group::Group;
use crate::logger::{GroupedLogger, LineSink, StdoutSink};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Upper bound for collecting output of a killed command
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion, logging its combined output under `group`
    ///
    /// When `cancel` fires the command is terminated and
    /// [`BuildError::Cancelled`] is returned.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        group: &Group,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Run `program` and return its standard output
    async fn capture(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>>;
}

/// Runs commands as local subprocesses
pub struct ProcessRunner {
    sink: Arc<dyn LineSink>,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Arc::new(StdoutSink::new()))
    }
}

async fn read_some<R: AsyncRead + Unpin>(stream: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize> {
    match stream {
        Some(stream) => stream.read(buf).await,
        None => Ok(0),
    }
}

/// Forward stdout and stderr to `logger` until both are closed
async fn pump(
    stdout: &mut Option<ChildStdout>,
    stderr: &mut Option<ChildStderr>,
    logger: &mut GroupedLogger,
) -> std::io::Result<()> {
    let mut out_buf = [0u8; READ_BUFFER_SIZE];
    let mut err_buf = [0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            read = read_some(stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => *stdout = None,
                    n => logger.write_chunk(&out_buf[..n]),
                }
            }
            read = read_some(stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => *stderr = None,
                    n => logger.write_chunk(&err_buf[..n]),
                }
            }
            else => return Ok(()),
        }
    }
}

async fn wait_streaming(
    child: &mut Child,
    stdout: &mut Option<ChildStdout>,
    stderr: &mut Option<ChildStderr>,
    logger: &mut GroupedLogger,
) -> std::io::Result<ExitStatus> {
    pump(stdout, stderr, logger).await?;
    child.wait().await
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        group: &Group,
        cancel: &CancellationToken,
    ) -> Result<()> {
        debug!(group = %group, name = program, args = ?args, "Running command");

        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut logger = GroupedLogger::new(group.clone(), Arc::clone(&self.sink));

        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            status = wait_streaming(&mut child, &mut stdout, &mut stderr, &mut logger) => Some(status),
        };

        let status = match outcome {
            Some(status) => status,
            None => {
                warn!(group = %group, name = program, "Cancelled, terminating command");
                if let Err(e) = child.start_kill() {
                    debug!(group = %group, error = %e, "Command already exited");
                }

                let drain = wait_streaming(&mut child, &mut stdout, &mut stderr, &mut logger);
                if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
                    warn!(group = %group, "Output of terminated command still open, giving up");
                }
                logger.finish();

                return Err(BuildError::Cancelled);
            }
        };
        logger.finish();

        let status = status.map_err(|source| BuildError::Output {
            program: program.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: status.code(),
            });
        }

        Ok(())
    }

    async fn capture(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        debug!(name = program, args = ?args, "Capturing command output");

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(BuildError::Cancelled),
            output = cmd.output() => output.map_err(|source| BuildError::Spawn {
                program: program.to_string(),
                source,
            })?,
        };

        if !output.stderr.is_empty() {
            debug!(
                name = program,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "Command stderr"
            );
        }

        if !output.status.success() {
            return Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: output.status.code(),
            });
        }

        Ok(output.stdout)
    }
}
