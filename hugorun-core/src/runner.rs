//! Supervised execution of the hugo process.
//!
//! The child gets piped stdout/stderr. Two background tasks drain them line
//! by line into a [`BuildLog`] while the caller waits for the exit status;
//! both tasks are joined before [`ProcessRunner::execute`] returns, so every
//! line of output is logged before the caller's next statement.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, Level};

use crate::error::{HugoError, Result};

/// Tracing target used for lines relayed from the hugo process.
pub const OUTPUT_TARGET: &str = "hugo";

// ============================================================================
// Build Log
// ============================================================================

/// Sink for leveled lines of process output.
pub trait BuildLog: Send + Sync {
    fn line(&self, level: Level, line: &str);
}

/// Forwards process output to `tracing` under the `hugo` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl BuildLog for TracingLog {
    fn line(&self, level: Level, line: &str) {
        if level == Level::ERROR {
            tracing::error!(target: OUTPUT_TARGET, "{}", line);
        } else if level == Level::WARN {
            tracing::warn!(target: OUTPUT_TARGET, "{}", line);
        } else if level == Level::INFO {
            tracing::info!(target: OUTPUT_TARGET, "{}", line);
        } else if level == Level::DEBUG {
            tracing::debug!(target: OUTPUT_TARGET, "{}", line);
        } else {
            tracing::trace!(target: OUTPUT_TARGET, "{}", line);
        }
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs an executable to completion, relaying its output.
#[derive(Clone)]
pub struct ProcessRunner {
    log: Arc<dyn BuildLog>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Arc::new(TracingLog))
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner").finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(log: Arc<dyn BuildLog>) -> Self {
        Self { log }
    }

    /// Runs `executable` with `args` in `working_dir`.
    ///
    /// Stdout lines are logged at INFO, stderr lines at ERROR. A non-zero
    /// exit is reported in preference to a failure while reading output.
    pub async fn execute(
        &self,
        executable: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> Result<()> {
        debug!(
            "Executing {} {} in {}",
            executable.display(),
            args.join(" "),
            working_dir.display()
        );

        let mut child = Command::new(executable)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HugoError::execution_caused(
                    format!(
                        "Cannot start {} in {}",
                        executable.display(),
                        working_dir.display()
                    ),
                    e,
                )
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HugoError::execution("stdout of hugo was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HugoError::execution("stderr of hugo was not captured"))?;

        let stdout_drain = spawn_drain(stdout, Level::INFO, self.log.clone());
        let stderr_drain = spawn_drain(stderr, Level::ERROR, self.log.clone());

        let status = child.wait().await.map_err(|e| {
            HugoError::execution_caused("Interrupted while waiting for hugo to finish", e)
        });

        let stdout_result = join_drain(stdout_drain, "stdout").await;
        let stderr_result = join_drain(stderr_drain, "stderr").await;

        let status = status?;
        if !status.success() {
            return Err(match status.code() {
                Some(code) => HugoError::execution(format!(
                    "Execution of hugo failed with {}. See output above.",
                    code
                )),
                None => HugoError::execution(format!(
                    "Execution of hugo was terminated ({}). See output above.",
                    status
                )),
            });
        }

        stdout_result?;
        stderr_result?;

        debug!("hugo finished successfully");
        Ok(())
    }
}

fn spawn_drain<R>(reader: R, level: Level, log: Arc<dyn BuildLog>) -> JoinHandle<io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move { drain(reader, level, log.as_ref()).await })
}

async fn join_drain(handle: JoinHandle<io::Result<()>>, stream: &str) -> Result<()> {
    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HugoError::execution_caused(
            format!("Cannot read {} of hugo", stream),
            e,
        )),
        Err(e) => Err(HugoError::execution_caused(
            format!("Reader of hugo {} did not finish", stream),
            e,
        )),
    }
}

/// Forwards each line of `reader` to `log`, tolerating invalid UTF-8 and a
/// final line without terminator.
async fn drain<R>(reader: R, level: Level, log: &dyn BuildLog) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        log.line(level, trim_trailing_whitespace(&line));
    }
}

fn trim_trailing_whitespace(line: &str) -> &str {
    line.trim_end_matches([' ', '\n', '\r'])
}
