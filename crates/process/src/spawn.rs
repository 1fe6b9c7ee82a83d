//! Spawning and supervising child processes.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use nix::sys::signal;
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::ProcessApplication;
use crate::error::{Error, Result};

/// Reported when the exit status of the child could not be collected.
const LOST_STATUS: i32 = 1 << 8;

/// Represents a running supervised process.
#[derive(Debug)]
pub struct ManagedProcess {
    /// Latest known exit status, `None` while running
    exit: watch::Receiver<Option<ExitStatus>>,

    /// Name of the application, for logs
    name: String,

    /// Process ID
    pid: u32,

    /// Shutdown token to request termination
    shutdown_token: CancellationToken,

    /// Task tracker for the monitor and output pumps
    task_tracker: TaskTracker,
}

impl ManagedProcess {
    /// Returns the exit status if the process has already exited.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.borrow()
    }

    /// Returns the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns whether the process is still running.
    #[must_use]
    pub fn running(&self) -> bool {
        self.exit_status().is_none()
    }

    /// Stops the process with its shutdown signal, killing it if it does not
    /// exit within its shutdown timeout, and returns the exit status.
    pub async fn shutdown(&self) -> ExitStatus {
        info!("shutting down {} (pid {})", self.name, self.pid);

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        let status = self.wait().await;

        info!("{} shut down: {}", self.name, status);

        status
    }

    /// Waits for the process to exit.
    pub async fn wait(&self) -> ExitStatus {
        self.exited().await
    }

    /// Resolves once the process has exited. The future does not borrow the
    /// handle, so it can be awaited after any lock around it is released.
    pub fn exited(&self) -> impl Future<Output = ExitStatus> + Send + use<> {
        let mut exit = self.exit.clone();

        async move {
            exit.wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|status| *status)
                .unwrap_or_else(|| ExitStatus::from_raw(LOST_STATUS))
        }
    }
}

/// Spawns the application as a supervised child process.
///
/// Output lines are forwarded to the application's handlers until the process
/// closes them.
///
/// # Errors
///
/// Returns an error if the process could not be spawned.
pub async fn spawn<A: ProcessApplication>(application: A) -> Result<ManagedProcess> {
    let application: Arc<dyn ProcessApplication> = Arc::new(application);
    let name = application.name().to_string();

    let mut cmd = Command::new(application.executable());
    cmd.args(application.args());

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("Spawning process: {:?}", cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Io("failed to spawn process", e))?;

    let pid = child
        .id()
        .ok_or_else(|| Error::SpawnProcess(format!("no pid available for {name}")))?;

    debug!("{} spawned with pid {}", name, pid);

    let shutdown_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();

    if let Some(stdout) = child.stdout.take() {
        let application = Arc::clone(&application);
        task_tracker.spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                application.handle_stdout(&line);
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let application = Arc::clone(&application);
        task_tracker.spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                application.handle_stderr(&line);
            }
        });
    }

    let (exit_tx, exit_rx) = watch::channel(None);

    let monitor_token = shutdown_token.clone();
    let monitor_name = name.clone();
    task_tracker.spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            () = monitor_token.cancelled() => {
                info!("shutdown requested, terminating {}...", monitor_name);

                #[allow(clippy::cast_possible_wrap)]
                let raw_pid = Pid::from_raw(pid as i32);
                if let Err(err) = signal::kill(raw_pid, application.shutdown_signal()) {
                    warn!("failed to signal {}: {}", monitor_name, err);
                }

                if let Ok(status) =
                    tokio::time::timeout(application.shutdown_timeout(), child.wait()).await
                {
                    status
                } else {
                    error!("timeout waiting for {} to exit, killing...", monitor_name);
                    if let Err(err) = child.kill().await {
                        error!("failed to kill {}: {}", monitor_name, err);
                    }
                    child.wait().await
                }
            }
        };

        let status = match status {
            Ok(status) => {
                if status.success() {
                    info!("{} exited with status: {}", monitor_name, status);
                } else {
                    error!("{} exited with non-zero status: {}", monitor_name, status);
                }
                status
            }
            Err(err) => {
                error!("failed to wait for {}: {}", monitor_name, err);
                ExitStatus::from_raw(LOST_STATUS)
            }
        };

        let _ = exit_tx.send(Some(status));
    });

    task_tracker.close();

    Ok(ManagedProcess {
        exit: exit_rx,
        name,
        pid,
        shutdown_token,
        task_tracker,
    })
}
