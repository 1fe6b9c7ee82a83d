//! Runs the mongod engine as a supervised child process.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod backoff;
mod config;
mod error;
mod log;

pub use config::{DEFAULT_CONFIG_PATH, MongodConfig};
pub use error::{Error, Result};

use backoff::Backoff;

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mongo_init_admin::{AdminClient, AdminCommand, Endpoint, Readiness, ShutdownMode};
use mongo_init_bootable::{Bootable, BootableError};
use mongo_init_process::{ManagedProcess, ProcessApplication};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const NAME: &str = "mongod";

/// Extra time, beyond the grace period, for mongod to exit after the shutdown command.
const EXIT_TIMEOUT: Duration = Duration::from_secs(10);

struct MongodApp {
    config_path: PathBuf,
    executable: String,
}

impl ProcessApplication for MongodApp {
    fn args(&self) -> Vec<String> {
        vec![
            "--config".to_string(),
            self.config_path.to_string_lossy().into_owned(),
        ]
    }

    fn executable(&self) -> &str {
        &self.executable
    }

    fn handle_stderr(&self, line: &str) {
        log::emit(line);
    }

    fn handle_stdout(&self, line: &str) {
        log::emit(line);
    }

    fn name(&self) -> &str {
        NAME
    }
}

/// Options for configuring `Mongod`.
pub struct MongodOptions<A>
where
    A: AdminClient,
{
    /// Admin client used for readiness probes and the shutdown command.
    pub admin: A,

    /// Directory containing the mongod binary. Looked up on `PATH` if unset.
    pub bin_dir: Option<PathBuf>,

    /// Config file passed to `mongod --config`.
    pub config_path: PathBuf,
}

/// Runs a mongod engine.
#[derive(Clone)]
pub struct Mongod<A>
where
    A: AdminClient,
{
    admin: A,
    bin_dir: Option<PathBuf>,
    config_path: PathBuf,
    process: Arc<Mutex<Option<ManagedProcess>>>,
}

impl<A> Mongod<A>
where
    A: AdminClient,
{
    /// Creates a new instance of `Mongod`.
    #[must_use]
    pub fn new(
        MongodOptions {
            admin,
            bin_dir,
            config_path,
        }: MongodOptions<A>,
    ) -> Self {
        Self {
            admin,
            bin_dir,
            config_path,
            process: Arc::new(Mutex::new(None)),
        }
    }

    fn executable(&self) -> Result<PathBuf> {
        match &self.bin_dir {
            Some(dir) => Ok(dir.join(NAME)),
            None => which::which(NAME).map_err(Error::BinaryNotFound),
        }
    }

    async fn exit_status(&self) -> std::result::Result<Option<ExitStatus>, BootableError> {
        self.process
            .lock()
            .await
            .as_ref()
            .map(ManagedProcess::exit_status)
            .ok_or(BootableError::NotStarted(NAME))
    }
}

#[async_trait]
impl<A> Bootable for Mongod<A>
where
    A: AdminClient,
{
    fn bootable_name(&self) -> &'static str {
        NAME
    }

    /// Spawns mongod without waiting for it to accept connections.
    async fn start(&self) -> std::result::Result<(), BootableError> {
        let mut process = self.process.lock().await;

        if process.is_some() {
            return Err(BootableError::AlreadyStarted(NAME));
        }

        let executable = self
            .executable()
            .map_err(|e| BootableError::spawn(NAME, e))?;

        info!(
            "spawning {} --config {}",
            executable.display(),
            self.config_path.display()
        );

        let app = MongodApp {
            config_path: self.config_path.clone(),
            executable: executable.to_string_lossy().into_owned(),
        };

        let spawned = mongo_init_process::spawn(app)
            .await
            .map_err(|e| BootableError::spawn(NAME, Error::from(e)))?;

        debug!("mongod running with pid {}", spawned.pid());

        process.replace(spawned);

        Ok(())
    }

    /// Polls the local engine with backoff until it answers a ping.
    ///
    /// # Errors
    ///
    /// Fails if the engine exits first, if a probe fails for a reason other
    /// than a refused connection, or once `timeout` has elapsed.
    async fn wait_ready(&self, timeout: Duration) -> std::result::Result<(), BootableError> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Backoff::new();

        info!("waiting up to {:?} for mongod to become ready", timeout);

        loop {
            if let Some(status) = self.exit_status().await? {
                return Err(BootableError::ExitedBeforeReady { name: NAME, status });
            }

            let readiness = self
                .admin
                .ping(&Endpoint::Local)
                .await
                .map_err(|e| BootableError::other(NAME, e))?;

            if readiness == Readiness::Ready {
                info!("mongod is ready");
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BootableError::ReadyTimeout {
                    name: NAME,
                    timeout,
                });
            }

            tokio::time::sleep(backoff.next_delay(remaining)).await;
        }
    }

    /// Asks mongod to shut down, then falls back to signals.
    async fn shutdown(&self, grace: Option<Duration>) -> std::result::Result<(), BootableError> {
        let taken_process = self.process.lock().await.take();

        let Some(process) = taken_process else {
            debug!("no running mongod to shut down");
            return Ok(());
        };

        if process.running() {
            let command = AdminCommand::Shutdown(ShutdownMode::from_grace(grace));

            info!("shutting down mongod: {}", command);

            // mongod drops the connection while it stops, so an unacknowledged
            // reply still counts as delivered. An error means it never arrived.
            if let Err(e) = self.admin.run_command(&Endpoint::Local, &command).await {
                warn!("shutdown command failed: {}, terminating...", e);
                process.shutdown().await;
            } else {
                let exit_timeout = grace.unwrap_or_default() + EXIT_TIMEOUT;

                if let Ok(status) = tokio::time::timeout(exit_timeout, process.wait()).await {
                    info!("mongod exited: {}", status);
                } else {
                    warn!(
                        "mongod still running after {:?}, terminating...",
                        exit_timeout
                    );
                    process.shutdown().await;
                }
            }
        } else {
            debug!("mongod already exited");
        }

        info!("mongod shutdown");

        Ok(())
    }

    async fn wait(&self) {
        let exited = self
            .process
            .lock()
            .await
            .as_ref()
            .map(ManagedProcess::exited);

        if let Some(exited) = exited {
            exited.await;
        }
    }
}
