use crate::classify::{is_acknowledged, is_connection_refused, is_server_error};
use crate::error::{Error, Result};
use crate::{AdminClient, AdminCommand, CommandOutput, Endpoint, Readiness, ShutdownMode, StatusQuery};

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

const PING_SCRIPT: &str = "db.adminCommand('ping')";

/// Options for configuring a `ShellAdminClient`.
#[derive(Clone, Debug)]
pub struct ShellAdminClientOptions {
    /// Bound for mutating commands.
    pub command_timeout: Duration,

    /// Arguments placed before the generated ones, e.g. TLS or auth flags.
    pub extra_args: Vec<String>,

    /// Port every member's engine listens on, if not the shell default.
    pub port: Option<u16>,

    /// Bound for pings and status queries.
    pub probe_timeout: Duration,

    /// Path to the `mongo` or `mongosh` executable.
    pub shell_path: PathBuf,
}

impl Default for ShellAdminClientOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            extra_args: Vec::new(),
            port: None,
            probe_timeout: Duration::from_secs(10),
            shell_path: PathBuf::from("mongo"),
        }
    }
}

struct ShellOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl ShellOutput {
    fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Admin client that runs every call as a separate shell session.
#[derive(Clone, Debug)]
pub struct ShellAdminClient {
    options: Arc<ShellAdminClientOptions>,
}

impl ShellAdminClient {
    /// Creates a new `ShellAdminClient`.
    #[must_use]
    pub fn new(options: ShellAdminClientOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    fn command_timeout(&self, command: &AdminCommand) -> Duration {
        match command {
            AdminCommand::Shutdown(ShutdownMode::Graceful { timeout }) => {
                *timeout + self.options.probe_timeout
            }
            _ => self.options.command_timeout,
        }
    }

    async fn eval(
        &self,
        operation: &'static str,
        endpoint: &Endpoint,
        script: &str,
        timeout: Duration,
    ) -> Result<ShellOutput> {
        let mut cmd = Command::new(&self.options.shell_path);
        cmd.args(&self.options.extra_args);
        cmd.arg("admin").arg("--quiet");

        if let Endpoint::Remote(host) = endpoint {
            cmd.arg("--host").arg(host);
        }

        // Stateful-set members share one engine config, so peers use our port.
        if let Some(port) = self.options.port {
            cmd.arg("--port").arg(port.to_string());
        }

        cmd.arg("--eval").arg(script);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        trace!("running {} against {}: {}", operation, endpoint, script);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                operation,
                endpoint: endpoint.to_string(),
                after: timeout,
            })?
            .map_err(Error::Spawn)?;

        Ok(ShellOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl AdminClient for ShellAdminClient {
    async fn ping(&self, endpoint: &Endpoint) -> Result<Readiness> {
        let output = self
            .eval("ping", endpoint, PING_SCRIPT, self.options.probe_timeout)
            .await?;

        if output.status.success() {
            return Ok(if is_acknowledged(&output.stdout) {
                Readiness::Ready
            } else {
                Readiness::NotReady
            });
        }

        let combined = output.combined();
        if is_connection_refused(&combined) {
            debug!("{} refused the connection", endpoint);
            return Ok(Readiness::NotReady);
        }

        Err(Error::ShellFailed {
            operation: "ping",
            endpoint: endpoint.to_string(),
            status: output.status,
            output: combined,
        })
    }

    async fn query_status(&self, endpoint: &Endpoint, query: StatusQuery) -> Result<String> {
        let output = self
            .eval(
                query.name(),
                endpoint,
                query.script(),
                self.options.probe_timeout,
            )
            .await?;

        let combined = output.combined();

        // mongosh throws on server errors where the legacy shell prints them, so an
        // error reply from a reachable server is still a payload.
        if output.status.success() || is_server_error(&combined) {
            Ok(combined)
        } else {
            Err(Error::ShellFailed {
                operation: query.name(),
                endpoint: endpoint.to_string(),
                status: output.status,
                output: combined,
            })
        }
    }

    async fn run_command(
        &self,
        endpoint: &Endpoint,
        command: &AdminCommand,
    ) -> Result<CommandOutput> {
        let output = self
            .eval(
                command.name(),
                endpoint,
                &command.script(),
                self.command_timeout(command),
            )
            .await?;

        let combined = output.combined();

        // Nothing was listening, so the command never reached an engine.
        if !output.status.success() && is_connection_refused(&combined) {
            return Err(Error::ShellFailed {
                operation: command.name(),
                endpoint: endpoint.to_string(),
                status: output.status,
                output: combined,
            });
        }

        crate::acknowledge(endpoint, command, combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn fake_shell(script: &str) -> ShellAdminClient {
        ShellAdminClient::new(ShellAdminClientOptions {
            command_timeout: Duration::from_secs(5),
            extra_args: vec!["-c".to_string(), script.to_string(), "mongo".to_string()],
            port: Some(27018),
            probe_timeout: Duration::from_secs(5),
            shell_path: PathBuf::from("/bin/sh"),
        })
    }

    #[tokio::test]
    async fn test_ping_ready() {
        let client = fake_shell(r#"echo '{ "ok" : 1 }'"#);

        assert_eq!(client.ping(&Endpoint::Local).await.unwrap(), Readiness::Ready);
    }

    #[tokio::test]
    async fn test_ping_connection_refused_is_not_ready() {
        let client = fake_shell("echo 'exception: connect failed' >&2; exit 1");

        assert_eq!(
            client.ping(&Endpoint::Local).await.unwrap(),
            Readiness::NotReady
        );
    }

    #[tokio::test]
    async fn test_ping_other_failure_propagates() {
        let client = fake_shell("echo 'Authentication failed' >&2; exit 1");

        assert_matches!(
            client.ping(&Endpoint::Local).await,
            Err(Error::ShellFailed { operation: "ping", .. })
        );
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let client = ShellAdminClient::new(ShellAdminClientOptions {
            probe_timeout: Duration::from_millis(100),
            ..fake_shell("sleep 5").options.as_ref().clone()
        });

        assert_matches!(
            client.ping(&Endpoint::Local).await,
            Err(Error::Timeout { operation: "ping", .. })
        );
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let client = ShellAdminClient::new(ShellAdminClientOptions {
            shell_path: PathBuf::from("/nonexistent/mongo"),
            ..ShellAdminClientOptions::default()
        });

        assert_matches!(
            client.ping(&Endpoint::Local).await,
            Err(Error::Spawn(_))
        );
    }

    #[tokio::test]
    async fn test_endpoint_arguments() {
        let client = fake_shell(r#"echo "$@""#);

        let remote = client
            .query_status(&Endpoint::remote("mongo-0.mongo"), StatusQuery::IsMaster)
            .await
            .unwrap();
        assert_eq!(
            remote,
            "admin --quiet --host mongo-0.mongo --port 27018 --eval db.isMaster()"
        );

        let local = client
            .query_status(&Endpoint::Local, StatusQuery::ReplicaSetStatus)
            .await
            .unwrap();
        assert_eq!(local, "admin --quiet --port 27018 --eval rs.status()");
    }

    #[tokio::test]
    async fn test_default_port_is_left_to_the_shell() {
        let client = ShellAdminClient::new(ShellAdminClientOptions {
            port: None,
            ..fake_shell(r#"echo "$@""#).options.as_ref().clone()
        });

        let remote = client
            .query_status(&Endpoint::remote("mongo-0.mongo"), StatusQuery::IsMaster)
            .await
            .unwrap();
        assert_eq!(remote, "admin --quiet --host mongo-0.mongo --eval db.isMaster()");
    }

    #[tokio::test]
    async fn test_server_error_reply_is_a_payload() {
        let client = fake_shell(
            "echo 'MongoServerError: no replset config has been received' >&2; exit 1",
        );

        let payload = client
            .query_status(&Endpoint::Local, StatusQuery::ReplicaSetStatus)
            .await
            .unwrap();

        assert!(payload.contains("no replset config has been received"));
    }

    #[tokio::test]
    async fn test_unacknowledged_command_is_an_error() {
        let client = fake_shell(r#"echo '{ "ok" : 0, "errmsg" : "already initialized" }'"#);
        let command = AdminCommand::InitiateReplicaSet {
            replica_set_id: "rs0".to_string(),
            members: vec!["mongo-0.mongo".to_string()],
        };

        assert_matches!(
            client.run_command(&Endpoint::Local, &command).await,
            Err(Error::NotAcknowledged { command: "replSetInitiate", .. })
        );
    }

    #[tokio::test]
    async fn test_shutdown_needs_no_acknowledgement() {
        let client = fake_shell("echo 'server should be down...'");

        let output = client
            .run_command(
                &Endpoint::Local,
                &AdminCommand::Shutdown(ShutdownMode::Force),
            )
            .await
            .unwrap();

        assert!(!output.acknowledged);
    }

    #[tokio::test]
    async fn test_refused_command_is_an_error() {
        let client = fake_shell("echo 'exception: connect failed' >&2; exit 1");

        assert_matches!(
            client
                .run_command(
                    &Endpoint::Local,
                    &AdminCommand::Shutdown(ShutdownMode::Force),
                )
                .await,
            Err(Error::ShellFailed { operation: "shutdown", .. })
        );
    }
}
