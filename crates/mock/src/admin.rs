use crate::{Call, ClusterState, MockCluster, ReplicaSetConfig};

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use async_trait::async_trait;
use mongo_init_admin::{
    AdminClient, AdminCommand, CommandOutput, Endpoint, Error, Readiness, Result, StatusQuery,
};
use serde_json::{Value, json};

const DEFAULT_PORT: u16 = 27017;

/// Admin client that talks to the engines of a [`MockCluster`].
///
/// `Endpoint::Local` is the engine of the member this client belongs to.
/// Payloads mimic what the legacy shell prints.
#[derive(Clone, Debug)]
pub struct MockAdminClient {
    cluster: MockCluster,
    host: String,
}

impl MockAdminClient {
    pub(crate) fn new(cluster: MockCluster, host: &str) -> Self {
        Self {
            cluster,
            host: host.to_string(),
        }
    }

    fn target(&self, endpoint: &Endpoint) -> String {
        endpoint.host().unwrap_or(&self.host).to_string()
    }
}

fn not_initialized() -> Value {
    json!({
        "ok": 0,
        "errmsg": "no replset config has been received",
        "code": 94,
        "codeName": "NotYetInitialized",
    })
}

fn render(document: &Value) -> String {
    serde_json::to_string_pretty(document).unwrap_or_default()
}

fn connect_failed(operation: &'static str, endpoint: &Endpoint) -> Error {
    Error::ShellFailed {
        operation,
        endpoint: endpoint.to_string(),
        status: ExitStatus::from_raw(1 << 8),
        output: format!("Error: couldn't connect to server {endpoint}\nexception: connect failed"),
    }
}

/// Member host as the engine reports it, with the port filled in.
fn qualified(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_PORT}")
    }
}

fn status_document(config: &ReplicaSetConfig, primary: Option<&str>) -> Value {
    let members: Vec<Value> = config
        .members
        .iter()
        .enumerate()
        .map(|(id, host)| {
            let is_primary = primary.is_some_and(|primary| crate::engine_host(host) == primary);
            let state = if is_primary {
                "PRIMARY"
            } else {
                "SECONDARY"
            };

            json!({
                "_id": id,
                "name": qualified(host),
                "stateStr": state,
            })
        })
        .collect();

    json!({ "set": config.id, "members": members, "ok": 1 })
}

fn config_document(config: &ReplicaSetConfig) -> Value {
    let members: Vec<Value> = config
        .members
        .iter()
        .enumerate()
        .map(|(id, host)| json!({ "_id": id, "host": qualified(host) }))
        .collect();

    json!({ "_id": config.id, "version": config.version, "members": members })
}

fn query(state: &ClusterState, target: &str, query: StatusQuery) -> Option<String> {
    let member = state.members.get(target)?;

    if let Some(payload) = member.overrides.get(&query) {
        return Some(payload.clone());
    }

    let document = match query {
        StatusQuery::IsMaster => json!({
            "ismaster": member.primary,
            "secondary": member.config.is_some() && !member.primary,
            "setName": member.config.as_ref().map(|config| config.id.clone()),
            "ok": 1,
        }),
        StatusQuery::ReplicaSetConfig => member
            .config
            .as_ref()
            .map_or_else(not_initialized, config_document),
        StatusQuery::ReplicaSetStatus => {
            let primary = state
                .members
                .iter()
                .find(|(_, other)| other.primary && other.config == member.config)
                .map(|(host, _)| host.as_str());

            member.config.as_ref().map_or_else(not_initialized, |config| {
                status_document(config, primary)
            })
        }
    };

    Some(render(&document))
}

fn execute(state: &mut ClusterState, target: &str, command: &AdminCommand) -> String {
    let Some(member) = state.members.get_mut(target) else {
        return String::new();
    };

    let reply = match command {
        AdminCommand::InitiateReplicaSet {
            replica_set_id,
            members,
        } => {
            if member.config.is_some() {
                json!({
                    "ok": 0,
                    "errmsg": "already initialized",
                    "code": 23,
                    "codeName": "AlreadyInitialized",
                })
            } else {
                let config = ReplicaSetConfig {
                    id: replica_set_id.clone(),
                    members: members.clone(),
                    version: 1,
                };

                member.primary = true;
                member.config = Some(config.clone());
                state.distribute(&config);

                json!({ "ok": 1 })
            }
        }
        AdminCommand::AddMember { host } => match member.config.clone() {
            Some(mut config) if member.primary => {
                if config.members.contains(host) {
                    json!({
                        "ok": 0,
                        "errmsg": format!("Found two member configurations with same host field, {host}"),
                        "code": 103,
                        "codeName": "NewReplicaSetConfigurationIncompatible",
                    })
                } else {
                    config.members.push(host.clone());
                    config.version += 1;
                    state.distribute(&config);

                    json!({ "ok": 1 })
                }
            }
            _ => json!({
                "ok": 0,
                "errmsg": "node is not in primary or recovering state",
                "code": 13436,
                "codeName": "NotPrimaryOrSecondary",
            }),
        },
        AdminCommand::Shutdown(_) => {
            member.running = false;
            return "server should be down...".to_string();
        }
    };

    render(&reply)
}

#[async_trait]
impl AdminClient for MockAdminClient {
    async fn ping(&self, endpoint: &Endpoint) -> Result<Readiness> {
        tokio::task::yield_now().await;

        let target = self.target(endpoint);
        let mut state = self.cluster.state();

        state.record(Call::Ping {
            from: self.host.clone(),
            target: target.clone(),
        });

        let readiness = match state.members.get_mut(&target) {
            Some(member) if member.running && !member.never_ready => {
                if member.pings_until_ready == 0 {
                    Readiness::Ready
                } else {
                    member.pings_until_ready -= 1;
                    Readiness::NotReady
                }
            }
            _ => Readiness::NotReady,
        };
        drop(state);

        Ok(readiness)
    }

    async fn query_status(&self, endpoint: &Endpoint, status_query: StatusQuery) -> Result<String> {
        tokio::task::yield_now().await;

        let target = self.target(endpoint);
        let mut state = self.cluster.state();

        state.record(Call::Query {
            from: self.host.clone(),
            target: target.clone(),
            query: status_query,
        });

        let running = state
            .members
            .get(&target)
            .is_some_and(|member| member.running);

        let payload = if running {
            query(&state, &target, status_query)
        } else {
            None
        };
        drop(state);

        payload.ok_or_else(|| connect_failed(status_query.name(), endpoint))
    }

    async fn run_command(
        &self,
        endpoint: &Endpoint,
        command: &AdminCommand,
    ) -> Result<CommandOutput> {
        tokio::task::yield_now().await;

        let target = self.target(endpoint);
        let mut state = self.cluster.state();

        let running = state
            .members
            .get(&target)
            .is_some_and(|member| member.running);

        if !running {
            state.record(Call::Command {
                from: self.host.clone(),
                target,
                command: command.clone(),
                acknowledged: false,
            });
            drop(state);

            return Err(connect_failed(command.name(), endpoint));
        }

        let payload = execute(&mut state, &target, command);
        let output = mongo_init_admin::acknowledge(endpoint, command, payload);

        state.record(Call::Command {
            from: self.host.clone(),
            target,
            command: command.clone(),
            acknowledged: output.as_ref().is_ok_and(|output| output.acknowledged),
        });
        drop(state);

        if matches!(command, AdminCommand::Shutdown(_)) {
            self.cluster.exited.notify_waiters();
        }

        output
    }
}
