use std::time::Duration;

use assert_matches::assert_matches;
use mongo_init_admin::{AdminCommand, StatusQuery};
use mongo_init_bootable::BootableError;
use mongo_init_bootstrap::{
    Bootstrap, BootstrapConfig, BootstrapOptions, BootstrapState, Error, PrimaryExit, Role,
    SeedPolicy,
};
use mongo_init_discovery::PeerAddress;
use mongo_init_mock::{Call, MockAdminClient, MockCluster, MockDiscovery, MockEngine};
use serde_json::json;
use tokio_util::sync::CancellationToken;

type MockBootstrap = Bootstrap<MockEngine, MockAdminClient, MockDiscovery>;

const M0: &str = "mongo-0.mongo.db.svc.cluster.local";
const M1: &str = "mongo-1.mongo.db.svc.cluster.local";
const M2: &str = "mongo-2.mongo.db.svc.cluster.local";
const M3: &str = "mongo-3.mongo.db.svc.cluster.local";
const M9: &str = "mongo-9.mongo.db.svc.cluster.local";

fn bootstrap(cluster: &MockCluster, host: &str, config: BootstrapConfig) -> MockBootstrap {
    Bootstrap::new(BootstrapOptions {
        admin: cluster.admin(host),
        config,
        discovery: cluster.discovery(host),
        engine: cluster.engine(host),
    })
}

fn commands_from(cluster: &MockCluster, host: &str) -> Vec<(String, AdminCommand)> {
    cluster
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Command {
                from,
                target,
                command,
                ..
            } if from == host => Some((target, command)),
            _ => None,
        })
        .collect()
}

fn queries_from(cluster: &MockCluster, host: &str) -> Vec<(String, StatusQuery)> {
    cluster
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Query {
                from,
                target,
                query,
            } if from == host => Some((target, query)),
            _ => None,
        })
        .collect()
}

fn shutdowns(cluster: &MockCluster, host: &str) -> Vec<Option<Duration>> {
    cluster
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Shutdown { host: shut, grace } if shut == host => Some(grace),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_single_member_initiates_once() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.role, Role::Primary { initiated: true });
    assert_eq!(outcome.identity.fqdn(), M0);
    assert_eq!(outcome.state, BootstrapState::Done);

    let commands = commands_from(&cluster, M0);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, M0);
    assert_eq!(
        commands[0].1.document(),
        json!({ "_id": "rs0", "members": [{ "_id": 0, "host": M0 }] })
    );

    assert_eq!(shutdowns(&cluster, M0), vec![None]);
    assert_eq!(
        bootstrap.context().history(),
        &[
            BootstrapState::Starting,
            BootstrapState::WaitingReady,
            BootstrapState::DiscoveringPeers,
            BootstrapState::SearchingPrimary,
            BootstrapState::InitializingPrimary,
            BootstrapState::ShuttingDown,
            BootstrapState::Done,
        ]
    );
    assert!(!bootstrap.context().engine_started());
}

#[tokio::test]
async fn test_second_member_joins_primary() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);
    cluster.seed_primary(M0, "rs0", &[M0]);

    let mut bootstrap = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        outcome.role,
        Role::Secondary {
            primary: PeerAddress::from(M0),
            added: true,
        }
    );

    assert_eq!(
        queries_from(&cluster, M1),
        vec![
            (M0.to_string(), StatusQuery::IsMaster),
            (M0.to_string(), StatusQuery::ReplicaSetConfig),
        ]
    );

    let commands = commands_from(&cluster, M1);
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].0, M0);
    assert_eq!(commands[0].1.document(), json!({ "host": M1 }));

    assert_eq!(
        shutdowns(&cluster, M1),
        vec![Some(Duration::from_secs(20))]
    );
    assert!(cluster.replica_set(M0).unwrap().members.contains(&M1.to_string()));
}

#[tokio::test]
async fn test_repeated_join_adds_once() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);
    cluster.seed_primary(M0, "rs0", &[M0]);

    let mut first = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));
    first.run(&CancellationToken::new()).await.unwrap();

    let mut second = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));
    let outcome = second.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        outcome.role,
        Role::Secondary {
            primary: PeerAddress::from(M0),
            added: false,
        }
    );

    let adds = commands_from(&cluster, M1)
        .into_iter()
        .filter(|(_, command)| matches!(command, AdminCommand::AddMember { .. }))
        .count();
    assert_eq!(adds, 1);
}

#[tokio::test]
async fn test_non_default_port_is_registered_with_members() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);

    let config = || {
        let mut config = BootstrapConfig::new("rs0");
        config.member_port = Some(27018);
        config
    };

    let outcome = bootstrap(&cluster, M0, config())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.role, Role::Primary { initiated: true });
    assert_eq!(
        commands_from(&cluster, M0)[0].1.document(),
        json!({ "_id": "rs0", "members": [{ "_id": 0, "host": format!("{M0}:27018") }] })
    );

    cluster.restart(M0);

    let outcome = bootstrap(&cluster, M1, config())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_matches!(outcome.role, Role::Secondary { added: true, .. });
    assert_eq!(
        commands_from(&cluster, M1)[0].1.document(),
        json!({ "host": format!("{M1}:27018") })
    );

    cluster.restart(M1);

    // Restarts recognize the port-qualified registrations.
    let outcome = bootstrap(&cluster, M0, config())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.role, Role::Primary { initiated: false });

    cluster.restart(M0);

    let outcome = bootstrap(&cluster, M1, config())
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_matches!(outcome.role, Role::Secondary { added: false, .. });

    assert_eq!(
        cluster.replica_set(M1).unwrap().members,
        vec![format!("{M0}:27018"), format!("{M1}:27018")]
    );
}

#[tokio::test]
async fn test_configured_engine_is_left_alone() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);
    cluster.seed_primary(M0, "rs0", &[M0]);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.role, Role::Primary { initiated: false });
    assert!(commands_from(&cluster, M0).is_empty());
    assert_eq!(shutdowns(&cluster, M0), vec![None]);
}

#[tokio::test]
async fn test_empty_discovery_initializes() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).unpublish(M0);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.role, Role::Primary { initiated: true });
    assert!(bootstrap.context().peers().is_empty());
    assert!(
        bootstrap
            .context()
            .history()
            .contains(&BootstrapState::InitializingPrimary)
    );
}

#[tokio::test]
async fn test_ready_timeout_skips_discovery() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).set_never_ready(M0);

    let mut config = BootstrapConfig::new("rs0");
    config.ready_timeout = Duration::from_millis(50);

    let mut bootstrap = bootstrap(&cluster, M0, config);

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::Engine(BootableError::ReadyTimeout { .. }))
    );

    assert!(!cluster.calls().iter().any(|call| matches!(
        call,
        Call::ResolveSelf { .. } | Call::DiscoverPeers { .. }
    )));
    assert_eq!(shutdowns(&cluster, M0), vec![None]);
    assert_eq!(bootstrap.context().state(), Some(BootstrapState::Fatal));
}

#[tokio::test]
async fn test_slow_engine_becomes_ready() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).set_ready_after(M0, 5);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.role, Role::Primary { initiated: true });
}

#[tokio::test]
async fn test_search_stops_at_first_primary() {
    let cluster = MockCluster::new();
    cluster
        .add_member(M1)
        .add_member(M2)
        .add_member(M3)
        .add_member(M9);
    cluster.seed_primary(M2, "rs0", &[M2]);

    let mut bootstrap = bootstrap(&cluster, M9, BootstrapConfig::new("rs0"));
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_matches!(outcome.role, Role::Secondary { primary, .. } if primary.as_str() == M2);

    let probed: Vec<String> = queries_from(&cluster, M9)
        .into_iter()
        .filter(|(_, query)| *query == StatusQuery::IsMaster)
        .map(|(target, _)| target)
        .collect();
    assert_eq!(probed, vec![M1.to_string(), M2.to_string()]);
}

#[tokio::test]
async fn test_unrecognized_status_is_fatal() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).set_status_override(
        M0,
        StatusQuery::ReplicaSetStatus,
        r#"{ "ok" : 0, "errmsg" : "node is in RECOVERING state" }"#,
    );

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::UnrecognizedState { status, .. }) if status.contains("RECOVERING")
    );
    assert!(commands_from(&cluster, M0).is_empty());
    assert_eq!(shutdowns(&cluster, M0), vec![None]);
}

#[tokio::test]
async fn test_non_seed_member_fails_fast() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);

    let mut bootstrap = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::NotSeedMember { identity, seed })
            if identity.as_str() == M1 && seed.as_str() == M0
    );
    assert!(commands_from(&cluster, M1).is_empty());
    assert_eq!(shutdowns(&cluster, M1), vec![None]);
}

#[tokio::test]
async fn test_any_member_policy_initiates_without_seed() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);

    let mut config = BootstrapConfig::new("rs0");
    config.seed_policy = SeedPolicy::AnyMember;

    let mut bootstrap = bootstrap(&cluster, M1, config);
    let outcome = bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.role, Role::Primary { initiated: true });
    assert!(cluster.is_primary(M1));
}

#[tokio::test]
async fn test_unacknowledged_add_is_fatal() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1);
    cluster.set_status_override(
        M0,
        StatusQuery::IsMaster,
        r#"{ "ismaster" : true, "secondary" : false, "ok" : 1 }"#,
    );

    let mut bootstrap = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::Admin(mongo_init_admin::Error::NotAcknowledged {
            command: "replSetAdd",
            ..
        }))
    );
    assert_eq!(shutdowns(&cluster, M1), vec![None]);
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).set_discovery_failure(true);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::Discovery(_))
    );
    assert!(queries_from(&cluster, M0).is_empty());
    assert_eq!(shutdowns(&cluster, M0), vec![None]);
}

#[tokio::test]
async fn test_unreachable_peer_is_fatal() {
    let cluster = MockCluster::new();
    cluster.add_member(M0).add_member(M1).crash(M0);

    let mut bootstrap = bootstrap(&cluster, M1, BootstrapConfig::new("rs0"));

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::Admin(mongo_init_admin::Error::ShellFailed { .. }))
    );
    assert_eq!(shutdowns(&cluster, M1), vec![None]);
}

#[tokio::test]
async fn test_supervised_primary_stops_on_cancel() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);

    let mut config = BootstrapConfig::new("rs0");
    config.primary_exit = PrimaryExit::Supervise;

    let token = CancellationToken::new();
    let task = {
        let mut bootstrap = bootstrap(&cluster, M0, config);
        let token = token.clone();
        tokio::spawn(async move { bootstrap.run(&token).await })
    };

    while cluster.acknowledged_commands().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert!(cluster.is_running(M0));
    assert!(shutdowns(&cluster, M0).is_empty());

    token.cancel();

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.role, Role::Primary { initiated: true });
    assert_eq!(
        shutdowns(&cluster, M0),
        vec![Some(Duration::from_secs(20))]
    );
}

#[tokio::test]
async fn test_supervised_primary_fails_when_engine_exits() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);

    let mut config = BootstrapConfig::new("rs0");
    config.primary_exit = PrimaryExit::Supervise;

    let task = {
        let mut bootstrap = bootstrap(&cluster, M0, config);
        tokio::spawn(async move { bootstrap.run(&CancellationToken::new()).await })
    };

    while cluster.acknowledged_commands().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    cluster.crash(M0);

    assert_matches!(
        task.await.unwrap(),
        Err(Error::EngineExited("mock-mongod"))
    );
    assert!(!cluster.is_running(M0));
}

#[tokio::test]
async fn test_cancelled_before_join() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);

    let token = CancellationToken::new();
    token.cancel();

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));

    assert_matches!(bootstrap.run(&token).await, Err(Error::Cancelled));
    assert!(commands_from(&cluster, M0).is_empty());
    assert!(!bootstrap.context().engine_started());
}

#[tokio::test]
async fn test_runs_only_once() {
    let cluster = MockCluster::new();
    cluster.add_member(M0);

    let mut bootstrap = bootstrap(&cluster, M0, BootstrapConfig::new("rs0"));
    bootstrap.run(&CancellationToken::new()).await.unwrap();

    assert_matches!(
        bootstrap.run(&CancellationToken::new()).await,
        Err(Error::AlreadyStarted)
    );
}
