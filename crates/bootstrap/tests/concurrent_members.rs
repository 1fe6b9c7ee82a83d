use mongo_init_admin::AdminCommand;
use mongo_init_bootstrap::{Bootstrap, BootstrapConfig, BootstrapOptions, Error, Outcome, Role};
use mongo_init_mock::MockCluster;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const MAX_ROUNDS: usize = 5;

fn member(index: usize) -> String {
    format!("mongo-{index}.mongo.db.svc.cluster.local")
}

/// Runs a bootstrap for every host at the same time.
async fn run_round(cluster: &MockCluster, hosts: &[String]) -> Vec<(String, Result<Outcome, Error>)> {
    let mut set = JoinSet::new();

    for host in hosts {
        let cluster = cluster.clone();
        let host = host.clone();

        set.spawn(async move {
            let mut bootstrap = Bootstrap::new(BootstrapOptions {
                admin: cluster.admin(&host),
                config: BootstrapConfig::new("rs0"),
                discovery: cluster.discovery(&host),
                engine: cluster.engine(&host),
            });

            let result = bootstrap.run(&CancellationToken::new()).await;

            (host, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        results.push(joined.unwrap());
    }

    results
}

#[tokio::test]
async fn test_concurrent_members_initiate_exactly_once() {
    for size in 1..=5 {
        let cluster = MockCluster::new();
        let hosts: Vec<String> = (0..size).map(member).collect();

        for host in &hosts {
            cluster.add_member(host);
        }

        let seed = &hosts[0];
        let mut pending = hosts.clone();

        for _ in 0..MAX_ROUNDS {
            if pending.is_empty() {
                break;
            }

            // Members that finished earlier come back as configured engines.
            for host in &hosts {
                cluster.restart(host);
            }

            pending = run_round(&cluster, &pending)
                .await
                .into_iter()
                .filter_map(|(host, result)| match result {
                    Ok(outcome) => {
                        if let Role::Secondary { primary, .. } = &outcome.role {
                            assert_eq!(primary.as_str(), seed);
                        }
                        None
                    }
                    Err(Error::NotSeedMember { seed: expected, .. }) => {
                        assert_eq!(expected.as_str(), seed);
                        Some(host)
                    }
                    // A peer shut down while this member probed it.
                    Err(Error::Admin(_)) => Some(host),
                    Err(e) => panic!("{host} failed unexpectedly: {e}"),
                })
                .collect();
        }

        assert!(
            pending.is_empty(),
            "{size} members did not converge, still pending: {pending:?}"
        );

        let initiates: Vec<String> = cluster
            .acknowledged_commands()
            .into_iter()
            .filter(|(_, command)| matches!(command, AdminCommand::InitiateReplicaSet { .. }))
            .map(|(target, _)| target)
            .collect();
        assert_eq!(&initiates, &[seed.clone()], "{size} members");

        let config = cluster.replica_set(seed).unwrap();
        for host in &hosts {
            assert!(config.members.contains(host), "{host} missing from {config:?}");
            assert_eq!(cluster.is_primary(host), host == seed);
            assert_eq!(cluster.replica_set(host).unwrap().id, "rs0");
        }
    }
}
