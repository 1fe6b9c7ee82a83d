//! Binary that joins a stateful-set member to its replica set.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod health_check;

use error::Result;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mongo_init_admin::{ShellAdminClient, ShellAdminClientOptions};
use mongo_init_bootstrap::{Bootstrap, BootstrapConfig, BootstrapOptions, PrimaryExit, SeedPolicy};
use mongo_init_discovery::{DnsPeerDiscovery, DnsPeerDiscoveryOptions};
use mongo_init_mongod::{DEFAULT_CONFIG_PATH, Mongod, MongodConfig, MongodOptions};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Seed {
    /// Any member may initiate a new replica set.
    Any,

    /// Only the lowest-ordered member may initiate.
    Lowest,
}

impl From<Seed> for SeedPolicy {
    fn from(seed: Seed) -> Self {
        match seed {
            Seed::Any => Self::AnyMember,
            Seed::Lowest => Self::LowestIdentity,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bound for mutating admin commands, in seconds
    #[arg(long, default_value_t = 30, env = "MONGO_INIT_COMMAND_TIMEOUT")]
    command_timeout: u64,

    /// Engine configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "MONGO_INIT_CONFIG")]
    config: PathBuf,

    /// Override for this member's fully-qualified name
    #[arg(long, env = "MONGO_INIT_FQDN")]
    fqdn: Option<String>,

    /// Where the health-check script is installed
    #[arg(
        long,
        default_value = "/workdir/health-check.sh",
        env = "MONGO_INIT_HEALTH_CHECK_DEST"
    )]
    health_check_dest: PathBuf,

    /// Health-check script shipped with this image
    #[arg(
        long,
        default_value = "/mongo-init/healthCheck.sh",
        env = "MONGO_INIT_HEALTH_CHECK_SOURCE"
    )]
    health_check_source: PathBuf,

    /// Override for this member's short hostname
    #[arg(long, env = "MONGO_INIT_HOSTNAME")]
    hostname: Option<String>,

    /// Log level
    #[arg(long, default_value_t = Level::INFO, env = "MONGO_INIT_LOG_LEVEL")]
    log_level: Level,

    /// Directory containing the mongod binary, looked up on PATH if unset
    #[arg(long, env = "MONGO_INIT_MONGOD_BIN_DIR")]
    mongod_bin_dir: Option<PathBuf>,

    /// Bound for pings and status queries, in seconds
    #[arg(long, default_value_t = 10, env = "MONGO_INIT_PROBE_TIMEOUT")]
    probe_timeout: u64,

    /// Bound for the engine to become ready, in seconds
    #[arg(long, default_value_t = 60, env = "MONGO_INIT_READY_TIMEOUT")]
    ready_timeout: u64,

    /// Grace period for a secondary to hand over, in seconds
    #[arg(long, default_value_t = 20, env = "MONGO_INIT_SECONDARY_GRACE")]
    secondary_grace: u64,

    /// Which member may initiate a new replica set
    #[arg(long, value_enum, default_value_t = Seed::Lowest, env = "MONGO_INIT_SEED")]
    seed: Seed,

    /// Extra arguments passed to every shell session, e.g. TLS or auth flags
    #[arg(
        long = "shell-arg",
        allow_hyphen_values = true,
        env = "MONGO_INIT_SHELL_ARGS",
        value_delimiter = ' '
    )]
    shell_args: Vec<String>,

    /// Admin shell executable, `mongo` or `mongosh`
    #[arg(long, default_value = "mongo", env = "MONGO_INIT_SHELL")]
    shell_path: PathBuf,

    /// Keep a new primary's engine running instead of shutting it down
    #[arg(long, env = "MONGO_INIT_SUPERVISE_PRIMARY")]
    supervise_primary: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(args.log_level)
            .finish(),
    )?;

    health_check::install(&args.health_check_source, &args.health_check_dest).await?;

    let config = MongodConfig::load(&args.config)?;
    info!(
        "replica set {} on port {}",
        config.replica_set_name(),
        config.port().map_or_else(|| "default".to_string(), |p| p.to_string())
    );

    let admin = ShellAdminClient::new(ShellAdminClientOptions {
        command_timeout: Duration::from_secs(args.command_timeout),
        extra_args: args.shell_args,
        port: config.port(),
        probe_timeout: Duration::from_secs(args.probe_timeout),
        shell_path: args.shell_path,
    });

    let engine = Mongod::new(MongodOptions {
        admin: admin.clone(),
        bin_dir: args.mongod_bin_dir,
        config_path: config.path().to_path_buf(),
    });

    let discovery = DnsPeerDiscovery::new(DnsPeerDiscoveryOptions {
        fqdn: args.fqdn,
        hostname: args.hostname,
    });

    let mut bootstrap_config = BootstrapConfig::new(config.replica_set_name());
    bootstrap_config.member_port = config.port();
    bootstrap_config.primary_exit = if args.supervise_primary {
        PrimaryExit::Supervise
    } else {
        PrimaryExit::Shutdown
    };
    bootstrap_config.ready_timeout = Duration::from_secs(args.ready_timeout);
    bootstrap_config.secondary_grace = Duration::from_secs(args.secondary_grace);
    bootstrap_config.seed_policy = args.seed.into();

    let mut bootstrap = Bootstrap::new(BootstrapOptions {
        admin,
        config: bootstrap_config,
        discovery,
        engine,
    });

    let shutdown_token = CancellationToken::new();

    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                info!("received SIGINT");
            }
        }

        signal_shutdown_token.cancel();
    });

    let outcome = bootstrap.run(&shutdown_token).await?;
    info!("{} finished as {:?}", outcome.identity.fqdn(), outcome.role);

    Ok(())
}
