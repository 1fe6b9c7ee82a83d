use mongo_init_bootable::{BootableError, BoxError};
use mongo_init_discovery::PeerAddress;
use thiserror::Error;

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a bootstrap run.
#[derive(Debug, Error)]
pub enum Error {
    /// An admin query or command failed.
    #[error(transparent)]
    Admin(#[from] mongo_init_admin::Error),

    /// The coordinator has already run.
    #[error("bootstrap already started")]
    AlreadyStarted,

    /// Shutdown was requested before the member finished joining.
    #[error("bootstrap cancelled")]
    Cancelled,

    /// Self identity or peer discovery failed.
    #[error("peer discovery failed: {0}")]
    Discovery(#[source] BoxError),

    /// The engine failed to start, become ready or stop.
    #[error(transparent)]
    Engine(#[from] BootableError),

    /// A supervised engine exited on its own.
    #[error("{0} exited while supervised")]
    EngineExited(&'static str),

    /// No primary exists and another member is responsible for initiating.
    #[error("{identity} is not the seed member, waiting for {seed} to initiate the replica set")]
    NotSeedMember {
        /// This member.
        identity: PeerAddress,

        /// The member allowed to initiate.
        seed: PeerAddress,
    },

    /// The engine reported a replica-set status the coordinator cannot act on.
    #[error("unrecognized replica set status from {endpoint}:\n{status}")]
    UnrecognizedState {
        /// Endpoint that was queried.
        endpoint: String,

        /// Raw status payload.
        status: String,
    },
}

impl Error {
    pub(crate) fn discovery<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Discovery(Box::new(source))
    }
}
