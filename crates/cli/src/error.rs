use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bootstrap error.
    #[error(transparent)]
    Bootstrap(#[from] mongo_init_bootstrap::Error),

    /// Engine configuration error.
    #[error(transparent)]
    Config(#[from] mongo_init_mongod::Error),

    /// Could not install the health-check script.
    #[error("failed to install {path:?}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,

        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Could not set global default subscriber.
    #[error("could not set global default subscriber: {0}")]
    SetTracing(#[from] tracing::dispatcher::SetGlobalDefaultError),
}
