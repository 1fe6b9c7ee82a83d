use std::path::PathBuf;

use thiserror::Error;

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The mongod binary is not in the configured directory or on `PATH`.
    #[error("mongod binary not found: {0}")]
    BinaryNotFound(#[source] which::Error),

    /// The config file is not valid JSON or YAML.
    #[error("invalid config file {path}: {source}")]
    Config {
        /// Path of the config file.
        path: PathBuf,

        /// Parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// The config file does not name a replica set.
    #[error("{0} has no replication.replSetName")]
    MissingReplicaSetName(PathBuf),

    /// An error from process supervision.
    #[error(transparent)]
    Process(#[from] mongo_init_process::Error),
}
