use thiserror::Error;

/// Errors returned by the mock discovery.
#[derive(Debug, Error)]
pub enum Error {
    /// Identity error from the real discovery types.
    #[error(transparent)]
    Discovery(#[from] mongo_init_discovery::Error),

    /// Simulated resolver failure.
    #[error("simulated resolver failure for {0}")]
    Resolve(String),
}
