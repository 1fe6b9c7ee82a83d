use std::fmt;

/// Where an admin call is sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The engine running next to this agent.
    Local,

    /// A peer, addressed by its fully-qualified name.
    Remote(String),
}

impl Endpoint {
    /// Builds a remote endpoint for `host`.
    pub fn remote(host: impl Into<String>) -> Self {
        Self::Remote(host.into())
    }

    /// Returns the remote host, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Remote(host) => Some(host),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local engine"),
            Self::Remote(host) => write!(f, "{host}"),
        }
    }
}
