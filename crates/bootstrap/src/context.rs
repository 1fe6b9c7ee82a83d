use std::fmt;

use indexmap::IndexSet;
use mongo_init_discovery::{PeerAddress, SelfIdentity};

/// Phases of a bootstrap run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    /// Launching the engine.
    Starting,

    /// Polling the engine until it answers.
    WaitingReady,

    /// Resolving self identity and enumerating peers.
    DiscoveringPeers,

    /// Probing peers for a primary.
    SearchingPrimary,

    /// Creating or confirming a replica set on the local engine.
    InitializingPrimary,

    /// Registering with an existing primary.
    JoiningSecondary,

    /// Stopping the engine.
    ShuttingDown,

    /// Keeping a freshly configured primary running.
    Supervising,

    /// Finished successfully.
    Done,

    /// Finished with an error.
    Fatal,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::WaitingReady => "waiting-ready",
            Self::DiscoveringPeers => "discovering-peers",
            Self::SearchingPrimary => "searching-primary",
            Self::InitializingPrimary => "initializing-primary",
            Self::JoiningSecondary => "joining-secondary",
            Self::ShuttingDown => "shutting-down",
            Self::Supervising => "supervising",
            Self::Done => "done",
            Self::Fatal => "fatal",
        };

        f.write_str(name)
    }
}

/// Values threaded through a bootstrap run.
#[derive(Debug, Default)]
pub struct BootstrapContext {
    pub(crate) engine_started: bool,
    pub(crate) history: Vec<BootstrapState>,
    pub(crate) identity: Option<SelfIdentity>,
    pub(crate) peers: IndexSet<PeerAddress>,
    pub(crate) primary: Option<PeerAddress>,
}

impl BootstrapContext {
    /// Whether the engine is running under this coordinator.
    #[must_use]
    pub const fn engine_started(&self) -> bool {
        self.engine_started
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[BootstrapState] {
        &self.history
    }

    /// This member, once resolved.
    #[must_use]
    pub const fn identity(&self) -> Option<&SelfIdentity> {
        self.identity.as_ref()
    }

    /// Discovered peers, in answer order.
    #[must_use]
    pub const fn peers(&self) -> &IndexSet<PeerAddress> {
        &self.peers
    }

    /// The primary found during the search, if any.
    #[must_use]
    pub const fn primary(&self) -> Option<&PeerAddress> {
        self.primary.as_ref()
    }

    /// The current state, `None` before the run starts.
    #[must_use]
    pub fn state(&self) -> Option<BootstrapState> {
        self.history.last().copied()
    }
}

/// The role this member ended up with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// This member runs the replica set.
    Primary {
        /// Whether this run created the set.
        initiated: bool,
    },

    /// This member belongs to the set run by `primary`.
    Secondary {
        /// The primary that was joined.
        primary: PeerAddress,

        /// Whether this run added the member.
        added: bool,
    },
}

/// Result of a successful bootstrap run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// This member.
    pub identity: SelfIdentity,

    /// The role it ended up with.
    pub role: Role,

    /// Final state.
    pub state: BootstrapState,
}
