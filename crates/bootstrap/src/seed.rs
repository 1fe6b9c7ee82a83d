use indexmap::IndexSet;
use mongo_init_discovery::PeerAddress;

/// Which member may initiate a new replica set when no primary exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Every member that sees no primary initiates.
    ///
    /// Members starting at the same time can each create their own set.
    AnyMember,

    /// Only the member whose name sorts lowest among itself and its peers.
    #[default]
    LowestIdentity,
}

impl SeedPolicy {
    /// Picks the member allowed to initiate, as seen by `identity`.
    #[must_use]
    pub fn seed<'a>(
        self,
        identity: &'a PeerAddress,
        peers: &'a IndexSet<PeerAddress>,
    ) -> &'a PeerAddress {
        match self {
            Self::AnyMember => identity,
            Self::LowestIdentity => peers.iter().fold(identity, std::cmp::min),
        }
    }
}
