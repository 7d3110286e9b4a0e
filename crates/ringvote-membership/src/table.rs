//! The membership table itself.

use parking_lot::RwLock;
use ringvote_types::{Error, PeerId, Result};
use std::collections::HashMap;

/// Everything the local node knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// The peer's listening host.
    pub host: String,
    /// The peer's listening port.
    pub port: u16,
    /// The id this peer currently forwards to.
    pub successor: PeerId,
}

impl PeerInfo {
    /// Creates a peer info entry.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, successor: PeerId) -> Self {
        Self {
            host: host.into(),
            port,
            successor,
        }
    }
}

/// The local peer table: `id -> {host, port, successor}`.
///
/// Invariants enforced by construction, not by the lock itself:
/// - Every id referenced by a `successor` field should be present in the
///   table, except transiently inside a repair step.
/// - At steady state the successor graph is a single cycle over all
///   live ids.
///
/// Only [`MembershipTable::apply_update`] and [`MembershipTable::set_successor`]
/// / [`MembershipTable::remove`] mutate the table after construction —
/// the table is only ever touched by the initial load and by the
/// repair protocol.
#[derive(Debug)]
pub struct MembershipTable {
    entries: RwLock<HashMap<PeerId, PeerInfo>>,
}

impl MembershipTable {
    /// Builds a membership table from an initial set of entries (the
    /// config-file load; parsing the file itself is the CLI's job, not
    /// this crate's).
    #[must_use]
    pub fn new(entries: HashMap<PeerId, PeerInfo>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the number of peers currently known, `N` in the poll
    /// termination rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns true if `id` has an entry.
    #[must_use]
    pub fn contains(&self, id: PeerId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Returns every id currently in the table, in unspecified order.
    #[must_use]
    pub fn ids(&self) -> Vec<PeerId> {
        self.entries.read().keys().copied().collect()
    }

    /// Resolves `id` to its listening endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPeer`] if `id` is absent.
    pub fn lookup(&self, id: PeerId) -> Result<(String, u16)> {
        self.entries
            .read()
            .get(&id)
            .map(|info| (info.host.clone(), info.port))
            .ok_or(Error::UnknownPeer(id))
    }

    /// Returns the successor of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPeer`] if `id` is absent.
    pub fn successor_of(&self, id: PeerId) -> Result<PeerId> {
        self.entries
            .read()
            .get(&id)
            .map(|info| info.successor)
            .ok_or(Error::UnknownPeer(id))
    }

    /// Returns `successor_of(successor_of(from))`, the candidate one
    /// hop past `from`'s immediate successor.
    ///
    /// Ring repair does not call this directly: a probe can find more
    /// than one dead peer in a row, so the live walk in
    /// `ringvote-node::repair` advances one `successor_of` hop at a
    /// time, probing and removing as it goes, rather than committing to
    /// a fixed two-hop skip. This helper stays as the building block for
    /// the always-exactly-one-dead-peer case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPeer`] if either hop is absent.
    pub fn advance_successor(&self, from: PeerId) -> Result<PeerId> {
        let mid = self.successor_of(from)?;
        self.successor_of(mid)
    }

    /// Applies a repair announcement: sets
    /// `table[initiator_id].successor = new_successor` and removes every
    /// id in `faulty` from the table.
    ///
    /// Idempotent: applying the same update twice leaves the table in
    /// the same state as applying it once.
    pub fn apply_update(&self, initiator_id: PeerId, new_successor: PeerId, faulty: &[PeerId]) {
        let mut entries = self.entries.write();
        if let Some(info) = entries.get_mut(&initiator_id) {
            info.successor = new_successor;
        }
        for id in faulty {
            entries.remove(id);
        }
    }

    /// Sets `id`'s successor directly, used by local repair before the
    /// `update` message has circulated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPeer`] if `id` is absent.
    pub fn set_successor(&self, id: PeerId, successor: PeerId) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(&id) {
            Some(info) => {
                info.successor = successor;
                Ok(())
            }
            None => Err(Error::UnknownPeer(id)),
        }
    }

    /// Removes `id` from the table, as ring repair does for each dead
    /// peer it walks past.
    pub fn remove(&self, id: PeerId) {
        self.entries.write().remove(&id);
    }

    /// Returns a point-in-time clone of the table, for the metrics sink
    /// or for tests that assert on ring shape.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<PeerId, PeerInfo> {
        self.entries.read().clone()
    }

    /// Returns true if, starting from `start`, following `successor`
    /// links visits every live id exactly once and returns to `start` —
    /// the "simple cycle over surviving ids" invariant the ring is
    /// expected to hold at steady state.
    #[must_use]
    pub fn is_simple_cycle_from(&self, start: PeerId) -> bool {
        let entries = self.entries.read();
        if !entries.contains_key(&start) {
            return false;
        }
        let mut visited = std::collections::HashSet::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return false;
            }
            match entries.get(&current) {
                Some(info) => current = info.successor,
                None => return false,
            }
            if current == start {
                break;
            }
        }
        visited.len() == entries.len()
    }
}
