//! The fleet config file: a JSON object keyed by stringified peer id,
//! loaded with `-a/--automate`.

use anyhow::{Context, Result};
use ringvote_membership::{MembershipTable, PeerInfo};
use ringvote_types::PeerId;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One peer's entry in the fleet config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerEntry {
    /// The peer's listening host.
    pub host: String,
    /// The peer's listening port.
    pub port: u16,
    /// The id this peer forwards to, or `-1` for "no successor" (used by
    /// standalone test-send entries that never join the ring).
    pub successor: i64,
    /// Whether this peer should initiate a poll on startup.
    #[serde(default)]
    pub test_send: bool,
    /// Whether this peer should exit immediately at startup, used to
    /// script link failures for the repair scenarios.
    #[serde(default)]
    pub faulty: bool,
    /// Whether this peer always votes against, overriding the default
    /// policy.
    #[serde(default)]
    pub all_vote_against: bool,
}

/// The full fleet, keyed by peer id.
pub type Fleet = HashMap<PeerId, PeerEntry>;

/// Loads and parses the fleet config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, or
/// has a non-integer key.
pub fn load(path: &Path) -> Result<Fleet> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let raw: HashMap<String, PeerEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    raw.into_iter()
        .map(|(key, entry)| {
            let id: u64 = key
                .parse()
                .with_context(|| format!("peer id '{key}' is not a valid integer"))?;
            Ok((PeerId::new(id), entry))
        })
        .collect()
}

/// Builds a membership table from every fleet entry that has joined the
/// ring (`successor != -1`); standalone test-send-only entries are
/// omitted.
#[must_use]
pub fn build_membership(fleet: &Fleet) -> MembershipTable {
    let mut entries = HashMap::new();
    for (&id, entry) in fleet {
        if entry.successor < 0 {
            continue;
        }
        entries.insert(
            id,
            PeerInfo::new(entry.host.clone(), entry.port, PeerId::new(entry.successor as u64)),
        );
    }
    MembershipTable::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_five_peer_ring() {
        let file = write_fixture(
            r#"{
                "1": {"host": "localhost", "port": 8001, "successor": 2, "test_send": true, "faulty": false},
                "2": {"host": "localhost", "port": 8002, "successor": 3, "test_send": false, "faulty": false}
            }"#,
        );
        let fleet = load(file.path()).unwrap();
        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet[&PeerId::new(1)].successor, 2);
        assert!(fleet[&PeerId::new(1)].test_send);
    }

    #[test]
    fn negative_successor_is_excluded_from_the_membership_table() {
        let mut fleet = Fleet::new();
        fleet.insert(
            PeerId::new(1),
            PeerEntry {
                host: "localhost".into(),
                port: 8001,
                successor: -1,
                test_send: true,
                faulty: false,
                all_vote_against: false,
            },
        );
        let membership = build_membership(&fleet);
        assert!(membership.is_empty());
    }

    #[test]
    fn rejects_a_non_integer_key() {
        let file = write_fixture(r#"{"not-a-number": {"host": "localhost", "port": 8001, "successor": -1, "test_send": false, "faulty": false}}"#);
        assert!(load(file.path()).is_err());
    }
}
