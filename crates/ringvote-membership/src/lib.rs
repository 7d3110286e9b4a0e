//! # ringvote-membership
//!
//! The authoritative local table of peers: `id -> {host, port,
//! successor}`, mutated only by initial load and by the repair
//! protocol. Reads and mutations are serialized through a single
//! `RwLock` — the node crate is responsible for ensuring only one task
//! writes at a time; this crate just makes that lock cheap to hold and
//! correct to use concurrently with readers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod table;

pub use table::{MembershipTable, PeerInfo};
