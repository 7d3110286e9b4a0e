//! # ringvote-types
//!
//! Shared identifiers, the fixed topic catalog, and wall-clock primitives
//! used throughout the ringvote fleet.
//!
//! This crate has no networking or I/O of its own — it only defines the
//! vocabulary the rest of the workspace shares.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod peer_id;
mod timestamp;
mod topic;

pub use error::{Error, Result};
pub use peer_id::PeerId;
pub use timestamp::Timestamp;
pub use topic::Topic;
