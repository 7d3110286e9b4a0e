//! Structural errors shared across the ringvote crates.
//!
//! Per-component error kinds (protocol decoding, send failures) live in
//! their owning crate; this enum only carries the fatal/structural kinds
//! from the error taxonomy that more than one crate needs to name.

use crate::PeerId;
use thiserror::Error;

/// Shared error type for ringvote operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A membership lookup referenced an id with no entry in the table.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// Ring repair walked the successor chain back to the local node:
    /// every other peer is gone.
    #[error("alone in ring: no live successor found")]
    AloneInRing,

    /// The inbound listener could not bind its configured address.
    #[error("failed to bind {addr}: {source}")]
    BindFailure {
        /// The address that failed to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized `Result` type for ringvote operations.
pub type Result<T> = std::result::Result<T, Error>;
