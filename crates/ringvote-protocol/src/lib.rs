//! # ringvote-protocol
//!
//! Wire message definitions for the ringvote fleet and the EOF-delimited
//! JSON framing used to move them over a TCP connection.
//!
//! There is no multiplexing and no length prefix: one connection carries
//! exactly one message, written in a single `write_all` and read until
//! the peer closes its end. This keeps wire compatibility with the
//! reference `robot.py` implementation this protocol was distilled from.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod message;
mod wire;

pub use error::{ProtocolError, Result};
pub use message::{Message, Sender};
pub use wire::{read_message, write_message, MAX_MESSAGE_SIZE};
