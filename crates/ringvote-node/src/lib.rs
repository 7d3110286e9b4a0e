//! # ringvote-node
//!
//! The per-peer runtime: the consensus/repair state machine, the
//! inbound server and outbound sender that carry it over TCP, the
//! failure detector and ring repair protocol, and the consensus timer
//! that bounds deliberation and drives coordinated shutdown.
//!
//! Everything here is threaded through an explicit [`NodeContext`]
//! rather than module-level globals, so a process can run one peer with
//! no hidden shared state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod handlers;
mod inbound;
mod metrics;
mod outbound;
mod policy;
mod repair;
mod timer;

pub use context::{DeadlineState, NodeContext, NodeError};
pub use handlers::{handle_message, perform, HandlerResult};
pub use inbound::{run_inbound_server, InboundError};
pub use metrics::{InMemoryMetrics, MetricsSink, MetricsSnapshot};
pub use outbound::{forward_to_successor, send_to_peer, OutboundError};
pub use policy::{BernoulliPolicy, FixedPolicy, ForceAgainstPolicy, VotePolicy};
pub use repair::repair_successor;
pub use timer::{is_deadline_expired, shutdown_fleet};
