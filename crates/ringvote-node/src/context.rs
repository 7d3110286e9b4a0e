//! Per-peer context threaded through every handler, in place of
//! module-level globals.

use crate::{InMemoryMetrics, MetricsSink, VotePolicy};
use parking_lot::RwLock;
use ringvote_membership::MembershipTable;
use ringvote_types::{PeerId, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

/// Errors raised directly by the node runtime (as opposed to protocol or
/// membership errors, which are re-exported through their own crates).
#[derive(Debug, Error)]
pub enum NodeError {
    /// A shared type error (unknown peer, alone in ring, bind failure).
    #[error(transparent)]
    Types(#[from] ringvote_types::Error),
    /// A protocol-level error (decode failure, oversized message, I/O).
    #[error(transparent)]
    Protocol(#[from] ringvote_protocol::ProtocolError),
}

/// The shared wall-clock deadline origin and bound.
///
/// `origin` starts unset. The initiator fixes it at poll creation; every
/// other peer adopts it the first time they handle a `poll` carrying a
/// `start_time`. Subsequent polls never overwrite an already-adopted
/// origin.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineState {
    origin: Option<Timestamp>,
    delta: Duration,
}

impl DeadlineState {
    /// Creates a deadline state with bound `delta` and no origin yet.
    #[must_use]
    pub fn new(delta: Duration) -> Self {
        Self {
            origin: None,
            delta,
        }
    }

    /// Adopts `origin` if none has been adopted yet. Returns true if this
    /// call set the origin.
    pub fn adopt(&mut self, origin: Timestamp) -> bool {
        if self.origin.is_none() {
            self.origin = Some(origin);
            true
        } else {
            false
        }
    }

    /// Returns the adopted origin, if any.
    #[must_use]
    pub fn origin(&self) -> Option<Timestamp> {
        self.origin
    }

    /// Returns the fleet-wide bound.
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Returns true if `now` is past `origin + delta`. Returns false if
    /// no origin has been adopted yet — an unstarted poll cannot expire.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.origin {
            Some(origin) => now.elapsed_since(origin.plus(self.delta)) > Duration::ZERO,
            None => false,
        }
    }
}

/// Everything one running peer needs to process messages: its own
/// identity, the membership view, the shared deadline, the metrics sink,
/// the voting policy, and the terminate flag that cooperative
/// cancellation checks.
pub struct NodeContext {
    /// This peer's id.
    pub id: PeerId,
    /// This peer's listening host, used when stamping outgoing messages.
    pub host: String,
    /// This peer's listening port.
    pub port: u16,
    /// The local membership view.
    pub membership: Arc<MembershipTable>,
    /// The shared consensus deadline.
    pub deadline: Arc<RwLock<DeadlineState>>,
    /// The metrics sink (ambient observability, kept behind a narrow
    /// trait so the node never touches a concrete sink's internals).
    pub metrics: Arc<dyn MetricsSink>,
    /// The voting decision policy, injected so tests can pin it.
    pub vote_policy: Arc<dyn VotePolicy>,
    /// Set once graceful shutdown has been initiated; checked at every
    /// suspension point by the inbound/outbound components.
    pub terminating: Arc<AtomicBool>,
    /// Serializes message processing to one-at-a-time per node: held for
    /// the duration of a handler call plus the resulting outbound send.
    processing: Arc<AsyncMutex<()>>,
    /// Guards the rare cross-task repair trigger from outbound sends
    /// racing each other onto the same node. An async mutex: the guard
    /// is held across the probe's `.await`, so it must stay `Send`.
    repair_lock: Arc<AsyncMutex<()>>,
}

impl NodeContext {
    /// Builds a context for peer `id` listening on `host:port`.
    #[must_use]
    pub fn new(
        id: PeerId,
        host: impl Into<String>,
        port: u16,
        membership: Arc<MembershipTable>,
        delta: Duration,
        vote_policy: Arc<dyn VotePolicy>,
    ) -> Self {
        Self {
            id,
            host: host.into(),
            port,
            membership,
            deadline: Arc::new(RwLock::new(DeadlineState::new(delta))),
            metrics: Arc::new(InMemoryMetrics::default()),
            vote_policy,
            terminating: Arc::new(AtomicBool::new(false)),
            processing: Arc::new(AsyncMutex::new(())),
            repair_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Overrides the metrics sink (defaults to an in-memory one).
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Acquires the per-node processing lock. Held across a handler call
    /// and its resulting outbound send so the state machine never runs
    /// two messages concurrently.
    pub async fn lock_processing(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.processing.lock().await
    }

    /// Acquires the repair lock, serializing concurrent repair attempts
    /// triggered by different outbound sends racing a dead successor.
    pub async fn lock_repair(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.repair_lock.lock().await
    }

    /// Returns true once graceful shutdown has been initiated.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Marks the node as terminating; cooperative cancellation checks
    /// this at their next suspension point.
    pub fn begin_terminating(&self) {
        self.terminating.store(true, Ordering::SeqCst);
    }
}
