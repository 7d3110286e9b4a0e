//! The per-message-kind state machine.
//!
//! Each handler receives the inbound message and the local context and
//! returns at most one outbound message, plus whether to execute an
//! action locally and whether to begin graceful self-shutdown. Sending
//! the outbound message and scheduling shutdown are the caller's job
//! (the inbound dispatch loop in [`crate::inbound`]) — a handler never
//! touches a socket.

use crate::NodeContext;
use ringvote_protocol::{Message, Sender};
use ringvote_types::Topic;
use std::time::{Duration, Instant};

/// What a handler decided to do with one inbound message.
#[derive(Debug, Default)]
pub struct HandlerResult {
    /// The message to forward to the local successor, if any.
    pub outbound: Option<Message>,
    /// The topic that was executed locally as a side effect, if any.
    pub executed: Option<Topic>,
    /// Whether this node should begin graceful shutdown after the
    /// outbound message (if any) has been sent.
    pub shutdown_self: bool,
    /// Whether this node should fan `shutdown` out to every other known
    /// peer before stopping. True only when *this* node is the one that
    /// just drove the poll to acceptance; a node that shuts down because
    /// it received a `shutdown` message must not re-broadcast it.
    pub announce_shutdown: bool,
}

impl HandlerResult {
    fn none() -> Self {
        Self::default()
    }

    fn forward(message: Message) -> Self {
        Self {
            outbound: Some(message),
            ..Self::default()
        }
    }
}

pub(crate) fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Poll { .. } => "poll",
        Message::Action { .. } => "action",
        Message::Update { .. } => "update",
        Message::Ping { .. } => "ping",
        Message::Shutdown { .. } => "shutdown",
    }
}

fn local_sender(ctx: &NodeContext) -> Sender {
    Sender::new(ctx.id, ctx.host.clone(), ctx.port)
}

/// Executes `topic`, an opaque physical action. Modeled as a fixed,
/// nonzero delay standing in for a real physical effect.
pub async fn perform(topic: Topic) -> Duration {
    let start = Instant::now();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tracing::info!(%topic, "performed action");
    start.elapsed()
}

/// Dispatches one inbound message to its handler.
pub async fn handle_message(message: Message, ctx: &NodeContext) -> HandlerResult {
    ctx.metrics.record_message(message_kind(&message));
    match message {
        Message::Poll {
            topic,
            initiator_id,
            count_for,
            count_against,
            start_time,
            ..
        } => handle_poll(topic, initiator_id, count_for, count_against, start_time, ctx).await,
        Message::Action {
            topic, initiator_id, ..
        } => handle_action(topic, initiator_id, ctx).await,
        Message::Update {
            initiator_id,
            successor,
            faulty_robots,
            ..
        } => handle_update(initiator_id, successor, faulty_robots, ctx),
        Message::Ping { .. } => HandlerResult::none(),
        Message::Shutdown { .. } => {
            ctx.begin_terminating();
            HandlerResult {
                outbound: None,
                executed: None,
                shutdown_self: true,
                announce_shutdown: false,
            }
        }
    }
}

async fn handle_poll(
    topic: Topic,
    initiator_id: ringvote_types::PeerId,
    count_for: u32,
    count_against: u32,
    start_time: ringvote_types::Timestamp,
    ctx: &NodeContext,
) -> HandlerResult {
    {
        let mut deadline = ctx.deadline.write();
        deadline.adopt(start_time);
    }

    if ctx.id == initiator_id {
        // The poll came home without being decided; pass it through
        // unchanged so the caller can observe exhaustion upstream.
        return HandlerResult::forward(Message::Poll {
            sender: local_sender(ctx),
            topic,
            initiator_id,
            count_for,
            count_against,
            start_time,
        });
    }

    let vote_start = Instant::now();
    let is_for = ctx.vote_policy.decide(topic);
    ctx.metrics.record_vote(topic, is_for, vote_start.elapsed());

    let (count_for, count_against) = if is_for {
        (count_for + 1, count_against)
    } else {
        (count_for, count_against + 1)
    };

    let n = ctx.membership.len() as u32;

    if count_against.saturating_mul(2) > n {
        tracing::info!(
            %topic, count_for, count_against, n,
            "poll rejected: majority against"
        );
        return HandlerResult::none();
    }

    if count_for + count_against == n {
        tracing::info!(
            %topic, count_for, count_against, n,
            "poll rejected: exhausted without a majority"
        );
        return HandlerResult::none();
    }

    if count_for.saturating_mul(2) > n {
        let elapsed = perform(topic).await;
        ctx.metrics.record_action(topic, elapsed);
        tracing::info!(%topic, count_for, count_against, n, "poll accepted");
        return HandlerResult {
            outbound: Some(Message::Action {
                sender: local_sender(ctx),
                topic,
                initiator_id,
            }),
            executed: Some(topic),
            shutdown_self: true,
            announce_shutdown: true,
        };
    }

    HandlerResult::forward(Message::Poll {
        sender: local_sender(ctx),
        topic,
        initiator_id,
        count_for,
        count_against,
        start_time,
    })
}

async fn handle_action(
    topic: Topic,
    initiator_id: ringvote_types::PeerId,
    ctx: &NodeContext,
) -> HandlerResult {
    if ctx.id == initiator_id {
        // The action lapped the ring and came home; every other peer
        // has already executed it.
        return HandlerResult::none();
    }

    let elapsed = perform(topic).await;
    ctx.metrics.record_action(topic, elapsed);
    HandlerResult {
        outbound: Some(Message::Action {
            sender: local_sender(ctx),
            topic,
            initiator_id,
        }),
        executed: Some(topic),
        shutdown_self: false,
        announce_shutdown: false,
    }
}

fn handle_update(
    initiator_id: ringvote_types::PeerId,
    successor: ringvote_types::PeerId,
    faulty_robots: Vec<ringvote_types::PeerId>,
    ctx: &NodeContext,
) -> HandlerResult {
    if ctx.id == initiator_id {
        return HandlerResult::none();
    }

    ctx.membership
        .apply_update(initiator_id, successor, &faulty_robots);

    HandlerResult::forward(Message::Update {
        sender: local_sender(ctx),
        initiator_id,
        successor,
        faulty_robots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedPolicy, ForceAgainstPolicy, NodeContext};
    use pretty_assertions::assert_eq;
    use ringvote_membership::{MembershipTable, PeerInfo};
    use ringvote_types::{PeerId, Timestamp};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ring(n: u64) -> Arc<MembershipTable> {
        let mut entries = HashMap::new();
        for i in 1..=n {
            let successor = if i == n { 1 } else { i + 1 };
            entries.insert(
                PeerId::new(i),
                PeerInfo::new("localhost", 8000 + i as u16, PeerId::new(successor)),
            );
        }
        Arc::new(MembershipTable::new(entries))
    }

    fn ctx_for(id: u64, n: u64, votes_for: bool) -> NodeContext {
        NodeContext::new(
            PeerId::new(id),
            "localhost",
            8000 + id as u16,
            ring(n),
            Duration::from_secs(30),
            Arc::new(FixedPolicy(votes_for)),
        )
    }

    fn ctx_force_against(id: u64, n: u64) -> NodeContext {
        NodeContext::new(
            PeerId::new(id),
            "localhost",
            8000 + id as u16,
            ring(n),
            Duration::from_secs(30),
            Arc::new(ForceAgainstPolicy),
        )
    }

    fn poll(
        sender_id: u64,
        initiator_id: u64,
        count_for: u32,
        count_against: u32,
    ) -> Message {
        Message::Poll {
            sender: Sender::new(PeerId::new(sender_id), "localhost", 8000 + sender_id as u16),
            topic: Topic::MoveUp,
            initiator_id: PeerId::new(initiator_id),
            count_for,
            count_against,
            start_time: Timestamp::from_millis(0),
        }
    }

    #[tokio::test]
    async fn initiator_passes_poll_through_without_voting() {
        let ctx = ctx_for(1, 5, true);
        let result = handle_message(poll(5, 1, 1, 1), &ctx).await;
        match result.outbound.unwrap() {
            Message::Poll {
                count_for,
                count_against,
                ..
            } => {
                assert_eq!(count_for, 1);
                assert_eq!(count_against, 1);
            }
            _ => panic!("expected poll"),
        }
        assert!(result.executed.is_none());
        assert!(!result.shutdown_self);
    }

    #[tokio::test]
    async fn third_for_vote_in_a_ring_of_five_accepts() {
        let ctx = ctx_for(4, 5, true);
        let result = handle_message(poll(3, 1, 2, 0), &ctx).await;
        assert_eq!(result.executed, Some(Topic::MoveUp));
        assert!(result.shutdown_self);
        assert!(result.announce_shutdown);
        match result.outbound.unwrap() {
            Message::Action { initiator_id, .. } => assert_eq!(initiator_id, PeerId::new(1)),
            _ => panic!("expected action"),
        }
    }

    #[tokio::test]
    async fn third_against_vote_in_a_ring_of_five_rejects() {
        let ctx = ctx_force_against(4, 5);
        let result = handle_message(poll(3, 1, 0, 2), &ctx).await;
        assert!(result.outbound.is_none());
        assert!(result.executed.is_none());
        assert!(!result.shutdown_self);
    }

    #[tokio::test]
    async fn exhaustion_without_majority_rejects_in_a_ring_of_four() {
        let ctx = ctx_for(4, 4, false);
        let result = handle_message(poll(3, 1, 2, 1), &ctx).await;
        assert!(result.outbound.is_none());
    }

    #[tokio::test]
    async fn acceptance_in_a_ring_of_four() {
        let ctx = ctx_for(4, 4, true);
        let result = handle_message(poll(3, 1, 2, 0), &ctx).await;
        assert_eq!(result.executed, Some(Topic::MoveUp));
        assert!(result.shutdown_self);
        assert!(result.announce_shutdown);
    }

    #[tokio::test]
    async fn action_coming_home_is_not_reexecuted() {
        let ctx = ctx_for(1, 5, true);
        let msg = Message::Action {
            sender: Sender::new(PeerId::new(5), "localhost", 8005),
            topic: Topic::LookCute,
            initiator_id: PeerId::new(1),
        };
        let result = handle_message(msg, &ctx).await;
        assert!(result.outbound.is_none());
        assert!(result.executed.is_none());
    }

    #[tokio::test]
    async fn action_forwarded_by_non_initiator_executes_once() {
        let ctx = ctx_for(2, 5, true);
        let msg = Message::Action {
            sender: Sender::new(PeerId::new(1), "localhost", 8001),
            topic: Topic::LookCute,
            initiator_id: PeerId::new(1),
        };
        let result = handle_message(msg, &ctx).await;
        assert_eq!(result.executed, Some(Topic::LookCute));
        match result.outbound.unwrap() {
            Message::Action { sender, .. } => assert_eq!(sender.sender_id, PeerId::new(2)),
            _ => panic!("expected action"),
        }
    }

    #[test]
    fn update_coming_home_consumes_without_forwarding() {
        let ctx = ctx_for(2, 5, true);
        let result = handle_update(PeerId::new(2), PeerId::new(4), vec![PeerId::new(3)], &ctx);
        assert!(result.outbound.is_none());
    }

    #[test]
    fn update_applies_repair_and_forwards() {
        let ctx = ctx_for(4, 5, true);
        let result = handle_update(PeerId::new(2), PeerId::new(4), vec![PeerId::new(3)], &ctx);
        assert_eq!(ctx.membership.successor_of(PeerId::new(2)).unwrap(), PeerId::new(4));
        assert!(!ctx.membership.contains(PeerId::new(3)));
        match result.outbound.unwrap() {
            Message::Update { sender, .. } => assert_eq!(sender.sender_id, PeerId::new(4)),
            _ => panic!("expected update"),
        }
    }

    #[tokio::test]
    async fn shutdown_message_begins_terminating_without_rebroadcast() {
        let ctx = ctx_for(3, 5, true);
        let msg = Message::Shutdown {
            sender: Sender::new(PeerId::new(1), "localhost", 8001),
        };
        let result = handle_message(msg, &ctx).await;
        assert!(result.outbound.is_none());
        assert!(result.shutdown_self);
        assert!(!result.announce_shutdown);
        assert!(ctx.is_terminating());
    }

    #[tokio::test]
    async fn ping_produces_no_outbound_message() {
        let ctx = ctx_for(2, 5, true);
        let msg = Message::Ping {
            sender: Sender::new(PeerId::new(1), "localhost", 8001),
        };
        let result = handle_message(msg, &ctx).await;
        assert!(result.outbound.is_none());
        assert!(!result.shutdown_self);
    }
}
