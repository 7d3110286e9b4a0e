//! The consensus deadline check and coordinated shutdown fan-out (spec
//! §4.7).

use crate::{outbound::send_to_peer, NodeContext, OutboundError};
use ringvote_protocol::{Message, Sender};
use ringvote_types::{PeerId, Timestamp};

/// Returns true if the shared consensus deadline has passed.
///
/// Returns false if no poll has adopted an origin yet — there is
/// nothing to time out.
#[must_use]
pub fn is_deadline_expired(ctx: &NodeContext) -> bool {
    ctx.deadline.read().is_expired_at(Timestamp::now())
}

/// Sends a `shutdown` message to every other known peer concurrently,
/// then marks this node as terminating. Per-peer failures are logged
/// and do not stop the fan-out; deadline shutdown is a best-effort
/// broadcast, not a confirmed protocol.
pub async fn shutdown_fleet(ctx: &NodeContext) -> Vec<(PeerId, Result<(), OutboundError>)> {
    let sender = Sender::new(ctx.id, ctx.host.clone(), ctx.port);

    let sends = ctx.membership.ids().into_iter().filter_map(|id| {
        if id == ctx.id {
            return None;
        }
        let (host, port) = ctx.membership.lookup(id).ok()?;
        let message = Message::Shutdown {
            sender: sender.clone(),
        };
        Some(async move {
            let result = send_to_peer(&host, port, &message).await;
            if let Err(ref err) = result {
                tracing::warn!(peer = %id, %err, "shutdown fan-out failed");
            }
            (id, result)
        })
    });
    let results = futures::future::join_all(sends).await;

    ctx.begin_terminating();
    results
}
