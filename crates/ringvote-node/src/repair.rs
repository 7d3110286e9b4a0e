//! Ring repair: skip past a dead successor and announce the new link.
//!
//! Repair is triggered by an outbound send failing, never proactively
//! polled. It walks the successor chain one hop at a time, probing each
//! candidate with a `ping`, collecting every dead id it skips as
//! `faulty`, until it finds a live peer or walks back to itself.

use crate::NodeContext;
use ringvote_protocol::{write_message, Message, Sender};
use ringvote_types::{Error, PeerId};
use std::time::Duration;
use tokio::net::TcpStream;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

async fn probe(ctx: &NodeContext, host: &str, port: u16) -> bool {
    let addr = format!("{host}:{port}");
    let Ok(Ok(mut stream)) = tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await
    else {
        return false;
    };
    let ping = Message::Ping {
        sender: Sender::new(ctx.id, ctx.host.clone(), ctx.port),
    };
    write_message(&mut stream, &ping).await.is_ok()
}

/// Walks past dead successors until a live one answers a `ping`, then
/// applies the repair locally.
///
/// Returns the new successor id and the ids skipped along the way. The
/// caller (the outbound sender) is responsible for broadcasting the
/// resulting `update` message around the ring — this function only
/// fixes the local table; the `update` broadcast is a separate step.
///
/// # Errors
///
/// Returns [`crate::NodeError::Types`] wrapping [`Error::AloneInRing`]
/// if the walk returns to this node without finding a live peer, or
/// [`Error::UnknownPeer`] if the table is missing an id mid-walk.
pub async fn repair_successor(ctx: &NodeContext) -> Result<(PeerId, Vec<PeerId>), crate::NodeError> {
    let _guard = ctx.lock_repair().await;

    let mut faulty = Vec::new();
    let mut candidate = ctx.membership.successor_of(ctx.id)?;

    loop {
        if candidate == ctx.id {
            return Err(Error::AloneInRing.into());
        }

        let (host, port) = ctx.membership.lookup(candidate)?;
        if probe(ctx, &host, port).await {
            ctx.membership.apply_update(ctx.id, candidate, &faulty);
            tracing::info!(
                new_successor = %candidate,
                faulty = ?faulty,
                "ring repaired"
            );
            return Ok((candidate, faulty));
        }

        tracing::warn!(dead = %candidate, "successor unreachable, skipping");
        let next = ctx.membership.successor_of(candidate)?;
        faulty.push(candidate);
        ctx.membership.remove(candidate);
        candidate = next;
    }
}
