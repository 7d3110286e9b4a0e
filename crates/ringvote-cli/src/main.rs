//! Command-line entry point for one ringvote peer process.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ringvote_membership::MembershipTable;
use ringvote_node::{
    forward_to_successor, run_inbound_server, send_to_peer, BernoulliPolicy, ForceAgainstPolicy,
    NodeContext, VotePolicy,
};
use ringvote_protocol::{Message, Sender};
use ringvote_types::{PeerId, Timestamp, Topic};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// The default vote probability for [`BernoulliPolicy`] when no
/// `--all_vote_against` override applies. There's no canonical default
/// vote probability across reference deployments; this binary fixes one.
const DEFAULT_P_FOR: f64 = 0.7;

/// The topic a `--test_send` peer initiates a poll on. There's no flag
/// to choose one, so every test-initiated poll targets the same fixed
/// topic.
const TEST_SEND_TOPIC: Topic = Topic::MoveUp;

#[derive(Debug, Parser)]
#[command(name = "ringvote", about = "One peer in a ring-vote fleet")]
struct Cli {
    /// This peer's id. Must be unique within a run.
    id: u64,

    /// This peer's listening host.
    #[arg(default_value = "localhost")]
    host: String,

    /// This peer's listening port.
    #[arg(default_value_t = 8000)]
    port: u16,

    /// Load the fleet topology from `--file` instead of running
    /// standalone.
    #[arg(short = 'a', long)]
    automate: bool,

    /// Fleet config file path, used with `--automate`.
    #[arg(short = 'f', long, default_value = "setup3.json")]
    file: PathBuf,

    /// This peer initiates a poll on startup.
    #[arg(long = "test_send")]
    test_send: bool,

    /// Ad-hoc poll target host, for `--test_send` without a ring.
    #[arg(long = "server_host")]
    server_host: Option<String>,

    /// Ad-hoc poll target port, for `--test_send` without a ring.
    #[arg(long = "server_port")]
    server_port: Option<u16>,

    /// Consensus deadline bound `Δ`, in seconds.
    #[arg(long, default_value_t = 30.0)]
    timeout: f64,

    /// Force this peer to always vote against, regardless of topic.
    #[arg(long = "all_vote_against")]
    all_vote_against: bool,

    /// Exit with failure immediately at startup, to script a dead link.
    #[arg(long)]
    faulty: bool,

    /// `tracing` filter directive (e.g. `info`, `ringvote_node=debug`).
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn vote_policy(all_vote_against: bool) -> Arc<dyn VotePolicy> {
    if all_vote_against {
        Arc::new(ForceAgainstPolicy)
    } else {
        Arc::new(BernoulliPolicy::new(DEFAULT_P_FOR))
    }
}

async fn initiate_test_poll(
    ctx: &NodeContext,
    server_host: Option<&str>,
    server_port: Option<u16>,
) -> Result<()> {
    let now = Timestamp::now();
    ctx.deadline.write().adopt(now);

    let poll = Message::Poll {
        sender: Sender::new(ctx.id, ctx.host.clone(), ctx.port),
        topic: TEST_SEND_TOPIC,
        initiator_id: ctx.id,
        count_for: 0,
        count_against: 0,
        start_time: now,
    };

    match (server_host, server_port) {
        (Some(host), Some(port)) => send_to_peer(host, port, &poll)
            .await
            .context("ad-hoc test_send to --server_host/--server_port failed"),
        _ => forward_to_successor(ctx, &poll)
            .await
            .context("test_send failed to reach the local successor"),
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if cli.faulty {
        bail!("started with --faulty, exiting immediately");
    }

    let id = PeerId::new(cli.id);
    let delta = Duration::from_secs_f64(cli.timeout.max(0.0));

    let (membership, force_against) = if cli.automate {
        let fleet = config::load(&cli.file)?;
        let own = fleet
            .get(&id)
            .with_context(|| format!("peer {id} is not present in {}", cli.file.display()))?;
        if own.successor < 0 {
            bail!("no successor found for peer {id} in {}", cli.file.display());
        }
        let membership = config::build_membership(&fleet);
        (membership, own.all_vote_against || cli.all_vote_against)
    } else {
        (MembershipTable::new(HashMap::new()), cli.all_vote_against)
    };

    let ctx = Arc::new(NodeContext::new(
        id,
        cli.host.clone(),
        cli.port,
        Arc::new(membership),
        delta,
        vote_policy(force_against),
    ));

    let inbound_ctx = Arc::clone(&ctx);
    let inbound_handle = tokio::spawn(async move { run_inbound_server(inbound_ctx).await });

    if cli.test_send {
        initiate_test_poll(&ctx, cli.server_host.as_deref(), cli.server_port).await?;
    }

    inbound_handle
        .await
        .context("inbound server task panicked")??;

    let snapshot = ctx.metrics.snapshot();
    tracing::info!(?snapshot, "final metrics");

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn positional_id_with_defaults() {
        let cli = Cli::try_parse_from(["ringvote", "3"]).unwrap();
        assert_eq!(cli.id, 3);
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.port, 8000);
        assert_eq!(cli.file, PathBuf::from("setup3.json"));
        assert_eq!(cli.timeout, 30.0);
        assert!(!cli.automate);
        assert!(!cli.faulty);
    }

    #[test]
    fn automate_and_all_vote_against_flags_parse() {
        let cli = Cli::try_parse_from([
            "ringvote",
            "1",
            "--automate",
            "--file",
            "fleet.json",
            "--all_vote_against",
            "--timeout",
            "12.5",
        ])
        .unwrap();
        assert!(cli.automate);
        assert_eq!(cli.file, PathBuf::from("fleet.json"));
        assert!(cli.all_vote_against);
        assert_eq!(cli.timeout, 12.5);
    }

    #[test]
    fn missing_positional_id_is_rejected() {
        assert!(Cli::try_parse_from(["ringvote"]).is_err());
    }
}
