//! Voting decision policy.
//!
//! Spec §9: "the random policy is the only nondeterministic piece of the
//! state machine; make it an injected decision function... so tests can
//! pin it." This trait is that seam.

use ringvote_types::Topic;

/// Decides how a non-initiator peer votes on a poll.
pub trait VotePolicy: Send + Sync {
    /// Returns true to vote for `topic`, false to vote against.
    fn decide(&self, topic: Topic) -> bool;
}

/// The reference policy: uniformly-random Bernoulli with a configurable
/// `P(for)`. Spec §9 notes two reference versions disagree on the
/// default (0.4 vs 0.5 on a 1..10 draw); this workspace has no baked-in
/// default and requires the caller to choose one.
pub struct BernoulliPolicy {
    /// Probability of voting for, in `[0.0, 1.0]`.
    pub p_for: f64,
}

impl BernoulliPolicy {
    /// Creates a policy with the given probability of voting for.
    #[must_use]
    pub fn new(p_for: f64) -> Self {
        Self { p_for }
    }
}

impl VotePolicy for BernoulliPolicy {
    fn decide(&self, _topic: Topic) -> bool {
        rand::random::<f64>() < self.p_for
    }
}

/// The `--all_vote_against` policy: always votes against, regardless of
/// topic.
pub struct ForceAgainstPolicy;

impl VotePolicy for ForceAgainstPolicy {
    fn decide(&self, _topic: Topic) -> bool {
        false
    }
}

/// A policy that always returns a fixed decision, for pinning
/// scripted end-to-end test scenarios exactly.
pub struct FixedPolicy(pub bool);

impl VotePolicy for FixedPolicy {
    fn decide(&self, _topic: Topic) -> bool {
        self.0
    }
}
