//! The metrics accumulator.
//!
//! Spec §1 places this outside the consensus core, reachable only
//! through a narrow interface; this module is that interface. The node
//! calls [`MetricsSink`] methods and never inspects an implementation's
//! internals. [`InMemoryMetrics`] mirrors the shape of the reference
//! `RobotMetrics` (`examples/original_source/metrics.py`): per-message-type
//! counts and average propagation time, per-topic voting time, a
//! for/against vote distribution, and action execution/wait times.

use parking_lot::Mutex;
use ringvote_types::Topic;
use std::collections::HashMap;
use std::time::Duration;

/// A point-in-time dump of accumulated metrics, suitable for logging or
/// writing to a metrics file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Count of messages seen, keyed by message kind (e.g. `"poll"`).
    pub message_counts: HashMap<String, u64>,
    /// Average propagation time per message kind, in milliseconds.
    pub average_propagation_ms: HashMap<String, f64>,
    /// Average voting time per topic, in milliseconds.
    pub average_voting_ms: HashMap<Topic, f64>,
    /// How many votes were cast for vs. against, across all topics.
    pub votes_for: u64,
    /// See [`MetricsSnapshot::votes_for`].
    pub votes_against: u64,
    /// How many times each topic was actually executed.
    pub action_counts: HashMap<Topic, u64>,
    /// Average action execution time, in milliseconds.
    pub average_action_ms: f64,
    /// Average time spent waiting for an inbound connection, in
    /// milliseconds.
    pub average_wait_ms: f64,
}

/// The interface the node crate uses to report observability data.
///
/// Implementations decide how (or whether) to persist this; the node
/// only ever calls these methods, never reaches past them into a
/// concrete sink's internals.
pub trait MetricsSink: Send + Sync {
    /// Records that a message of `kind` was handled.
    fn record_message(&self, kind: &str);

    /// Records how long a message of `kind` took to reach its successor.
    fn record_propagation(&self, kind: &str, elapsed: Duration);

    /// Records a vote cast on `topic`.
    fn record_vote(&self, topic: Topic, is_for: bool, elapsed: Duration);

    /// Records that `topic` was executed, taking `elapsed`.
    fn record_action(&self, topic: Topic, elapsed: Duration);

    /// Records time spent waiting for an inbound connection.
    fn record_wait(&self, elapsed: Duration);

    /// Returns a snapshot of everything recorded so far.
    fn snapshot(&self) -> MetricsSnapshot;
}

#[derive(Default)]
struct Accumulator {
    message_counts: HashMap<String, u64>,
    propagation_ms: HashMap<String, Vec<f64>>,
    voting_ms: HashMap<Topic, Vec<f64>>,
    votes_for: u64,
    votes_against: u64,
    action_counts: HashMap<Topic, u64>,
    action_ms: Vec<f64>,
    wait_ms: Vec<f64>,
}

/// An in-memory [`MetricsSink`], sufficient for a single peer process's
/// lifetime; nothing here persists across restarts (spec's Non-goals).
#[derive(Default)]
pub struct InMemoryMetrics {
    inner: Mutex<Accumulator>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_message(&self, kind: &str) {
        let mut inner = self.inner.lock();
        *inner.message_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    fn record_propagation(&self, kind: &str, elapsed: Duration) {
        let mut inner = self.inner.lock();
        inner
            .propagation_ms
            .entry(kind.to_string())
            .or_default()
            .push(elapsed.as_secs_f64() * 1_000.0);
    }

    fn record_vote(&self, topic: Topic, is_for: bool, elapsed: Duration) {
        let mut inner = self.inner.lock();
        inner
            .voting_ms
            .entry(topic)
            .or_default()
            .push(elapsed.as_secs_f64() * 1_000.0);
        if is_for {
            inner.votes_for += 1;
        } else {
            inner.votes_against += 1;
        }
    }

    fn record_action(&self, topic: Topic, elapsed: Duration) {
        let mut inner = self.inner.lock();
        *inner.action_counts.entry(topic).or_insert(0) += 1;
        inner.action_ms.push(elapsed.as_secs_f64() * 1_000.0);
    }

    fn record_wait(&self, elapsed: Duration) {
        self.inner.lock().wait_ms.push(elapsed.as_secs_f64() * 1_000.0);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        MetricsSnapshot {
            message_counts: inner.message_counts.clone(),
            average_propagation_ms: inner
                .propagation_ms
                .iter()
                .map(|(k, v)| (k.clone(), mean(v)))
                .collect(),
            average_voting_ms: inner
                .voting_ms
                .iter()
                .map(|(k, v)| (*k, mean(v)))
                .collect(),
            votes_for: inner.votes_for,
            votes_against: inner.votes_against,
            action_counts: inner.action_counts.clone(),
            average_action_ms: mean(&inner.action_ms),
            average_wait_ms: mean(&inner.wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_message_counts_per_kind() {
        let metrics = InMemoryMetrics::default();
        metrics.record_message("poll");
        metrics.record_message("poll");
        metrics.record_message("action");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.message_counts.get("poll"), Some(&2));
        assert_eq!(snapshot.message_counts.get("action"), Some(&1));
    }

    #[test]
    fn tracks_vote_distribution() {
        let metrics = InMemoryMetrics::default();
        metrics.record_vote(Topic::MoveUp, true, Duration::from_millis(5));
        metrics.record_vote(Topic::MoveUp, false, Duration::from_millis(5));
        metrics.record_vote(Topic::MoveUp, true, Duration::from_millis(5));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.votes_for, 2);
        assert_eq!(snapshot.votes_against, 1);
    }

    #[test]
    fn averages_action_time_across_executions() {
        let metrics = InMemoryMetrics::default();
        metrics.record_action(Topic::LookCute, Duration::from_millis(100));
        metrics.record_action(Topic::LookCute, Duration::from_millis(200));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.action_counts.get(&Topic::LookCute), Some(&2));
        assert!((snapshot.average_action_ms - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sink_reports_zero_averages() {
        let metrics = InMemoryMetrics::default();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.average_action_ms, 0.0);
        assert_eq!(snapshot.average_wait_ms, 0.0);
    }
}
