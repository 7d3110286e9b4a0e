//! Message kinds and their payloads.

use ringvote_types::{PeerId, Timestamp, Topic};
use serde::{Deserialize, Serialize};

/// Fields every message carries, regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// The id of the peer that sent this message.
    pub sender_id: PeerId,
    /// The sending peer's listening host.
    pub sender_host: String,
    /// The sending peer's listening port.
    pub sender_port: u16,
}

impl Sender {
    /// Creates a sender descriptor.
    #[must_use]
    pub fn new(sender_id: PeerId, sender_host: impl Into<String>, sender_port: u16) -> Self {
        Self {
            sender_id,
            sender_host: sender_host.into(),
            sender_port,
        }
    }
}

/// A single ringvote protocol message.
///
/// Every variant carries a [`Sender`]; handlers that forward a message
/// rewrite it to their own identity before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// A vote in progress, circulating the ring.
    Poll {
        /// The sender of this hop.
        #[serde(flatten)]
        sender: Sender,
        /// The topic being voted on.
        topic: Topic,
        /// The peer that started this poll.
        initiator_id: PeerId,
        /// Running count of votes for.
        count_for: u32,
        /// Running count of votes against.
        count_against: u32,
        /// Wall-clock origin of the consensus deadline, fixed by the
        /// initiator and adopted by every recipient on first sight.
        start_time: Timestamp,
    },
    /// Consensus reached: execute `topic` and pass this on.
    Action {
        /// The sender of this hop.
        #[serde(flatten)]
        sender: Sender,
        /// The topic to execute.
        topic: Topic,
        /// The peer that initiated the poll this action resulted from.
        initiator_id: PeerId,
    },
    /// A repair announcement.
    Update {
        /// The sender of this hop.
        #[serde(flatten)]
        sender: Sender,
        /// The peer whose successor changed.
        initiator_id: PeerId,
        /// The new successor for `initiator_id`.
        successor: PeerId,
        /// Peers to remove from the local membership view.
        faulty_robots: Vec<PeerId>,
    },
    /// A liveness probe; acknowledged by the connection completing.
    Ping {
        /// The sender of this hop.
        #[serde(flatten)]
        sender: Sender,
    },
    /// Terminate immediately; not re-broadcast by recipients.
    Shutdown {
        /// The sender of this hop.
        #[serde(flatten)]
        sender: Sender,
    },
}

impl Message {
    /// Returns the sender descriptor common to every variant.
    #[must_use]
    pub fn sender(&self) -> &Sender {
        match self {
            Message::Poll { sender, .. }
            | Message::Action { sender, .. }
            | Message::Update { sender, .. }
            | Message::Ping { sender, .. }
            | Message::Shutdown { sender, .. } => sender,
        }
    }

    /// Returns a copy of this message with the sender fields rewritten,
    /// as every forwarding handler must do before sending on.
    #[must_use]
    pub fn with_sender(mut self, sender: Sender) -> Self {
        match &mut self {
            Message::Poll { sender: s, .. }
            | Message::Action { sender: s, .. }
            | Message::Update { sender: s, .. }
            | Message::Ping { sender: s, .. }
            | Message::Shutdown { sender: s, .. } => *s = sender,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_sender() -> Sender {
        Sender::new(PeerId::new(1), "localhost", 8001)
    }

    #[test]
    fn poll_roundtrips_through_json() {
        let msg = Message::Poll {
            sender: sample_sender(),
            topic: Topic::MoveUp,
            initiator_id: PeerId::new(1),
            count_for: 0,
            count_against: 0,
            start_time: Timestamp::from_millis(1_000),
        };
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn poll_has_a_type_tag() {
        let msg = Message::Poll {
            sender: sample_sender(),
            topic: Topic::LookCute,
            initiator_id: PeerId::new(1),
            count_for: 0,
            count_against: 0,
            start_time: Timestamp::from_millis(0),
        };
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains("\"type\":\"poll\""));
    }

    #[test]
    fn with_sender_rewrites_only_sender_fields() {
        let msg = Message::Action {
            sender: sample_sender(),
            topic: Topic::MoveDown,
            initiator_id: PeerId::new(1),
        };
        let new_sender = Sender::new(PeerId::new(2), "localhost", 8002);
        let rewritten = msg.with_sender(new_sender.clone());
        assert_eq!(rewritten.sender(), &new_sender);
        match rewritten {
            Message::Action { initiator_id, topic, .. } => {
                assert_eq!(initiator_id, PeerId::new(1));
                assert_eq!(topic, Topic::MoveDown);
            }
            _ => panic!("expected action"),
        }
    }

    #[test]
    fn update_roundtrips_with_faulty_list() {
        let msg = Message::Update {
            sender: sample_sender(),
            initiator_id: PeerId::new(2),
            successor: PeerId::new(4),
            faulty_robots: vec![PeerId::new(3)],
        };
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }
}
