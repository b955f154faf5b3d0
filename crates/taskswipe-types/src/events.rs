use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events published on the in-process bus after a write commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// The reconciler paired a worker and a client on a task
    MatchCreated {
        match_id: Uuid,
        task_id: Uuid,
        worker_id: Uuid,
        client_id: Uuid,
    },

    /// A participant posted a message in a match
    MessageCreated {
        message_id: Uuid,
        match_id: Uuid,
        sender_id: Uuid,
    },
}

impl DomainEvent {
    pub fn match_id(&self) -> Uuid {
        match self {
            Self::MatchCreated { match_id, .. } | Self::MessageCreated { match_id, .. } => *match_id,
        }
    }
}
