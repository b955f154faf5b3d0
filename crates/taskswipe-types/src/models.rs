use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// Account role chosen at registration.
    Role, "role" {
        Worker => "worker",
        Client => "client",
    }
}

string_enum! {
    /// Task lifecycle: `open -> matched -> completed`, or cancelled from `open` or `matched`.
    TaskStatus, "task status" {
        Open => "open",
        Matched => "matched",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    TaskPriority, "task priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

string_enum! {
    SwipeDirection, "direction" {
        Left => "left",
        Right => "right",
    }
}

string_enum! {
    MatchStatus, "match status" {
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    MessageKind, "message type" {
        Text => "text",
        Image => "image",
        File => "file",
    }
}

string_enum! {
    NotificationKind, "notification type" {
        Match => "match",
        Message => "message",
    }
}

/// Full profile of the authenticated user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub college: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub rating: Option<f64>,
    pub total_reviews: i64,
    pub is_verified: bool,
    pub is_email_verified: bool,
    pub wallet_balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What one match participant gets to see of the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: f64,
    pub estimated_hours: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub required_skills: Vec<String>,
    pub location: Option<Location>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub id: Uuid,
    pub task_id: Uuid,
    pub worker_id: Uuid,
    pub direction: SwipeDirection,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub task_id: Uuid,
    pub worker_id: Uuid,
    pub client_id: Uuid,
    pub status: MatchStatus,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: MessageKind,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub match_id: Option<Uuid>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&SwipeDirection::Right).unwrap(), "\"right\"");
        assert_eq!("matched".parse::<TaskStatus>().unwrap(), TaskStatus::Matched);
        assert_eq!(MatchStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let err = "up".parse::<SwipeDirection>().unwrap_err();
        assert_eq!(err.kind, "direction");
        assert_eq!(err.to_string(), "invalid direction 'up'");
    }
}
