//! Database row types. These map directly to SQLite rows.
//! Distinct from taskswipe-types API models to keep the DB layer independent;
//! `into_model` does the conversion and logs anything that fails to parse.

use rusqlite::Row;
use taskswipe_types::models::{
    Location, Match, MatchStatus, Message, MessageKind, Notification, NotificationKind, PublicUser,
    Role, Swipe, SwipeDirection, Task, TaskPriority, TaskStatus, User,
};
use tracing::warn;

use crate::util::{parse_enum, parse_id, parse_opt_ts, parse_string_list, parse_ts};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub college: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub skills: String,
    pub hourly_rate: Option<f64>,
    pub rating: Option<f64>,
    pub total_reviews: i64,
    pub is_verified: bool,
    pub is_email_verified: bool,
    pub wallet_balance: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str = "id, email, password, first_name, last_name, role, college, \
         profile_image, bio, skills, hourly_rate, rating, total_reviews, is_verified, \
         is_email_verified, wallet_balance, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            role: row.get(5)?,
            college: row.get(6)?,
            profile_image: row.get(7)?,
            bio: row.get(8)?,
            skills: row.get(9)?,
            hourly_rate: row.get(10)?,
            rating: row.get(11)?,
            total_reviews: row.get(12)?,
            is_verified: row.get(13)?,
            is_email_verified: row.get(14)?,
            wallet_balance: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    pub fn into_model(self) -> User {
        User {
            id: parse_id(&self.id, "id", &self.id),
            role: parse_enum(&self.role, Role::Worker, &self.id),
            skills: parse_string_list(&self.skills, &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
            updated_at: parse_ts(&self.updated_at, &self.id),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            college: self.college,
            profile_image: self.profile_image,
            bio: self.bio,
            hourly_rate: self.hourly_rate,
            rating: self.rating,
            total_reviews: self.total_reviews,
            is_verified: self.is_verified,
            is_email_verified: self.is_email_verified,
            wallet_balance: self.wallet_balance,
        }
    }

    pub fn into_public(self) -> PublicUser {
        PublicUser {
            id: parse_id(&self.id, "id", &self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            profile_image: self.profile_image,
            rating: self.rating,
        }
    }
}

pub struct TaskRow {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: f64,
    pub estimated_hours: Option<i64>,
    pub deadline: Option<String>,
    pub required_skills: String,
    pub location: Option<String>,
    pub status: String,
    pub priority: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub(crate) const COLUMNS: &'static str = "id, client_id, title, description, category, budget, \
         estimated_hours, deadline, required_skills, location, status, priority, view_count, \
         like_count, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            client_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            budget: row.get(5)?,
            estimated_hours: row.get(6)?,
            deadline: row.get(7)?,
            required_skills: row.get(8)?,
            location: row.get(9)?,
            status: row.get(10)?,
            priority: row.get(11)?,
            view_count: row.get(12)?,
            like_count: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }

    pub fn into_model(self) -> Task {
        let location = self.location.as_deref().and_then(|raw| {
            serde_json::from_str::<Location>(raw)
                .map_err(|e| warn!("Corrupt location on task '{}': {}", self.id, e))
                .ok()
        });

        Task {
            id: parse_id(&self.id, "id", &self.id),
            client_id: parse_id(&self.client_id, "client_id", &self.id),
            deadline: parse_opt_ts(self.deadline.as_deref(), &self.id),
            required_skills: parse_string_list(&self.required_skills, &self.id),
            status: parse_enum(&self.status, TaskStatus::Open, &self.id),
            priority: parse_enum(&self.priority, TaskPriority::Medium, &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
            updated_at: parse_ts(&self.updated_at, &self.id),
            location,
            title: self.title,
            description: self.description,
            category: self.category,
            budget: self.budget,
            estimated_hours: self.estimated_hours,
            view_count: self.view_count,
            like_count: self.like_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwipeRow {
    pub id: String,
    pub task_id: String,
    pub worker_id: String,
    pub direction: String,
    pub created_at: String,
}

impl SwipeRow {
    pub(crate) const COLUMNS: &'static str = "id, task_id, worker_id, direction, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            worker_id: row.get(2)?,
            direction: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn into_model(self) -> Swipe {
        Swipe {
            id: parse_id(&self.id, "id", &self.id),
            task_id: parse_id(&self.task_id, "task_id", &self.id),
            worker_id: parse_id(&self.worker_id, "worker_id", &self.id),
            direction: parse_enum(&self.direction, SwipeDirection::Left, &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchRow {
    pub id: String,
    pub task_id: String,
    pub worker_id: String,
    pub client_id: String,
    pub status: String,
    pub last_message_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl MatchRow {
    pub(crate) const COLUMNS: &'static str =
        "id, task_id, worker_id, client_id, status, last_message_at, created_at, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            worker_id: row.get(2)?,
            client_id: row.get(3)?,
            status: row.get(4)?,
            last_message_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.worker_id == user_id || self.client_id == user_id
    }

    pub fn into_model(self) -> Match {
        Match {
            id: parse_id(&self.id, "id", &self.id),
            task_id: parse_id(&self.task_id, "task_id", &self.id),
            worker_id: parse_id(&self.worker_id, "worker_id", &self.id),
            client_id: parse_id(&self.client_id, "client_id", &self.id),
            status: parse_enum(&self.status, MatchStatus::Active, &self.id),
            last_message_at: parse_opt_ts(self.last_message_at.as_deref(), &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
            updated_at: parse_ts(&self.updated_at, &self.id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub read: bool,
    pub client_message_id: Option<String>,
    pub created_at: String,
}

impl MessageRow {
    pub(crate) const COLUMNS: &'static str =
        "id, match_id, sender_id, content, message_type, read, client_message_id, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            match_id: row.get(1)?,
            sender_id: row.get(2)?,
            content: row.get(3)?,
            message_type: row.get(4)?,
            read: row.get(5)?,
            client_message_id: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn into_model(self) -> Message {
        Message {
            id: parse_id(&self.id, "id", &self.id),
            match_id: parse_id(&self.match_id, "match_id", &self.id),
            sender_id: parse_id(&self.sender_id, "sender_id", &self.id),
            message_type: parse_enum(&self.message_type, MessageKind::Text, &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
            content: self.content,
            read: self.read,
            client_message_id: self.client_message_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub match_id: Option<String>,
    pub read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

impl NotificationRow {
    pub(crate) const COLUMNS: &'static str =
        "id, user_id, kind, title, message, match_id, read, read_at, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            title: row.get(3)?,
            message: row.get(4)?,
            match_id: row.get(5)?,
            read: row.get(6)?,
            read_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn into_model(self) -> Notification {
        Notification {
            id: parse_id(&self.id, "id", &self.id),
            user_id: parse_id(&self.user_id, "user_id", &self.id),
            kind: parse_enum(&self.kind, NotificationKind::Message, &self.id),
            match_id: self.match_id.as_deref().map(|m| parse_id(m, "match_id", &self.id)),
            read_at: parse_opt_ts(self.read_at.as_deref(), &self.id),
            created_at: parse_ts(&self.created_at, &self.id),
            title: self.title,
            message: self.message,
            read: self.read,
        }
    }
}
