use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use taskswipe_types::models::NotificationKind;
use uuid::Uuid;

use crate::Database;
use crate::models::NotificationRow;
use crate::retry::retry_transient;
use crate::util::{OptionalExt, now_ts};

pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
    pub match_id: Option<&'a str>,
}

/// Result of a mutation that only the notification's target may perform.
#[derive(Debug, PartialEq, Eq)]
pub enum OwnedOutcome {
    Done,
    NotFound,
    Forbidden,
}

impl Database {
    /// Inserts a batch of notifications in one transaction: all or none.
    pub fn insert_notifications(&self, batch: &[NewNotification<'_>]) -> Result<Vec<NotificationRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_ts();

            let mut rows = Vec::with_capacity(batch.len());
            for n in batch {
                let row = NotificationRow {
                    id: Uuid::new_v4().to_string(),
                    user_id: n.user_id.to_string(),
                    kind: n.kind.as_str().to_string(),
                    title: n.title.to_string(),
                    message: n.message.to_string(),
                    match_id: n.match_id.map(str::to_string),
                    read: false,
                    read_at: None,
                    created_at: now.clone(),
                };
                tx.execute(
                    "INSERT INTO notifications (id, user_id, kind, title, message, match_id, read, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                    rusqlite::params![
                        row.id,
                        row.user_id,
                        row.kind,
                        row.title,
                        row.message,
                        row.match_id,
                        row.created_at,
                    ],
                )?;
                rows.push(row);
            }

            tx.commit()?;
            Ok(rows)
        })
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<NotificationRow>> {
        retry_transient("list_notifications", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM notifications
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?2 OFFSET ?3",
                    NotificationRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map(rusqlite::params![user_id, limit, offset], NotificationRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<OwnedOutcome> {
        retry_transient("mark_notification_read", || {
            self.with_conn(|conn| {
                let outcome = check_owner(conn, id, user_id)?;
                if outcome == OwnedOutcome::Done {
                    conn.execute(
                        "UPDATE notifications SET read = 1, read_at = COALESCE(read_at, ?2) WHERE id = ?1",
                        rusqlite::params![id, now_ts()],
                    )?;
                }
                Ok(outcome)
            })
        })
    }

    /// Marks every unread notification of `user_id` as read. Returns how many changed.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        retry_transient("mark_all_notifications_read", || {
            self.with_conn(|conn| {
                let updated = conn.execute(
                    "UPDATE notifications SET read = 1, read_at = ?2 WHERE user_id = ?1 AND read = 0",
                    rusqlite::params![user_id, now_ts()],
                )?;
                Ok(updated)
            })
        })
    }

    pub fn delete_notification(&self, id: &str, user_id: &str) -> Result<OwnedOutcome> {
        retry_transient("delete_notification", || {
            self.with_conn(|conn| {
                let outcome = check_owner(conn, id, user_id)?;
                if outcome == OwnedOutcome::Done {
                    conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?;
                }
                Ok(outcome)
            })
        })
    }
}

/// Runs under the connection lock, so nothing can change between this check
/// and the caller's write.
fn check_owner(conn: &Connection, id: &str, user_id: &str) -> Result<OwnedOutcome> {
    let owner: Option<String> = conn
        .query_row("SELECT user_id FROM notifications WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;

    Ok(match owner {
        None => OwnedOutcome::NotFound,
        Some(owner) if owner == user_id => OwnedOutcome::Done,
        Some(_) => OwnedOutcome::Forbidden,
    })
}
