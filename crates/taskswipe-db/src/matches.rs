use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use taskswipe_types::models::{MatchStatus, TaskStatus};
use tracing::info;

use crate::Database;
use crate::models::MatchRow;
use crate::retry::retry_transient;
use crate::util::{OptionalExt, now_ts};

#[derive(Debug)]
pub enum MatchUpdateOutcome {
    Updated(MatchRow),
    NotFound,
    Forbidden,
    /// The match is already completed or cancelled.
    Finished,
}

impl Database {
    pub fn get_match(&self, id: &str) -> Result<Option<MatchRow>> {
        retry_transient("get_match", || self.with_conn(|conn| query_match(conn, id)))
    }

    /// Active matches where `user_id` is either participant, most recently active first.
    pub fn list_active_matches(&self, user_id: &str) -> Result<Vec<MatchRow>> {
        retry_transient("list_active_matches", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM matches
                     WHERE (worker_id = ?1 OR client_id = ?1) AND status = 'active'
                     ORDER BY COALESCE(last_message_at, created_at) DESC",
                    MatchRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map([user_id], MatchRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    /// Participant-only status change. Completing or cancelling a match does
    /// the same to its task in the same transaction.
    pub fn update_match_status(
        &self,
        id: &str,
        requester: &str,
        status: MatchStatus,
    ) -> Result<MatchUpdateOutcome> {
        retry_transient("update_match_status", || {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let Some(current) = query_match(&tx, id)? else {
                    return Ok(MatchUpdateOutcome::NotFound);
                };
                if !current.is_participant(requester) {
                    return Ok(MatchUpdateOutcome::Forbidden);
                }
                if current.status != MatchStatus::Active.as_str() && current.status != status.as_str() {
                    return Ok(MatchUpdateOutcome::Finished);
                }

                let now = now_ts();
                tx.execute(
                    "UPDATE matches SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![id, status.as_str(), now],
                )?;

                let task_status = match status {
                    MatchStatus::Active => None,
                    MatchStatus::Completed => Some(TaskStatus::Completed),
                    MatchStatus::Cancelled => Some(TaskStatus::Cancelled),
                };
                if let Some(task_status) = task_status {
                    tx.execute(
                        "UPDATE tasks SET status = ?2, updated_at = ?3
                         WHERE id = ?1 AND status = 'matched'",
                        rusqlite::params![current.task_id, task_status.as_str(), now],
                    )?;
                }

                let row = query_match(&tx, id)?
                    .ok_or_else(|| anyhow::anyhow!("Match {} vanished during update", id))?;
                tx.commit()?;

                info!("Match {} -> {} by {}", id, status, requester);
                Ok(MatchUpdateOutcome::Updated(row))
            })
        })
    }
}

pub(crate) fn query_match(conn: &Connection, id: &str) -> Result<Option<MatchRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {} FROM matches WHERE id = ?1", MatchRow::COLUMNS))?;
    stmt.query_row([id], MatchRow::from_row).optional()
}
