//! Swipe recording and match reconciliation.
//!
//! A swipe and any match it produces are written in a single `BEGIN IMMEDIATE`
//! transaction, so the uniqueness check, the opposing-swipe lookup, the match
//! insert and the task status flip are one atomic unit. The schema backs this
//! up with `UNIQUE(task_id, worker_id)` on swipes and `UNIQUE(task_id)` on
//! matches.
//!
//! A right swipe by the task's owner is how the owner accepts applicants:
//! a worker's right swipe matches once the owner has one on record, and the
//! owner's right swipe matches the earliest worker already waiting.

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use taskswipe_types::models::{MatchStatus, SwipeDirection, TaskStatus};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Database;
use crate::models::{MatchRow, SwipeRow};
use crate::retry::retry_transient;
use crate::util::{OptionalExt, now_ts};

#[derive(Debug)]
pub enum SwipeOutcome {
    /// The swipe was stored; `matched` is set when it completed a pair.
    Recorded {
        swipe: SwipeRow,
        matched: Option<MatchRow>,
    },
    TaskNotFound,
    /// The task is matched, completed or cancelled.
    TaskClosed,
    AlreadySwiped,
}

impl Database {
    /// Records a swipe and reconciles it into a match if the opposing side
    /// has already swiped right. Safe to retry: the `(task, worker)` key makes
    /// a replay report `AlreadySwiped` instead of writing twice.
    pub fn record_swipe(
        &self,
        task_id: &str,
        worker_id: &str,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome> {
        retry_transient("record_swipe", || {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = reconcile(&tx, task_id, worker_id, direction)?;
                if matches!(outcome, SwipeOutcome::Recorded { .. }) {
                    tx.commit()?;
                }
                Ok(outcome)
            })
        })
    }

    /// All swipes by `worker_id`, newest first.
    pub fn list_swipes_for_worker(&self, worker_id: &str) -> Result<Vec<SwipeRow>> {
        retry_transient("list_swipes_for_worker", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM swipes WHERE worker_id = ?1 ORDER BY created_at DESC, rowid DESC",
                    SwipeRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map([worker_id], SwipeRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    /// The swipe `worker_id` made on `task_id`, if any.
    pub fn get_swipe(&self, task_id: &str, worker_id: &str) -> Result<Option<SwipeRow>> {
        retry_transient("get_swipe", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM swipes WHERE task_id = ?1 AND worker_id = ?2",
                    SwipeRow::COLUMNS
                ))?;
                stmt.query_row([task_id, worker_id], SwipeRow::from_row).optional()
            })
        })
    }
}

fn reconcile(
    conn: &Connection,
    task_id: &str,
    worker_id: &str,
    direction: SwipeDirection,
) -> Result<SwipeOutcome> {
    let Some((client_id, status)) = crate::tasks::query_owner_and_status(conn, task_id)? else {
        return Ok(SwipeOutcome::TaskNotFound);
    };
    if status != TaskStatus::Open.as_str() {
        return Ok(SwipeOutcome::TaskClosed);
    }

    let swipe = SwipeRow {
        id: Uuid::new_v4().to_string(),
        task_id: task_id.to_string(),
        worker_id: worker_id.to_string(),
        direction: direction.as_str().to_string(),
        created_at: now_ts(),
    };

    let inserted = conn.execute(
        "INSERT INTO swipes (id, task_id, worker_id, direction, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(task_id, worker_id) DO NOTHING",
        rusqlite::params![swipe.id, swipe.task_id, swipe.worker_id, swipe.direction, swipe.created_at],
    )?;
    if inserted == 0 {
        return Ok(SwipeOutcome::AlreadySwiped);
    }

    if direction == SwipeDirection::Left {
        return Ok(SwipeOutcome::Recorded { swipe, matched: None });
    }

    let is_owner = worker_id == client_id;
    let partner = if is_owner {
        earliest_waiting_worker(conn, task_id, &client_id)?
    } else {
        conn.execute("UPDATE tasks SET like_count = like_count + 1 WHERE id = ?1", [task_id])?;
        owner_accepted(conn, task_id, &client_id)?.then(|| worker_id.to_string())
    };

    let Some(matched_worker) = partner else {
        debug!("Swipe {} on task {} recorded, no counterpart yet", swipe.id, task_id);
        return Ok(SwipeOutcome::Recorded { swipe, matched: None });
    };

    let now = now_ts();
    let flipped = conn.execute(
        "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        rusqlite::params![task_id, TaskStatus::Matched.as_str(), now, TaskStatus::Open.as_str()],
    )?;
    if flipped == 0 {
        return Ok(SwipeOutcome::Recorded { swipe, matched: None });
    }

    let matched = MatchRow {
        id: Uuid::new_v4().to_string(),
        task_id: task_id.to_string(),
        worker_id: matched_worker,
        client_id,
        status: MatchStatus::Active.as_str().to_string(),
        last_message_at: None,
        created_at: now.clone(),
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO matches (id, task_id, worker_id, client_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            matched.id,
            matched.task_id,
            matched.worker_id,
            matched.client_id,
            matched.status,
            matched.created_at,
            matched.updated_at,
        ],
    )?;

    info!(
        "Match {} created on task {} (worker {}, client {})",
        matched.id, matched.task_id, matched.worker_id, matched.client_id
    );
    Ok(SwipeOutcome::Recorded { swipe, matched: Some(matched) })
}

/// Whether the task owner has a right swipe on their own task.
fn owner_accepted(conn: &Connection, task_id: &str, client_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM swipes WHERE task_id = ?1 AND worker_id = ?2 AND direction = 'right'",
            [task_id, client_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn earliest_waiting_worker(conn: &Connection, task_id: &str, client_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT worker_id FROM swipes
         WHERE task_id = ?1 AND worker_id != ?2 AND direction = 'right'
         ORDER BY created_at ASC, rowid ASC
         LIMIT 1",
        [task_id, client_id],
        |row| row.get(0),
    )
    .optional()
}
