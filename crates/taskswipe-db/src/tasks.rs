use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use taskswipe_types::models::{Location, TaskPriority, TaskStatus};

use crate::Database;
use crate::models::TaskRow;
use crate::retry::retry_transient;
use crate::util::{OptionalExt, format_ts, now_ts, to_json};

pub struct NewTask<'a> {
    pub id: &'a str,
    pub client_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub budget: f64,
    pub estimated_hours: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub required_skills: &'a [String],
    pub location: Option<&'a Location>,
    pub priority: TaskPriority,
}

/// Partial update applied by the owning client.
#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub budget: Option<f64>,
    pub estimated_hours: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub required_skills: Option<Vec<String>>,
    pub location: Option<Location>,
    pub priority: Option<TaskPriority>,
    /// Moves the task `open -> cancelled`.
    pub cancel: bool,
}

pub enum TaskUpdateOutcome {
    Updated(TaskRow),
    NotFound,
    Forbidden,
    /// Cancellation requested on a task that is no longer open.
    NotOpen,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TaskDeleteOutcome {
    Deleted,
    NotFound,
    Forbidden,
    NotOpen,
}

impl Database {
    pub fn create_task(&self, new: &NewTask<'_>) -> Result<TaskRow> {
        let skills = to_json(&new.required_skills)?;
        let location = new.location.map(to_json).transpose()?;
        let deadline = new.deadline.map(format_ts);

        self.with_conn(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO tasks (id, client_id, title, description, category, budget, estimated_hours,
                                    deadline, required_skills, location, status, priority, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'open', ?11, ?12, ?12)",
                rusqlite::params![
                    new.id,
                    new.client_id,
                    new.title,
                    new.description,
                    new.category,
                    new.budget,
                    new.estimated_hours,
                    deadline,
                    skills,
                    location,
                    new.priority.as_str(),
                    now,
                ],
            )?;

            query_task(conn, new.id)?.ok_or_else(|| anyhow::anyhow!("Task {} vanished after insert", new.id))
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskRow>> {
        retry_transient("get_task", || self.with_conn(|conn| query_task(conn, id)))
    }

    /// Bumps the view counter and returns the task. The counter is cosmetic;
    /// a lost increment under contention is acceptable.
    pub fn view_task(&self, id: &str) -> Result<Option<TaskRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET view_count = view_count + 1 WHERE id = ?1",
                [id],
            )?;
            query_task(conn, id)
        })
    }

    /// Open tasks not owned by `exclude_client`, newest first.
    pub fn list_open_tasks(
        &self,
        exclude_client: &str,
        category: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TaskRow>> {
        retry_transient("list_open_tasks", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM tasks
                     WHERE status = 'open'
                       AND client_id != ?1
                       AND (?2 IS NULL OR category = ?2)
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?3 OFFSET ?4",
                    TaskRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map(
                        rusqlite::params![exclude_client, category, limit, offset],
                        TaskRow::from_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    pub fn list_tasks_by_client(&self, client_id: &str) -> Result<Vec<TaskRow>> {
        retry_transient("list_tasks_by_client", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM tasks WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC",
                    TaskRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map([client_id], TaskRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    /// Ownership check and update in one transaction.
    pub fn update_task(
        &self,
        id: &str,
        requester: &str,
        changes: &TaskChanges,
    ) -> Result<TaskUpdateOutcome> {
        let skills = changes.required_skills.as_ref().map(to_json).transpose()?;
        let location = changes.location.as_ref().map(to_json).transpose()?;
        let deadline = changes.deadline.map(format_ts);
        let priority = changes.priority.map(TaskPriority::as_str);

        retry_transient("update_task", || {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let Some((owner, status)) = query_owner_and_status(&tx, id)? else {
                    return Ok(TaskUpdateOutcome::NotFound);
                };
                if owner != requester {
                    return Ok(TaskUpdateOutcome::Forbidden);
                }
                if changes.cancel && status != TaskStatus::Open.as_str() {
                    return Ok(TaskUpdateOutcome::NotOpen);
                }

                tx.execute(
                    "UPDATE tasks SET
                        title           = COALESCE(?2, title),
                        description     = COALESCE(?3, description),
                        category        = COALESCE(?4, category),
                        budget          = COALESCE(?5, budget),
                        estimated_hours = COALESCE(?6, estimated_hours),
                        deadline        = COALESCE(?7, deadline),
                        required_skills = COALESCE(?8, required_skills),
                        location        = COALESCE(?9, location),
                        priority        = COALESCE(?10, priority),
                        status          = CASE WHEN ?11 THEN 'cancelled' ELSE status END,
                        updated_at      = ?12
                     WHERE id = ?1",
                    rusqlite::params![
                        id,
                        changes.title,
                        changes.description,
                        changes.category,
                        changes.budget,
                        changes.estimated_hours,
                        deadline,
                        skills,
                        location,
                        priority,
                        changes.cancel,
                        now_ts(),
                    ],
                )?;

                let row = query_task(&tx, id)?
                    .ok_or_else(|| anyhow::anyhow!("Task {} vanished during update", id))?;
                tx.commit()?;
                Ok(TaskUpdateOutcome::Updated(row))
            })
        })
    }

    /// Deletes an open task owned by `requester`. Its swipes cascade.
    pub fn delete_task(&self, id: &str, requester: &str) -> Result<TaskDeleteOutcome> {
        retry_transient("delete_task", || {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let Some((owner, status)) = query_owner_and_status(&tx, id)? else {
                    return Ok(TaskDeleteOutcome::NotFound);
                };
                if owner != requester {
                    return Ok(TaskDeleteOutcome::Forbidden);
                }
                if status != TaskStatus::Open.as_str() {
                    return Ok(TaskDeleteOutcome::NotOpen);
                }

                tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
                tx.commit()?;
                Ok(TaskDeleteOutcome::Deleted)
            })
        })
    }
}

pub(crate) fn query_task(conn: &Connection, id: &str) -> Result<Option<TaskRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tasks WHERE id = ?1", TaskRow::COLUMNS))?;
    stmt.query_row([id], TaskRow::from_row).optional()
}

/// `(client_id, status)` for a task.
pub(crate) fn query_owner_and_status(conn: &Connection, id: &str) -> Result<Option<(String, String)>> {
    conn.query_row(
        "SELECT client_id, status FROM tasks WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}
