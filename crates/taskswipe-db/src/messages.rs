use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use taskswipe_types::models::MessageKind;
use uuid::Uuid;

use crate::Database;
use crate::matches::query_match;
use crate::models::MessageRow;
use crate::retry::retry_transient;
use crate::util::{OptionalExt, now_ts};

pub struct NewMessage<'a> {
    pub match_id: &'a str,
    pub sender_id: &'a str,
    pub content: &'a str,
    pub kind: MessageKind,
    pub client_message_id: Option<&'a str>,
}

#[derive(Debug)]
pub enum AppendOutcome {
    Appended(MessageRow),
    /// The `client_message_id` was already used in this match; this is the stored message.
    Replayed(MessageRow),
    MatchNotFound,
    Forbidden,
}

impl Database {
    /// Appends a message and bumps the match's `last_message_at` atomically.
    ///
    /// Only retried on contention when the sender supplied a
    /// `client_message_id`; without one a retry could post twice.
    pub fn append_message(&self, new: &NewMessage<'_>) -> Result<AppendOutcome> {
        let op = || {
            self.with_conn_mut(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = append(&tx, new)?;
                if matches!(outcome, AppendOutcome::Appended(_)) {
                    tx.commit()?;
                }
                Ok(outcome)
            })
        };

        match new.client_message_id {
            Some(_) => retry_transient("append_message", op),
            None => op(),
        }
    }

    /// Full history of a match in creation order.
    pub fn list_messages(&self, match_id: &str) -> Result<Vec<MessageRow>> {
        retry_transient("list_messages", || {
            self.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM messages WHERE match_id = ?1 ORDER BY created_at ASC, rowid ASC",
                    MessageRow::COLUMNS
                ))?;

                let rows = stmt
                    .query_map([match_id], MessageRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }
}

fn append(conn: &Connection, new: &NewMessage<'_>) -> Result<AppendOutcome> {
    let Some(m) = query_match(conn, new.match_id)? else {
        return Ok(AppendOutcome::MatchNotFound);
    };
    if !m.is_participant(new.sender_id) {
        return Ok(AppendOutcome::Forbidden);
    }

    if let Some(key) = new.client_message_id {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM messages WHERE match_id = ?1 AND client_message_id = ?2",
            MessageRow::COLUMNS
        ))?;
        if let Some(existing) = stmt.query_row([new.match_id, key], MessageRow::from_row).optional()? {
            return Ok(AppendOutcome::Replayed(existing));
        }
    }

    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        match_id: new.match_id.to_string(),
        sender_id: new.sender_id.to_string(),
        content: new.content.to_string(),
        message_type: new.kind.as_str().to_string(),
        read: false,
        client_message_id: new.client_message_id.map(str::to_string),
        created_at: now_ts(),
    };

    conn.execute(
        "INSERT INTO messages (id, match_id, sender_id, content, message_type, read, client_message_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        rusqlite::params![
            row.id,
            row.match_id,
            row.sender_id,
            row.content,
            row.message_type,
            row.client_message_id,
            row.created_at,
        ],
    )?;
    conn.execute(
        "UPDATE matches SET last_message_at = ?2, updated_at = ?2 WHERE id = ?1",
        rusqlite::params![row.match_id, row.created_at],
    )?;

    Ok(AppendOutcome::Appended(row))
}
