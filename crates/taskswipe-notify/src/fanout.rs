//! Notification fan-out.
//!
//! Listens on the [`Dispatcher`] and turns each domain event into one
//! notification per interested recipient: both participants for a new match,
//! the non-sending participant for a new message.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use taskswipe_db::Database;
use taskswipe_db::models::NotificationRow;
use taskswipe_db::notifications::NewNotification;
use taskswipe_types::events::DomainEvent;
use taskswipe_types::models::NotificationKind;

use crate::Dispatcher;

/// Writes the notifications for one event and returns them.
pub fn fan_out(db: &Database, event: &DomainEvent) -> Result<Vec<NotificationRow>> {
    match event {
        DomainEvent::MatchCreated {
            match_id,
            worker_id,
            client_id,
            ..
        } => {
            let match_id = match_id.to_string();
            let worker_id = worker_id.to_string();
            let client_id = client_id.to_string();

            db.insert_notifications(&[
                NewNotification {
                    user_id: &worker_id,
                    kind: NotificationKind::Match,
                    title: "New Match!",
                    message: "You have a new task match. Start chatting!",
                    match_id: Some(&match_id),
                },
                NewNotification {
                    user_id: &client_id,
                    kind: NotificationKind::Match,
                    title: "Match Found!",
                    message: "Someone is interested in your task!",
                    match_id: Some(&match_id),
                },
            ])
        }

        DomainEvent::MessageCreated {
            match_id,
            sender_id,
            ..
        } => {
            let match_id = match_id.to_string();
            let Some(m) = db.get_match(&match_id)? else {
                warn!("Message event for unknown match {}", match_id);
                return Ok(Vec::new());
            };

            let sender_id = sender_id.to_string();
            let recipient = if sender_id == m.worker_id { &m.client_id } else { &m.worker_id };

            db.insert_notifications(&[NewNotification {
                user_id: recipient,
                kind: NotificationKind::Message,
                title: "New Message",
                message: "New message in your conversation",
                match_id: Some(&match_id),
            }])
        }
    }
}

/// Consumes events until the channel closes. Events are handled one at a
/// time so notifications keep publish order.
pub async fn run(db: Arc<Database>, mut rx: broadcast::Receiver<DomainEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notification fan-out lagged; {} events dropped", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let db = db.clone();
        let result = tokio::task::spawn_blocking(move || {
            let rows = fan_out(&db, &event);
            (event, rows)
        })
        .await;

        match result {
            Ok((event, Ok(rows))) => {
                debug!("Fanned out {} notification(s) for match {}", rows.len(), event.match_id());
            }
            Ok((event, Err(e))) => error!("Fan-out failed for {:?}: {:#}", event, e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }

    info!("Notification fan-out stopped");
}

/// Subscribes before spawning, so no event published after this returns is missed.
pub fn spawn(db: Arc<Database>, dispatcher: &Dispatcher) -> JoinHandle<()> {
    let rx = dispatcher.subscribe();
    tokio::spawn(run(db, rx))
}
