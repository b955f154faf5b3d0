use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                password            TEXT NOT NULL,
                first_name          TEXT NOT NULL,
                last_name           TEXT NOT NULL,
                role                TEXT NOT NULL CHECK (role IN ('worker', 'client')),
                college             TEXT,
                profile_image       TEXT,
                bio                 TEXT,
                skills              TEXT NOT NULL DEFAULT '[]',
                hourly_rate         REAL,
                rating              REAL,
                total_reviews       INTEGER NOT NULL DEFAULT 0,
                is_verified         INTEGER NOT NULL DEFAULT 0,
                is_email_verified   INTEGER NOT NULL DEFAULT 0,
                wallet_balance      REAL NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE tasks (
                id                  TEXT PRIMARY KEY,
                client_id           TEXT NOT NULL REFERENCES users(id),
                title               TEXT NOT NULL,
                description         TEXT NOT NULL DEFAULT '',
                category            TEXT NOT NULL DEFAULT '',
                budget              REAL NOT NULL,
                estimated_hours     INTEGER,
                deadline            TEXT,
                required_skills     TEXT NOT NULL DEFAULT '[]',
                location            TEXT,
                status              TEXT NOT NULL DEFAULT 'open',
                priority            TEXT NOT NULL DEFAULT 'medium',
                view_count          INTEGER NOT NULL DEFAULT 0,
                like_count          INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_tasks_status_created ON tasks(status, created_at);
            CREATE INDEX idx_tasks_client ON tasks(client_id, created_at);

            CREATE TABLE swipes (
                id          TEXT PRIMARY KEY,
                task_id     TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                worker_id   TEXT NOT NULL REFERENCES users(id),
                direction   TEXT NOT NULL CHECK (direction IN ('left', 'right')),
                created_at  TEXT NOT NULL,
                UNIQUE(task_id, worker_id)
            );

            CREATE INDEX idx_swipes_worker ON swipes(worker_id, created_at);

            CREATE TABLE matches (
                id              TEXT PRIMARY KEY,
                task_id         TEXT NOT NULL UNIQUE REFERENCES tasks(id),
                worker_id       TEXT NOT NULL REFERENCES users(id),
                client_id       TEXT NOT NULL REFERENCES users(id),
                status          TEXT NOT NULL DEFAULT 'active',
                last_message_at TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_matches_worker ON matches(worker_id, status);
            CREATE INDEX idx_matches_client ON matches(client_id, status);

            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                match_id            TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id           TEXT NOT NULL REFERENCES users(id),
                content             TEXT NOT NULL,
                message_type        TEXT NOT NULL DEFAULT 'text',
                read                INTEGER NOT NULL DEFAULT 0,
                client_message_id   TEXT,
                created_at          TEXT NOT NULL,
                UNIQUE(match_id, client_message_id)
            );

            CREATE INDEX idx_messages_match ON messages(match_id, created_at);

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL,
                title       TEXT NOT NULL,
                message     TEXT NOT NULL,
                match_id    TEXT,
                read        INTEGER NOT NULL DEFAULT 0,
                read_at     TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
