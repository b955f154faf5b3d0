//! Bounded retry for transient SQLite contention.
//!
//! Only wrap operations whose effect is the same when repeated: reads,
//! transactions that roll back on failure, and inserts keyed by a natural
//! unique constraint. Plain appends must not go through here.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Total attempts, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE: Duration = Duration::from_millis(25);
const BACKOFF_MAX: Duration = Duration::from_millis(500);

/// True for `SQLITE_BUSY` / `SQLITE_LOCKED`, the errors another writer can cause.
pub fn is_transient(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

/// Runs `f`, retrying transient failures with exponential backoff.
///
/// Blocks the calling thread while backing off; callers are already on a
/// blocking pool thread.
pub fn retry_transient<T, F>(op: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 1;
    let mut backoff = BACKOFF_BASE;

    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                warn!("{}: transient store error (attempt {}/{}): {}", op, attempt, MAX_ATTEMPTS, e);
                thread::sleep(backoff.min(BACKOFF_MAX));
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
