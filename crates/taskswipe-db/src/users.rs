use anyhow::Result;
use rusqlite::Connection;
use taskswipe_types::models::Role;

use crate::Database;
use crate::models::UserRow;
use crate::retry::retry_transient;
use crate::util::{OptionalExt, is_unique_violation, now_ts, to_json};

pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
    pub college: Option<&'a str>,
}

/// Fields a user may change on their own profile. `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub college: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub hourly_rate: Option<f64>,
}

impl Database {
    /// Inserts a user. Returns `Ok(None)` when the email is already registered.
    pub fn create_user(&self, new: &NewUser<'_>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let now = now_ts();
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password, first_name, last_name, role, college, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    new.id,
                    new.email,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    new.role.as_str(),
                    new.college,
                    now,
                ],
            );

            match inserted {
                Ok(_) => query_user_by_id(conn, new.id),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        retry_transient("get_user_by_email", || {
            self.with_conn(|conn| query_user_by_email(conn, email))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        retry_transient("get_user_by_id", || self.with_conn(|conn| query_user_by_id(conn, id)))
    }

    /// Applies profile changes and returns the updated row, or `None` if the user is gone.
    pub fn update_profile(&self, id: &str, changes: &ProfileChanges) -> Result<Option<UserRow>> {
        let skills = changes.skills.as_ref().map(to_json).transpose()?;

        retry_transient("update_profile", || {
            self.with_conn(|conn| {
                let updated = conn.execute(
                    "UPDATE users SET
                        first_name    = COALESCE(?2, first_name),
                        last_name     = COALESCE(?3, last_name),
                        college       = COALESCE(?4, college),
                        profile_image = COALESCE(?5, profile_image),
                        bio           = COALESCE(?6, bio),
                        skills        = COALESCE(?7, skills),
                        hourly_rate   = COALESCE(?8, hourly_rate),
                        updated_at    = ?9
                     WHERE id = ?1",
                    rusqlite::params![
                        id,
                        changes.first_name,
                        changes.last_name,
                        changes.college,
                        changes.profile_image,
                        changes.bio,
                        skills,
                        changes.hourly_rate,
                        now_ts(),
                    ],
                )?;

                if updated == 0 {
                    return Ok(None);
                }
                query_user_by_id(conn, id)
            })
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", UserRow::COLUMNS))?;
    stmt.query_row([id], UserRow::from_row).optional()
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {} FROM users WHERE email = ?1", UserRow::COLUMNS))?;
    stmt.query_row([email], UserRow::from_row).optional()
}
