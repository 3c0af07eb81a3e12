use super::affected;
use crate::error::Result;
use crate::schema::{Politician, User};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const USER_COLUMNS: &str = "id, username, email";
const POLITICIAN_COLUMNS: &str = "id, name, website, chamber";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
    })
}

pub(crate) fn politician_from_row(row: &Row<'_>) -> rusqlite::Result<Politician> {
    Ok(Politician {
        id: row.get(0)?,
        name: row.get(1)?,
        website: row.get(2)?,
        chamber: row.get(3)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    user.validate()?;
    conn.execute(
        "INSERT INTO users (id, username, email) VALUES (?1, ?2, ?3)",
        params![user.id, user.username, user.email],
    )?;
    debug!(id = user.id, "user inserted");
    Ok(())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?)
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_from_row,
        )
        .optional()?)
}

pub fn update_user(conn: &Connection, user: &User) -> Result<()> {
    user.validate()?;
    let changed = conn.execute(
        "UPDATE users SET username = ?2, email = ?3 WHERE id = ?1",
        params![user.id, user.username, user.email],
    )?;
    affected(changed, "user", user.id)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    affected(changed, "user", id)
}

pub fn insert_politician(conn: &Connection, politician: &Politician) -> Result<()> {
    politician.validate()?;
    conn.execute(
        "INSERT INTO politician (id, name, website, chamber) VALUES (?1, ?2, ?3, ?4)",
        params![
            politician.id,
            politician.name,
            politician.website,
            politician.chamber
        ],
    )?;
    debug!(id = politician.id, chamber = %politician.chamber, "politician inserted");
    Ok(())
}

pub fn get_politician(conn: &Connection, id: i64) -> Result<Option<Politician>> {
    Ok(conn
        .query_row(
            &format!("SELECT {POLITICIAN_COLUMNS} FROM politician WHERE id = ?1"),
            [id],
            politician_from_row,
        )
        .optional()?)
}

pub fn update_politician(conn: &Connection, politician: &Politician) -> Result<()> {
    politician.validate()?;
    let changed = conn.execute(
        "UPDATE politician SET name = ?2, website = ?3, chamber = ?4 WHERE id = ?1",
        params![
            politician.id,
            politician.name,
            politician.website,
            politician.chamber
        ],
    )?;
    affected(changed, "politician", politician.id)
}

/// Fails with a referential violation while sponsorships or memberships remain.
pub fn delete_politician(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM politician WHERE id = ?1", [id])?;
    affected(changed, "politician", id)
}
