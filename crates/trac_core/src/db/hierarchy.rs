//! Subjects and committees: the two self-referential trees.
//!
//! Each row stores only its parent key. Children are found through the parent
//! index, and every parent change walks the ancestor chain so no row can become
//! its own ancestor.

use super::{affected, atomically, check_ancestors};
use crate::error::Result;
use crate::schema::{Committee, Subject};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const SUBJECT_COLUMNS: &str = "id, name, parent_id";
const COMMITTEE_COLUMNS: &str = "code, name, chamber, parent_code";

pub(crate) const SUBJECT_EXISTS: &str = "SELECT 1 FROM subject WHERE id = ?1";
pub(crate) const COMMITTEE_EXISTS: &str = "SELECT 1 FROM committee WHERE code = ?1";

const SUBJECT_PARENT: &str = "SELECT parent_id FROM subject WHERE id = ?1";
const COMMITTEE_PARENT: &str = "SELECT parent_code FROM committee WHERE code = ?1";

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

fn committee_from_row(row: &Row<'_>) -> rusqlite::Result<Committee> {
    Ok(Committee {
        code: row.get(0)?,
        name: row.get(1)?,
        chamber: row.get(2)?,
        parent_code: row.get(3)?,
    })
}

pub fn insert_subject(conn: &Connection, subject: &Subject) -> Result<()> {
    subject.validate()?;
    atomically(conn, |conn| {
        check_ancestors(
            conn,
            "subject",
            SUBJECT_PARENT,
            &subject.id,
            subject.parent_id.as_ref(),
        )?;
        conn.execute(
            "INSERT INTO subject (id, name, parent_id) VALUES (?1, ?2, ?3)",
            params![subject.id, subject.name, subject.parent_id],
        )?;
        Ok(())
    })?;
    debug!(id = subject.id, parent = ?subject.parent_id, "subject inserted");
    Ok(())
}

pub fn get_subject(conn: &Connection, id: i64) -> Result<Option<Subject>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subject WHERE id = ?1"),
            [id],
            subject_from_row,
        )
        .optional()?)
}

pub fn find_subject_by_name(conn: &Connection, name: &str) -> Result<Option<Subject>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subject WHERE name = ?1"),
            [name],
            subject_from_row,
        )
        .optional()?)
}

pub fn update_subject(conn: &Connection, subject: &Subject) -> Result<()> {
    subject.validate()?;
    atomically(conn, |conn| {
        check_ancestors(
            conn,
            "subject",
            SUBJECT_PARENT,
            &subject.id,
            subject.parent_id.as_ref(),
        )?;
        let changed = conn.execute(
            "UPDATE subject SET name = ?2, parent_id = ?3 WHERE id = ?1",
            params![subject.id, subject.name, subject.parent_id],
        )?;
        affected(changed, "subject", subject.id)
    })
}

/// Fails while the subject has children or is applied to a bill.
pub fn delete_subject(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM subject WHERE id = ?1", [id])?;
    affected(changed, "subject", id)
}

pub fn subject_children(conn: &Connection, parent_id: i64) -> Result<Vec<Subject>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBJECT_COLUMNS} FROM subject WHERE parent_id = ?1 ORDER BY name"
    ))?;
    let rows = stmt.query_map([parent_id], subject_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Ancestors of a subject, nearest first.
pub fn subject_ancestors(conn: &Connection, id: i64) -> Result<Vec<Subject>> {
    let mut ancestors: Vec<Subject> = Vec::new();
    let mut next = get_subject(conn, id)?.and_then(|subject| subject.parent_id);
    while let Some(parent_id) = next {
        if ancestors.iter().any(|seen| seen.id == parent_id) {
            break;
        }
        let Some(parent) = get_subject(conn, parent_id)? else {
            break;
        };
        next = parent.parent_id;
        ancestors.push(parent);
    }
    Ok(ancestors)
}

pub fn insert_committee(conn: &Connection, committee: &Committee) -> Result<()> {
    committee.validate()?;
    atomically(conn, |conn| {
        check_ancestors(
            conn,
            "committee",
            COMMITTEE_PARENT,
            &committee.code,
            committee.parent_code.as_ref(),
        )?;
        conn.execute(
            &format!("INSERT INTO committee ({COMMITTEE_COLUMNS}) VALUES (?1, ?2, ?3, ?4)"),
            params![
                committee.code,
                committee.name,
                committee.chamber,
                committee.parent_code
            ],
        )?;
        Ok(())
    })?;
    debug!(code = %committee.code, parent = ?committee.parent_code, "committee inserted");
    Ok(())
}

pub fn get_committee(conn: &Connection, code: &str) -> Result<Option<Committee>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COMMITTEE_COLUMNS} FROM committee WHERE code = ?1"),
            [code],
            committee_from_row,
        )
        .optional()?)
}

/// Updates name, chamber and parent of the committee with `committee.code`.
pub fn update_committee(conn: &Connection, committee: &Committee) -> Result<()> {
    committee.validate()?;
    atomically(conn, |conn| {
        check_ancestors(
            conn,
            "committee",
            COMMITTEE_PARENT,
            &committee.code,
            committee.parent_code.as_ref(),
        )?;
        let changed = conn.execute(
            "UPDATE committee SET name = ?2, chamber = ?3, parent_code = ?4 WHERE code = ?1",
            params![
                committee.code,
                committee.name,
                committee.chamber,
                committee.parent_code
            ],
        )?;
        affected(changed, "committee", &committee.code)
    })
}

pub fn delete_committee(conn: &Connection, code: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM committee WHERE code = ?1", [code])?;
    affected(changed, "committee", code)
}

pub fn subcommittees(conn: &Connection, parent_code: &str) -> Result<Vec<Committee>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMITTEE_COLUMNS} FROM committee WHERE parent_code = ?1 ORDER BY code"
    ))?;
    let rows = stmt.query_map([parent_code], committee_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
