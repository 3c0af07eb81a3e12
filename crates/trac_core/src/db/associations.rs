//! Many-to-many links: sponsorships, committee memberships and bill subjects.
//!
//! Each link is stored once, keyed by both ends. Both ends must exist at write time.

use super::bills::BILL_EXISTS;
use super::hierarchy::{COMMITTEE_EXISTS, SUBJECT_EXISTS};
use super::people::politician_from_row;
use super::{affected, atomically, date_column, date_to_sql, require};
use crate::codes::SubjectStatus;
use crate::error::{Result, StoreError};
use crate::schema::{BillSubject, Committee, CommitteeMembership, Politician, Sponsorship};
use rusqlite::{Connection, OptionalExtension, Row, params};
use time::Date;
use tracing::debug;

const POLITICIAN_EXISTS: &str = "SELECT 1 FROM politician WHERE id = ?1";
const SPONSORSHIP_COLUMNS: &str = "politician_id, bill_id, date, date_withdrawn, is_original";

fn duplicate(table: &str, key: String) -> StoreError {
    StoreError::DuplicateAssociationViolation {
        table: table.to_string(),
        key,
    }
}

fn sponsorship_from_row(row: &Row<'_>) -> rusqlite::Result<Sponsorship> {
    Ok(Sponsorship {
        politician_id: row.get(0)?,
        bill_id: row.get(1)?,
        date: date_column(row, 2)?,
        date_withdrawn: date_column(row, 3)?,
        is_original: row.get(4)?,
    })
}

fn bill_subject_from_row(row: &Row<'_>) -> rusqlite::Result<BillSubject> {
    Ok(BillSubject {
        bill_id: row.get(0)?,
        subject_id: row.get(1)?,
        status: row.get(2)?,
    })
}

pub fn insert_sponsorship(conn: &Connection, sponsorship: &Sponsorship) -> Result<()> {
    sponsorship.validate()?;
    let (politician_id, bill_id) = (sponsorship.politician_id, sponsorship.bill_id);
    atomically(conn, |conn| {
        require(conn, POLITICIAN_EXISTS, politician_id, "politician")?;
        require(conn, BILL_EXISTS, bill_id, "bill")?;
        if get_sponsorship(conn, politician_id, bill_id)?.is_some() {
            return Err(duplicate(
                "sponsorship",
                format!("politician {politician_id}, bill {bill_id}"),
            ));
        }
        conn.execute(
            &format!("INSERT INTO sponsorship ({SPONSORSHIP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                politician_id,
                bill_id,
                date_to_sql(sponsorship.date)?,
                date_to_sql(sponsorship.date_withdrawn)?,
                sponsorship.is_original
            ],
        )?;
        Ok(())
    })?;
    debug!(politician_id, bill_id, original = sponsorship.is_original, "sponsorship inserted");
    Ok(())
}

pub fn get_sponsorship(
    conn: &Connection,
    politician_id: i64,
    bill_id: i64,
) -> Result<Option<Sponsorship>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {SPONSORSHIP_COLUMNS} FROM sponsorship \
                 WHERE politician_id = ?1 AND bill_id = ?2"
            ),
            [politician_id, bill_id],
            sponsorship_from_row,
        )
        .optional()?)
}

/// Rewrites the dates and original flag of an existing sponsorship.
pub fn update_sponsorship(conn: &Connection, sponsorship: &Sponsorship) -> Result<()> {
    sponsorship.validate()?;
    let changed = conn.execute(
        "UPDATE sponsorship SET date = ?3, date_withdrawn = ?4, is_original = ?5 \
         WHERE politician_id = ?1 AND bill_id = ?2",
        params![
            sponsorship.politician_id,
            sponsorship.bill_id,
            date_to_sql(sponsorship.date)?,
            date_to_sql(sponsorship.date_withdrawn)?,
            sponsorship.is_original
        ],
    )?;
    affected(
        changed,
        "sponsorship",
        format!("({}, {})", sponsorship.politician_id, sponsorship.bill_id),
    )
}

/// Marks a sponsorship withdrawn. The withdrawal may not precede the sponsorship date.
pub fn withdraw_sponsorship(
    conn: &Connection,
    politician_id: i64,
    bill_id: i64,
    withdrawn: Date,
) -> Result<()> {
    atomically(conn, |conn| {
        let Some(mut sponsorship) = get_sponsorship(conn, politician_id, bill_id)? else {
            return Err(StoreError::not_found(
                "sponsorship",
                format!("({politician_id}, {bill_id})"),
            ));
        };
        sponsorship.date_withdrawn = Some(withdrawn);
        update_sponsorship(conn, &sponsorship)
    })?;
    debug!(politician_id, bill_id, %withdrawn, "sponsorship withdrawn");
    Ok(())
}

pub fn delete_sponsorship(conn: &Connection, politician_id: i64, bill_id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM sponsorship WHERE politician_id = ?1 AND bill_id = ?2",
        [politician_id, bill_id],
    )?;
    affected(changed, "sponsorship", format!("({politician_id}, {bill_id})"))
}

/// Sponsors of a bill, original sponsors first.
pub fn sponsorships_for_bill(conn: &Connection, bill_id: i64) -> Result<Vec<Sponsorship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SPONSORSHIP_COLUMNS} FROM sponsorship WHERE bill_id = ?1 \
         ORDER BY is_original DESC, date, politician_id"
    ))?;
    let rows = stmt.query_map([bill_id], sponsorship_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn sponsorships_for_politician(
    conn: &Connection,
    politician_id: i64,
) -> Result<Vec<Sponsorship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SPONSORSHIP_COLUMNS} FROM sponsorship WHERE politician_id = ?1 \
         ORDER BY date, bill_id"
    ))?;
    let rows = stmt.query_map([politician_id], sponsorship_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_committee_membership(
    conn: &Connection,
    membership: &CommitteeMembership,
) -> Result<()> {
    let committee = membership.committee_id.as_str();
    let politician_id = membership.politician_id;
    atomically(conn, |conn| {
        require(conn, COMMITTEE_EXISTS, committee, "committee")?;
        require(conn, POLITICIAN_EXISTS, politician_id, "politician")?;
        if get_committee_membership(conn, committee, politician_id)?.is_some() {
            return Err(duplicate(
                "committee_membership",
                format!("committee {committee}, politician {politician_id}"),
            ));
        }
        conn.execute(
            "INSERT INTO committee_membership (committee_id, politician_id) VALUES (?1, ?2)",
            params![committee, politician_id],
        )?;
        Ok(())
    })?;
    debug!(committee, politician_id, "committee membership inserted");
    Ok(())
}

pub fn get_committee_membership(
    conn: &Connection,
    committee_code: &str,
    politician_id: i64,
) -> Result<Option<CommitteeMembership>> {
    Ok(conn
        .query_row(
            "SELECT committee_id, politician_id FROM committee_membership \
             WHERE committee_id = ?1 AND politician_id = ?2",
            params![committee_code, politician_id],
            |row| {
                Ok(CommitteeMembership {
                    committee_id: row.get(0)?,
                    politician_id: row.get(1)?,
                })
            },
        )
        .optional()?)
}

pub fn delete_committee_membership(
    conn: &Connection,
    committee_code: &str,
    politician_id: i64,
) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM committee_membership WHERE committee_id = ?1 AND politician_id = ?2",
        params![committee_code, politician_id],
    )?;
    affected(
        changed,
        "committee_membership",
        format!("({committee_code}, {politician_id})"),
    )
}

pub fn members_of_committee(conn: &Connection, committee_code: &str) -> Result<Vec<Politician>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.website, p.chamber FROM politician p \
         JOIN committee_membership m ON m.politician_id = p.id \
         WHERE m.committee_id = ?1 ORDER BY p.name, p.id",
    )?;
    let rows = stmt.query_map([committee_code], politician_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn committees_of_politician(conn: &Connection, politician_id: i64) -> Result<Vec<Committee>> {
    let mut stmt = conn.prepare(
        "SELECT c.code, c.name, c.chamber, c.parent_code FROM committee c \
         JOIN committee_membership m ON m.committee_id = c.code \
         WHERE m.politician_id = ?1 ORDER BY c.code",
    )?;
    let rows = stmt.query_map([politician_id], |row| {
        Ok(Committee {
            code: row.get(0)?,
            name: row.get(1)?,
            chamber: row.get(2)?,
            parent_code: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_bill_subject(conn: &Connection, link: &BillSubject) -> Result<()> {
    let (bill_id, subject_id) = (link.bill_id, link.subject_id);
    atomically(conn, |conn| {
        require(conn, BILL_EXISTS, bill_id, "bill")?;
        require(conn, SUBJECT_EXISTS, subject_id, "subject")?;
        if get_bill_subject(conn, bill_id, subject_id)?.is_some() {
            return Err(duplicate(
                "bill_subject",
                format!("bill {bill_id}, subject {subject_id}"),
            ));
        }
        conn.execute(
            "INSERT INTO bill_subject (bill_id, subject_id, status) VALUES (?1, ?2, ?3)",
            params![bill_id, subject_id, link.status],
        )?;
        Ok(())
    })?;
    debug!(bill_id, subject_id, status = %link.status, "bill subject inserted");
    Ok(())
}

pub fn get_bill_subject(
    conn: &Connection,
    bill_id: i64,
    subject_id: i64,
) -> Result<Option<BillSubject>> {
    Ok(conn
        .query_row(
            "SELECT bill_id, subject_id, status FROM bill_subject \
             WHERE bill_id = ?1 AND subject_id = ?2",
            [bill_id, subject_id],
            bill_subject_from_row,
        )
        .optional()?)
}

pub fn set_bill_subject_status(
    conn: &Connection,
    bill_id: i64,
    subject_id: i64,
    status: SubjectStatus,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE bill_subject SET status = ?3 WHERE bill_id = ?1 AND subject_id = ?2",
        params![bill_id, subject_id, status],
    )?;
    affected(changed, "bill_subject", format!("({bill_id}, {subject_id})"))
}

pub fn delete_bill_subject(conn: &Connection, bill_id: i64, subject_id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM bill_subject WHERE bill_id = ?1 AND subject_id = ?2",
        [bill_id, subject_id],
    )?;
    affected(changed, "bill_subject", format!("({bill_id}, {subject_id})"))
}

/// Subjects applied to a bill, primary first.
pub fn subjects_for_bill(conn: &Connection, bill_id: i64) -> Result<Vec<BillSubject>> {
    let mut stmt = conn.prepare(
        "SELECT bill_id, subject_id, status FROM bill_subject WHERE bill_id = ?1 \
         ORDER BY status, subject_id",
    )?;
    let rows = stmt.query_map([bill_id], bill_subject_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn bills_for_subject(conn: &Connection, subject_id: i64) -> Result<Vec<BillSubject>> {
    let mut stmt = conn.prepare(
        "SELECT bill_id, subject_id, status FROM bill_subject WHERE subject_id = ?1 \
         ORDER BY status, bill_id",
    )?;
    let rows = stmt.query_map([subject_id], bill_subject_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
