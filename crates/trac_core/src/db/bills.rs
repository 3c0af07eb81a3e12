use super::{affected, atomically, date_column, date_to_sql, require, time_column, time_to_sql};
use super::hierarchy::COMMITTEE_EXISTS;
use crate::codes;
use crate::error::Result;
use crate::schema::{Action, Amendment, Bill};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const BILL_COLUMNS: &str = "id, introduced, congress, number, title, bill_type, origin_chamber";
const AMENDMENT_COLUMNS: &str = "id, bill_id, amendment_type, number, description, purpose";
const ACTION_COLUMNS: &str = "id, action_code, action_date, action_time, bill_id, committee_id, \
     text, source_system_code, source_system_name, action_type";

pub(crate) const BILL_EXISTS: &str = "SELECT 1 FROM bill WHERE id = ?1";

fn bill_from_row(row: &Row<'_>) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: row.get(0)?,
        introduced: date_column(row, 1)?.ok_or(rusqlite::Error::InvalidColumnType(
            1,
            "introduced".to_string(),
            rusqlite::types::Type::Null,
        ))?,
        congress: row.get(2)?,
        number: row.get(3)?,
        title: row.get(4)?,
        bill_type: row.get(5)?,
        origin_chamber: row.get(6)?,
    })
}

fn amendment_from_row(row: &Row<'_>) -> rusqlite::Result<Amendment> {
    Ok(Amendment {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        amendment_type: row.get(2)?,
        number: row.get(3)?,
        description: row.get(4)?,
        purpose: row.get(5)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        action_code: row.get(1)?,
        action_date: date_column(row, 2)?,
        action_time: time_column(row, 3)?,
        bill_id: row.get(4)?,
        committee_id: row.get(5)?,
        text: row.get(6)?,
        source_system_code: row.get(7)?,
        source_system_name: row.get(8)?,
        action_type: row.get(9)?,
    })
}

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<()> {
    bill.validate()?;
    conn.execute(
        &format!("INSERT INTO bill ({BILL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            bill.id,
            date_to_sql(Some(bill.introduced))?,
            bill.congress,
            bill.number,
            bill.title,
            bill.bill_type,
            bill.origin_chamber
        ],
    )?;
    debug!(id = bill.id, bill_type = %bill.bill_type, "bill inserted");
    Ok(())
}

pub fn get_bill(conn: &Connection, id: i64) -> Result<Option<Bill>> {
    Ok(conn
        .query_row(
            &format!("SELECT {BILL_COLUMNS} FROM bill WHERE id = ?1"),
            [id],
            bill_from_row,
        )
        .optional()?)
}

pub fn update_bill(conn: &Connection, bill: &Bill) -> Result<()> {
    bill.validate()?;
    let changed = conn.execute(
        "UPDATE bill SET introduced = ?2, congress = ?3, number = ?4, title = ?5, \
         bill_type = ?6, origin_chamber = ?7 WHERE id = ?1",
        params![
            bill.id,
            date_to_sql(Some(bill.introduced))?,
            bill.congress,
            bill.number,
            bill.title,
            bill.bill_type,
            bill.origin_chamber
        ],
    )?;
    affected(changed, "bill", bill.id)
}

/// Restricted: fails while any sponsorship, subject, action or amendment references the bill.
pub fn delete_bill(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM bill WHERE id = ?1", [id])?;
    affected(changed, "bill", id)
}

pub fn insert_amendment(conn: &Connection, amendment: &Amendment) -> Result<()> {
    amendment.validate()?;
    atomically(conn, |conn| {
        require(conn, BILL_EXISTS, amendment.bill_id, "bill")?;
        conn.execute(
            &format!("INSERT INTO amendment ({AMENDMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                amendment.id,
                amendment.bill_id,
                amendment.amendment_type,
                amendment.number,
                amendment.description,
                amendment.purpose
            ],
        )?;
        Ok(())
    })?;
    debug!(id = amendment.id, bill_id = amendment.bill_id, "amendment inserted");
    Ok(())
}

pub fn get_amendment(conn: &Connection, id: i64) -> Result<Option<Amendment>> {
    Ok(conn
        .query_row(
            &format!("SELECT {AMENDMENT_COLUMNS} FROM amendment WHERE id = ?1"),
            [id],
            amendment_from_row,
        )
        .optional()?)
}

pub fn update_amendment(conn: &Connection, amendment: &Amendment) -> Result<()> {
    amendment.validate()?;
    atomically(conn, |conn| {
        require(conn, BILL_EXISTS, amendment.bill_id, "bill")?;
        let changed = conn.execute(
            "UPDATE amendment SET bill_id = ?2, amendment_type = ?3, number = ?4, \
             description = ?5, purpose = ?6 WHERE id = ?1",
            params![
                amendment.id,
                amendment.bill_id,
                amendment.amendment_type,
                amendment.number,
                amendment.description,
                amendment.purpose
            ],
        )?;
        affected(changed, "amendment", amendment.id)
    })
}

pub fn delete_amendment(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM amendment WHERE id = ?1", [id])?;
    affected(changed, "amendment", id)
}

pub fn amendments_for_bill(conn: &Connection, bill_id: i64) -> Result<Vec<Amendment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AMENDMENT_COLUMNS} FROM amendment WHERE bill_id = ?1 ORDER BY number, id"
    ))?;
    let rows = stmt.query_map([bill_id], amendment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn check_action_refs(conn: &Connection, action: &Action) -> Result<()> {
    require(conn, BILL_EXISTS, action.bill_id, "bill")?;
    if let Some(committee) = &action.committee_id {
        require(conn, COMMITTEE_EXISTS, committee, "committee")?;
    }
    Ok(())
}

/// Unknown action codes are stored as given; the code table is advisory.
pub fn insert_action(conn: &Connection, action: &Action) -> Result<()> {
    action.validate()?;
    if !codes::is_known_action_code(&action.action_code) {
        debug!(code = %action.action_code, "action code not in reference table");
    }
    atomically(conn, |conn| {
        check_action_refs(conn, action)?;
        conn.execute(
            &format!(
                "INSERT INTO action ({ACTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                action.id,
                action.action_code,
                date_to_sql(action.action_date)?,
                time_to_sql(action.action_time)?,
                action.bill_id,
                action.committee_id,
                action.text,
                action.source_system_code,
                action.source_system_name,
                action.action_type
            ],
        )?;
        Ok(())
    })?;
    debug!(id = action.id, bill_id = action.bill_id, "action inserted");
    Ok(())
}

pub fn get_action(conn: &Connection, id: i64) -> Result<Option<Action>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ACTION_COLUMNS} FROM action WHERE id = ?1"),
            [id],
            action_from_row,
        )
        .optional()?)
}

pub fn update_action(conn: &Connection, action: &Action) -> Result<()> {
    action.validate()?;
    atomically(conn, |conn| {
        check_action_refs(conn, action)?;
        let changed = conn.execute(
            "UPDATE action SET action_code = ?2, action_date = ?3, action_time = ?4, \
             bill_id = ?5, committee_id = ?6, text = ?7, source_system_code = ?8, \
             source_system_name = ?9, action_type = ?10 WHERE id = ?1",
            params![
                action.id,
                action.action_code,
                date_to_sql(action.action_date)?,
                time_to_sql(action.action_time)?,
                action.bill_id,
                action.committee_id,
                action.text,
                action.source_system_code,
                action.source_system_name,
                action.action_type
            ],
        )?;
        affected(changed, "action", action.id)
    })
}

pub fn delete_action(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM action WHERE id = ?1", [id])?;
    affected(changed, "action", id)
}

/// Actions on a bill in the order they happened.
pub fn actions_for_bill(conn: &Connection, bill_id: i64) -> Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTION_COLUMNS} FROM action WHERE bill_id = ?1 \
         ORDER BY action_date, action_time, id"
    ))?;
    let rows = stmt.query_map([bill_id], action_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn actions_for_committee(conn: &Connection, committee_code: &str) -> Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTION_COLUMNS} FROM action WHERE committee_id = ?1 \
         ORDER BY action_date, action_time, id"
    ))?;
    let rows = stmt.query_map([committee_code], action_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
