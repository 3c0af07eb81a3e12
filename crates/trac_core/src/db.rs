use crate::codes::{BillType, Chamber, SubjectStatus};
use crate::config::DatabaseConfig;
use crate::error::{Result, StoreError};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::path::Path;
use std::time::Duration;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time};
use tracing::{debug, info, warn};

mod associations;
mod bills;
mod bundle;
mod hierarchy;
mod people;

pub use associations::*;
pub use bills::*;
pub use bundle::*;
pub use hierarchy::*;
pub use people::*;

pub fn open(db_path: impl AsRef<Path>) -> Result<Connection> {
    open_with(&DatabaseConfig {
        path: db_path.as_ref().to_path_buf(),
        ..DatabaseConfig::default()
    })
}

pub fn open_with(config: &DatabaseConfig) -> Result<Connection> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(&config.path)?;
    conn.pragma_update(None, "journal_mode", &config.journal_mode)?;
    conn.pragma_update(None, "synchronous", &config.synchronous)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    init(&conn)?;
    info!(path = %config.path.display(), "database opened");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(conn)
}

fn quoted(codes: impl IntoIterator<Item = &'static str>) -> String {
    codes
        .into_iter()
        .map(|code| format!("'{code}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Creates every table and index. Safe to run against an existing database.
pub fn init(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let chambers = quoted(Chamber::ALL.map(Chamber::code));
    let bill_types = quoted(BillType::ALL.map(BillType::code));
    let statuses = quoted(SubjectStatus::ALL.map(SubjectStatus::code));

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS users (
          id INTEGER PRIMARY KEY,
          username TEXT UNIQUE,
          email TEXT UNIQUE,
          CONSTRAINT username_len CHECK (length(username) <= 50),
          CONSTRAINT email_len CHECK (length(email) <= 120)
        );

        CREATE TABLE IF NOT EXISTS politician (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          website TEXT,
          chamber TEXT NOT NULL,
          CONSTRAINT politician_name_len CHECK (length(name) BETWEEN 1 AND 255),
          CONSTRAINT politician_website_len CHECK (length(website) <= 255),
          CONSTRAINT politician_chamber CHECK (chamber IN ({chambers}))
        );

        CREATE TABLE IF NOT EXISTS bill (
          id INTEGER PRIMARY KEY,
          introduced TEXT NOT NULL,
          congress INTEGER,
          number INTEGER,
          title TEXT NOT NULL,
          bill_type TEXT NOT NULL,
          origin_chamber TEXT NOT NULL,
          CONSTRAINT bill_title_len CHECK (length(title) BETWEEN 1 AND 1000),
          CONSTRAINT bill_type_domain CHECK (bill_type IN ({bill_types})),
          CONSTRAINT bill_origin_chamber CHECK (origin_chamber IN ({chambers}))
        );

        CREATE TABLE IF NOT EXISTS amendment (
          id INTEGER PRIMARY KEY,
          bill_id INTEGER NOT NULL REFERENCES bill(id) ON DELETE RESTRICT,
          amendment_type TEXT,
          number INTEGER,
          description TEXT,
          purpose TEXT,
          CONSTRAINT amendment_type_len CHECK (length(amendment_type) <= 200)
        );

        CREATE TABLE IF NOT EXISTS subject (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE,
          parent_id INTEGER REFERENCES subject(id) ON DELETE RESTRICT,
          CONSTRAINT subject_name_len CHECK (length(name) BETWEEN 1 AND 255),
          CONSTRAINT subject_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
        );

        CREATE TABLE IF NOT EXISTS committee (
          code TEXT PRIMARY KEY,
          name TEXT,
          chamber TEXT NOT NULL,
          parent_code TEXT REFERENCES committee(code) ON DELETE RESTRICT,
          CONSTRAINT committee_code_len CHECK (length(code) BETWEEN 1 AND 6),
          CONSTRAINT committee_name_len CHECK (length(name) <= 400),
          CONSTRAINT committee_chamber CHECK (chamber IN ({chambers})),
          CONSTRAINT committee_not_own_parent CHECK (parent_code IS NULL OR parent_code <> code)
        );

        CREATE TABLE IF NOT EXISTS sponsorship (
          politician_id INTEGER NOT NULL REFERENCES politician(id) ON DELETE RESTRICT,
          bill_id INTEGER NOT NULL REFERENCES bill(id) ON DELETE RESTRICT,
          date TEXT,
          date_withdrawn TEXT,
          is_original INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (politician_id, bill_id),
          CONSTRAINT sponsorship_withdrawn_after_date CHECK (date_withdrawn >= date)
        );

        CREATE TABLE IF NOT EXISTS committee_membership (
          committee_id TEXT NOT NULL REFERENCES committee(code) ON DELETE RESTRICT,
          politician_id INTEGER NOT NULL REFERENCES politician(id) ON DELETE RESTRICT,
          PRIMARY KEY (committee_id, politician_id)
        );

        CREATE TABLE IF NOT EXISTS bill_subject (
          bill_id INTEGER NOT NULL REFERENCES bill(id) ON DELETE RESTRICT,
          subject_id INTEGER NOT NULL REFERENCES subject(id) ON DELETE RESTRICT,
          status TEXT NOT NULL,
          PRIMARY KEY (bill_id, subject_id),
          CONSTRAINT bill_subject_status CHECK (status IN ({statuses}))
        );

        CREATE TABLE IF NOT EXISTS action (
          id INTEGER PRIMARY KEY,
          action_code TEXT NOT NULL,
          action_date TEXT,
          action_time TEXT,
          bill_id INTEGER NOT NULL REFERENCES bill(id) ON DELETE RESTRICT,
          committee_id TEXT REFERENCES committee(code) ON DELETE RESTRICT,
          text TEXT,
          source_system_code INTEGER,
          source_system_name TEXT,
          action_type TEXT,
          CONSTRAINT action_code_len CHECK (length(action_code) BETWEEN 1 AND 6),
          CONSTRAINT action_source_name_len CHECK (length(source_system_name) <= 20),
          CONSTRAINT action_type_len CHECK (length(action_type) <= 100)
        );

        CREATE INDEX IF NOT EXISTS idx_amendment_bill ON amendment(bill_id);
        CREATE INDEX IF NOT EXISTS idx_subject_parent ON subject(parent_id);
        CREATE INDEX IF NOT EXISTS idx_committee_parent ON committee(parent_code);
        CREATE INDEX IF NOT EXISTS idx_sponsorship_bill ON sponsorship(bill_id);
        CREATE INDEX IF NOT EXISTS idx_membership_politician ON committee_membership(politician_id);
        CREATE INDEX IF NOT EXISTS idx_bill_subject_subject ON bill_subject(subject_id);
        CREATE INDEX IF NOT EXISTS idx_action_bill ON action(bill_id);
        CREATE INDEX IF NOT EXISTS idx_action_committee ON action(committee_id);
        CREATE INDEX IF NOT EXISTS idx_action_date ON action(action_date);
        "#
    ))?;
    debug!("schema verified");
    Ok(())
}

/// Runs `write` in an IMMEDIATE transaction, or inside the caller's transaction if
/// one is already open. Nothing `write` did is visible unless it returns `Ok`.
pub(crate) fn atomically<T>(
    conn: &Connection,
    write: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    if !conn.is_autocommit() {
        return write(conn);
    }
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let outcome = write(&tx).and_then(|value| {
        tx.commit()?;
        Ok(value)
    });
    // Only the outermost call reports, so a rejection is logged once.
    if let Err(err) = &outcome {
        warn!(error = %err, "write rejected");
    }
    outcome
}

pub(crate) fn exists(conn: &Connection, sql: &str, key: impl ToSql) -> Result<bool> {
    Ok(conn
        .query_row(sql, [key], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn require(
    conn: &Connection,
    sql: &str,
    key: impl ToSql + Display,
    entity: &str,
) -> Result<()> {
    let label = key.to_string();
    if exists(conn, sql, key)? {
        Ok(())
    } else {
        Err(StoreError::missing(format!("{entity} {label} does not exist")))
    }
}

pub(crate) fn affected(changed: usize, entity: &'static str, key: impl ToString) -> Result<()> {
    if changed == 0 {
        return Err(StoreError::not_found(entity, key));
    }
    Ok(())
}

/// Walks parent links from `parent` to the root, failing if `key` is met on the way.
///
/// `parent_sql` selects the parent key of the row whose key is `?1`.
pub(crate) fn check_ancestors<K>(
    conn: &Connection,
    entity: &'static str,
    parent_sql: &str,
    key: &K,
    parent: Option<&K>,
) -> Result<()>
where
    K: ToSql + FromSql + Clone + Eq + Hash + Display,
{
    let Some(parent) = parent else {
        return Ok(());
    };
    let mut current = parent.clone();
    let mut seen = HashSet::new();
    loop {
        if &current == key {
            return Err(StoreError::CyclicHierarchyViolation {
                entity,
                key: key.to_string(),
            });
        }
        if !seen.insert(current.clone()) {
            // an existing loop not involving `key`; stored data predates the check
            return Ok(());
        }
        let next: Option<Option<K>> = conn
            .query_row(parent_sql, [&current], |row| row.get(0))
            .optional()?;
        match next {
            None => {
                return Err(StoreError::missing(format!(
                    "{entity} {current} does not exist"
                )));
            }
            Some(None) => return Ok(()),
            Some(Some(next)) => current = next,
        }
    }
}

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

pub(crate) fn date_to_sql(value: Option<Date>) -> rusqlite::Result<Option<String>> {
    value
        .map(|date| date.format(DATE_FORMAT))
        .transpose()
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

pub(crate) fn time_to_sql(value: Option<Time>) -> rusqlite::Result<Option<String>> {
    value
        .map(|time| time.format(TIME_FORMAT))
        .transpose()
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Date>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| Date::parse(&raw, DATE_FORMAT))
        .transpose()
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
        })
}

pub(crate) fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Time>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| Time::parse(&raw, TIME_FORMAT))
        .transpose()
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
        })
}

macro_rules! code_sql {
    ($($ty:ty),+) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.code().as_bytes())))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|err: StoreError| FromSqlError::Other(Box::new(err)))
                }
            }
        )+
    };
}

code_sql!(Chamber, BillType, SubjectStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 10);
    }

    #[test]
    fn open_creates_file_with_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trac.sqlite3");
        let conn = open(&path).unwrap();
        assert!(path.exists());
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn stored_codes_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        let code: String = conn
            .query_row("SELECT ?1", [BillType::SenateJointResolution], |row| row.get(0))
            .unwrap();
        assert_eq!(code, "SJRES");
        let chamber: Chamber = conn.query_row("SELECT 'SE'", [], |row| row.get(0)).unwrap();
        assert_eq!(chamber, Chamber::Senate);
        assert!(
            conn.query_row("SELECT 'XX'", [], |row| row.get::<_, Chamber>(0))
                .is_err()
        );
    }
    #[test]
    fn nested_write_joins_outer_transaction() {
        let conn = open_in_memory().unwrap();
        let err = atomically(&conn, |outer| {
            outer.execute(
                "INSERT INTO politician (id, name, chamber) VALUES (1, 'Jane Doe', 'HO')",
                [],
            )?;
            atomically(outer, |inner| {
                assert!(!inner.is_autocommit());
                Err::<(), _>(StoreError::missing("bill 9 does not exist"))
            })
        })
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ReferentialIntegrityViolation);
        assert!(conn.is_autocommit());
        let count: i64 = conn
            .query_row("SELECT count(*) FROM politician", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
