//! Error types for the legislative store.

use rusqlite::ffi;
use thiserror::Error;

/// Store operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store errors. The first five variants are integrity failures surfaced at write time.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {table}.{column}")]
    UniqueConstraintViolation { table: String, column: String },

    #[error("referential integrity violated: {0}")]
    ReferentialIntegrityViolation(String),

    #[error("value {value:?} is outside the domain of {field}")]
    DomainConstraintViolation { field: String, value: String },

    #[error("{entity} {key} cannot be its own ancestor")]
    CyclicHierarchyViolation { entity: &'static str, key: String },

    #[error("association already exists in {table}: {key}")]
    DuplicateAssociationViolation { table: String, key: String },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid bundle {path}: {message}")]
    InvalidBundle { path: String, message: String },
}

/// Discriminant of [`StoreError`], for callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UniqueConstraintViolation,
    ReferentialIntegrityViolation,
    DomainConstraintViolation,
    CyclicHierarchyViolation,
    DuplicateAssociationViolation,
    NotFound,
    Sqlite,
    Io,
    Config,
    InvalidBundle,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UniqueConstraintViolation { .. } => ErrorKind::UniqueConstraintViolation,
            StoreError::ReferentialIntegrityViolation(_) => ErrorKind::ReferentialIntegrityViolation,
            StoreError::DomainConstraintViolation { .. } => ErrorKind::DomainConstraintViolation,
            StoreError::CyclicHierarchyViolation { .. } => ErrorKind::CyclicHierarchyViolation,
            StoreError::DuplicateAssociationViolation { .. } => {
                ErrorKind::DuplicateAssociationViolation
            }
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Sqlite(_) => ErrorKind::Sqlite,
            StoreError::Io(_) => ErrorKind::Io,
            StoreError::Config(_) => ErrorKind::Config,
            StoreError::InvalidBundle { .. } => ErrorKind::InvalidBundle,
        }
    }

    pub fn domain(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DomainConstraintViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::ReferentialIntegrityViolation(what.into())
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    /// Maps SQLite constraint failures onto the integrity taxonomy.
    ///
    /// Messages look like `UNIQUE constraint failed: users.email` or
    /// `CHECK constraint failed: bill_type_domain`.
    fn from(err: rusqlite::Error) -> Self {
        let (extended_code, message) = match &err {
            rusqlite::Error::SqliteFailure(
                ffi::Error {
                    code: ffi::ErrorCode::ConstraintViolation,
                    extended_code,
                },
                message,
            ) => (*extended_code, message.clone().unwrap_or_default()),
            _ => return StoreError::Sqlite(err),
        };
        let detail = message
            .split_once(": ")
            .map(|(_, detail)| detail.to_string())
            .unwrap_or_else(|| message.clone());

        match extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                let columns: Vec<&str> = detail.split(", ").collect();
                let table = columns
                    .first()
                    .and_then(|column| column.split_once('.'))
                    .map(|(table, _)| table.to_string())
                    .unwrap_or_default();
                let names: Vec<&str> = columns
                    .iter()
                    .map(|column| column.split_once('.').map_or(*column, |(_, name)| name))
                    .collect();
                if names.len() > 1 {
                    StoreError::DuplicateAssociationViolation {
                        table,
                        key: names.join(", "),
                    }
                } else {
                    StoreError::UniqueConstraintViolation {
                        table,
                        column: names.join(""),
                    }
                }
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreError::ReferentialIntegrityViolation(detail),
            // ON DELETE RESTRICT fires as a trigger constraint.
            ffi::SQLITE_CONSTRAINT_TRIGGER
                if message.starts_with("FOREIGN KEY constraint failed") =>
            {
                StoreError::missing("row is still referenced")
            }
            ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                StoreError::DomainConstraintViolation {
                    field: detail,
                    value: String::new(),
                }
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn failing(sql: &str) -> StoreError {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT UNIQUE,
              CONSTRAINT name_len CHECK (length(name) <= 3));
            CREATE TABLE link (a INTEGER NOT NULL REFERENCES parent(id) ON DELETE RESTRICT,
              b INTEGER NOT NULL, PRIMARY KEY (a, b));
            INSERT INTO parent (id, name) VALUES (1, 'one');
            INSERT INTO link (a, b) VALUES (1, 1);
            "#,
        )
        .unwrap();
        conn.execute_batch(sql).unwrap_err().into()
    }

    #[test]
    fn classifies_single_column_unique() {
        let err = failing("INSERT INTO parent (id, name) VALUES (2, 'one')");
        match err {
            StoreError::UniqueConstraintViolation { table, column } => {
                assert_eq!(table, "parent");
                assert_eq!(column, "name");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classifies_composite_key_as_duplicate_association() {
        let err = failing("INSERT INTO link (a, b) VALUES (1, 1)");
        assert_eq!(err.kind(), ErrorKind::DuplicateAssociationViolation);
    }

    #[test]
    fn classifies_foreign_key_and_check() {
        let err = failing("INSERT INTO link (a, b) VALUES (9, 1)");
        assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);

        let err = failing("INSERT INTO parent (id, name) VALUES (3, 'four')");
        match err {
            StoreError::DomainConstraintViolation { field, .. } => assert_eq!(field, "name_len"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn restricted_delete_of_referenced_parent_is_referential() {
        let err = failing("DELETE FROM parent WHERE id = 1");
        assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    }

    #[test]
    fn other_errors_pass_through() {
        let err = failing("SELECT * FROM nowhere");
        assert_eq!(err.kind(), ErrorKind::Sqlite);
    }
}
