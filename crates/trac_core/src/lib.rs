//! Relational model of United States federal legislation: bills, amendments,
//! sponsors, committees, legislative subjects and procedural actions.
//!
//! Integrity (uniqueness, foreign keys, enumerated domains, acyclic hierarchies,
//! association keys) is enforced at write time by [`db`], backed by SQLite
//! constraints.
//!
//! ```rust,ignore
//! use trac_core::{db, schema::Committee, codes::Chamber};
//!
//! let conn = db::open("trac.sqlite3")?;
//! db::insert_committee(&conn, &Committee {
//!     code: "HSAG".into(),
//!     name: Some("Agriculture".into()),
//!     chamber: Chamber::House,
//!     parent_code: None,
//! })?;
//! ```

pub mod codes;
pub mod config;
pub mod db;
pub mod error;
pub mod schema;

pub use error::{ErrorKind, Result, StoreError};
