use crate::codes::{self, BillType, Chamber, SubjectStatus};
use crate::error::{Result as StoreResult, StoreError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::{Date, Time};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(iso_time, Time, "[hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub id: i64,
    pub username: Option<String>, // unique when present
    pub email: Option<String>,    // unique when present
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Politician {
    pub id: i64,
    pub name: String,
    pub website: Option<String>,
    pub chamber: Chamber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bill {
    pub id: i64,
    #[serde(with = "iso_date")]
    #[schemars(with = "String")]
    pub introduced: Date,
    pub congress: Option<i64>, // e.g. 117
    pub number: Option<i64>,   // sequence within congress and type
    pub title: String,
    pub bill_type: BillType,
    pub origin_chamber: Chamber,
}

/// An amendment always targets a bill. Amendments to amendments are not modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Amendment {
    pub id: i64,
    pub bill_id: i64,
    pub amendment_type: Option<String>,
    pub number: Option<i64>,
    pub description: Option<String>,
    pub purpose: Option<String>,
}

/// Legislative subject term. Roughly 1,000 issue, entity and geographic terms,
/// arranged as a tree through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Committee {
    pub code: String, // e.g. "HSAG", subcommittees "HSAG01"
    pub name: Option<String>,
    pub chamber: Chamber,
    pub parent_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sponsorship {
    pub politician_id: i64,
    pub bill_id: i64,
    #[serde(with = "iso_date::option", default)]
    #[schemars(with = "Option<String>")]
    pub date: Option<Date>,
    #[serde(with = "iso_date::option", default)]
    #[schemars(with = "Option<String>")]
    pub date_withdrawn: Option<Date>,
    #[serde(default)]
    pub is_original: bool,
}

impl Sponsorship {
    pub fn is_withdrawn(&self) -> bool {
        self.date_withdrawn.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommitteeMembership {
    pub committee_id: String,
    pub politician_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BillSubject {
    pub bill_id: i64,
    pub subject_id: i64,
    pub status: SubjectStatus,
}

/// A dated procedural event on a bill, optionally attributed to a committee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    pub id: i64,
    pub action_code: String,
    #[serde(with = "iso_date::option", default)]
    #[schemars(with = "Option<String>")]
    pub action_date: Option<Date>,
    #[serde(with = "iso_time::option", default)]
    #[schemars(with = "Option<String>")]
    pub action_time: Option<Time>,
    pub bill_id: i64,
    pub committee_id: Option<String>,
    pub text: Option<String>,
    pub source_system_code: Option<i64>,
    pub source_system_name: Option<String>,
    /// Legislative process stage or category condensing more detailed actions.
    pub action_type: Option<String>,
}

impl Action {
    pub fn description(&self) -> Option<&'static str> {
        codes::action_code_description(&self.action_code)
    }
}

/// Every entity kind in one document, for bulk loads from YAML or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LegislativeBundle {
    pub users: Vec<User>,
    pub politicians: Vec<Politician>,
    pub subjects: Vec<Subject>,
    pub committees: Vec<Committee>,
    pub bills: Vec<Bill>,
    pub amendments: Vec<Amendment>,
    pub actions: Vec<Action>,
    pub sponsorships: Vec<Sponsorship>,
    pub committee_memberships: Vec<CommitteeMembership>,
    pub bill_subjects: Vec<BillSubject>,
}

impl LegislativeBundle {
    pub fn row_count(&self) -> usize {
        self.users.len()
            + self.politicians.len()
            + self.subjects.len()
            + self.committees.len()
            + self.bills.len()
            + self.amendments.len()
            + self.actions.len()
            + self.sponsorships.len()
            + self.committee_memberships.len()
            + self.bill_subjects.len()
    }
}

/// A bill together with the rows that reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BillDetail {
    pub bill: Bill,
    pub sponsorships: Vec<Sponsorship>,
    pub subjects: Vec<BillSubject>,
    pub actions: Vec<Action>,
    pub amendments: Vec<Amendment>,
}

// Column widths carried over from the legislative feeds.
pub const USERNAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 120;
pub const NAME_MAX: usize = 255;
pub const TITLE_MAX: usize = 1000;
pub const CODE_MAX: usize = 6;
pub const COMMITTEE_NAME_MAX: usize = 400;
pub const AMENDMENT_TYPE_MAX: usize = 200;
pub const SOURCE_SYSTEM_NAME_MAX: usize = 20;
pub const ACTION_TYPE_MAX: usize = 100;

fn check_len(field: &str, value: &str, max: usize) -> StoreResult<()> {
    if value.chars().count() > max {
        return Err(StoreError::domain(field, value));
    }
    Ok(())
}

fn check_opt_len(field: &str, value: Option<&str>, max: usize) -> StoreResult<()> {
    value.map_or(Ok(()), |value| check_len(field, value, max))
}

fn check_required(field: &str, value: &str, max: usize) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::domain(field, value));
    }
    check_len(field, value, max)
}

impl User {
    pub fn validate(&self) -> StoreResult<()> {
        check_opt_len("username", self.username.as_deref(), USERNAME_MAX)?;
        check_opt_len("email", self.email.as_deref(), EMAIL_MAX)
    }
}

impl Politician {
    pub fn validate(&self) -> StoreResult<()> {
        check_required("name", &self.name, NAME_MAX)?;
        check_opt_len("website", self.website.as_deref(), NAME_MAX)
    }
}

impl Bill {
    pub fn validate(&self) -> StoreResult<()> {
        check_required("title", &self.title, TITLE_MAX)
    }
}

impl Amendment {
    pub fn validate(&self) -> StoreResult<()> {
        check_opt_len("amendment_type", self.amendment_type.as_deref(), AMENDMENT_TYPE_MAX)
    }
}

impl Subject {
    pub fn validate(&self) -> StoreResult<()> {
        check_required("name", &self.name, NAME_MAX)
    }
}

impl Committee {
    pub fn validate(&self) -> StoreResult<()> {
        check_required("code", &self.code, CODE_MAX)?;
        check_opt_len("name", self.name.as_deref(), COMMITTEE_NAME_MAX)?;
        check_opt_len("parent_code", self.parent_code.as_deref(), CODE_MAX)
    }
}

impl Sponsorship {
    pub fn validate(&self) -> StoreResult<()> {
        match (self.date, self.date_withdrawn) {
            (Some(date), Some(withdrawn)) if withdrawn < date => {
                Err(StoreError::domain("date_withdrawn", withdrawn.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl Action {
    pub fn validate(&self) -> StoreResult<()> {
        check_required("action_code", &self.action_code, CODE_MAX)?;
        check_opt_len("committee_id", self.committee_id.as_deref(), CODE_MAX)?;
        check_opt_len(
            "source_system_name",
            self.source_system_name.as_deref(),
            SOURCE_SYSTEM_NAME_MAX,
        )?;
        check_opt_len("action_type", self.action_type.as_deref(), ACTION_TYPE_MAX)
    }
}
