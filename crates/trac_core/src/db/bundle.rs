//! Multi-row writes that must land together or not at all.

use super::{
    actions_for_bill, amendments_for_bill, atomically, get_bill, insert_action, insert_amendment,
    insert_bill, insert_bill_subject, insert_committee, insert_committee_membership,
    insert_politician, insert_sponsorship, insert_subject, insert_user, sponsorships_for_bill,
    subjects_for_bill,
};
use crate::error::{Result, StoreError};
use crate::schema::{Bill, BillDetail, LegislativeBundle, Sponsorship};
use rusqlite::Connection;
use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::hash::Hash;
use std::path::Path;
use tracing::info;

/// Inserts a bill and its initial sponsors in one transaction.
pub fn insert_bill_with_sponsors(
    conn: &Connection,
    bill: &Bill,
    sponsorships: &[Sponsorship],
) -> Result<()> {
    atomically(conn, |conn| {
        insert_bill(conn, bill)?;
        for sponsorship in sponsorships {
            if sponsorship.bill_id != bill.id {
                return Err(StoreError::missing(format!(
                    "sponsorship names bill {} while inserting bill {}",
                    sponsorship.bill_id, bill.id
                )));
            }
            insert_sponsorship(conn, sponsorship)?;
        }
        Ok(())
    })
}

/// Reads a bundle from `.yaml`/`.yml` or JSON, chosen by extension.
pub fn read_bundle(path: &Path) -> Result<LegislativeBundle> {
    let raw = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str(&raw).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|err| err.to_string())
    };
    parsed.map_err(|message| StoreError::InvalidBundle {
        path: path.display().to_string(),
        message,
    })
}

/// Orders tree rows so every parent precedes its children.
///
/// Parents outside the batch are assumed to exist already. Rows left over form a
/// cycle among themselves.
fn parent_first<'a, T, K>(
    entity: &'static str,
    rows: &'a [T],
    key: impl Fn(&'a T) -> &'a K,
    parent: impl Fn(&'a T) -> Option<&'a K>,
) -> Result<Vec<&'a T>>
where
    K: Eq + Hash + Display + ?Sized + 'a,
{
    let batch: HashSet<&K> = rows.iter().map(&key).collect();
    let mut placed: HashSet<&K> = HashSet::new();
    let mut ordered = Vec::with_capacity(rows.len());
    let mut pending: Vec<&T> = rows.iter().collect();

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&row| {
            let ready = match parent(row) {
                Some(parent) => !batch.contains(parent) || placed.contains(parent),
                None => true,
            };
            if ready {
                placed.insert(key(row));
                ordered.push(row);
            }
            !ready
        });
        if pending.len() == before {
            return Err(StoreError::CyclicHierarchyViolation {
                entity,
                key: key(pending[0]).to_string(),
            });
        }
    }
    Ok(ordered)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
}

/// Writes a whole bundle atomically, leaves before the rows that reference them.
pub fn load_bundle(conn: &Connection, bundle: &LegislativeBundle) -> Result<LoadReport> {
    let subjects = parent_first(
        "subject",
        &bundle.subjects,
        |subject| &subject.id,
        |subject| subject.parent_id.as_ref(),
    )?;
    let committees = parent_first(
        "committee",
        &bundle.committees,
        |committee| committee.code.as_str(),
        |committee| committee.parent_code.as_deref(),
    )?;

    atomically(conn, |conn| {
        for subject in subjects {
            insert_subject(conn, subject)?;
        }
        for politician in &bundle.politicians {
            insert_politician(conn, politician)?;
        }
        for committee in committees {
            insert_committee(conn, committee)?;
        }
        for bill in &bundle.bills {
            insert_bill(conn, bill)?;
        }
        for amendment in &bundle.amendments {
            insert_amendment(conn, amendment)?;
        }
        for action in &bundle.actions {
            insert_action(conn, action)?;
        }
        for sponsorship in &bundle.sponsorships {
            insert_sponsorship(conn, sponsorship)?;
        }
        for membership in &bundle.committee_memberships {
            insert_committee_membership(conn, membership)?;
        }
        for link in &bundle.bill_subjects {
            insert_bill_subject(conn, link)?;
        }
        for user in &bundle.users {
            insert_user(conn, user)?;
        }
        Ok(())
    })?;

    let report = LoadReport {
        rows: bundle.row_count(),
    };
    info!(rows = report.rows, "bundle loaded");
    Ok(report)
}

/// A bill and everything derived from it, or `None` if the bill does not exist.
pub fn bill_detail(conn: &Connection, bill_id: i64) -> Result<Option<BillDetail>> {
    let Some(bill) = get_bill(conn, bill_id)? else {
        return Ok(None);
    };
    Ok(Some(BillDetail {
        bill,
        sponsorships: sponsorships_for_bill(conn, bill_id)?,
        subjects: subjects_for_bill(conn, bill_id)?,
        actions: actions_for_bill(conn, bill_id)?,
        amendments: amendments_for_bill(conn, bill_id)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::Chamber;
    use crate::error::ErrorKind;
    use crate::schema::{Committee, Subject};

    fn subject(id: i64, parent_id: Option<i64>) -> Subject {
        Subject {
            id,
            name: format!("subject {id}"),
            parent_id,
        }
    }

    #[test]
    fn children_listed_first_are_reordered() {
        let rows = vec![subject(3, Some(2)), subject(2, Some(1)), subject(1, None)];
        let ordered = parent_first("subject", &rows, |s| &s.id, |s| s.parent_id.as_ref()).unwrap();
        let ids: Vec<i64> = ordered.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn cycle_inside_batch_is_reported() {
        let committee = |code: &str, parent: &str| Committee {
            code: code.to_string(),
            name: None,
            chamber: Chamber::Senate,
            parent_code: Some(parent.to_string()),
        };
        let rows = vec![committee("SSAF", "SSAF13"), committee("SSAF13", "SSAF")];
        let err = parent_first(
            "committee",
            &rows,
            |c| c.code.as_str(),
            |c| c.parent_code.as_deref(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicHierarchyViolation);
    }
}
