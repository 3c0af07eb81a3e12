use rusqlite::Connection;
use time::macros::{date, time};
use trac_core::codes::{BillType, Chamber, SubjectStatus};
use trac_core::db;
use trac_core::schema::{
    Action, Amendment, Bill, BillSubject, Committee, CommitteeMembership, LegislativeBundle,
    Politician, Sponsorship, Subject, User,
};
use trac_core::ErrorKind;

fn conn() -> Connection {
    db::open_in_memory().unwrap()
}

fn test_bill(id: i64) -> Bill {
    Bill {
        id,
        introduced: date!(2021 - 01 - 05),
        congress: Some(117),
        number: Some(id),
        title: "Test Act".to_string(),
        bill_type: BillType::House,
        origin_chamber: Chamber::House,
    }
}

fn jane() -> Politician {
    Politician {
        id: 1,
        name: "Jane Doe".to_string(),
        website: None,
        chamber: Chamber::House,
    }
}

fn committee(code: &str, parent: Option<&str>) -> Committee {
    Committee {
        code: code.to_string(),
        name: Some("Agriculture".to_string()),
        chamber: Chamber::House,
        parent_code: parent.map(str::to_string),
    }
}

fn subject(id: i64, name: &str, parent_id: Option<i64>) -> Subject {
    Subject {
        id,
        name: name.to_string(),
        parent_id,
    }
}

fn sponsorship(politician_id: i64, bill_id: i64) -> Sponsorship {
    Sponsorship {
        politician_id,
        bill_id,
        date: Some(date!(2021 - 01 - 05)),
        date_withdrawn: None,
        is_original: true,
    }
}

#[test]
fn sponsorship_scenario() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_politician(&conn, &jane()).unwrap();
    db::insert_sponsorship(&conn, &sponsorship(1, 1)).unwrap();

    let err = db::insert_sponsorship(&conn, &sponsorship(1, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateAssociationViolation);
    assert_eq!(db::sponsorships_for_bill(&conn, 1).unwrap().len(), 1);
}

#[test]
fn committee_cycle_scenario() {
    let conn = conn();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_committee(&conn, &committee("HSAG01", Some("HSAG"))).unwrap();

    let err = db::update_committee(&conn, &committee("HSAG", Some("HSAG01"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicHierarchyViolation);
    assert_eq!(db::get_committee(&conn, "HSAG").unwrap().unwrap().parent_code, None);
}

#[test]
fn committee_moves_under_unrelated_committee() {
    let conn = conn();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_committee(&conn, &committee("HSAG01", Some("HSAG"))).unwrap();
    db::insert_committee(&conn, &committee("SSFI", None)).unwrap();

    db::update_committee(&conn, &committee("HSAG", Some("SSFI"))).unwrap();
    let moved = db::get_committee(&conn, "HSAG").unwrap().unwrap();
    assert_eq!(moved.parent_code.as_deref(), Some("SSFI"));
    let codes: Vec<String> = db::subcommittees(&conn, "SSFI")
        .unwrap()
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(codes, vec!["HSAG".to_string()]);
}

#[test]
fn hierarchy_rejects_self_and_descendants_but_accepts_unrelated() {
    let conn = conn();
    db::insert_subject(&conn, &subject(1, "Agriculture and food", None)).unwrap();
    db::insert_subject(&conn, &subject(2, "Agricultural trade", Some(1))).unwrap();
    db::insert_subject(&conn, &subject(3, "Dairy exports", Some(2))).unwrap();
    db::insert_subject(&conn, &subject(4, "Taxation", None)).unwrap();

    let self_parent = db::update_subject(&conn, &subject(1, "Agriculture and food", Some(1)));
    assert_eq!(self_parent.unwrap_err().kind(), ErrorKind::CyclicHierarchyViolation);

    let grandchild = db::update_subject(&conn, &subject(1, "Agriculture and food", Some(3)));
    assert_eq!(grandchild.unwrap_err().kind(), ErrorKind::CyclicHierarchyViolation);

    let new_self_parent = db::insert_subject(&conn, &subject(5, "Loops", Some(5)));
    assert_eq!(new_self_parent.unwrap_err().kind(), ErrorKind::CyclicHierarchyViolation);

    db::update_subject(&conn, &subject(1, "Agriculture and food", Some(4))).unwrap();
    let ancestors: Vec<i64> = db::subject_ancestors(&conn, 3)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ancestors, vec![2, 1, 4]);

    let err = db::insert_committee(&conn, &committee("HSAG01", Some("HSAG01"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicHierarchyViolation);
}

#[test]
fn missing_parent_is_referential_violation() {
    let conn = conn();
    let err = db::insert_subject(&conn, &subject(2, "Orphan", Some(99))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::insert_committee(&conn, &committee("SSFI02", Some("SSFI"))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
}

#[test]
fn children_are_derived_from_parent_index() {
    let conn = conn();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_committee(&conn, &committee("HSAG22", Some("HSAG"))).unwrap();
    db::insert_committee(&conn, &committee("HSAG03", Some("HSAG"))).unwrap();
    let codes: Vec<String> = db::subcommittees(&conn, "HSAG")
        .unwrap()
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(codes, vec!["HSAG03", "HSAG22"]);

    db::insert_subject(&conn, &subject(1, "Energy", None)).unwrap();
    db::insert_subject(&conn, &subject(2, "Solar energy", Some(1))).unwrap();
    assert_eq!(db::subject_children(&conn, 1).unwrap(), vec![subject(2, "Solar energy", Some(1))]);
}

#[test]
fn unique_columns_reject_second_insert() {
    let conn = conn();
    let user = |id: i64, username: &str, email: &str| User {
        id,
        username: Some(username.to_string()),
        email: Some(email.to_string()),
    };
    db::insert_user(&conn, &user(1, "jdoe", "jdoe@example.com")).unwrap();

    let err = db::insert_user(&conn, &user(2, "jdoe", "other@example.com")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
    let err = db::insert_user(&conn, &user(3, "other", "jdoe@example.com")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);

    db::insert_subject(&conn, &subject(1, "Taxation", None)).unwrap();
    let err = db::insert_subject(&conn, &subject(2, "Taxation", None)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
}

#[test]
fn associations_require_both_ends() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_politician(&conn, &jane()).unwrap();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_subject(&conn, &subject(1, "Agriculture and food", None)).unwrap();

    let err = db::insert_sponsorship(&conn, &sponsorship(9, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::insert_sponsorship(&conn, &sponsorship(1, 9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);

    let membership = |code: &str, politician_id: i64| CommitteeMembership {
        committee_id: code.to_string(),
        politician_id,
    };
    let err = db::insert_committee_membership(&conn, &membership("SSFI", 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::insert_committee_membership(&conn, &membership("HSAG", 9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);

    let link = |bill_id: i64, subject_id: i64| BillSubject {
        bill_id,
        subject_id,
        status: SubjectStatus::Primary,
    };
    let err = db::insert_bill_subject(&conn, &link(9, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::insert_bill_subject(&conn, &link(1, 9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
}

#[test]
fn associations_reject_duplicate_pairs() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_politician(&conn, &jane()).unwrap();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_subject(&conn, &subject(1, "Agriculture and food", None)).unwrap();

    let membership = CommitteeMembership {
        committee_id: "HSAG".to_string(),
        politician_id: 1,
    };
    db::insert_committee_membership(&conn, &membership).unwrap();
    let err = db::insert_committee_membership(&conn, &membership).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateAssociationViolation);

    let link = BillSubject {
        bill_id: 1,
        subject_id: 1,
        status: SubjectStatus::Primary,
    };
    db::insert_bill_subject(&conn, &link).unwrap();
    let secondary = BillSubject {
        status: SubjectStatus::Secondary,
        ..link.clone()
    };
    let err = db::insert_bill_subject(&conn, &secondary).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateAssociationViolation);

    assert_eq!(db::members_of_committee(&conn, "HSAG").unwrap(), vec![jane()]);
    assert_eq!(db::committees_of_politician(&conn, 1).unwrap().len(), 1);
}

#[test]
fn out_of_domain_codes_are_rejected_by_the_store() {
    let conn = conn();
    let err = conn
        .execute(
            "INSERT INTO bill (id, introduced, title, bill_type, origin_chamber) \
             VALUES (1, '2021-01-05', 'Test Act', 'HR', 'HO')",
            [],
        )
        .map_err(trac_core::StoreError::from)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);

    let err = conn
        .execute(
            "INSERT INTO politician (id, name, chamber) VALUES (1, 'Jane Doe', 'XX')",
            [],
        )
        .map_err(trac_core::StoreError::from)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);

    let err = conn
        .execute(
            "INSERT INTO committee (code, name, chamber) VALUES ('HSAG', 'Agriculture', 'XX')",
            [],
        )
        .map_err(trac_core::StoreError::from)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);

    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_subject(&conn, &subject(1, "Agriculture and food", None)).unwrap();
    let err = conn
        .execute(
            "INSERT INTO bill_subject (bill_id, subject_id, status) VALUES (1, 1, 'TER')",
            [],
        )
        .map_err(trac_core::StoreError::from)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);
    assert!(db::subjects_for_bill(&conn, 1).unwrap().is_empty());

    let bundle = r#"{"bills": [{"id": 1, "introduced": "2021-01-05", "congress": 117,
        "number": 1, "title": "Test Act", "bill_type": "HR", "origin_chamber": "HO"}]}"#;
    assert!(serde_json::from_str::<LegislativeBundle>(bundle).is_err());
}

#[test]
fn required_text_and_lengths_are_enforced() {
    let conn = conn();
    let untitled = Bill {
        title: "  ".to_string(),
        ..test_bill(1)
    };
    let err = db::insert_bill(&conn, &untitled).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);

    let long_code = Action {
        action_code: "H1110000".to_string(),
        ..action(1, 1)
    };
    let err = db::insert_action(&conn, &long_code).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);
}

fn action(id: i64, bill_id: i64) -> Action {
    Action {
        id,
        action_code: "H11100".to_string(),
        action_date: Some(date!(2021 - 01 - 05)),
        action_time: Some(time!(12:30:00)),
        bill_id,
        committee_id: Some("HSAG".to_string()),
        text: Some("Referred to the House Committee on Agriculture.".to_string()),
        source_system_code: Some(2),
        source_system_name: Some("House floor actions".to_string()),
        action_type: Some("IntroReferral".to_string()),
    }
}

#[test]
fn entities_read_back_equal() {
    let conn = conn();
    let user = User {
        id: 1,
        username: Some("jdoe".to_string()),
        email: None,
    };
    let politician = Politician {
        website: Some("https://doe.house.gov".to_string()),
        ..jane()
    };
    let bill = test_bill(1);
    let parent = committee("HSAG", None);
    let child = committee("HSAG01", Some("HSAG"));
    let root = subject(1, "Agriculture and food", None);
    let leaf = subject(2, "Agricultural trade", Some(1));
    let amendment = Amendment {
        id: 1,
        bill_id: 1,
        amendment_type: Some("HAMDT".to_string()),
        number: Some(12),
        description: Some("Strikes section 3.".to_string()),
        purpose: None,
    };
    let sponsorship = Sponsorship {
        date_withdrawn: Some(date!(2021 - 02 - 01)),
        ..sponsorship(1, 1)
    };
    let link = BillSubject {
        bill_id: 1,
        subject_id: 2,
        status: SubjectStatus::Secondary,
    };
    let membership = CommitteeMembership {
        committee_id: "HSAG01".to_string(),
        politician_id: 1,
    };
    let action = action(1, 1);

    db::insert_user(&conn, &user).unwrap();
    db::insert_politician(&conn, &politician).unwrap();
    db::insert_bill(&conn, &bill).unwrap();
    db::insert_committee(&conn, &parent).unwrap();
    db::insert_committee(&conn, &child).unwrap();
    db::insert_subject(&conn, &root).unwrap();
    db::insert_subject(&conn, &leaf).unwrap();
    db::insert_amendment(&conn, &amendment).unwrap();
    db::insert_sponsorship(&conn, &sponsorship).unwrap();
    db::insert_bill_subject(&conn, &link).unwrap();
    db::insert_committee_membership(&conn, &membership).unwrap();
    db::insert_action(&conn, &action).unwrap();

    assert_eq!(db::get_user(&conn, 1).unwrap(), Some(user));
    assert_eq!(db::get_politician(&conn, 1).unwrap(), Some(politician));
    assert_eq!(db::get_bill(&conn, 1).unwrap(), Some(bill));
    assert_eq!(db::get_committee(&conn, "HSAG01").unwrap(), Some(child));
    assert_eq!(db::get_subject(&conn, 2).unwrap(), Some(leaf));
    assert_eq!(db::get_amendment(&conn, 1).unwrap(), Some(amendment));
    assert_eq!(db::get_sponsorship(&conn, 1, 1).unwrap(), Some(sponsorship));
    assert_eq!(db::get_bill_subject(&conn, 1, 2).unwrap(), Some(link));
    assert_eq!(
        db::get_committee_membership(&conn, "HSAG01", 1).unwrap(),
        Some(membership)
    );
    assert_eq!(db::get_action(&conn, 1).unwrap(), Some(action));
}

#[test]
fn withdrawal_must_not_precede_sponsorship() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_politician(&conn, &jane()).unwrap();
    db::insert_sponsorship(&conn, &sponsorship(1, 1)).unwrap();

    let err = db::withdraw_sponsorship(&conn, 1, 1, date!(2020 - 12 - 31)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintViolation);

    db::withdraw_sponsorship(&conn, 1, 1, date!(2021 - 03 - 15)).unwrap();
    let stored = db::get_sponsorship(&conn, 1, 1).unwrap().unwrap();
    assert_eq!(stored.date_withdrawn, Some(date!(2021 - 03 - 15)));
    assert!(stored.is_withdrawn());

    let err = db::withdraw_sponsorship(&conn, 1, 2, date!(2021 - 03 - 15)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deletes_are_restricted_while_referenced() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    db::insert_politician(&conn, &jane()).unwrap();
    db::insert_sponsorship(&conn, &sponsorship(1, 1)).unwrap();

    let err = db::delete_bill(&conn, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::delete_politician(&conn, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);

    db::delete_sponsorship(&conn, 1, 1).unwrap();
    db::delete_bill(&conn, 1).unwrap();
    db::delete_politician(&conn, 1).unwrap();
    assert_eq!(db::get_bill(&conn, 1).unwrap(), None);

    let err = db::delete_bill(&conn, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn parents_cannot_be_deleted_under_their_children() {
    let conn = conn();
    db::insert_committee(&conn, &committee("HSAG", None)).unwrap();
    db::insert_committee(&conn, &committee("HSAG01", Some("HSAG"))).unwrap();
    db::insert_subject(&conn, &subject(1, "Agriculture and food", None)).unwrap();
    db::insert_subject(&conn, &subject(2, "Agricultural trade", Some(1))).unwrap();

    let err = db::delete_committee(&conn, "HSAG").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    let err = db::delete_subject(&conn, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    assert!(db::get_committee(&conn, "HSAG").unwrap().is_some());

    db::delete_committee(&conn, "HSAG01").unwrap();
    db::delete_committee(&conn, "HSAG").unwrap();
    db::delete_subject(&conn, 2).unwrap();
    db::delete_subject(&conn, 1).unwrap();
}

#[test]
fn unknown_action_codes_are_stored() {
    let conn = conn();
    db::insert_bill(&conn, &test_bill(1)).unwrap();
    let unlisted = Action {
        action_code: "Z99999".to_string(),
        committee_id: None,
        ..action(1, 1)
    };
    db::insert_action(&conn, &unlisted).unwrap();
    let stored = db::get_action(&conn, 1).unwrap().unwrap();
    assert_eq!(stored.description(), None);
    assert_eq!(db::actions_for_bill(&conn, 1).unwrap(), vec![unlisted]);
}

#[test]
fn bill_with_sponsors_is_all_or_nothing() {
    let conn = conn();
    db::insert_politician(&conn, &jane()).unwrap();

    let err =
        db::insert_bill_with_sponsors(&conn, &test_bill(1), &[sponsorship(1, 1), sponsorship(7, 1)])
            .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferentialIntegrityViolation);
    assert_eq!(db::get_bill(&conn, 1).unwrap(), None);

    db::insert_bill_with_sponsors(&conn, &test_bill(1), &[sponsorship(1, 1)]).unwrap();
    let detail = db::bill_detail(&conn, 1).unwrap().unwrap();
    assert_eq!(detail.sponsorships, vec![sponsorship(1, 1)]);
}

#[test]
fn bundle_load_rolls_back_on_failure() {
    let conn = conn();
    let mut bundle = LegislativeBundle {
        politicians: vec![jane()],
        bills: vec![test_bill(1)],
        committees: vec![committee("HSAG01", Some("HSAG")), committee("HSAG", None)],
        subjects: vec![subject(2, "Agricultural trade", Some(1)), subject(1, "Agriculture", None)],
        sponsorships: vec![sponsorship(1, 1), sponsorship(1, 1)],
        ..LegislativeBundle::default()
    };
    let err = db::load_bundle(&conn, &bundle).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateAssociationViolation);
    assert_eq!(db::get_politician(&conn, 1).unwrap(), None);
    assert_eq!(db::get_committee(&conn, "HSAG").unwrap(), None);

    bundle.sponsorships.pop();
    let report = db::load_bundle(&conn, &bundle).unwrap();
    assert_eq!(report.rows, 7);
    assert_eq!(db::subcommittees(&conn, "HSAG").unwrap().len(), 1);
}

#[test]
fn yaml_bundle_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.yaml");
    std::fs::write(
        &path,
        r#"
politicians:
  - id: 1
    name: Jane Doe
    website: null
    chamber: HO
bills:
  - id: 1
    introduced: 2021-01-05
    congress: 117
    number: 1
    title: Test Act
    bill_type: H
    origin_chamber: HO
sponsorships:
  - politician_id: 1
    bill_id: 1
    date: 2021-01-05
    is_original: true
"#,
    )
    .unwrap();

    let conn = db::open(dir.path().join("trac.sqlite3")).unwrap();
    let bundle = db::read_bundle(&path).unwrap();
    db::load_bundle(&conn, &bundle).unwrap();
    assert_eq!(db::sponsorships_for_politician(&conn, 1).unwrap(), vec![sponsorship(1, 1)]);
}

#[test]
fn bundle_with_unknown_bill_type_is_an_invalid_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.json");
    std::fs::write(
        &path,
        r#"{"bills": [{"id": 1, "introduced": "2021-01-05", "congress": 117,
            "number": 1, "title": "Test Act", "bill_type": "HR", "origin_chamber": "HO"}]}"#,
    )
    .unwrap();

    let err = db::read_bundle(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBundle);
    assert!(err.to_string().contains("bill_type"));
}
