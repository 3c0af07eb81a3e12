//! Enumerated domains shared across entities, plus the advisory action-code table.
//!
//! Each enumeration is stored in the database by its short code (`HO`, `HRES`,
//! `PRI`, ...). Parsing any other string fails with a domain violation.

use crate::error::StoreError;
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chamber of Congress. Used by politicians, bills (origin) and committees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    pub const ALL: [Chamber; 2] = [Chamber::House, Chamber::Senate];

    pub fn code(self) -> &'static str {
        match self {
            Chamber::House => "HO",
            Chamber::Senate => "SE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Chamber::House => "House",
            Chamber::Senate => "Senate",
        }
    }
}

impl FromStr for Chamber {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chamber::ALL
            .into_iter()
            .find(|chamber| chamber.code() == s)
            .ok_or_else(|| StoreError::domain("chamber", s))
    }
}

/// Legislation type, as printed in bill identifiers (`H.R. 1` is `H`, `S.J.Res. 3` is `SJRES`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BillType {
    House,
    Senate,
    HouseResolution,
    SenateResolution,
    HouseJointResolution,
    SenateJointResolution,
    HouseConcurrentResolution,
    SenateConcurrentResolution,
}

impl BillType {
    pub const ALL: [BillType; 8] = [
        BillType::House,
        BillType::Senate,
        BillType::HouseResolution,
        BillType::SenateResolution,
        BillType::HouseJointResolution,
        BillType::SenateJointResolution,
        BillType::HouseConcurrentResolution,
        BillType::SenateConcurrentResolution,
    ];

    pub fn code(self) -> &'static str {
        match self {
            BillType::House => "H",
            BillType::Senate => "S",
            BillType::HouseResolution => "HRES",
            BillType::SenateResolution => "SRES",
            BillType::HouseJointResolution => "HJRES",
            BillType::SenateJointResolution => "SJRES",
            BillType::HouseConcurrentResolution => "HCONRES",
            BillType::SenateConcurrentResolution => "SCONRES",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BillType::House => "House bill",
            BillType::Senate => "Senate bill",
            BillType::HouseResolution => "House resolution",
            BillType::SenateResolution => "Senate resolution",
            BillType::HouseJointResolution => "House joint resolution",
            BillType::SenateJointResolution => "Senate joint resolution",
            BillType::HouseConcurrentResolution => "House concurrent resolution",
            BillType::SenateConcurrentResolution => "Senate concurrent resolution",
        }
    }

    /// Chamber a measure of this type is introduced in.
    pub fn chamber(self) -> Chamber {
        match self {
            BillType::House
            | BillType::HouseResolution
            | BillType::HouseJointResolution
            | BillType::HouseConcurrentResolution => Chamber::House,
            _ => Chamber::Senate,
        }
    }
}

impl FromStr for BillType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillType::ALL
            .into_iter()
            .find(|bill_type| bill_type.code() == s)
            .ok_or_else(|| StoreError::domain("bill_type", s))
    }
}

/// Whether a subject is the policy area of a bill or one of its secondary terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubjectStatus {
    Primary,
    Secondary,
}

impl SubjectStatus {
    pub const ALL: [SubjectStatus; 2] = [SubjectStatus::Primary, SubjectStatus::Secondary];

    pub fn code(self) -> &'static str {
        match self {
            SubjectStatus::Primary => "PRI",
            SubjectStatus::Secondary => "SEC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubjectStatus::Primary => "Primary",
            SubjectStatus::Secondary => "Secondary",
        }
    }
}

impl FromStr for SubjectStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| StoreError::domain("status", s))
    }
}

macro_rules! code_conversions {
    ($($ty:ident),+) => {
        $(
            impl JsonSchema for $ty {
                fn schema_name() -> String {
                    stringify!($ty).to_string()
                }

                fn json_schema(_: &mut SchemaGenerator) -> Schema {
                    SchemaObject {
                        instance_type: Some(InstanceType::String.into()),
                        enum_values: Some($ty::ALL.iter().map(|value| value.code().into()).collect()),
                        ..Default::default()
                    }
                    .into()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.code())
                }
            }

            impl TryFrom<String> for $ty {
                type Error = StoreError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.code().to_string()
                }
            }
        )+
    };
}

code_conversions!(Chamber, BillType, SubjectStatus);

/// Procedural action codes from the GPO bill-status user guide.
///
/// The list is known to be incomplete. Codes outside it are still stored.
pub const ACTION_CODES: &[(&str, &str)] = &[
    ("B00100", "Sponsor introductory remarks on measure"),
    ("E20000", "Presented to President"),
    ("E30000", "Signed by President"),
    ("E40000", "Became Public Law No: 114-47"),
    ("H11100", "Referred to the Committee"),
    ("H11200", "Sequential committee referral"),
    ("H12100", "Committee report of an original measure"),
    ("H12200", "Committee reported"),
    ("H12300", "Committee discharged"),
    ("H12410", "Union Calendar assignment"),
    ("H14000", "Received in the House"),
    ("H15000", "Held at the desk"),
    ("H17000", "Motion to Discharge Committee"),
    ("H1L210", "Rule provides for consideration of"),
    ("H25200", "Conference report [free text] filed"),
    ("H37300", "Final Passage Under Suspension of the Rules Results"),
    ("H38310", "Motion To Reconsider Results"),
    ("H30000", "Consideration by House"),
    ("H8D000", "DEBATE"),
    ("H81000", "Point of order against a motion"),
    ("1000", "Introduced in House"),
    ("2000", "Referred to House committee"),
    ("5000", "Reported to House"),
    ("8000", "Passed/agreed to in House"),
    ("10000", "Introduced in Senate"),
    ("11000", "Referred to Senate committee"),
    ("13100", "Senate committee/subcommittee hearings"),
    ("13200", "Senate committee/subcommittee markups"),
    ("14000", "Reported to Senate"),
    ("14500", "Senate committee discharged"),
    ("14900", "Senate committee report filed after reporting"),
    ("17000", "Passed/agreed to in Senate"),
    ("28000", "Presented to President."),
    ("36000", "Became Public Law"),
];

pub fn action_code_description(code: &str) -> Option<&'static str> {
    ACTION_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
}

pub fn is_known_action_code(code: &str) -> bool {
    action_code_description(code).is_some()
}
