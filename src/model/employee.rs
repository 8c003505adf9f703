use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Longest nickname the device display can show.
pub const NICKNAME_MAX_CHARS: usize = 16;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Position {
    Staff,
    Supervisor,
    Manager,
    Director,
    Intern,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "uid": "A1B2C3D4",
        "name": "Budi Santoso",
        "nickname": "Budi",
        "gender": "Male",
        "position": "Staff",
        "status": "Active",
        "birthplace": "Bandung",
        "birthdate": "1990-05-17",
        "nik": "3273011705900001",
        "createdAt": "2025-01-02T08:00:00Z",
        "updatedAt": "2025-02-10T09:30:00Z"
    })
)]
pub struct Employee {
    /// Card UID reported by the RFID reader
    pub uid: String,
    pub name: String,
    pub nickname: String,
    pub gender: Option<String>,
    pub position: Option<String>,
    pub status: String,
    pub birthplace: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub birthdate: Option<NaiveDate>,
    pub nik: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Employee row as stored. Older rows may lack a nickname or status; see
/// `utils::normalize::normalize_employee` for how they are filled in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmployeeRow {
    pub uid: String,
    pub name: String,
    pub nickname: Option<String>,
    pub gender: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub birthplace: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub nik: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_enums_case_insensitively() {
        assert_eq!(Gender::from_str("female").unwrap(), Gender::Female);
        assert_eq!(Position::from_str("MANAGER").unwrap(), Position::Manager);
        assert_eq!(
            EmployeeStatus::from_str("inactive").unwrap(),
            EmployeeStatus::Inactive
        );
        assert!(Position::from_str("Janitor").is_err());
    }

    #[test]
    fn positions_round_trip_through_labels() {
        for position in Position::iter() {
            assert_eq!(Position::from_str(position.as_ref()).unwrap(), position);
        }
    }
}
