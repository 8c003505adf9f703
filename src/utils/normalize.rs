//! Read-time normalization of legacy record shapes.
//!
//! Older employee entries may lack a nickname or status, or carry the name as
//! `fullname`. Older attendance entries nest check-in and check-out data in
//! `checkIn` / `checkOut` objects with a `type` field instead of a status. All
//! of that is mapped onto the current shapes here so nothing else has to care.

use crate::model::attendance::AttendanceRecord;
use crate::model::employee::{
    Employee, EmployeeRow, EmployeeStatus, Gender, NICKNAME_MAX_CHARS, Position,
};
use crate::utils::time_fmt::parse_calendar_day;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::str::FromStr;

/// First word of the name, cut to the nickname limit.
pub fn derive_nickname(name: &str) -> String {
    let first = name.split_whitespace().next().unwrap_or("");
    first.chars().take(NICKNAME_MAX_CHARS).collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn normalize_employee(row: EmployeeRow) -> Employee {
    let nickname = non_blank(row.nickname).unwrap_or_else(|| derive_nickname(&row.name));
    let status = non_blank(row.status)
        .and_then(|s| EmployeeStatus::from_str(&s).ok())
        .unwrap_or_default();

    Employee {
        uid: row.uid,
        name: row.name,
        nickname,
        gender: non_blank(row.gender),
        position: non_blank(row.position),
        status: status.to_string(),
        birthplace: non_blank(row.birthplace),
        birthdate: row.birthdate,
        nik: non_blank(row.nik),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    text(obj, &[key])
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Maps an exported employee entry onto an `Employee`. Entries without any
/// name are rejected. Unknown gender/position values are dropped rather than
/// stored.
pub fn employee_from_legacy(uid: &str, value: &Value) -> Option<Employee> {
    let obj = value.as_object()?;
    let name = text(obj, &["name", "fullname", "fullName"])?;

    let gender = text(obj, &["gender"])
        .and_then(|g| Gender::from_str(&g).ok())
        .map(|g| g.to_string());
    let position = text(obj, &["position"])
        .and_then(|p| Position::from_str(&p).ok())
        .map(|p| p.to_string());
    let nickname = text(obj, &["nickname"])
        .map(|n| n.chars().take(NICKNAME_MAX_CHARS).collect())
        .unwrap_or_else(|| derive_nickname(&name));
    let status = text(obj, &["status"])
        .and_then(|s| EmployeeStatus::from_str(&s).ok())
        .unwrap_or_default();

    Some(Employee {
        uid: uid.to_string(),
        nickname,
        gender,
        position,
        status: status.to_string(),
        birthplace: text(obj, &["birthplace"]),
        birthdate: text(obj, &["birthdate"]).and_then(|d| parse_calendar_day(&d)),
        nik: text(obj, &["nik"]),
        created_at: timestamp(obj, "createdAt"),
        updated_at: timestamp(obj, "updatedAt"),
        name,
    })
}

fn nested_text(part: Option<&Map<String, Value>>, keys: &[&str]) -> Option<String> {
    part.and_then(|p| text(p, keys))
}

/// Maps an exported attendance entry onto an `AttendanceRecord`, accepting
/// both the flat layout and the nested `checkIn`/`checkOut` layout.
pub fn attendance_from_legacy(uid: &str, value: &Value) -> Option<AttendanceRecord> {
    let obj = value.as_object()?;
    let check_in = obj.get("checkIn").and_then(Value::as_object);
    let check_out = obj.get("checkOut").and_then(Value::as_object);

    Some(AttendanceRecord {
        uid: uid.to_string(),
        name: text(obj, &["name"]).or_else(|| nested_text(check_in, &["name"])),
        position: text(obj, &["position"]),
        time: text(obj, &["time"]).or_else(|| nested_text(check_in, &["time"])),
        status: text(obj, &["status"]).or_else(|| nested_text(check_in, &["status", "type"])),
        time_checkout: text(obj, &["time_checkout"])
            .or_else(|| nested_text(check_out, &["time"])),
        status_checkout: text(obj, &["status_checkout"])
            .or_else(|| nested_text(check_out, &["status", "type"])),
        image_url: text(obj, &["imageUrl", "image_url"])
            .or_else(|| nested_text(check_in, &["imageUrl"])),
        image_checkout: text(obj, &["image_checkout"])
            .or_else(|| nested_text(check_out, &["imageUrl"])),
        absence_details: text(obj, &["absence_details"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(name: &str, nickname: Option<&str>, status: Option<&str>) -> EmployeeRow {
        EmployeeRow {
            uid: "A1".into(),
            name: name.into(),
            nickname: nickname.map(Into::into),
            gender: None,
            position: Some("Staff".into()),
            status: status.map(Into::into),
            birthplace: Some("  ".into()),
            birthdate: None,
            nik: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn nickname_falls_back_to_first_name() {
        let employee = normalize_employee(row("Budi Santoso", None, None));
        assert_eq!(employee.nickname, "Budi");
        assert_eq!(employee.status, "Active");
        assert_eq!(employee.birthplace, None);

        let kept = normalize_employee(row("Budi Santoso", Some("Bud"), Some("inactive")));
        assert_eq!(kept.nickname, "Bud");
        assert_eq!(kept.status, "Inactive");
    }

    #[test]
    fn derived_nickname_respects_limit() {
        assert_eq!(
            derive_nickname("Muhammadabdurrahmanwahid Putra"),
            "Muhammadabdurrah"
        );
        assert_eq!(derive_nickname(""), "");
    }

    #[test]
    fn legacy_employee_uses_fullname() {
        let value = json!({
            "fullname": "Siti Aminah",
            "gender": "female",
            "position": "Pilot",
            "createdAt": "2024-11-05T03:12:00.000Z"
        });
        let employee = employee_from_legacy("C3", &value).unwrap();
        assert_eq!(employee.name, "Siti Aminah");
        assert_eq!(employee.nickname, "Siti");
        assert_eq!(employee.gender.as_deref(), Some("Female"));
        assert_eq!(employee.position, None);
        assert!(employee.created_at.is_some());

        assert!(employee_from_legacy("D4", &json!({"gender": "Male"})).is_none());
    }

    #[test]
    fn legacy_attendance_accepts_nested_layout() {
        let value = json!({
            "checkIn": {"name": "Siti", "time": "07:55", "type": "Tepat Waktu"},
            "checkOut": {"time": "16:10", "type": "Tepat Waktu"}
        });
        let record = attendance_from_legacy("C3", &value).unwrap();
        assert_eq!(record.name.as_deref(), Some("Siti"));
        assert_eq!(record.time.as_deref(), Some("07:55"));
        assert_eq!(record.status.as_deref(), Some("Tepat Waktu"));
        assert_eq!(record.time_checkout.as_deref(), Some("16:10"));
    }

    #[test]
    fn flat_attendance_fields_win() {
        let value = json!({
            "name": "Budi",
            "time": "08:20:00",
            "status": "Terlambat",
            "imageUrl": "photos/a.jpg",
            "absence_details": ""
        });
        let record = attendance_from_legacy("A1", &value).unwrap();
        assert_eq!(record.status.as_deref(), Some("Terlambat"));
        assert_eq!(record.image_url.as_deref(), Some("photos/a.jpg"));
        assert_eq!(record.absence_details, None);
    }
}
