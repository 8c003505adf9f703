//! One-shot import of an export taken from the realtime store the device
//! used to write to.

use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        attendance::AttendanceRow,
        employee::Employee,
        holiday::Holiday,
        working_hours::{WorkingHours, validate_separation},
    },
    utils::{
        normalize::{attendance_from_legacy, employee_from_legacy},
        photo_cache::{PhotoCache, PhotoDirection},
        time_fmt::{canonical_date_key, parse_calendar_day},
    },
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::MySqlPool;
use std::collections::BTreeSet;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Default)]
pub struct ImportPlan {
    pub employees: Vec<Employee>,
    pub attendance: Vec<AttendanceRow>,
    pub holidays: Vec<Holiday>,
    pub working_hours: Option<WorkingHours>,
    pub unregistered: Vec<String>,
    pub skipped: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    pub employees: usize,
    pub attendance: usize,
    pub holidays: usize,
    pub working_hours: bool,
    pub unregistered: usize,
    /// Entries that could not be mapped (malformed dates, missing names)
    pub skipped: usize,
}

impl From<&ImportPlan> for ImportSummary {
    fn from(plan: &ImportPlan) -> Self {
        Self {
            employees: plan.employees.len(),
            attendance: plan.attendance.len(),
            holidays: plan.holidays.len(),
            working_hours: plan.working_hours.is_some(),
            unregistered: plan.unregistered.len(),
            skipped: plan.skipped,
        }
    }
}

fn entries<'a>(root: &'a Value, key: &str) -> impl Iterator<Item = (&'a String, &'a Value)> {
    root.get(key)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter())
}

/// Maps an export onto rows to upsert. Nothing is written here.
pub fn plan_import(root: &Value) -> ImportPlan {
    let mut plan = ImportPlan::default();

    for (uid, value) in entries(root, "employees") {
        match employee_from_legacy(uid, value) {
            Some(employee) => plan.employees.push(employee),
            None => {
                warn!(uid = %uid, "Skipping employee without a name");
                plan.skipped += 1;
            }
        }
    }

    for (date, day) in entries(root, "attendance") {
        let records = day.as_object();
        let Some(key) = canonical_date_key(date) else {
            warn!(date = %date, "Skipping attendance under a malformed date");
            plan.skipped += records.map_or(1, |r| r.len().max(1));
            continue;
        };
        for (uid, value) in records.into_iter().flat_map(|r| r.iter()) {
            match attendance_from_legacy(uid, value) {
                Some(record) => plan.attendance.push(AttendanceRow {
                    date: key.clone(),
                    record,
                }),
                None => plan.skipped += 1,
            }
        }
    }

    for (id, value) in entries(root, "holidays") {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let date = value
            .get("date")
            .and_then(Value::as_str)
            .and_then(parse_calendar_day);
        match (name, date) {
            (Some(name), Some(date)) => plan.holidays.push(Holiday {
                id: id.clone(),
                name: name.to_string(),
                date,
            }),
            _ => {
                warn!(id = %id, "Skipping malformed holiday");
                plan.skipped += 1;
            }
        }
    }

    if let Some(value) = root.get("workingHours") {
        match serde_json::from_value::<WorkingHours>(value.clone()) {
            Ok(hours)
                if hours.check_in.validate("Check-in").is_ok()
                    && hours.check_out.validate("Check-out").is_ok()
                    && validate_separation(&hours.check_in, &hours.check_out).is_ok() =>
            {
                plan.working_hours = Some(hours)
            }
            _ => {
                warn!("Skipping invalid working hours");
                plan.skipped += 1;
            }
        }
    }

    let registered: BTreeSet<&str> = plan.employees.iter().map(|e| e.uid.as_str()).collect();
    let mut pending = BTreeSet::new();
    if let Some(uids) = root.get("unregisteredUids") {
        let values: Vec<&Value> = match uids {
            Value::Object(map) => map.values().collect(),
            Value::Array(items) => items.iter().collect(),
            _ => Vec::new(),
        };
        for uid in values.into_iter().filter_map(Value::as_str).map(str::trim) {
            if !uid.is_empty() && !registered.contains(uid) {
                pending.insert(uid.to_string());
            }
        }
    }
    plan.unregistered = pending.into_iter().collect();

    plan
}

/// Import a legacy export
#[utoipa::path(
    post,
    path = "/api/import",
    request_body(content = Object, description = "Export with `employees`, `attendance`, `holidays`, `workingHours` and `unregisteredUids`"),
    responses(
        (status = 200, description = "Rows upserted", body = ImportSummary),
        (status = 400, description = "Payload is not an object"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Import"
)]
pub async fn import_legacy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    photos: web::Data<PhotoCache>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    if !body.is_object() {
        return Err(AppError::validation("Export must be a JSON object"));
    }

    let plan = plan_import(&body);
    let mut tx = pool.begin().await?;

    for e in &plan.employees {
        sqlx::query(
            r#"
            INSERT INTO employees
            (uid, name, nickname, gender, position, status, birthplace, birthdate, nik, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name), nickname = VALUES(nickname), gender = VALUES(gender),
                position = VALUES(position), status = VALUES(status),
                birthplace = VALUES(birthplace), birthdate = VALUES(birthdate), nik = VALUES(nik),
                created_at = COALESCE(created_at, VALUES(created_at)),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&e.uid)
        .bind(&e.name)
        .bind(&e.nickname)
        .bind(&e.gender)
        .bind(&e.position)
        .bind(&e.status)
        .bind(&e.birthplace)
        .bind(e.birthdate)
        .bind(&e.nik)
        .bind(e.created_at)
        .bind(e.updated_at.or(e.created_at).unwrap_or_else(Utc::now))
        .execute(&mut *tx)
        .await?;
    }

    for row in &plan.attendance {
        let r = &row.record;
        sqlx::query(
            r#"
            INSERT INTO attendance
            (date, uid, name, position, check_in_time, status, check_out_time, status_checkout,
             image_url, image_checkout, absence_details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name), position = VALUES(position),
                check_in_time = VALUES(check_in_time), status = VALUES(status),
                check_out_time = VALUES(check_out_time), status_checkout = VALUES(status_checkout),
                image_url = VALUES(image_url), image_checkout = VALUES(image_checkout),
                absence_details = VALUES(absence_details)
            "#,
        )
        .bind(&row.date)
        .bind(&r.uid)
        .bind(&r.name)
        .bind(&r.position)
        .bind(&r.time)
        .bind(&r.status)
        .bind(&r.time_checkout)
        .bind(&r.status_checkout)
        .bind(&r.image_url)
        .bind(&r.image_checkout)
        .bind(&r.absence_details)
        .execute(&mut *tx)
        .await?;
    }

    for h in &plan.holidays {
        sqlx::query(
            r#"
            INSERT INTO holidays (id, name, date) VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE name = VALUES(name), date = VALUES(date)
            "#,
        )
        .bind(&h.id)
        .bind(&h.name)
        .bind(h.date)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(hours) = &plan.working_hours {
        sqlx::query(
            r#"
            INSERT INTO working_hours
            (id, check_in_start, check_in_end, check_out_start, check_out_end, autocek)
            VALUES (1, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                check_in_start = VALUES(check_in_start), check_in_end = VALUES(check_in_end),
                check_out_start = VALUES(check_out_start), check_out_end = VALUES(check_out_end),
                autocek = VALUES(autocek)
            "#,
        )
        .bind(hours.check_in.start)
        .bind(hours.check_in.end)
        .bind(hours.check_out.start)
        .bind(hours.check_out.end)
        .bind(hours.autocek)
        .execute(&mut *tx)
        .await?;
    }

    let seen_at = Utc::now();
    for uid in &plan.unregistered {
        sqlx::query(
            r#"
            INSERT INTO unregistered_uids (uid, seen_at)
            SELECT ?, ? FROM DUAL
            WHERE NOT EXISTS (SELECT 1 FROM employees WHERE uid = ?)
            ON DUPLICATE KEY UPDATE seen_at = seen_at
            "#,
        )
        .bind(uid)
        .bind(seen_at)
        .bind(uid)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    // imported rows may carry different photo references
    for row in &plan.attendance {
        for direction in [PhotoDirection::CheckIn, PhotoDirection::CheckOut] {
            photos
                .invalidate(&row.date, &row.record.uid, direction)
                .await;
        }
    }

    let summary = ImportSummary::from(&plan);
    info!(
        employees = summary.employees,
        attendance = summary.attendance,
        holidays = summary.holidays,
        skipped = summary.skipped,
        user = %auth.username,
        "Legacy export imported"
    );
    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export() -> Value {
        json!({
            "employees": {
                "A1": {"name": "Budi Santoso", "gender": "Male", "position": "Staff"},
                "B2": {"fullname": "Siti Aminah"},
                "C3": {"gender": "Female"}
            },
            "attendance": {
                "2025-03-03": {
                    "A1": {"time": "07:50", "status": "Tepat Waktu"},
                    "B2": {"checkIn": {"time": "08:20", "type": "Terlambat"}}
                },
                "03-03-2025": {
                    "A1": {"time": "07:50"},
                    "B2": {"time": "07:51"}
                }
            },
            "holidays": {
                "h1": {"name": "Nyepi", "date": "2025-03-29T00:00:00.000Z"},
                "h2": {"name": "", "date": "2025-04-01"}
            },
            "workingHours": {
                "checkIn": {"start": "07:00", "end": "08:00"},
                "checkOut": {"start": "16:00", "end": "17:00"},
                "autocek": "18:00"
            },
            "unregisteredUids": {"-Nx1": "Z9", "-Nx2": "A1", "-Nx3": "Z9"}
        })
    }

    #[test]
    fn maps_legacy_shapes_and_counts_skips() {
        let plan = plan_import(&export());

        assert_eq!(plan.employees.len(), 2);
        assert_eq!(plan.attendance.len(), 2);
        assert_eq!(plan.holidays.len(), 1);
        assert!(plan.working_hours.is_some());
        // C3 (no name), the malformed day (two entries), h2 (no name)
        assert_eq!(plan.skipped, 4);

        let late = plan
            .attendance
            .iter()
            .find(|row| row.record.uid == "B2")
            .unwrap();
        assert_eq!(late.record.status.as_deref(), Some("Terlambat"));
    }

    #[test]
    fn attendance_is_stored_under_padded_dates() {
        let plan = plan_import(&json!({
            "attendance": {
                "2025-3-1": {"A1": {"time": "07:50", "status": "Tepat Waktu"}}
            }
        }));
        assert_eq!(plan.skipped, 0);
        assert_eq!(plan.attendance.len(), 1);
        assert_eq!(plan.attendance[0].date, "2025-03-01");
    }

    #[test]
    fn pending_uids_exclude_imported_employees() {
        let plan = plan_import(&export());
        assert_eq!(plan.unregistered, vec!["Z9".to_string()]);
    }

    #[test]
    fn overlapping_working_hours_are_skipped() {
        let plan = plan_import(&json!({
            "workingHours": {
                "checkIn": {"start": "07:00", "end": "14:00"},
                "checkOut": {"start": "16:00", "end": "17:00"},
                "autocek": "18:00"
            }
        }));
        assert!(plan.working_hours.is_none());
        assert_eq!(plan.skipped, 1);
    }

    #[test]
    fn empty_export_plans_nothing() {
        let plan = plan_import(&json!({}));
        let summary = ImportSummary::from(&plan);
        assert_eq!(summary.employees + summary.attendance + summary.skipped, 0);
        assert!(!summary.working_hours);
    }
}
