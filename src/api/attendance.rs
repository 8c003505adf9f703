use crate::{
    attendance::{
        aggregator::{
            AttendanceStore, DateSelector, StatusCount, filter_by_search, flatten_records,
            month_bounds, select_dates, summarize_statuses,
        },
        classifier::{CheckInStatus, StatusMismatch, audit_record},
    },
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::attendance::AttendanceRow,
    utils::{
        auto_absence::{AbsenceSweep, check_sweep_day, mark_absences},
        db_utils::{load_attendance, load_working_hours},
        photo_cache::{PhotoCache, PhotoDirection},
        time_fmt::{canonical_date_key, date_key, parse_date_key},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Single,
    Range,
    Month,
}

/// Date selection shared by the attendance table and the report export.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// `single` (default), `range` or `month`
    pub mode: Option<SelectionMode>,
    /// Day for `single`, defaults to today
    #[param(example = "2025-03-01")]
    pub date: Option<String>,
    #[param(example = "2025-03-01")]
    pub from: Option<String>,
    #[param(example = "2025-03-05")]
    pub to: Option<String>,
    /// Month for `month`, defaults to the current one
    #[param(example = "2025-03")]
    pub month: Option<String>,
    /// Case-insensitive search over name, position, status and absence details
    pub q: Option<String>,
}

/// Canonical form of a non-blank date parameter. Unparseable input is kept
/// (trimmed) so it matches nothing and the report export can reject it.
fn date_param(raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|d| !d.is_empty())?;
    Some(canonical_date_key(raw).unwrap_or_else(|| raw.to_string()))
}

impl AttendanceQuery {
    pub fn selector(&self, today: NaiveDate) -> DateSelector {
        match self.mode.unwrap_or_default() {
            SelectionMode::Single => DateSelector::Single(
                date_param(self.date.as_deref()).unwrap_or_else(|| date_key(today)),
            ),
            SelectionMode::Range => DateSelector::Range {
                from: date_param(self.from.as_deref()),
                to: date_param(self.to.as_deref()),
            },
            SelectionMode::Month => DateSelector::Month(
                self.month
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| today.format("%Y-%m").to_string()),
            ),
        }
    }

    pub fn search(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }
}

/// Loads only the days the selector can reach.
pub async fn load_selection(
    pool: &MySqlPool,
    selector: &DateSelector,
) -> Result<AttendanceStore, AppError> {
    match selector.bounds() {
        Some((from, to)) => Ok(load_attendance(pool, &from, &to).await?),
        None => Ok(AttendanceStore::new()),
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    parse_date_key(raw).ok_or_else(|| AppError::validation(format!("Invalid date: {}", raw)))
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(example = json!(["2025-03-01", "2025-03-03"]))]
    pub dates: Vec<String>,
    pub rows: Vec<AttendanceRow>,
}

/// List attendance rows for a date selection
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Selected dates and their rows", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    let selector = query.selector(today());
    debug!(selector = ?selector, "Listing attendance");

    let store = load_selection(pool.get_ref(), &selector).await?;
    let dates = select_dates(&selector, &store);
    let rows = filter_by_search(flatten_records(&dates, &store), query.search());
    debug!(loaded = store.len(), shown = rows.len(), "Attendance listed");

    Ok(HttpResponse::Ok().json(AttendanceListResponse { dates, rows }))
}

#[derive(Deserialize, ToSchema)]
pub struct AbsenceDetailsReq {
    /// Free-text reason; empty clears it
    #[schema(example = "Sakit")]
    pub absence_details: Option<String>,
}

/// Annotate an absent record
#[utoipa::path(
    put,
    path = "/api/attendance/{date}/{uid}/absence-details",
    params(
        ("date", Path, description = "Attendance date (YYYY-MM-DD)"),
        ("uid", Path, description = "Employee card UID")
    ),
    request_body = AbsenceDetailsReq,
    responses(
        (status = 200, description = "Saved", body = Object, example = json!({
            "message": "Absence details saved"
        })),
        (status = 400, description = "Record is not an absence"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No attendance record for that day")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_absence_details(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, String)>,
    body: web::Json<AbsenceDetailsReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let (date, uid) = path.into_inner();
    let date = date_key(parse_day(&date)?);

    let status = sqlx::query_scalar::<_, Option<String>>(
        "SELECT status FROM attendance WHERE date = ? AND uid = ?",
    )
    .bind(&date)
    .bind(&uid)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Attendance record not found"))?;

    let absent = status
        .as_deref()
        .and_then(|s| CheckInStatus::from_str(s.trim()).ok())
        == Some(CheckInStatus::Absent);
    if !absent {
        return Err(AppError::validation(
            "Absence details can only be set on absent records",
        ));
    }

    let details = body
        .absence_details
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    sqlx::query("UPDATE attendance SET absence_details = ? WHERE date = ? AND uid = ?")
        .bind(details)
        .bind(&date)
        .bind(&uid)
        .execute(pool.get_ref())
        .await?;

    info!(date = %date, uid = %uid, "Absence details saved");
    Ok(HttpResponse::Ok().json(json!({ "message": "Absence details saved" })))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    /// Defaults to today
    #[param(example = "2025-03-01")]
    pub date: Option<String>,
}

impl DayQuery {
    fn day(&self) -> Result<NaiveDate, AppError> {
        match self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => parse_day(raw),
            None => Ok(today()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuditResponse {
    #[schema(example = "2025-03-01")]
    pub date: String,
    pub checked: usize,
    pub mismatches: Vec<StatusMismatch>,
}

/// Recompute the labels written by the device for one day
#[utoipa::path(
    get,
    path = "/api/attendance/audit",
    params(DayQuery),
    responses(
        (status = 200, description = "Records whose labels disagree with the working hours", body = AuditResponse),
        (status = 400, description = "Invalid date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn audit_day(
    pool: web::Data<MySqlPool>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    let day = query.day()?;
    let key = date_key(day);
    let hours = load_working_hours(pool.get_ref()).await?;
    let store = load_attendance(pool.get_ref(), &key, &key).await?;
    let day_closed = day < today();

    let records = store.day(&key);
    let mismatches: Vec<StatusMismatch> = records
        .iter()
        .flat_map(|record| audit_record(record, &hours, day_closed))
        .collect();

    if !mismatches.is_empty() {
        warn!(date = %key, count = mismatches.len(), "Attendance labels disagree with working hours");
    }

    Ok(HttpResponse::Ok().json(AuditResponse {
        date: key,
        checked: records.len(),
        mismatches,
    }))
}

/// Download URL of an attendance photo
#[utoipa::path(
    get,
    path = "/api/attendance/{date}/{uid}/photo/{direction}",
    params(
        ("date", Path, description = "Attendance date (YYYY-MM-DD)"),
        ("uid", Path, description = "Employee card UID"),
        ("direction", Path, description = "`check-in` or `check-out`")
    ),
    responses(
        (status = 200, description = "Resolved URL, null when unavailable", body = Object, example = json!({
            "url": "https://firebasestorage.googleapis.com/v0/b/bucket/o/attendance%2F2025-03-01%2FA1B2C3D4_in.jpg?alt=media&token=abc"
        })),
        (status = 400, description = "Invalid date"),
        (status = 404, description = "No attendance record for that day")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn photo_url(
    pool: web::Data<MySqlPool>,
    photos: web::Data<PhotoCache>,
    path: web::Path<(String, String, PhotoDirection)>,
) -> Result<HttpResponse, AppError> {
    let (date, uid, direction) = path.into_inner();
    let date = date_key(parse_day(&date)?);

    let (image_in, image_out) = sqlx::query_as::<_, (Option<String>, Option<String>)>(
        "SELECT image_url, image_checkout FROM attendance WHERE date = ? AND uid = ?",
    )
    .bind(&date)
    .bind(&uid)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Attendance record not found"))?;

    let reference = match direction {
        PhotoDirection::CheckIn => image_in,
        PhotoDirection::CheckOut => image_out,
    };

    let url = match reference.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(reference) => photos.resolve(&date, &uid, direction, reference).await,
        None => None,
    };

    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

/// Mark every active employee without a record as absent
#[utoipa::path(
    post,
    path = "/api/attendance/auto-absence",
    params(DayQuery),
    responses(
        (status = 200, description = "Sweep result", body = AbsenceSweep),
        (status = 400, description = "Day has not closed yet"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn run_auto_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let day = query.day()?;
    let hours = load_working_hours(pool.get_ref()).await?;
    check_sweep_day(day, Local::now().naive_local(), hours.autocek)?;

    let sweep = mark_absences(pool.get_ref(), day, config.rest_weekday).await?;
    info!(
        date = %sweep.date,
        marked = sweep.marked,
        rest_day = sweep.rest_day,
        user = %auth.username,
        "Manual absence sweep"
    );

    Ok(HttpResponse::Ok().json(sweep))
}

#[derive(Serialize, ToSchema)]
pub struct DashboardSummary {
    #[schema(example = 42)]
    pub employees: i64,
    #[schema(example = "2025-03-01")]
    pub date: String,
    pub today: Vec<AttendanceRow>,
    #[schema(example = "2025-03")]
    pub month: String,
    pub month_statuses: Vec<StatusCount>,
}

/// Dashboard summary
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Employee count, today's rows and this month's check-in statuses", body = DashboardSummary)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn dashboard(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let today = today();
    let key = date_key(today);
    let month = today.format("%Y-%m").to_string();

    let employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool.get_ref())
        .await?;

    let (first, last) = month_bounds(&month)
        .ok_or_else(|| AppError::validation(format!("Invalid month: {}", month)))?;
    let store = load_attendance(pool.get_ref(), &date_key(first), &date_key(last)).await?;

    let today_rows = flatten_records(std::slice::from_ref(&key), &store);
    let month_dates = select_dates(&DateSelector::Month(month.clone()), &store);
    let month_statuses = summarize_statuses(&flatten_records(&month_dates, &store));

    Ok(HttpResponse::Ok().json(DashboardSummary {
        employees,
        date: key,
        today: today_rows,
        month,
        month_statuses,
    }))
}
