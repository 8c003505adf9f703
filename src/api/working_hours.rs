use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::working_hours::{TimeWindow, WorkingHours, validate_separation},
    utils::{db_utils::load_working_hours, time_fmt::hhmm},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct AutocekReq {
    #[serde(with = "hhmm")]
    #[schema(example = "18:00", value_type = String)]
    pub autocek: NaiveTime,
}

/// One independently saved part of the working-hours settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    CheckIn(TimeWindow),
    CheckOut(TimeWindow),
    Autocek(NaiveTime),
}

impl Section {
    fn columns(&self) -> &'static [&'static str] {
        match self {
            Section::CheckIn(_) => &["check_in_start", "check_in_end"],
            Section::CheckOut(_) => &["check_out_start", "check_out_end"],
            Section::Autocek(_) => &["autocek"],
        }
    }
}

/// Applies a section to the stored settings, validating it against the
/// section it has to stay apart from.
fn apply_section(current: &WorkingHours, section: Section) -> Result<WorkingHours, AppError> {
    let mut next = *current;
    match section {
        Section::CheckIn(window) => {
            window.validate("Check-in")?;
            validate_separation(&window, &current.check_out)?;
            next.check_in = window;
        }
        Section::CheckOut(window) => {
            window.validate("Check-out")?;
            validate_separation(&current.check_in, &window)?;
            next.check_out = window;
        }
        Section::Autocek(at) => next.autocek = at,
    }
    Ok(next)
}

async fn save_section(pool: &MySqlPool, section: Section) -> Result<WorkingHours, AppError> {
    let mut tx = pool.begin().await?;

    // serialize concurrent saves of the singleton row
    sqlx::query("SELECT id FROM working_hours WHERE id = 1 FOR UPDATE")
        .execute(&mut *tx)
        .await?;
    let current = load_working_hours(&mut *tx).await?;
    let next = apply_section(&current, section)?;

    let updates = section
        .columns()
        .iter()
        .map(|c| format!("{0} = VALUES({0})", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO working_hours \
         (id, check_in_start, check_in_end, check_out_start, check_out_end, autocek) \
         VALUES (1, ?, ?, ?, ?, ?) ON DUPLICATE KEY UPDATE {}",
        updates
    );

    sqlx::query(&sql)
        .bind(next.check_in.start)
        .bind(next.check_in.end)
        .bind(next.check_out.start)
        .bind(next.check_out.end)
        .bind(next.autocek)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(section = ?section, "Working hours saved");
    Ok(next)
}

/// Current working hours
#[utoipa::path(
    get,
    path = "/api/working-hours",
    responses((status = 200, description = "Working hours", body = WorkingHours)),
    security(("bearer_auth" = [])),
    tag = "Working Hours"
)]
pub async fn get_working_hours(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(load_working_hours(pool.get_ref()).await?))
}

/// Save the check-in window
#[utoipa::path(
    put,
    path = "/api/working-hours/check-in",
    request_body = TimeWindow,
    responses(
        (status = 200, description = "Saved settings", body = WorkingHours),
        (status = 400, description = "Window invalid or too close to check-out"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Working Hours"
)]
pub async fn save_check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<TimeWindow>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let saved = save_section(pool.get_ref(), Section::CheckIn(body.into_inner())).await?;
    Ok(HttpResponse::Ok().json(saved))
}

/// Save the check-out window
#[utoipa::path(
    put,
    path = "/api/working-hours/check-out",
    request_body = TimeWindow,
    responses(
        (status = 200, description = "Saved settings", body = WorkingHours),
        (status = 400, description = "Window invalid or too close to check-in"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Working Hours"
)]
pub async fn save_check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<TimeWindow>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let saved = save_section(pool.get_ref(), Section::CheckOut(body.into_inner())).await?;
    Ok(HttpResponse::Ok().json(saved))
}

/// Save the automatic absence time
#[utoipa::path(
    put,
    path = "/api/working-hours/autocek",
    request_body = AutocekReq,
    responses(
        (status = 200, description = "Saved settings", body = WorkingHours),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Working Hours"
)]
pub async fn save_autocek(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<AutocekReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let saved = save_section(pool.get_ref(), Section::Autocek(body.autocek)).await?;
    Ok(HttpResponse::Ok().json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn check_in_is_validated_against_stored_check_out() {
        let current = WorkingHours::default();

        let ok = apply_section(&current, Section::CheckIn(TimeWindow::new(t(6, 30), t(13, 0))))
            .unwrap();
        assert_eq!(ok.check_in.end, t(13, 0));
        assert_eq!(ok.check_out, current.check_out);

        let too_close = Section::CheckIn(TimeWindow::new(t(7, 0), t(13, 1)));
        assert!(matches!(
            apply_section(&current, too_close),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn check_out_is_validated_against_stored_check_in() {
        let current = WorkingHours::default();
        let too_early = Section::CheckOut(TimeWindow::new(t(10, 59), t(17, 0)));
        assert!(apply_section(&current, too_early).is_err());

        let inverted = Section::CheckOut(TimeWindow::new(t(17, 0), t(16, 0)));
        assert!(apply_section(&current, inverted).is_err());
    }

    #[test]
    fn autocek_only_touches_its_column() {
        let current = WorkingHours::default();
        let section = Section::Autocek(t(19, 30));
        let next = apply_section(&current, section).unwrap();
        assert_eq!(next.autocek, t(19, 30));
        assert_eq!(next.check_in, current.check_in);
        assert_eq!(section.columns(), &["autocek"]);
    }

    #[test]
    fn autocek_accepts_hh_mm() {
        let req: AutocekReq = serde_json::from_str(r#"{"autocek":"17:45"}"#).unwrap();
        assert_eq!(req.autocek, t(17, 45));
    }
}
