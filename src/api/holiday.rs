use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::holiday::Holiday,
    utils::{db_utils::load_holidays, time_fmt::parse_calendar_day},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "Hari Raya Nyepi")]
    pub name: String,
    /// Calendar day; a trailing time part is ignored
    #[schema(example = "2025-03-29")]
    pub date: String,
}

fn new_holiday(payload: &CreateHoliday) -> Result<Holiday, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Holiday name is required"));
    }
    let date = parse_calendar_day(&payload.date)
        .ok_or_else(|| AppError::validation(format!("Invalid date: {}", payload.date)))?;

    Ok(Holiday {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        date,
    })
}

/// List holidays
#[utoipa::path(
    get,
    path = "/api/holidays",
    responses((status = 200, description = "Holidays ordered by date", body = [Holiday])),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn list_holidays(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let holidays = load_holidays(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(holidays))
}

/// Add a holiday
#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 400, description = "Missing name or invalid date"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateHoliday>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let holiday = new_holiday(&payload)?;

    sqlx::query("INSERT INTO holidays (id, name, date) VALUES (?, ?, ?)")
        .bind(&holiday.id)
        .bind(&holiday.name)
        .bind(holiday.date)
        .execute(pool.get_ref())
        .await?;

    info!(id = %holiday.id, date = %holiday.date, "Holiday added");
    Ok(HttpResponse::Created().json(holiday))
}

/// Remove a holiday
#[utoipa::path(
    delete,
    path = "/api/holidays/{id}",
    params(("id", Path, description = "Holiday id")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Holiday not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Holiday"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(&id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Holiday not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn holiday_dates_drop_time_part() {
        let holiday = new_holiday(&CreateHoliday {
            name: " Nyepi ".into(),
            date: "2025-03-29T00:00:00.000Z".into(),
        })
        .unwrap();
        assert_eq!(holiday.name, "Nyepi");
        assert_eq!(holiday.date, NaiveDate::from_ymd_opt(2025, 3, 29).unwrap());
        assert!(Uuid::parse_str(&holiday.id).is_ok());
    }

    #[test]
    fn holidays_need_name_and_date() {
        let missing_name = CreateHoliday {
            name: "  ".into(),
            date: "2025-03-29".into(),
        };
        assert!(matches!(new_holiday(&missing_name), Err(AppError::Validation(_))));

        let bad_date = CreateHoliday {
            name: "Nyepi".into(),
            date: "29/03/2025".into(),
        };
        assert!(matches!(new_holiday(&bad_date), Err(AppError::Validation(_))));
    }
}
