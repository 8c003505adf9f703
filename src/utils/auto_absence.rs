use crate::attendance::aggregator::is_rest_day;
use crate::attendance::classifier::{CheckInStatus, CheckOutStatus};
use crate::error::AppError;
use crate::utils::db_utils::{load_holidays, load_working_hours};
use crate::utils::time_fmt::date_key;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use sqlx::MySqlPool;
use std::time::Duration;
use utoipa::ToSchema;

const TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, ToSchema)]
pub struct AbsenceSweep {
    #[schema(example = "2025-03-03")]
    pub date: String,
    pub rest_day: bool,
    #[schema(example = 3)]
    pub marked: u64,
}

/// Writes an absence record for every active employee that has no record on
/// `date`. Existing records are never touched; rest days are skipped.
pub async fn mark_absences(
    pool: &MySqlPool,
    date: NaiveDate,
    rest_weekday: Weekday,
) -> Result<AbsenceSweep, AppError> {
    let key = date_key(date);
    let holidays = load_holidays(pool).await?;
    if is_rest_day(date, &holidays, rest_weekday) {
        return Ok(AbsenceSweep {
            date: key,
            rest_day: true,
            marked: 0,
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (date, uid, name, position, status, status_checkout)
        SELECT ?, e.uid, e.name, e.position, ?, ?
        FROM employees e
        WHERE (e.status IS NULL OR e.status = 'Active')
        AND NOT EXISTS (
            SELECT 1 FROM attendance a WHERE a.date = ? AND a.uid = e.uid
        )
        ORDER BY e.created_at, e.uid
        "#,
    )
    .bind(&key)
    .bind(CheckInStatus::Absent.to_string())
    .bind(CheckOutStatus::Absent.to_string())
    .bind(&key)
    .execute(pool)
    .await?;

    Ok(AbsenceSweep {
        date: key,
        rest_day: false,
        marked: result.rows_affected(),
    })
}

/// Whether the daily sweep should run now. It runs once per day, at or after
/// the configured `autocek` time.
fn sweep_due(now: NaiveTime, autocek: NaiveTime, today: NaiveDate, last_run: Option<NaiveDate>) -> bool {
    now >= autocek && last_run != Some(today)
}

/// Rejects sweeping a day that has not closed yet: future days always, and
/// today before the `autocek` time.
pub fn check_sweep_day(day: NaiveDate, now: NaiveDateTime, autocek: NaiveTime) -> Result<(), AppError> {
    let today = now.date();
    if day > today {
        return Err(AppError::validation(format!(
            "Cannot mark absences for a future date: {}",
            date_key(day)
        )));
    }
    if day == today && now.time() < autocek {
        return Err(AppError::validation(format!(
            "Absences for today can be marked from {}",
            autocek.format("%H:%M")
        )));
    }
    Ok(())
}

/// Background loop that runs the absence sweep at the `autocek` time.
pub async fn run_scheduler(pool: MySqlPool, rest_weekday: Weekday) {
    let mut last_run: Option<NaiveDate> = None;
    let mut ticker = actix_web::rt::time::interval(TICK);

    loop {
        ticker.tick().await;

        let hours = match load_working_hours(&pool).await {
            Ok(h) => h,
            Err(e) => {
                log::error!("Auto absence: failed to load working hours: {}", e);
                continue;
            }
        };

        let now = Local::now();
        let today = now.date_naive();
        if !sweep_due(now.time(), hours.autocek, today, last_run) {
            continue;
        }

        match mark_absences(&pool, today, rest_weekday).await {
            Ok(sweep) => {
                last_run = Some(today);
                log::info!(
                    "Auto absence complete for {}: {} employees marked absent (rest day: {})",
                    sweep.date,
                    sweep.marked,
                    sweep.rest_day
                );
            }
            Err(e) => log::error!("Auto absence failed for {}: {}", today, e),
        }
    }
}
