use crate::error::AppError;
use crate::utils::time_fmt::hhmm;
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimum gap between the end of the check-in window and the start of the
/// check-out window. Overlapping windows would make a tap ambiguous.
pub const MIN_WINDOW_SEPARATION_MINUTES: i64 = 3 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    #[schema(example = "07:00", value_type = String)]
    pub start: NaiveTime,

    #[serde(with = "hhmm")]
    #[schema(example = "08:00", value_type = String)]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn validate(&self, label: &str) -> Result<(), AppError> {
        if self.start > self.end {
            return Err(AppError::validation(format!(
                "{} start must not be later than its end",
                label
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub check_in: TimeWindow,
    pub check_out: TimeWindow,

    /// Time of day at which employees without a record are marked absent
    #[serde(with = "hhmm")]
    #[schema(example = "18:00", value_type = String)]
    pub autocek: NaiveTime,
}

impl Default for WorkingHours {
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
        Self {
            check_in: TimeWindow::new(at(7), at(8)),
            check_out: TimeWindow::new(at(16), at(17)),
            autocek: at(18),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct WorkingHoursRow {
    pub check_in_start: NaiveTime,
    pub check_in_end: NaiveTime,
    pub check_out_start: NaiveTime,
    pub check_out_end: NaiveTime,
    pub autocek: NaiveTime,
}

impl From<WorkingHoursRow> for WorkingHours {
    fn from(row: WorkingHoursRow) -> Self {
        Self {
            check_in: TimeWindow::new(row.check_in_start, row.check_in_end),
            check_out: TimeWindow::new(row.check_out_start, row.check_out_end),
            autocek: row.autocek,
        }
    }
}

/// Rejects a check-in window that ends less than three hours before the
/// check-out window starts.
pub fn validate_separation(check_in: &TimeWindow, check_out: &TimeWindow) -> Result<(), AppError> {
    let gap = check_out.start.signed_duration_since(check_in.end);
    if gap < TimeDelta::minutes(MIN_WINDOW_SEPARATION_MINUTES) {
        return Err(AppError::validation(
            "Check-in must end at least 3 hours before check-out starts",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn exactly_three_hours_is_accepted() {
        let check_in = TimeWindow::new(t(7, 0), t(9, 0));
        let check_out = TimeWindow::new(t(12, 0), t(17, 0));
        assert!(validate_separation(&check_in, &check_out).is_ok());
    }

    #[test]
    fn short_gap_is_rejected() {
        let check_in = TimeWindow::new(t(7, 0), t(9, 30));
        let check_out = TimeWindow::new(t(12, 0), t(17, 0));
        assert!(matches!(
            validate_separation(&check_in, &check_out),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let check_in = TimeWindow::new(t(13, 0), t(14, 0));
        let check_out = TimeWindow::new(t(8, 0), t(9, 0));
        assert!(validate_separation(&check_in, &check_out).is_err());
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(TimeWindow::new(t(9, 0), t(8, 0)).validate("Check-in").is_err());
        assert!(TimeWindow::new(t(8, 0), t(8, 0)).validate("Check-in").is_ok());
    }

    #[test]
    fn serializes_as_hours_and_minutes() {
        let json = serde_json::to_value(WorkingHours::default()).unwrap();
        assert_eq!(json["checkIn"]["start"], "07:00");
        assert_eq!(json["checkOut"]["end"], "17:00");
        assert_eq!(json["autocek"], "18:00");

        let parsed: WorkingHours = serde_json::from_value(serde_json::json!({
            "checkIn": {"start": "06:30", "end": "08:00:00"},
            "checkOut": {"start": "15:00", "end": "16:00"},
            "autocek": "19:15"
        }))
        .unwrap();
        assert_eq!(parsed.check_in.start, t(6, 30));
        assert_eq!(parsed.autocek, t(19, 15));
    }
}
