//! Status labels for check-in and check-out events.
//!
//! Labels normally arrive pre-computed from the recording device. The rules
//! here are the ones the device is expected to follow; the dashboard uses them
//! to audit stored records and to write absence records.

use crate::model::attendance::AttendanceRecord;
use crate::model::working_hours::{TimeWindow, WorkingHours};
use crate::utils::time_fmt::parse_time_of_day;
use chrono::NaiveTime;
use serde::Serialize;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum CheckInStatus {
    #[strum(to_string = "Lebih Awal", serialize = "Early")]
    Early,
    #[strum(to_string = "Tepat Waktu", serialize = "On Time", serialize = "On-Time")]
    OnTime,
    #[strum(to_string = "Terlambat", serialize = "Late")]
    Late,
    #[strum(to_string = "Tidak Hadir", serialize = "Absent")]
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum CheckOutStatus {
    #[strum(to_string = "Lebih Awal", serialize = "Early")]
    Early,
    #[strum(to_string = "Tepat Waktu", serialize = "On Time", serialize = "On-Time")]
    OnTime,
    #[strum(to_string = "Lembur", serialize = "Overtime")]
    Overtime,
    #[strum(
        to_string = "Lembur Tanpa Izin",
        serialize = "Unauthorized Overtime",
        serialize = "Unauthorized-Overtime"
    )]
    UnauthorizedOvertime,
    #[strum(to_string = "Tidak Hadir", serialize = "Absent")]
    Absent,
    #[strum(
        to_string = "Belum Checkout",
        serialize = "Not Checked Out",
        serialize = "Not-Checked-Out"
    )]
    NotCheckedOut,
}

/// Whether overtime was approved for this check-out. Approval lives outside
/// the dashboard, so callers must supply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertimeAuthorization {
    Authorized,
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckIn,
    CheckOut {
        checked_in: bool,
        overtime: OvertimeAuthorization,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    CheckIn(CheckInStatus),
    CheckOut(CheckOutStatus),
}

pub fn classify_check_in(time: NaiveTime, window: &TimeWindow) -> CheckInStatus {
    if time < window.start {
        CheckInStatus::Early
    } else if time > window.end {
        CheckInStatus::Late
    } else {
        CheckInStatus::OnTime
    }
}

pub fn classify_check_out(
    time: NaiveTime,
    window: &TimeWindow,
    overtime: OvertimeAuthorization,
) -> CheckOutStatus {
    if time < window.start {
        CheckOutStatus::Early
    } else if time > window.end {
        match overtime {
            OvertimeAuthorization::Authorized => CheckOutStatus::Overtime,
            OvertimeAuthorization::Unauthorized => CheckOutStatus::UnauthorizedOvertime,
        }
    } else {
        CheckOutStatus::OnTime
    }
}

/// Classifies an event, or its absence.
///
/// A missing event only becomes `Absent` once the business day is closed;
/// before that there is nothing to report yet. A missing check-out after a
/// recorded check-in is `NotCheckedOut` rather than `Absent`.
pub fn classify(
    event: Option<NaiveTime>,
    hours: &WorkingHours,
    kind: EventKind,
    day_closed: bool,
) -> Option<Classification> {
    match (kind, event) {
        (EventKind::CheckIn, Some(time)) => Some(Classification::CheckIn(classify_check_in(
            time,
            &hours.check_in,
        ))),
        (EventKind::CheckIn, None) if day_closed => {
            Some(Classification::CheckIn(CheckInStatus::Absent))
        }
        (EventKind::CheckOut { overtime, .. }, Some(time)) => Some(Classification::CheckOut(
            classify_check_out(time, &hours.check_out, overtime),
        )),
        (EventKind::CheckOut { checked_in, .. }, None) if day_closed => {
            Some(Classification::CheckOut(if checked_in {
                CheckOutStatus::NotCheckedOut
            } else {
                CheckOutStatus::Absent
            }))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusMismatch {
    pub uid: String,
    pub name: Option<String>,
    #[schema(value_type = String, example = "status")]
    pub field: &'static str,
    pub recorded: Option<String>,
    pub expected: String,
}

/// Recomputes the labels of a stored record and reports the ones that
/// disagree with what the device wrote.
///
/// Overtime and unauthorized overtime are treated as the same outcome since
/// the approval behind them is not visible here.
pub fn audit_record(
    record: &AttendanceRecord,
    hours: &WorkingHours,
    day_closed: bool,
) -> Vec<StatusMismatch> {
    let mut mismatches = Vec::new();
    let check_in = record.time.as_deref().and_then(parse_time_of_day);
    let check_out = record.time_checkout.as_deref().and_then(parse_time_of_day);

    if let Some(Classification::CheckIn(expected)) =
        classify(check_in, hours, EventKind::CheckIn, day_closed)
    {
        let recorded = record
            .status
            .as_deref()
            .and_then(|s| CheckInStatus::from_str(s.trim()).ok());
        if recorded != Some(expected) {
            mismatches.push(mismatch(record, "status", &record.status, expected.to_string()));
        }
    }

    let kind = EventKind::CheckOut {
        checked_in: check_in.is_some(),
        overtime: OvertimeAuthorization::Authorized,
    };
    if let Some(Classification::CheckOut(expected)) = classify(check_out, hours, kind, day_closed) {
        let recorded = record
            .status_checkout
            .as_deref()
            .and_then(|s| CheckOutStatus::from_str(s.trim()).ok());
        let agrees = match (recorded, expected) {
            (Some(CheckOutStatus::UnauthorizedOvertime), CheckOutStatus::Overtime) => true,
            (Some(r), e) => r == e,
            (None, _) => false,
        };
        if !agrees {
            mismatches.push(mismatch(
                record,
                "status_checkout",
                &record.status_checkout,
                expected.to_string(),
            ));
        }
    }

    mismatches
}

fn mismatch(
    record: &AttendanceRecord,
    field: &'static str,
    recorded: &Option<String>,
    expected: String,
) -> StatusMismatch {
    StatusMismatch {
        uid: record.uid.clone(),
        name: record.name.clone(),
        field,
        recorded: recorded.clone(),
        expected,
    }
}
