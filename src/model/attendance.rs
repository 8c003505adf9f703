use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One employee's attendance for one day, keyed by `(date, uid)`.
///
/// `name` and `position` are copies of the employee profile taken when the
/// device wrote the record; they are kept in sync by the reconciliation step
/// that runs whenever an employee is edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "A1B2C3D4")]
    pub uid: String,

    #[schema(example = "Budi Santoso")]
    pub name: Option<String>,

    #[schema(example = "Staff")]
    pub position: Option<String>,

    /// Check-in wall-clock time
    #[sqlx(rename = "check_in_time")]
    #[schema(example = "07:52:10")]
    pub time: Option<String>,

    #[schema(example = "Tepat Waktu")]
    pub status: Option<String>,

    #[sqlx(rename = "check_out_time")]
    #[schema(example = "16:05:43")]
    pub time_checkout: Option<String>,

    #[schema(example = "Tepat Waktu")]
    pub status_checkout: Option<String>,

    #[serde(rename = "imageUrl")]
    #[schema(example = "attendance/2025-03-01/A1B2C3D4_in.jpg")]
    pub image_url: Option<String>,

    #[schema(example = "attendance/2025-03-01/A1B2C3D4_out.jpg")]
    pub image_checkout: Option<String>,

    /// Administrator annotation, only meaningful for absent records
    #[schema(example = "Sakit")]
    pub absence_details: Option<String>,
}

/// A flattened attendance entry as shown in the table and exported reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRow {
    #[schema(example = "2025-03-01")]
    pub date: String,

    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: AttendanceRecord,
}
