//! Printable attendance reports.
//!
//! A report is laid out into pages of positioned text and rules first
//! (`layout`), then drawn into a PDF (`render`). Layout is pure so pagination
//! can be checked without producing a document.

pub mod layout;
pub mod render;

use crate::attendance::aggregator::{DateSelector, ReportRow, month_bounds};
use crate::error::AppError;
use crate::utils::time_fmt::{format_long_date, month_name, parse_date_key};
use chrono::{Datelike, NaiveDate};

pub const REPORT_TITLE: &str = "Laporan Absensi Karyawan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Single(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
    Month { year: i32, month: u32 },
}

impl ReportPeriod {
    pub fn from_selector(selector: &DateSelector) -> Result<Self, AppError> {
        match selector {
            DateSelector::Single(date) => parse_date_key(date)
                .map(ReportPeriod::Single)
                .ok_or_else(|| AppError::validation(format!("Invalid date: {}", date))),
            DateSelector::Range {
                from: Some(from),
                to: Some(to),
            } => {
                let (Some(from), Some(to)) = (parse_date_key(from), parse_date_key(to)) else {
                    return Err(AppError::validation("Invalid date range"));
                };
                if from > to {
                    return Err(AppError::validation("Range start is after its end"));
                }
                Ok(ReportPeriod::Range { from, to })
            }
            DateSelector::Range { .. } => {
                Err(AppError::validation("A date range needs both from and to"))
            }
            DateSelector::Month(month) => month_bounds(month)
                .map(|(first, _)| ReportPeriod::Month {
                    year: first.year(),
                    month: first.month(),
                })
                .ok_or_else(|| AppError::validation(format!("Invalid month: {}", month))),
        }
    }

    pub fn variant(&self) -> ReportVariant {
        match self {
            ReportPeriod::Single(_) => ReportVariant::Daily,
            ReportPeriod::Range { .. } => ReportVariant::Range,
            ReportPeriod::Month { .. } => ReportVariant::Monthly,
        }
    }

    /// `Laporan_Absensi_2025-03-01.pdf`,
    /// `Laporan_Absensi_LPD_20250301_sd_20250305.pdf` or
    /// `Laporan_Absensi_2025-03.pdf`
    pub fn filename(&self) -> String {
        match self {
            ReportPeriod::Single(date) => {
                format!("Laporan_Absensi_{}.pdf", date.format("%Y-%m-%d"))
            }
            ReportPeriod::Range { from, to } => format!(
                "Laporan_Absensi_LPD_{}_sd_{}.pdf",
                from.format("%Y%m%d"),
                to.format("%Y%m%d")
            ),
            ReportPeriod::Month { year, month } => {
                format!("Laporan_Absensi_{:04}-{:02}.pdf", year, month)
            }
        }
    }

    pub fn subtitle(&self) -> String {
        match self {
            ReportPeriod::Single(date) => format!("Tanggal: {}", format_long_date(*date)),
            ReportPeriod::Range { from, to } => format!(
                "Periode: {} s/d {}",
                format_long_date(*from),
                format_long_date(*to)
            ),
            ReportPeriod::Month { year, month } => {
                format!("Bulan: {} {}", month_name(*month), year)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportVariant {
    Daily,
    Monthly,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnField {
    Number,
    Date,
    Name,
    Position,
    CheckInTime,
    CheckInStatus,
    CheckOutTime,
    CheckOutStatus,
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub width: f32,
    pub field: ColumnField,
}

const fn col(title: &'static str, width: f32, field: ColumnField) -> Column {
    Column {
        title,
        width,
        field,
    }
}

const DAILY_COLUMNS: [Column; 8] = [
    col("No", 10.0, ColumnField::Number),
    col("Nama", 40.0, ColumnField::Name),
    col("Jabatan", 25.0, ColumnField::Position),
    col("Masuk", 18.0, ColumnField::CheckInTime),
    col("Status Masuk", 24.0, ColumnField::CheckInStatus),
    col("Keluar", 18.0, ColumnField::CheckOutTime),
    col("Status Keluar", 24.0, ColumnField::CheckOutStatus),
    col("Keterangan", 31.0, ColumnField::Details),
];

const DATED_COLUMNS: [Column; 9] = [
    col("No", 8.0, ColumnField::Number),
    col("Tanggal", 20.0, ColumnField::Date),
    col("Nama", 34.0, ColumnField::Name),
    col("Jabatan", 22.0, ColumnField::Position),
    col("Masuk", 15.0, ColumnField::CheckInTime),
    col("Status Masuk", 22.0, ColumnField::CheckInStatus),
    col("Keluar", 15.0, ColumnField::CheckOutTime),
    col("Status Keluar", 22.0, ColumnField::CheckOutStatus),
    col("Keterangan", 32.0, ColumnField::Details),
];

impl ReportVariant {
    pub fn columns(&self) -> &'static [Column] {
        match self {
            ReportVariant::Daily => &DAILY_COLUMNS,
            ReportVariant::Monthly | ReportVariant::Range => &DATED_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBlock {
    pub city: String,
    pub title: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub period: ReportPeriod,
    pub rows: Vec<ReportRow>,
    pub signature: SignatureBlock,
    pub printed_on: NaiveDate,
}

impl Report {
    pub fn filename(&self) -> String {
        self.period.filename()
    }

    /// Lays the report out and draws it into PDF bytes.
    pub fn to_pdf(&self) -> Result<Vec<u8>, AppError> {
        let pages = layout::layout_report(self);
        render::render_pdf(&self.title, &pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    #[test]
    fn filenames_follow_period_kind() {
        assert_eq!(
            ReportPeriod::Single(d("2025-03-01")).filename(),
            "Laporan_Absensi_2025-03-01.pdf"
        );
        assert_eq!(
            ReportPeriod::Range {
                from: d("2025-03-01"),
                to: d("2025-03-05")
            }
            .filename(),
            "Laporan_Absensi_LPD_20250301_sd_20250305.pdf"
        );
        assert_eq!(
            ReportPeriod::Month {
                year: 2025,
                month: 3
            }
            .filename(),
            "Laporan_Absensi_2025-03.pdf"
        );
    }

    #[test]
    fn period_from_selector() {
        let range = DateSelector::Range {
            from: Some("2025-03-01".into()),
            to: Some("2025-03-05".into()),
        };
        let period = ReportPeriod::from_selector(&range).unwrap();
        assert_eq!(period.variant(), ReportVariant::Range);
        assert_eq!(
            period.subtitle(),
            "Periode: 01 Maret 2025 s/d 05 Maret 2025"
        );

        let open = DateSelector::Range {
            from: Some("2025-03-01".into()),
            to: None,
        };
        assert!(ReportPeriod::from_selector(&open).is_err());

        let month = ReportPeriod::from_selector(&DateSelector::Month("2025-08".into())).unwrap();
        assert_eq!(month.subtitle(), "Bulan: Agustus 2025");
        assert_eq!(month.variant(), ReportVariant::Monthly);
    }

    #[test]
    fn column_schemas_fill_the_printable_width() {
        for variant in [ReportVariant::Daily, ReportVariant::Range] {
            let total: f32 = variant.columns().iter().map(|c| c.width).sum();
            assert!((total - layout::TABLE_WIDTH).abs() < 0.01);
        }
        assert!(
            !ReportVariant::Daily
                .columns()
                .iter()
                .any(|c| c.field == ColumnField::Date)
        );
        assert_eq!(ReportVariant::Monthly.columns()[1].field, ColumnField::Date);
    }
}
