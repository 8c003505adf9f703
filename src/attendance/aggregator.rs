use crate::model::attendance::{AttendanceRecord, AttendanceRow};
use crate::model::holiday::Holiday;
use crate::utils::time_fmt::{date_key, parse_date_key, weekday_name};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;
use utoipa::ToSchema;

/// Attendance records grouped by date key. Within a day, records keep the
/// order in which they were stored; table numbering depends on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceStore {
    days: BTreeMap<String, Vec<AttendanceRecord>>,
}

impl AttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, replacing any existing record of the same uid on that
    /// day in place.
    pub fn insert(&mut self, date: impl Into<String>, record: AttendanceRecord) {
        let day = self.days.entry(date.into()).or_default();
        match day.iter_mut().find(|r| r.uid == record.uid) {
            Some(existing) => *existing = record,
            None => day.push(record),
        }
    }

    pub fn day(&self, date: &str) -> &[AttendanceRecord] {
        self.days.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_records(&self, date: &str) -> bool {
        !self.day(date).is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<AttendanceRow> for AttendanceStore {
    fn from_iter<I: IntoIterator<Item = AttendanceRow>>(rows: I) -> Self {
        let mut store = AttendanceStore::new();
        for row in rows {
            store.insert(row.date, row.record);
        }
        store
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelector {
    Single(String),
    Range {
        from: Option<String>,
        to: Option<String>,
    },
    /// `YYYY-MM`
    Month(String),
}

impl DateSelector {
    /// Inclusive date-key bounds to load from storage, or `None` when the
    /// selector cannot match anything.
    pub fn bounds(&self) -> Option<(String, String)> {
        match self {
            DateSelector::Single(date) => Some((date.clone(), date.clone())),
            DateSelector::Range { from, to } => {
                let (from, to) = parse_range(from.as_deref()?, to.as_deref()?)?;
                Some((date_key(from), date_key(to)))
            }
            DateSelector::Month(month) => {
                let (first, last) = month_bounds(month)?;
                Some((date_key(first), date_key(last)))
            }
        }
    }
}

fn parse_range(from: &str, to: &str) -> Option<(NaiveDate, NaiveDate)> {
    match (parse_date_key(from), parse_date_key(to)) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => {
            warn!(from, to, "Ignoring malformed date range");
            None
        }
    }
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let first = parse_date_key(&format!("{}-01", month.trim()));
    let Some(first) = first else {
        warn!(month, "Ignoring malformed month");
        return None;
    };
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }?;
    Some((first, next.pred_opt()?))
}

/// Dates to show for a selector.
///
/// A single date is returned as-is. A range yields every calendar day from
/// `from` to `to` inclusive that has at least one record; empty days are
/// dropped. A range missing either bound yields nothing.
pub fn select_dates(selector: &DateSelector, store: &AttendanceStore) -> Vec<String> {
    let bounds = match selector {
        DateSelector::Single(date) => return vec![date.clone()],
        DateSelector::Range {
            from: Some(from),
            to: Some(to),
        } => parse_range(from, to),
        DateSelector::Range { .. } => None,
        DateSelector::Month(month) => month_bounds(month),
    };

    let Some((from, to)) = bounds else {
        return Vec::new();
    };

    from.iter_days()
        .take_while(|day| *day <= to)
        .map(date_key)
        .filter(|key| store.has_records(key))
        .collect()
}

/// One row per `(date, uid)` for the given dates, in the order supplied and
/// then in storage order. Malformed date keys are skipped.
pub fn flatten_records(dates: &[String], store: &AttendanceStore) -> Vec<AttendanceRow> {
    let mut rows = Vec::new();
    for date in dates {
        if parse_date_key(date).is_none() {
            warn!(date = %date, "Skipping malformed attendance date");
            continue;
        }
        rows.extend(store.day(date).iter().map(|record| AttendanceRow {
            date: date.clone(),
            record: record.clone(),
        }));
    }
    rows
}

/// Case-insensitive substring match over name, position, status and absence
/// details. A blank query keeps every row.
pub fn filter_by_search(rows: Vec<AttendanceRow>, query: &str) -> Vec<AttendanceRow> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            let r = &row.record;
            [&r.name, &r.position, &r.status, &r.absence_details]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn holiday_on(date: NaiveDate, holidays: &[Holiday]) -> Option<&Holiday> {
    holidays.iter().find(|h| h.date == date)
}

pub fn is_rest_day(date: NaiveDate, holidays: &[Holiday], rest_weekday: Weekday) -> bool {
    date.weekday() == rest_weekday || holiday_on(date, holidays).is_some()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    /// Stands in for all rows of a rest day in printed reports
    Banner { date: String, label: String },
    Entry(AttendanceRow),
}

/// Rows for a printed report. Each rest day collapses into a single banner;
/// the interactive table keeps showing those days' records.
pub fn report_rows(
    dates: &[String],
    store: &AttendanceStore,
    holidays: &[Holiday],
    rest_weekday: Weekday,
) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for date in dates {
        let Some(day) = parse_date_key(date) else {
            warn!(date = %date, "Skipping malformed report date");
            continue;
        };

        if is_rest_day(day, holidays, rest_weekday) {
            let label = match holiday_on(day, holidays) {
                Some(holiday) => format!("Hari Libur: {}", holiday.name),
                None => format!("Hari Libur ({})", weekday_name(day.weekday())),
            };
            rows.push(ReportRow::Banner {
                date: date.clone(),
                label,
            });
            continue;
        }

        rows.extend(
            flatten_records(std::slice::from_ref(date), store)
                .into_iter()
                .map(ReportRow::Entry),
        );
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    #[schema(example = "Terlambat")]
    pub status: String,
    #[schema(example = 4)]
    pub count: usize,
}

/// Check-in status tally, largest first then by label.
pub fn summarize_statuses(rows: &[AttendanceRow]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let status = row
            .record
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Tanpa Status");
        *counts.entry(status.to_string()).or_default() += 1;
    }

    let mut summary: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uid: &str, name: &str, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            uid: uid.into(),
            name: Some(name.into()),
            position: Some("Staff".into()),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    fn day(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    fn store() -> AttendanceStore {
        let mut store = AttendanceStore::new();
        store.insert("2025-03-01", record("Z9", "Zaki", "Tepat Waktu"));
        store.insert("2025-03-01", record("A1", "Ani", "Terlambat"));
        store.insert("2025-03-03", record("A1", "Ani", "Tepat Waktu"));
        store
    }

    #[test]
    fn range_drops_days_without_records() {
        let selector = DateSelector::Range {
            from: Some("2025-03-01".into()),
            to: Some("2025-03-03".into()),
        };
        assert_eq!(
            select_dates(&selector, &store()),
            vec!["2025-03-01".to_string(), "2025-03-03".to_string()]
        );
    }

    #[test]
    fn partial_or_malformed_ranges_select_nothing() {
        let open = DateSelector::Range {
            from: Some("2025-03-01".into()),
            to: None,
        };
        assert!(select_dates(&open, &store()).is_empty());
        assert_eq!(open.bounds(), None);

        let garbled = DateSelector::Range {
            from: Some("2025-03-01".into()),
            to: Some("soon".into()),
        };
        assert!(select_dates(&garbled, &store()).is_empty());

        let backwards = DateSelector::Range {
            from: Some("2025-03-03".into()),
            to: Some("2025-03-01".into()),
        };
        assert!(select_dates(&backwards, &store()).is_empty());
    }

    #[test]
    fn single_date_is_returned_even_without_records() {
        let selector = DateSelector::Single("2025-03-02".into());
        assert_eq!(select_dates(&selector, &store()), vec!["2025-03-02"]);
    }

    #[test]
    fn month_covers_whole_month() {
        assert_eq!(
            month_bounds("2024-02"),
            Some((day("2024-02-01"), day("2024-02-29")))
        );
        assert_eq!(
            month_bounds("2025-12"),
            Some((day("2025-12-01"), day("2025-12-31")))
        );
        let selector = DateSelector::Month("2025-03".into());
        assert_eq!(select_dates(&selector, &store()).len(), 2);
        assert_eq!(
            selector.bounds(),
            Some(("2025-03-01".to_string(), "2025-03-31".to_string()))
        );
    }

    #[test]
    fn flatten_keeps_storage_order_within_a_day() {
        let dates = vec!["2025-03-01".to_string(), "2025-03-03".to_string()];
        let rows = flatten_records(&dates, &store());
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.date.as_str(), r.record.uid.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("2025-03-01", "Z9"), ("2025-03-01", "A1"), ("2025-03-03", "A1")]
        );
    }

    #[test]
    fn flatten_is_repeatable_and_skips_bad_keys() {
        let s = store();
        let dates = vec!["bogus".to_string(), "2025-03-01".to_string()];
        let first = flatten_records(&dates, &s);
        let second = flatten_records(&dates, &s);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(s, store());
    }

    #[test]
    fn insert_replaces_same_uid_in_place() {
        let mut s = store();
        s.insert("2025-03-01", record("Z9", "Zaki", "Terlambat"));
        let day = s.day("2025-03-01");
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].status.as_deref(), Some("Terlambat"));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn search_is_case_insensitive() {
        let dates = vec!["2025-03-01".to_string()];
        let rows = flatten_records(&dates, &store());

        let hits = filter_by_search(rows.clone(), "terlambat");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.uid, "A1");

        assert_eq!(filter_by_search(rows.clone(), "   "), rows);
        assert_eq!(filter_by_search(rows.clone(), "STAFF").len(), 2);
    }

    #[test]
    fn search_matches_absence_details() {
        let mut s = AttendanceStore::new();
        let mut sick = record("C3", "Citra", "Tidak Hadir");
        sick.absence_details = Some("Sakit demam".into());
        s.insert("2025-03-04", sick);
        s.insert("2025-03-04", record("D4", "Dewi", "Tepat Waktu"));

        let rows = flatten_records(&["2025-03-04".to_string()], &s);
        let hits = filter_by_search(rows, "DEMAM");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.uid, "C3");
    }

    #[test]
    fn rest_days_are_sundays_and_holidays() {
        assert!(is_rest_day(day("2025-03-02"), &[], Weekday::Sun));
        assert!(!is_rest_day(day("2025-03-03"), &[], Weekday::Sun));

        let holidays = vec![Holiday {
            id: "h1".into(),
            name: "Holiday X".into(),
            date: day("2025-03-03"),
        }];
        assert!(is_rest_day(day("2025-03-03"), &holidays, Weekday::Sun));
    }

    #[test]
    fn report_rows_collapse_rest_days_into_banners() {
        let mut s = store();
        s.insert("2025-03-02", record("A1", "Ani", "Tepat Waktu"));
        let holidays = vec![Holiday {
            id: "h1".into(),
            name: "Nyepi".into(),
            date: day("2025-03-03"),
        }];
        let dates: Vec<String> = ["2025-03-01", "2025-03-02", "2025-03-03"]
            .iter()
            .map(|d| d.to_string())
            .collect();

        let rows = report_rows(&dates, &s, &holidays, Weekday::Sun);
        assert_eq!(rows.len(), 4);
        assert!(matches!(&rows[0], ReportRow::Entry(r) if r.record.uid == "Z9"));
        assert!(matches!(&rows[1], ReportRow::Entry(r) if r.record.uid == "A1"));
        assert_eq!(
            rows[2],
            ReportRow::Banner {
                date: "2025-03-02".into(),
                label: "Hari Libur (Minggu)".into()
            }
        );
        assert_eq!(
            rows[3],
            ReportRow::Banner {
                date: "2025-03-03".into(),
                label: "Hari Libur: Nyepi".into()
            }
        );
    }

    #[test]
    fn status_summary_orders_by_count() {
        let mut s = store();
        s.insert("2025-03-03", record("Z9", "Zaki", "Tepat Waktu"));
        let mut blank = record("Q7", "Qori", "");
        blank.status = None;
        s.insert("2025-03-03", blank);

        let dates = vec!["2025-03-01".to_string(), "2025-03-03".to_string()];
        let summary = summarize_statuses(&flatten_records(&dates, &s));
        assert_eq!(
            summary,
            vec![
                StatusCount { status: "Tepat Waktu".into(), count: 3 },
                StatusCount { status: "Tanpa Status".into(), count: 1 },
                StatusCount { status: "Terlambat".into(), count: 1 },
            ]
        );
    }
}
