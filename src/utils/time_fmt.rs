use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Parses a wall-clock time as written by the device, `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parses a `YYYY-MM-DD` date key.
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Calendar day of a date that may carry a time part
/// (`2025-03-03T00:00:00.000Z` and `2025-03-03` are the same day).
pub fn parse_calendar_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10).and_then(parse_date_key)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Zero-padded `YYYY-MM-DD` form of a date key, so `2025-3-1` and
/// ` 2025-03-01` address the same stored day.
pub fn canonical_date_key(raw: &str) -> Option<String> {
    parse_date_key(raw).map(date_key)
}

pub fn month_name(month: u32) -> &'static str {
    MONTHS_ID[(month.clamp(1, 12) - 1) as usize]
}

/// `01 Maret 2025`
pub fn format_long_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        month_name(date.month()),
        date.year()
    )
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

/// Serde adapter for `HH:MM` times in the working-hours settings.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time_of_day(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid time of day: {}", raw)))
    }
}
