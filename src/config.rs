use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Optional bootstrap administrator, created on startup when missing
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Fixed weekly rest day, in addition to the holiday calendar
    pub rest_weekday: Weekday,
    pub auto_absence_enabled: bool,

    // Attendance photos
    pub photo_api_base: String,
    pub photo_bucket: String,
    pub photo_cache_capacity: u64,

    // Printed report signature block
    pub report_signatory_name: String,
    pub report_signatory_title: String,
    pub report_city: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: setting("ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: setting("REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: setting("RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: setting("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: setting("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),

            rest_weekday: setting("REST_WEEKDAY", "Sun")?,
            auto_absence_enabled: setting("AUTO_ABSENCE_ENABLED", "true")?,

            photo_api_base: env::var("PHOTO_API_BASE").unwrap_or_else(|_| {
                "https://firebasestorage.googleapis.com/v0/b".to_string()
            }),
            photo_bucket: env::var("PHOTO_BUCKET").unwrap_or_default(),
            photo_cache_capacity: setting("PHOTO_CACHE_CAPACITY", "10000")?,

            report_signatory_name: env::var("REPORT_SIGNATORY_NAME")
                .unwrap_or_else(|_| "Kepala Bagian Kepegawaian".to_string()),
            report_signatory_title: env::var("REPORT_SIGNATORY_TITLE")
                .unwrap_or_else(|_| "Manager HRD".to_string()),
            report_city: env::var("REPORT_SIGNATORY_CITY")
                .unwrap_or_else(|_| "Jakarta".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn setting<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weekday_names() {
        let day: Weekday = parse_value("REST_WEEKDAY", "Sunday").unwrap();
        assert_eq!(day, Weekday::Sun);
        let day: Weekday = parse_value("REST_WEEKDAY", " fri ").unwrap();
        assert_eq!(day, Weekday::Fri);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = parse_value::<u32>("RATE_LOGIN_PER_MIN", "sixty").unwrap_err();
        assert!(err.to_string().contains("RATE_LOGIN_PER_MIN"));
    }
}
