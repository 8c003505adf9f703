use anyhow::{Context, Result, anyhow, bail};
use moka::future::Cache;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::config::Config;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PhotoDirection {
    CheckIn,
    CheckOut,
}

type PhotoKey = (String, String, PhotoDirection);

/// Download URLs of attendance photos, keyed by `(date, uid, direction)`.
///
/// Owned by the application state. Only successful lookups are cached, so a
/// photo that failed once is retried on the next request.
#[derive(Clone)]
pub struct PhotoCache {
    cache: Cache<PhotoKey, String>,
    client: reqwest::Client,
    api_base: String,
    bucket: String,
}

#[derive(Deserialize)]
struct ObjectMetadata {
    #[serde(rename = "downloadTokens")]
    download_tokens: Option<String>,
}

impl PhotoCache {
    pub fn new(config: &Config) -> Self {
        Self::with_store(
            config.photo_api_base.clone(),
            config.photo_bucket.clone(),
            config.photo_cache_capacity,
        )
    }

    pub fn with_store(api_base: String, bucket: String, capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Duration::from_secs(12 * 3600))
                .build(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bucket,
        }
    }

    /// URL for a stored photo reference, or `None` when it cannot be
    /// resolved. A failure only affects this one photo.
    pub async fn resolve(
        &self,
        date: &str,
        uid: &str,
        direction: PhotoDirection,
        reference: &str,
    ) -> Option<String> {
        let key = (date.to_string(), uid.to_string(), direction);
        if let Some(url) = self.cache.get(&key).await {
            return Some(url);
        }

        match self.lookup(reference).await {
            Ok(url) => {
                self.cache.insert(key, url.clone()).await;
                Some(url)
            }
            Err(e) => {
                tracing::warn!(error = %e, date, uid, direction = %direction, "Photo lookup failed");
                None
            }
        }
    }

    pub async fn invalidate(&self, date: &str, uid: &str, direction: PhotoDirection) {
        self.cache
            .invalidate(&(date.to_string(), uid.to_string(), direction))
            .await;
    }

    async fn lookup(&self, reference: &str) -> Result<String> {
        let reference = reference.trim();
        if reference.starts_with("https://") || reference.starts_with("http://") {
            return Ok(reference.to_string());
        }
        if reference.is_empty() {
            bail!("empty photo reference");
        }
        let object_url = self.object_url(reference)?;

        let meta: ObjectMetadata = self
            .client
            .get(object_url.clone())
            .send()
            .await
            .context("object store request failed")?
            .error_for_status()?
            .json()
            .await
            .context("object store returned unexpected metadata")?;

        let token = meta
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("object has no download token"))?
            .to_string();

        let mut url = object_url;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", &token);
        Ok(url.to_string())
    }

    /// Metadata URL for an object path. `gs://bucket/path` references carry
    /// their own bucket; bare paths use the configured one.
    fn object_url(&self, reference: &str) -> Result<Url> {
        let (bucket, path) = match reference.strip_prefix("gs://") {
            Some(rest) => rest
                .split_once('/')
                .ok_or_else(|| anyhow!("malformed storage reference: {}", reference))?,
            None => (self.bucket.as_str(), reference.trim_start_matches('/')),
        };
        if bucket.is_empty() {
            bail!("photo bucket is not configured");
        }

        let mut url = Url::parse(&self.api_base).context("invalid PHOTO_API_BASE")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("PHOTO_API_BASE cannot be a base URL"))?
            .push(bucket)
            .push("o")
            .push(path);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn cache(bucket: &str) -> PhotoCache {
        PhotoCache::with_store(
            "https://storage.example.test/v0/b/".into(),
            bucket.into(),
            100,
        )
    }

    #[test]
    fn object_paths_are_encoded_as_one_segment() {
        let url = cache("absensi")
            .object_url("attendance/2025-03-01/A1 in.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.test/v0/b/absensi/o/attendance%2F2025-03-01%2FA1%20in.jpg"
        );

        let url = cache("").object_url("gs://other/p/x.jpg").unwrap();
        assert!(url.as_str().ends_with("/b/other/o/p%2Fx.jpg"));
        assert!(cache("").object_url("p/x.jpg").is_err());
    }

    #[test]
    fn directions_use_kebab_case() {
        assert_eq!(PhotoDirection::CheckIn.as_ref(), "check-in");
        assert_eq!(
            PhotoDirection::from_str("check-out").unwrap(),
            PhotoDirection::CheckOut
        );
    }

    #[actix_web::test]
    async fn absolute_urls_pass_through_and_are_cached() {
        let photos = cache("");
        let url = "https://cdn.example.test/a.jpg";
        let got = photos
            .resolve("2025-03-01", "A1", PhotoDirection::CheckIn, url)
            .await;
        assert_eq!(got.as_deref(), Some(url));

        // Served from cache even though the new reference is unusable.
        let again = photos
            .resolve("2025-03-01", "A1", PhotoDirection::CheckIn, "")
            .await;
        assert_eq!(again.as_deref(), Some(url));

        photos
            .invalidate("2025-03-01", "A1", PhotoDirection::CheckIn)
            .await;
        let after = photos
            .resolve("2025-03-01", "A1", PhotoDirection::CheckIn, "")
            .await;
        assert_eq!(after, None);
    }

    #[actix_web::test]
    async fn unresolvable_reference_degrades_to_none() {
        let photos = cache("");
        let got = photos
            .resolve("2025-03-01", "B2", PhotoDirection::CheckOut, "photos/b.jpg")
            .await;
        assert_eq!(got, None);
    }
}
