//! Image-of-the-day archive metadata

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::constants::{IMAGES_PER_REQUEST, SIZE_SUFFIXES};
use crate::error::FetchError;

/// One entry of the archive's `images` array. Everything else in the entry is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArchiveImage {
    /// Canonical image URL, usually site-relative
    #[serde(default)]
    pub url: Option<String>,
    /// Path prefix used to build alternate resolutions
    #[serde(default)]
    pub urlbase: Option<String>,
}

/// An image we could download, plus what's needed to build its fallbacks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageCandidate {
    /// Fully-qualified canonical URL
    pub url: String,
    /// Fully-qualified `urlbase`, when the archive supplied one
    pub url_base: Option<String>,
}

impl ImageCandidate {
    /// Builds a candidate from an archive entry, resolving relative paths against `image_host`.
    ///
    /// Returns `None` when the entry has no usable URL.
    pub fn from_archive(image: &ArchiveImage, image_host: &Url) -> Option<Self> {
        let raw = image.url.as_deref().map(str::trim).filter(|url| !url.is_empty())?;
        let url = match image_host.join(raw) {
            Ok(url) => url.to_string(),
            Err(err) => {
                debug!("Skipping unusable image URL {:?}: {}", raw, err);
                return None;
            }
        };
        let url_base = image
            .urlbase
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .and_then(|base| image_host.join(base).ok())
            .map(|base| base.to_string());
        Some(Self { url, url_base })
    }

    /// The dedup key: `urlbase` when present, otherwise the URL.
    pub fn key(&self) -> &str {
        self.url_base.as_deref().unwrap_or(&self.url)
    }

    /// URLs to try for this image, canonical first then each size suffix.
    pub fn url_ladder(&self) -> Vec<String> {
        let mut ladder = vec![self.url.clone()];
        if let Some(base) = &self.url_base {
            for suffix in SIZE_SUFFIXES {
                let variant = format!("{base}_{suffix}.jpg");
                if !ladder.contains(&variant) {
                    ladder.push(variant);
                }
            }
        }
        ladder
    }
}

/// Client for the archive endpoint.
#[derive(Clone, Debug)]
pub struct ArchiveClient {
    client: reqwest::Client,
    archive_url: Url,
}

impl ArchiveClient {
    /// Creates a client for the given endpoint.
    pub fn new(client: reqwest::Client, archive_url: Url) -> Self {
        Self {
            client,
            archive_url,
        }
    }

    /// The request URL for a day offset and market.
    pub fn request_url(&self, day_offset: u32, locale: &str) -> Url {
        let mut url = self.archive_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "js")
            .append_pair("idx", &day_offset.to_string())
            .append_pair("n", &IMAGES_PER_REQUEST.to_string())
            .append_pair("mkt", locale);
        url
    }

    /// Fetches the image list for one (day, locale) pair.
    pub async fn fetch_images(
        &self,
        day_offset: u32,
        locale: &str,
    ) -> Result<Vec<ArchiveImage>, FetchError> {
        let url = self.request_url(day_offset, locale);
        debug!("Fetching archive page {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes().await?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        Ok(images_from_payload(&payload))
    }
}

/// Pulls the `images` array out of an archive payload.
///
/// A missing or non-array field is an empty list, and entries that aren't
/// objects are dropped.
pub fn images_from_payload(payload: &Value) -> Vec<ArchiveImage> {
    let Some(images) = payload.get("images").and_then(Value::as_array) else {
        return Vec::new();
    };
    images
        .iter()
        .filter_map(|entry| ArchiveImage::deserialize(entry).ok())
        .collect()
}
