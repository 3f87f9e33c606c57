//! Size-capped image downloads

use std::path::Path;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::DownloadError;

/// What happened to a download that didn't fail outright.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DownloadOutcome {
    /// The body was written to the destination, this many bytes.
    Saved(u64),
    /// The body was (or announced itself as) bigger than the limit; nothing was written.
    TooLarge,
    /// The server answered with anything but 200; nothing was written.
    BadStatus(StatusCode),
}

/// Downloads `url` into `dest`, never buffering more than `max_bytes`.
///
/// A `Content-Length` over the limit is refused before reading the body. Without
/// one, the body is streamed and the connection is dropped as soon as the limit
/// is crossed. The file is only written once the full body is in hand.
pub async fn download_capped(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    max_bytes: u64,
) -> Result<DownloadOutcome, DownloadError> {
    let mut response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Ok(DownloadOutcome::BadStatus(status));
    }

    if let Some(length) = response.content_length()
        && length > max_bytes
    {
        debug!(
            "{} announces {} bytes, over the {} byte limit",
            url, length, max_bytes
        );
        return Ok(DownloadOutcome::TooLarge);
    }

    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (buffer.len() + chunk.len()) as u64 > max_bytes {
            debug!(
                "{} passed the {} byte limit mid-stream, aborting",
                url, max_bytes
            );
            // dropping the response closes the connection
            drop(response);
            return Ok(DownloadOutcome::TooLarge);
        }
        buffer.extend_from_slice(&chunk);
    }

    tokio::fs::write(dest, &buffer).await?;
    Ok(DownloadOutcome::Saved(buffer.len() as u64))
}
