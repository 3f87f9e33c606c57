//! Error handling

use reqwest::StatusCode;

/// Failures fetching one (day, locale) page of archive metadata.
#[derive(Debug)]
pub enum FetchError {
    /// The request itself failed (DNS, connect, reset...)
    Request(reqwest::Error),
    /// The archive answered with something other than 200
    Status(StatusCode),
    /// The body wasn't JSON
    Parse(serde_json::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(err) => write!(f, "Archive request failed: {err}"),
            Self::Status(status) => write!(f, "Archive returned HTTP {status}"),
            Self::Parse(err) => write!(f, "Failed to parse archive JSON: {err}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Request(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err)
    }
}

/// Hard failures while downloading a single image URL.
///
/// Oversized bodies and bad statuses are not errors, see
/// [`crate::download::DownloadOutcome`].
#[derive(Debug)]
pub enum DownloadError {
    /// Network-level failure
    Request(reqwest::Error),
    /// Writing the destination file failed
    Io(std::io::Error),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(err) => write!(f, "Download failed: {err}"),
            Self::Io(err) => write!(f, "Failed to write download: {err}"),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Request(err)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Io(err)
    }
}

/// Failures bringing a file under the size budget.
#[derive(Debug)]
pub enum EncodeError {
    /// Corrupt or unsupported image, nothing was attempted
    Decode(image::ImageError),
    /// Re-encoding itself failed
    Encode(image::ImageError),
    /// Every (width, quality) pair came out over budget
    BudgetUnreachable {
        /// The budget that couldn't be met
        budget: u64,
    },
    /// Reading or writing the file failed
    Io(std::io::Error),
    /// The blocking worker died
    Worker(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "Failed to decode image: {err}"),
            Self::Encode(err) => write!(f, "Failed to encode JPEG: {err}"),
            Self::BudgetUnreachable { budget } => {
                write!(f, "No width/quality combination fits in {budget} bytes")
            }
            Self::Io(err) => write!(f, "Image I/O error: {err}"),
            Self::Worker(message) => write!(f, "Re-encode worker failed: {message}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::Io(err)
    }
}

/// Run-level failures, the only ones that end the process with a failure status.
#[derive(Debug)]
pub enum PipelineError {
    /// The output directory couldn't be created
    OutputDir(std::io::Error),
    /// Not a single image was found across every locale and day
    NoCandidates,
    /// The archive URL or image host is unusable
    Config(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutputDir(err) => write!(f, "Failed to create output directory: {err}"),
            Self::NoCandidates => write!(f, "No images found in any locale or day"),
            Self::Config(message) => write!(f, "Invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for PipelineError {}
