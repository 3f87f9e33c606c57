//! CLI parser
use clap::Parser;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_ARCHIVE_URL, DEFAULT_IMAGE_HOST, DEFAULT_OUTPUT_DIR, MAX_DAY_OFFSET,
};

#[derive(Parser, Debug)]
#[command(name = "bing-gallery", version, about)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "BING_GALLERY_DEBUG")]
    /// Enable debug logging. Env: BING_GALLERY_DEBUG
    pub debug: bool,

    #[clap(long, short, default_value = DEFAULT_OUTPUT_DIR, env = "BING_GALLERY_OUTPUT_DIR")]
    /// Directory the numbered JPEGs are written to, created if missing.
    /// Env: BING_GALLERY_OUTPUT_DIR
    pub output_dir: PathBuf,

    #[clap(long, default_value = DEFAULT_ARCHIVE_URL, env = "BING_GALLERY_ARCHIVE_URL")]
    /// Image archive endpoint.
    /// Env: BING_GALLERY_ARCHIVE_URL
    pub archive_url: String,

    #[clap(long, default_value = DEFAULT_IMAGE_HOST, env = "BING_GALLERY_IMAGE_HOST")]
    /// Host relative image URLs are resolved against.
    /// Env: BING_GALLERY_IMAGE_HOST
    pub image_host: String,

    #[clap(long, short, default_value = "50", env = "BING_GALLERY_TARGET_COUNT")]
    /// Number of images to save, defaults to `50`.
    /// Env: BING_GALLERY_TARGET_COUNT
    pub target_count: NonZeroUsize,

    #[clap(long, default_value = "512000", env = "BING_GALLERY_MAX_BYTES")]
    /// Size budget per saved file in bytes, defaults to 500 KiB.
    /// Env: BING_GALLERY_MAX_BYTES
    pub max_bytes: NonZeroU64,

    #[clap(long, default_value = "10485760", env = "BING_GALLERY_DOWNLOAD_LIMIT")]
    /// Hard ceiling per download in bytes, defaults to 10 MiB.
    /// Env: BING_GALLERY_DOWNLOAD_LIMIT
    pub download_limit: NonZeroU64,

    #[clap(long, default_value_t = MAX_DAY_OFFSET, env = "BING_GALLERY_MAX_DAYS")]
    /// How many days back to look in each market.
    /// Env: BING_GALLERY_MAX_DAYS
    pub max_days: u32,
}
