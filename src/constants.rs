//! Shared constants/defaults for the gallery run
//!

/// Where the gallery ends up unless told otherwise
pub const DEFAULT_OUTPUT_DIR: &str = "./public/images/bing";

/// Image-of-the-day archive endpoint
pub const DEFAULT_ARCHIVE_URL: &str = "https://www.bing.com/HPImageArchive.aspx";

/// Host that relative image URLs and `urlbase` values hang off
pub const DEFAULT_IMAGE_HOST: &str = "https://www.bing.com";

/// Number of images the gallery holds.
pub const TARGET_COUNT: usize = 50;

/// Size budget for each stored file (500 KiB).
pub const MAX_BYTES: u64 = 500 * 1024;

/// Hard ceiling for a single download (10 MiB).
pub const DOWNLOAD_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// How many days back the archive is queried, exclusive.
pub const MAX_DAY_OFFSET: u32 = 8;

/// Images requested per archive call (`n=`).
pub const IMAGES_PER_REQUEST: u32 = 1;

/// Market locales queried, in order.
pub const LOCALES: &[&str] = &[
    "en-US", "en-GB", "en-AU", "en-CA", "en-IN", "en-NZ", "en-IE", "en-SG", "en-ZA", "de-DE",
    "de-AT", "de-CH", "fr-FR", "fr-CA", "fr-BE", "fr-CH", "es-ES", "es-MX", "es-AR", "it-IT",
    "pt-BR", "pt-PT", "nl-NL", "nl-BE", "ja-JP", "zh-CN", "zh-TW", "ko-KR", "sv-SE", "pl-PL",
];

/// Fallback size variants synthesized from `urlbase`, tried after the canonical URL.
pub const SIZE_SUFFIXES: &[&str] = &["800x600", "640x480", "400x240"];

/// JPEG qualities tried at each width, best first.
pub const QUALITY_LADDER: &[u8] = &[80, 70, 60, 55, 50, 45, 40, 35];

/// Common display widths, descending. Only those at or below the source width are used.
pub const COMMON_WIDTHS: &[u32] = &[1920, 1600, 1366, 1280, 1024, 960, 800, 640];

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
