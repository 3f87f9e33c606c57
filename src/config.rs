//! Config handling

use std::path::PathBuf;

use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::constants::{
    DEFAULT_ARCHIVE_URL, DEFAULT_IMAGE_HOST, DOWNLOAD_LIMIT_BYTES, LOCALES, MAX_BYTES,
    MAX_DAY_OFFSET, TARGET_COUNT,
};
use crate::error::PipelineError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Everything a gallery run needs to know.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Where `1.jpg..N.jpg` go
    pub output_dir: PathBuf,
    /// Archive endpoint, query parameters are appended per request
    pub archive_url: Url,
    /// Base for relative image URLs
    pub image_host: Url,
    /// Number of output slots
    pub target_count: usize,
    /// Size budget per stored file
    pub max_bytes: u64,
    /// Ceiling per download, above `max_bytes`
    pub download_limit: u64,
    /// Day offsets `0..max_day_offset` are queried per market
    pub max_day_offset: u32,
    /// Markets queried, in order
    pub locales: Vec<String>,
}

impl PipelineConfig {
    /// Compiled-in defaults, writing to `output_dir`.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        Ok(Self {
            output_dir: output_dir.into(),
            archive_url: parse_url(DEFAULT_ARCHIVE_URL)?,
            image_host: parse_url(DEFAULT_IMAGE_HOST)?,
            target_count: TARGET_COUNT,
            max_bytes: MAX_BYTES,
            download_limit: DOWNLOAD_LIMIT_BYTES,
            max_day_offset: MAX_DAY_OFFSET,
            locales: LOCALES.iter().map(|locale| (*locale).to_string()).collect(),
        })
    }
}

impl TryFrom<&CliOptions> for PipelineConfig {
    type Error = PipelineError;

    fn try_from(cli: &CliOptions) -> Result<Self, Self::Error> {
        Ok(Self {
            archive_url: parse_url(&cli.archive_url)?,
            image_host: parse_url(&cli.image_host)?,
            target_count: cli.target_count.get(),
            max_bytes: cli.max_bytes.get(),
            download_limit: cli.download_limit.get(),
            max_day_offset: cli.max_days,
            ..Self::with_output_dir(cli.output_dir.clone())?
        })
    }
}

fn parse_url(value: &str) -> Result<Url, PipelineError> {
    Url::parse(value).map_err(|err| PipelineError::Config(format!("{value}: {err}")))
}
