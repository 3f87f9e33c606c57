//! The gallery run: collect, download, shrink, number

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::{ArchiveClient, ImageCandidate};
use crate::collector::collect_candidates;
use crate::config::PipelineConfig;
use crate::constants::USER_AGENT;
use crate::download::{DownloadOutcome, download_capped};
use crate::encode::fit_file_to_budget;
use crate::error::PipelineError;
use crate::search::{Attempt, first_accepted_async};

/// How a run went.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunSummary {
    /// Files written, numbered `1..=saved`
    pub saved: usize,
    /// Slots that were attempted
    pub target: usize,
    /// Unique candidates found before padding
    pub unique_candidates: usize,
}

impl RunSummary {
    /// True when every slot got a file.
    pub fn is_complete(&self) -> bool {
        self.saved == self.target
    }
}

/// Output path for slot `index` (1-based).
pub fn output_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("{index}.jpg"))
}

/// Builds the shared HTTP client.
pub fn build_client() -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| PipelineError::Config(format!("HTTP client: {err}")))
}

/// Runs the whole thing with a fresh HTTP client.
pub async fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let client = build_client()?;
    run_with_client(config, &client).await
}

/// Runs the whole thing: every step is awaited before the next starts.
pub async fn run_with_client(
    config: &PipelineConfig,
    client: &reqwest::Client,
) -> Result<RunSummary, PipelineError> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(PipelineError::OutputDir)?;

    let archive = ArchiveClient::new(client.clone(), config.archive_url.clone());
    let locales: Vec<&str> = config.locales.iter().map(String::as_str).collect();
    let collector = collect_candidates(
        &archive,
        &config.image_host,
        &locales,
        config.max_day_offset,
        config.target_count,
    )
    .await;
    let unique_candidates = collector.len();
    let candidates = collector.finish()?;

    let mut saved = 0;
    for (slot, candidate) in candidates.iter().enumerate() {
        let dest = output_path(&config.output_dir, saved + 1);
        match save_candidate(client, candidate, &dest, config).await {
            Some(bytes) => {
                saved += 1;
                info!(
                    "Saved {} ({} bytes) [{}/{}]",
                    dest.display(),
                    bytes,
                    saved,
                    config.target_count
                );
            }
            None => warn!(
                "Skipping image #{} ({}): every URL failed",
                slot + 1,
                candidate.url
            ),
        }
    }

    let summary = RunSummary {
        saved,
        target: config.target_count,
        unique_candidates,
    };
    if summary.is_complete() {
        info!(
            "Done: saved {} images to {}",
            saved,
            config.output_dir.display()
        );
    } else {
        warn!(
            "Done: saved {} of {} images to {}",
            saved,
            summary.target,
            config.output_dir.display()
        );
    }
    Ok(summary)
}

/// Walks a candidate's URL ladder until one URL yields a file within budget at `dest`.
///
/// Each rung downloads to a `.part` file next to `dest`, which only replaces
/// `dest` once accepted. Returns the stored size, or `None` when every URL
/// failed, in which case `dest` is untouched.
pub async fn save_candidate(
    client: &reqwest::Client,
    candidate: &ImageCandidate,
    dest: &Path,
    config: &PipelineConfig,
) -> Option<u64> {
    let staging = staging_path(dest);
    first_accepted_async(candidate.url_ladder(), async |url: String| {
        let attempt = match try_url(client, &url, &staging, config).await {
            Attempt::Accepted(bytes) => match tokio::fs::rename(&staging, dest).await {
                Ok(()) => Attempt::Accepted(bytes),
                Err(err) => Attempt::Rejected(format!(
                    "failed to move into {}: {}",
                    dest.display(),
                    err
                )),
            },
            rejected => rejected,
        };
        if let Attempt::Rejected(reason) = &attempt {
            warn!("{}: {}", url, reason);
            remove_partial(&staging).await;
        }
        attempt
    })
    .await
}

/// Where a download for `dest` is written before it is accepted.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// One rung of the ladder: download under the ceiling, then shrink to budget if needed.
async fn try_url(
    client: &reqwest::Client,
    url: &str,
    staging: &Path,
    config: &PipelineConfig,
) -> Attempt<u64> {
    let downloaded = match download_capped(client, url, staging, config.download_limit).await {
        Ok(DownloadOutcome::Saved(bytes)) => bytes,
        Ok(DownloadOutcome::TooLarge) => {
            return Attempt::Rejected(format!(
                "larger than the {} byte download limit",
                config.download_limit
            ));
        }
        Ok(DownloadOutcome::BadStatus(status)) => {
            return Attempt::Rejected(format!("HTTP {status}"));
        }
        Err(err) => return Attempt::Rejected(err.to_string()),
    };

    if downloaded <= config.max_bytes {
        return Attempt::Accepted(downloaded);
    }

    debug!(
        "{} is {} bytes, over the {} byte budget",
        url, downloaded, config.max_bytes
    );
    match fit_file_to_budget(staging.to_path_buf(), config.max_bytes).await {
        Ok(fitted) => {
            debug!(
                "Re-encoded {} at {}px q{}",
                url, fitted.setting.width, fitted.setting.quality
            );
            Attempt::Accepted(fitted.bytes)
        }
        Err(err) => Attempt::Rejected(err.to_string()),
    }
}

async fn remove_partial(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await
        && err.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove {}: {}", path.display(), err);
    }
}
