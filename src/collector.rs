//! Collects unique image candidates across markets and days

use std::collections::HashSet;

use tracing::{debug, info, warn};
use url::Url;

use crate::archive::{ArchiveClient, ImageCandidate};
use crate::error::PipelineError;

/// Ordered, deduplicated set of candidates.
#[derive(Debug, Default)]
pub struct Collector {
    target: usize,
    seen: HashSet<String>,
    images: Vec<ImageCandidate>,
}

impl Collector {
    /// An empty collector that fills up at `target` candidates.
    pub fn new(target: usize) -> Self {
        Self {
            target,
            seen: HashSet::new(),
            images: Vec::with_capacity(target),
        }
    }

    /// Adds a candidate unless its key was already seen or the collector is full.
    ///
    /// Returns true when the candidate was kept.
    pub fn offer(&mut self, candidate: ImageCandidate) -> bool {
        if self.is_full() {
            return false;
        }
        if !self.seen.insert(candidate.key().to_string()) {
            debug!("Duplicate image {}", candidate.key());
            return false;
        }
        self.images.push(candidate);
        true
    }

    /// True once `target` unique candidates are held.
    pub fn is_full(&self) -> bool {
        self.images.len() >= self.target
    }

    /// Number of unique candidates so far.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Returns exactly `target` candidates, cycling through the collected ones if short.
    ///
    /// Padding repeats entries on purpose, so the same image may be saved twice.
    pub fn finish(self) -> Result<Vec<ImageCandidate>, PipelineError> {
        if self.images.is_empty() {
            return Err(PipelineError::NoCandidates);
        }
        let unique = self.images.len();
        if unique < self.target {
            warn!(
                "Only found {} unique images, repeating them to reach {}",
                unique, self.target
            );
        }
        Ok(pad_cyclic(self.images, self.target))
    }
}

/// Extends `images` to `target` entries by cycling from the start, or truncates to it.
pub fn pad_cyclic<T: Clone>(mut images: Vec<T>, target: usize) -> Vec<T> {
    let unique = images.len();
    if unique == 0 {
        return images;
    }
    images.truncate(target);
    for index in unique..target {
        let repeat = images[index % unique].clone();
        images.push(repeat);
    }
    images
}

/// Walks markets (outer) and day offsets (inner) until `target` unique candidates are found.
///
/// Every (day, locale) pair is fetched at most once; failures are logged and skipped.
pub async fn collect_candidates(
    archive: &ArchiveClient,
    image_host: &Url,
    locales: &[&str],
    max_day_offset: u32,
    target: usize,
) -> Collector {
    let mut collector = Collector::new(target);
    'markets: for locale in locales {
        for day_offset in 0..max_day_offset {
            if collector.is_full() {
                break 'markets;
            }
            let images = match archive.fetch_images(day_offset, locale).await {
                Ok(images) => images,
                Err(err) => {
                    warn!("No data for {} day {}: {}", locale, day_offset, err);
                    continue;
                }
            };
            let before = collector.len();
            for image in &images {
                let Some(candidate) = ImageCandidate::from_archive(image, image_host) else {
                    continue;
                };
                collector.offer(candidate);
                if collector.is_full() {
                    break;
                }
            }
            debug!(
                "{} day {}: {} new images ({} total)",
                locale,
                day_offset,
                collector.len() - before,
                collector.len()
            );
        }
    }
    info!("Collected {} unique images", collector.len());
    collector
}
