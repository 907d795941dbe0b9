use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusoto_s3::S3Client;
use tokio::fs;
use tracing::{debug, info};

use super::key_resolver::{Galleries, KeyClassifier};
use super::listing::ListingExecutor;
use super::manifest::GalleryManifest;
use super::Error;

#[derive(Debug, Clone)]
pub struct GallerySync {
    pub bucket: String,
    pub galleries_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub keys_listed: usize,
    pub keys_ignored: usize,
    pub galleries_found: usize,
    pub manifests_written: usize,
    pub directories_skipped: usize,
}

pub struct SyncExecutor {
    s3_client: S3Client,
}

impl SyncExecutor {
    pub fn new(s3_client: S3Client) -> Self {
        Self { s3_client }
    }

    pub async fn execute(
        &self,
        GallerySync {
            bucket,
            galleries_dir,
        }: GallerySync,
    ) -> Result<SyncStats, Error> {
        let keys = ListingExecutor::new(self.s3_client.clone())
            .execute(&bucket)
            .await?;
        info!(bucket = %bucket, count = keys.len(), "listed objects");

        let galleries = KeyClassifier::new()?.group_by_gallery(&keys);
        debug!(?galleries, "grouped images");

        let mut stats = write_manifests(&galleries_dir, &galleries, Utc::now()).await?;
        stats.keys_listed = keys.len();
        Ok(stats)
    }
}

/// Writes a manifest into every directory under `galleries_dir` that has images in `galleries`.
///
/// Stops at the first error; manifests written before it are left in place.
pub async fn write_manifests(
    galleries_dir: &Path,
    galleries: &Galleries,
    generated_on: DateTime<Utc>,
) -> Result<SyncStats, Error> {
    let mut stats = SyncStats {
        keys_ignored: galleries.ignored(),
        galleries_found: galleries.len(),
        ..Default::default()
    };

    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(galleries_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !entry.file_type().await?.is_dir() {
            debug!(id = ?name, "not a directory");
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort();

    for (name, path) in dirs {
        let images = match name.to_str().and_then(|id| galleries.get(id)) {
            Some(images) => images,
            None => {
                info!(id = ?name, "gallery id not found in image data, skipping");
                stats.directories_skipped += 1;
                continue;
            }
        };
        info!(image_count = images.len(), gallery = ?name, "image(s) found for gallery");

        let manifest = GalleryManifest::from_images(images, generated_on);
        let written = manifest.write(&path).await?;
        info!(gallery = ?name, path = %written.display(), "generated gallery data");
        stats.manifests_written += 1;
    }
    Ok(stats)
}
