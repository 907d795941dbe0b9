use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::prelude::*;
use tracing::debug;

use super::key_resolver::GalleryImage;
use super::Error;

pub const MANIFEST_FILE_NAME: &str = "gallery.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryManifest {
    pub generated_on: DateTime<Utc>,
    pub images: Vec<String>,
}

impl GalleryManifest {
    pub fn from_images(images: &[GalleryImage], generated_on: DateTime<Utc>) -> Self {
        Self {
            generated_on,
            images: images.iter().map(|image| image.slug.clone()).collect(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Writes `gallery.json` into `dir`, replacing whatever was there.
    pub async fn write(&self, dir: &Path) -> Result<PathBuf, Error> {
        let json = self.to_json()?;
        debug!(json = %String::from_utf8_lossy(&json), "serialized");

        let path = dir.join(MANIFEST_FILE_NAME);
        let mut file = fs::File::create(&path).await?;
        file.write_all(&json).await?;
        file.flush().await?;
        Ok(path)
    }
}
