use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use tracing::{debug, info};

use super::Error;

/// `images/<gallery id>/<image name>.<jpg|png>`, where a gallery id is eight ASCII digits followed
/// by letters, digits or hyphens.
pub const IMAGE_KEY_PATTERN: &str = r"^images/([0-9]{8}[A-Za-z0-9-]+)/([^/]+)\.(jpg|png)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpg,
    Png,
}

impl ImageType {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageType::Jpg => "jpg",
            ImageType::Png => "png",
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(ImageType::Jpg),
            "png" => Ok(ImageType::Png),
            other => Err(format!("unsupported image type {}", other).into()),
        }
    }
}

/// An object key that matched [`IMAGE_KEY_PATTERN`].
///
/// `slug` is the whole key, not the part below the gallery directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub slug: String,
    pub gallery_id: String,
    pub image_name: String,
    pub image_type: ImageType,
}

pub struct KeyClassifier {
    pattern: Regex,
}

impl KeyClassifier {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            pattern: Regex::new(IMAGE_KEY_PATTERN)?,
        })
    }

    pub fn classify(&self, key: &str) -> Option<GalleryImage> {
        debug!(key, "checking");
        let image = self.pattern.captures(key).and_then(|caps| {
            Some(GalleryImage {
                slug: caps.get(0)?.as_str().to_string(),
                gallery_id: caps.get(1)?.as_str().to_string(),
                image_name: caps.get(2)?.as_str().to_string(),
                image_type: caps.get(3)?.as_str().parse().ok()?,
            })
        });
        match &image {
            Some(image) => debug!(
                slug = %image.slug,
                gallery = %image.gallery_id,
                image_name = %image.image_name,
                image_type = %image.image_type,
                "match found"
            ),
            None => info!(key, "ignoring"),
        }
        image
    }

    /// Groups matching keys by gallery id, keeping the order the keys were given in.
    pub fn group_by_gallery<I, S>(&self, keys: I) -> Galleries
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut galleries = Galleries::default();
        for key in keys {
            match self.classify(key.as_ref()) {
                Some(image) => galleries
                    .images
                    .entry(image.gallery_id.clone())
                    .or_insert_with(Vec::new)
                    .push(image),
                None => galleries.ignored += 1,
            }
        }
        galleries
    }
}

#[derive(Debug, Default)]
pub struct Galleries {
    images: BTreeMap<String, Vec<GalleryImage>>,
    ignored: usize,
}

impl Galleries {
    pub fn get(&self, gallery_id: &str) -> Option<&[GalleryImage]> {
        self.images.get(gallery_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn ignored(&self) -> usize {
        self.ignored
    }
}
