use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::forms::ImageUpload;
use crate::utils::ensure_directory_exists;

/// Subdirectory of the media root holding post images
pub const POST_IMAGES_DIR: &str = "posts_images";

/// Uploaded files on disk, addressed by names relative to the media root
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `image` under a fresh name and returns that name
    pub fn save_image(&self, image: &ImageUpload) -> Result<String> {
        let extension = image
            .extension()
            .with_context(|| format!("{} is not a supported image", image.file_name))?;
        let name = format!(
            "{}/{}.{}",
            POST_IMAGES_DIR,
            uuid::Uuid::new_v4().simple(),
            extension
        );

        let path = self.root.join(&name);
        ensure_directory_exists(&path)?;
        fs::write(&path, &image.bytes)
            .with_context(|| format!("Failed to store image {}", path.display()))?;
        debug!("Stored upload {:?} as {}", image.file_name, name);
        Ok(name)
    }

    /// Deletes a stored file; one that is already gone is fine
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.root.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
