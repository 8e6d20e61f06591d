use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use image::ImageFormat;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{models::posts::UploadedImage, Error, Result};

/// Directory under the media root that holds post images.
pub const POST_IMAGES_DIR: &str = "posts_images";

/// Uploaded files on disk, addressed by paths relative to the media root.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

fn invalid_image() -> Error {
    Error::field(
        "image",
        "Upload a valid image. The file was either not an image or corrupted",
    )
}

impl MediaStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the upload decodes as an image and write it under
    /// `posts_images/`. Returns the stored relative path.
    #[instrument(skip(self, upload), fields(file_name = ?upload.file_name, size = upload.bytes.len()))]
    pub async fn save_post_image(&self, upload: &UploadedImage) -> Result<String> {
        let format = image::guess_format(&upload.bytes).map_err(|_| invalid_image())?;
        image::load_from_memory_with_format(&upload.bytes, format).map_err(|_| invalid_image())?;

        let extension = extension_for(format);
        let relative = format!("{}/{}.{}", POST_IMAGES_DIR, Uuid::now_v7(), extension);

        let dir = self.root.join(POST_IMAGES_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.root.join(&relative), &upload.bytes).await?;

        debug!(path = %relative, "Stored post image");

        Ok(relative)
    }

    /// Remove a stored file. A file that is already gone is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let Some(path) = self.resolve(relative) else {
            warn!(path = %relative, "Refusing to delete a path outside the media root");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %relative, "Deleted media file");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        inside.then(|| self.root.join(relative))
    }
}

fn extension_for(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// A tiny encoded PNG.
#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    use image::{DynamicImage, RgbImage};

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(2, 2))
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
