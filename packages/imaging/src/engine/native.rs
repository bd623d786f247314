//! In-process engine backed by the `image` crate.
//!
//! Decoding and encoding are CPU-bound, so every operation runs on the
//! blocking thread pool via `spawn_blocking`.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use photoline::ResizeTarget;

use super::RasterEngine;
use crate::error::TransformError;
use crate::geometry::{CropRegion, Dimensions};

/// JPEG quality used when the caller does not ask for one.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// [`RasterEngine`] that decodes, transforms, and re-encodes in-process.
///
/// Output is a pure function of input bytes and parameters.
#[derive(Debug, Clone)]
pub struct NativeEngine {
    filter: FilterType,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterEngine for NativeEngine {
    async fn dimensions(&self, src: &Path) -> Result<Dimensions, TransformError> {
        let src = src.to_path_buf();
        blocking(move || {
            let (width, height) = ImageReader::open(&src)?
                .with_guessed_format()?
                .into_dimensions()?;
            Ok(Dimensions::new(width, height))
        })
        .await
    }

    async fn crop(
        &self,
        src: &Path,
        region: CropRegion,
        dest: &Path,
    ) -> Result<(), TransformError> {
        let (src, dest) = (src.to_path_buf(), dest.to_path_buf());
        blocking(move || {
            let img = open_image(&src)?;
            let (w, h) = img.dimensions();
            if region.x + region.width > w || region.y + region.height > h {
                return Err(TransformError::InvalidGeometry(format!(
                    "crop {} exceeds {w}x{h}",
                    region.to_geometry()
                )));
            }
            let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
            write_image(&cropped, &dest, None)
        })
        .await
    }

    async fn resize(
        &self,
        src: &Path,
        target: ResizeTarget,
        quality: Option<u8>,
        dest: &Path,
    ) -> Result<(), TransformError> {
        let (src, dest) = (src.to_path_buf(), dest.to_path_buf());
        let filter = self.filter;
        blocking(move || {
            let img = open_image(&src)?;
            let (w, h) = target.output_dimensions(img.width(), img.height());
            let resized = img.resize_exact(w, h, filter);
            write_image(&resized, &dest, quality)
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, TransformError>
where
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransformError::Join(e.to_string()))?
}

/// Decode `src`, sniffing the format from its leading bytes. The extension
/// only decides the output format.
fn open_image(src: &Path) -> Result<DynamicImage, TransformError> {
    Ok(ImageReader::open(src)?.with_guessed_format()?.decode()?)
}

/// Encode `img` in the format implied by `dest`'s extension and write it.
fn write_image(img: &DynamicImage, dest: &Path, quality: Option<u8>) -> Result<(), TransformError> {
    let format = ImageFormat::from_path(dest).map_err(|_| {
        TransformError::Codec(format!("unsupported output format: {}", dest.display()))
    })?;

    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let q = quality.unwrap_or(DEFAULT_JPEG_QUALITY);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(q))?;
        }
        other => {
            img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::from(other))?;
        }
    }
    std::fs::write(dest, buf)?;
    Ok(())
}
