//! Raster Transform Engine.
//!
//! [`RasterEngine`] is the seam between the service and whatever performs
//! pixel work. Engines operate on file paths only; [`Transformer`] wraps an
//! engine and owns every temporary file it creates, so callers pass a source
//! path and get encoded bytes back with cleanup on every exit path.
//!
//! Temporary files are [`tempfile::TempPath`]s: they are unlinked when
//! dropped, whether the operation succeeded, failed, or its future was
//! cancelled mid-await.

pub mod magick;
pub mod native;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use photoline::ResizeTarget;
use tempfile::TempPath;

use crate::error::TransformError;
use crate::geometry::{CropRegion, Dimensions};

/// Deterministic geometric raster operations on files.
///
/// Implementations must write `dest` completely or fail; a non-zero tool exit
/// or any filesystem error is returned as a [`TransformError`]. The format of
/// `dest` is chosen from its extension.
#[async_trait]
pub trait RasterEngine: Send + Sync + 'static {
    /// Read the pixel dimensions of `src`.
    async fn dimensions(&self, src: &Path) -> Result<Dimensions, TransformError>;

    /// Write the `region` of `src` to `dest`.
    async fn crop(&self, src: &Path, region: CropRegion, dest: &Path)
        -> Result<(), TransformError>;

    /// Write `src` resized to `target` into `dest`. `quality` applies to
    /// lossy output formats only.
    async fn resize(
        &self,
        src: &Path,
        target: ResizeTarget,
        quality: Option<u8>,
        dest: &Path,
    ) -> Result<(), TransformError>;
}

/// Which [`RasterEngine`] backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterKind {
    /// In-process `image` crate codec.
    #[default]
    Native,
    /// ImageMagick `convert`/`identify` subprocesses.
    Magick,
}

impl RasterKind {
    /// Construct the engine. `timeout` bounds each subprocess and is
    /// ignored by the native engine.
    pub fn build(self, timeout: Duration) -> Arc<dyn RasterEngine> {
        match self {
            RasterKind::Native => Arc::new(native::NativeEngine::new()),
            RasterKind::Magick => Arc::new(magick::MagickEngine::new(timeout)),
        }
    }
}

impl FromStr for RasterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(RasterKind::Native),
            "magick" | "imagemagick" => Ok(RasterKind::Magick),
            other => Err(format!("unknown raster engine {other:?}; expected native or magick")),
        }
    }
}

impl fmt::Display for RasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RasterKind::Native => "native",
            RasterKind::Magick => "magick",
        })
    }
}

/// Byte- and path-level transforms over a [`RasterEngine`], with scoped
/// temporary files.
#[derive(Clone)]
pub struct Transformer {
    engine: Arc<dyn RasterEngine>,
    tmp_dir: PathBuf,
    jpeg_quality: Option<u8>,
}

impl Transformer {
    pub fn new(engine: Arc<dyn RasterEngine>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            tmp_dir: tmp_dir.into(),
            jpeg_quality: None,
        }
    }

    /// Encode lossy output at `quality` instead of the engine default.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    /// Allocate an empty temporary file ending in `.<ext>` in the scratch
    /// directory. It is removed when the returned path is dropped.
    pub fn temp_path(&self, ext: &str) -> Result<TempPath, TransformError> {
        scratch_file(&self.tmp_dir, ext)
    }

    /// Resize the file at `src` and return the encoded result. The output
    /// temp file is removed before returning.
    pub async fn resize_file(
        &self,
        src: &Path,
        ext: &str,
        target: Option<ResizeTarget>,
    ) -> Result<Bytes, TransformError> {
        let Some(target) = target else {
            return Ok(Bytes::from(tokio::fs::read(src).await?));
        };
        let output = self.temp_path(ext)?;
        self.resize_into(src, target, &output).await?;
        let data = tokio::fs::read(&output).await?;
        Ok(Bytes::from(data))
    }

    /// Resize `src` into the caller-provided `dest`.
    pub async fn resize_into(
        &self,
        src: &Path,
        target: ResizeTarget,
        dest: &Path,
    ) -> Result<(), TransformError> {
        validate_target(target)?;
        self.engine
            .resize(src, target, self.jpeg_quality, dest)
            .await
    }

    /// Crop `src` to its largest centred square and return the path of the
    /// new temporary file. The caller owns it; dropping the [`TempPath`]
    /// removes the file.
    pub async fn crop_to_square(&self, src: &Path, ext: &str) -> Result<TempPath, TransformError> {
        let dims = self.engine.dimensions(src).await?;
        let region = CropRegion::centered_square(dims);
        if region.is_empty() {
            return Err(TransformError::InvalidGeometry(format!(
                "cannot crop a {}x{} image",
                dims.width, dims.height
            )));
        }
        let output = self.temp_path(ext)?;
        self.engine.crop(src, region, &output).await?;
        tracing::debug!(
            src = %src.display(),
            width = dims.width,
            height = dims.height,
            crop = %region.to_geometry(),
            "cropped to square"
        );
        Ok(output)
    }
}

pub(crate) fn scratch_file(dir: &Path, ext: &str) -> Result<TempPath, TransformError> {
    let file = tempfile::Builder::new()
        .prefix(".photoline-")
        .suffix(&format!(".{ext}"))
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

fn validate_target(target: ResizeTarget) -> Result<(), TransformError> {
    if target.width == 0 || target.height == 0 {
        return Err(TransformError::InvalidGeometry(format!(
            "resize target must be positive, got {}x{}",
            target.width, target.height
        )));
    }
    Ok(())
}
