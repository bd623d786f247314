//! ImageMagick subprocess engine.
//!
//! Every invocation runs under a timeout. The child is spawned with
//! `kill_on_drop`, so a timed-out or cancelled call also terminates the
//! external process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use photoline::{Fit, ResizeTarget};
use tokio::process::Command;
use tracing::warn;

use super::RasterEngine;
use crate::error::TransformError;
use crate::geometry::{CropRegion, Dimensions};

/// [`RasterEngine`] that shells out to `convert` and `identify`.
#[derive(Debug, Clone)]
pub struct MagickEngine {
    convert_bin: PathBuf,
    identify_bin: PathBuf,
    timeout: Duration,
}

impl MagickEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            convert_bin: PathBuf::from("convert"),
            identify_bin: PathBuf::from("identify"),
            timeout,
        }
    }

    /// Use explicit binaries instead of looking them up on `PATH`.
    pub fn with_binaries(mut self, convert: impl Into<PathBuf>, identify: impl Into<PathBuf>) -> Self {
        self.convert_bin = convert.into();
        self.identify_bin = identify.into();
        self
    }

    async fn run(&self, program: &Path, args: Vec<OsString>) -> Result<Vec<u8>, TransformError> {
        let name = program.display().to_string();
        let started_at = Instant::now();

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(TransformError::Spawn { program: name, source });
            }
            Err(_) => {
                warn!(
                    program = %name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "raster tool timed out; child killed"
                );
                return Err(TransformError::Timeout { program: name, timeout: self.timeout });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                program = %name,
                exit_code = output.status.code().unwrap_or(-1),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                stderr = %stderr,
                "raster tool failed"
            );
            return Err(TransformError::ToolFailed {
                program: name,
                exit_code: output.status.code(),
                stderr,
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl RasterEngine for MagickEngine {
    async fn dimensions(&self, src: &Path) -> Result<Dimensions, TransformError> {
        let stdout = self.run(&self.identify_bin, identify_args(src)).await?;
        let text = String::from_utf8_lossy(&stdout);
        parse_identify(&text).ok_or_else(|| TransformError::UnexpectedOutput {
            program: self.identify_bin.display().to_string(),
            output: text.into_owned(),
        })
    }

    async fn crop(
        &self,
        src: &Path,
        region: CropRegion,
        dest: &Path,
    ) -> Result<(), TransformError> {
        if region.is_empty() {
            return Err(TransformError::InvalidGeometry(region.to_geometry()));
        }
        self.run(&self.convert_bin, crop_args(src, region, dest)).await?;
        Ok(())
    }

    async fn resize(
        &self,
        src: &Path,
        target: ResizeTarget,
        quality: Option<u8>,
        dest: &Path,
    ) -> Result<(), TransformError> {
        self.run(&self.convert_bin, resize_args(src, target, quality, dest))
            .await?;
        Ok(())
    }
}

/// `identify -format "%w %h" <src>[0]` — first frame only.
fn identify_args(src: &Path) -> Vec<OsString> {
    let mut frame = src.as_os_str().to_owned();
    frame.push("[0]");
    vec!["-format".into(), "%w %h".into(), frame]
}

fn parse_identify(text: &str) -> Option<Dimensions> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(Dimensions::new(width, height))
}

/// `convert <src> -crop WxH+X+Y +repage <dest>`
fn crop_args(src: &Path, region: CropRegion, dest: &Path) -> Vec<OsString> {
    vec![
        src.as_os_str().to_owned(),
        "-crop".into(),
        region.to_geometry().into(),
        "+repage".into(),
        dest.as_os_str().to_owned(),
    ]
}

/// `convert [-quality Q] <src> -resize WxH[!] <dest>`
///
/// A bare `WxH` is ImageMagick's fit-within; the `!` flag forces both sides.
fn resize_args(src: &Path, target: ResizeTarget, quality: Option<u8>, dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(7);
    if let Some(q) = quality {
        args.push("-quality".into());
        args.push(q.to_string().into());
    }
    let flag = match target.fit {
        Fit::Within => "",
        Fit::Exact => "!",
    };
    args.push(src.as_os_str().to_owned());
    args.push("-resize".into());
    args.push(format!("{}x{}{flag}", target.width, target.height).into());
    args.push(dest.as_os_str().to_owned());
    args
}
