use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A failed transform. Fatal for the request or pipeline item that hit it;
/// nothing in this crate retries.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to launch {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("{program} failed (exit {exit_code:?}): {stderr}")]
    ToolFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("unexpected output from {program}: {output:?}")]
    UnexpectedOutput { program: String, output: String },

    #[error("image codec error: {0}")]
    Codec(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("transform task failed: {0}")]
    Join(String),
}

impl From<image::ImageError> for TransformError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => TransformError::Io(io),
            other => TransformError::Codec(other.to_string()),
        }
    }
}

/// A pipeline run that could not proceed at all. Individual file failures
/// are reported in [`crate::PipelineReport`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read source directory {dir}: {source}")]
    ReadDir { dir: PathBuf, source: io::Error },

    #[error("pipeline worker failed: {0}")]
    Worker(String),
}
