//! Raster transforms, the derivative cache, and the batch thumbnail pipeline.
//!
//! # Layers
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | [`RasterEngine`] backends and the [`Transformer`] that owns temp-file lifecycles |
//! | [`geometry`] | Pure crop math: [`Dimensions`], [`CropRegion`] |
//! | [`cache`] | [`DerivativeCache`]: create-if-absent derivative files next to their sources |
//! | [`pipeline`] | [`ThumbnailPipeline`]: fixed worker pool that fills the cache for a directory |
//!
//! Two engines are provided. [`NativeEngine`] decodes and encodes in-process
//! with the `image` crate; [`MagickEngine`] shells out to ImageMagick's
//! `convert`/`identify` with a per-invocation timeout.

pub mod cache;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod pipeline;

pub use cache::{CommitOutcome, DerivativeCache, DerivativeKey};
pub use engine::{
    magick::MagickEngine, native::NativeEngine, RasterEngine, RasterKind, Transformer,
};
pub use error::{PipelineError, TransformError};
pub use geometry::{CropRegion, Dimensions};
pub use pipeline::{
    parse_source_name, FileFailure, PipelineReport, ThumbnailPipeline,
    DEFAULT_WORKERS,
};
