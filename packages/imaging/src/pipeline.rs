//! Batch Thumbnail Pipeline.
//!
//! Scans one asset directory and fills the [`DerivativeCache`] for every
//! batch size class of every source file. Work is fanned out to a fixed
//! pool of workers pulling file names from a shared bounded queue; each
//! worker finishes all sizes of one file before taking the next.
//!
//! A failure on one file is recorded in the [`PipelineReport`] and the run
//! continues. Only an unreadable directory aborts the run.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use photoline::AssetKind;
use regex::Regex;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cache::{CommitOutcome, DerivativeCache, DerivativeKey};
use crate::engine::Transformer;
use crate::error::{PipelineError, TransformError};

/// Workers used when the caller does not say otherwise.
pub const DEFAULT_WORKERS: usize = 4;

static IMAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-f]+)(_(?:s|m|l))?\.jpg$").expect("valid regex"));
static ICON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-z]+)(_(?:s|m|l))?\.png$").expect("valid regex"));

/// Return the source hash if `name` is a source file of `kind`.
///
/// Names that do not match, and names that already carry a size suffix,
/// are not sources.
pub fn parse_source_name(kind: AssetKind, name: &str) -> Option<&str> {
    let re = match kind {
        AssetKind::Image => &*IMAGE_NAME,
        AssetKind::Icon => &*ICON_NAME,
    };
    let caps = re.captures(name)?;
    if caps.get(2).is_some() {
        return None;
    }
    caps.get(1).map(|m| m.as_str())
}

/// One file the pipeline could not finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Summary of one [`ThumbnailPipeline::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Directory entries examined.
    pub scanned: usize,
    /// Entries that are not source files (including existing derivatives).
    pub ignored: usize,
    /// Derivatives written by this run.
    pub created: usize,
    /// Derivatives that already existed.
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: PipelineReport) {
        self.scanned += other.scanned;
        self.ignored += other.ignored;
        self.created += other.created;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Fixed-size worker pool that populates a [`DerivativeCache`].
#[derive(Clone)]
pub struct ThumbnailPipeline {
    transformer: Arc<Transformer>,
    workers: usize,
}

impl ThumbnailPipeline {
    pub fn new(transformer: Arc<Transformer>) -> Self {
        Self {
            transformer,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Produce every missing batch derivative for the sources in `dir`.
    pub async fn run(&self, dir: &Path, kind: AssetKind) -> Result<PipelineReport, PipelineError> {
        let names = list_files(dir).await?;
        let cache = DerivativeCache::new(dir, kind);

        let mut report = PipelineReport {
            scanned: names.len(),
            ..PipelineReport::default()
        };

        let (tx, rx) = mpsc::channel::<String>(self.workers);
        let rx = Arc::new(Mutex::new(rx));

        let mut set = JoinSet::new();
        for _ in 0..self.workers {
            let rx = Arc::clone(&rx);
            let cache = cache.clone();
            let transformer = Arc::clone(&self.transformer);
            set.spawn(async move {
                let mut local = PipelineReport::default();
                loop {
                    // Holding the lock only across recv keeps workers independent.
                    let next = rx.lock().await.recv().await;
                    let Some(name) = next else { break };
                    process_file(&cache, &transformer, &name, &mut local).await;
                }
                local
            });
        }

        for name in names {
            if parse_source_name(kind, &name).is_none() {
                report.ignored += 1;
                continue;
            }
            if tx.send(name).await.is_err() {
                break;
            }
        }
        drop(tx);

        while let Some(joined) = set.join_next().await {
            let local = joined.map_err(|e| PipelineError::Worker(e.to_string()))?;
            report.merge(local);
        }

        info!(
            dir = %dir.display(),
            kind = ?kind,
            scanned = report.scanned,
            ignored = report.ignored,
            created = report.created,
            skipped = report.skipped,
            failed = report.failures.len(),
            "thumbnail pipeline finished"
        );
        Ok(report)
    }
}

/// Regular files in `dir`, sorted by name.
async fn list_files(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let read_err = |source| PipelineError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

async fn process_file(
    cache: &DerivativeCache,
    transformer: &Transformer,
    name: &str,
    report: &mut PipelineReport,
) {
    let Some(hash) = parse_source_name(cache.kind(), name) else {
        return;
    };
    let source = cache.dir().join(name);
    if let Err(error) = make_derivatives(cache, transformer, hash, &source, report).await {
        warn!(file = %name, error = %error, "thumbnail generation failed");
        report.failures.push(FileFailure {
            file: name.to_owned(),
            error: error.to_string(),
        });
    }
}

async fn make_derivatives(
    cache: &DerivativeCache,
    transformer: &Transformer,
    hash: &str,
    source: &Path,
    report: &mut PipelineReport,
) -> Result<(), TransformError> {
    let kind = cache.kind();
    let mut pending = Vec::new();
    for &size in kind.batch_sizes() {
        let Some(target) = kind.batch_target(size) else {
            continue;
        };
        let key = DerivativeKey::new(hash, size);
        if cache.contains(&key).await? {
            info!(path = %cache.path_for(&key).display(), size = %size, "exists");
            report.skipped += 1;
            continue;
        }
        pending.push((key, target));
    }
    if pending.is_empty() {
        return Ok(());
    }

    // Cropped once per file, shared by every missing size.
    let square = transformer.crop_to_square(source, kind.extension()).await?;
    for (key, target) in pending {
        let dest = cache.path_for(&key);
        let staged = cache.staging_path()?;
        transformer.resize_into(&square, target, &staged).await?;
        match cache.commit(staged, &key)? {
            CommitOutcome::Created => {
                info!(path = %dest.display(), size = %key.size, "created");
                report.created += 1;
            }
            CommitOutcome::AlreadyPresent => {
                info!(path = %dest.display(), size = %key.size, "exists");
                report.skipped += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::native::NativeEngine;
    use image::{ImageBuffer, Rgb, Rgba};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, w: u32, h: u32) {
        let img = ImageBuffer::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        img.save(path).unwrap();
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = ImageBuffer::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 9, 255]));
        img.save(path).unwrap();
    }

    fn pipeline(scratch: &TempDir) -> ThumbnailPipeline {
        let transformer =
            Transformer::new(Arc::new(NativeEngine::new()), scratch.path()).with_jpeg_quality(70);
        ThumbnailPipeline::new(Arc::new(transformer))
    }

    fn mtime(path: &Path) -> SystemTime {
        std::fs::metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn source_names_exclude_derivatives_and_other_files() {
        assert_eq!(parse_source_name(AssetKind::Image, "abc123.jpg"), Some("abc123"));
        assert_eq!(parse_source_name(AssetKind::Image, "abc123_s.jpg"), None);
        assert_eq!(parse_source_name(AssetKind::Image, "ABC.jpg"), None);
        assert_eq!(parse_source_name(AssetKind::Image, "abc.png"), None);
        assert_eq!(parse_source_name(AssetKind::Image, ".photoline-x1.jpg"), None);
        assert_eq!(parse_source_name(AssetKind::Icon, "default.png"), Some("default"));
        assert_eq!(parse_source_name(AssetKind::Icon, "default_l.png"), None);
    }

    #[tokio::test]
    async fn image_run_creates_small_and_medium_then_skips() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("hash1.jpg"), 400, 300);

        let pipeline = pipeline(&scratch);
        let report = pipeline.run(dir.path(), AssetKind::Image).await.unwrap();
        assert_eq!(report.created, 2);
        assert!(report.is_success());

        let small = dir.path().join("hash1_s.jpg");
        let medium = dir.path().join("hash1_m.jpg");
        assert_eq!(image::image_dimensions(&small).unwrap(), (128, 128));
        assert_eq!(image::image_dimensions(&medium).unwrap(), (256, 256));
        assert!(!dir.path().join("hash1_l.jpg").exists());

        let (before_s, before_m) = (mtime(&small), mtime(&medium));
        let again = pipeline.run(dir.path(), AssetKind::Image).await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(again.ignored, 2);
        assert_eq!(mtime(&small), before_s);
        assert_eq!(mtime(&medium), before_m);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn icon_run_creates_three_exact_squares() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        write_png(&dir.path().join("face.png"), 150, 100);

        let report = pipeline(&scratch).run(dir.path(), AssetKind::Icon).await.unwrap();
        assert_eq!(report.created, 3);
        for (suffix, side) in [("s", 32), ("m", 64), ("l", 128)] {
            let path = dir.path().join(format!("face_{suffix}.png"));
            assert_eq!(image::image_dimensions(&path).unwrap(), (side, side));
        }
    }

    #[tokio::test]
    async fn broken_file_is_reported_and_others_continue() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.jpg"), b"not a jpeg").unwrap();
        write_jpeg(&dir.path().join("cafe.jpg"), 60, 80);
        write_jpeg(&dir.path().join("f00d.jpg"), 80, 60);

        let report = pipeline(&scratch)
            .with_workers(2)
            .run(dir.path(), AssetKind::Image)
            .await
            .unwrap();

        assert_eq!(report.created, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, "bad.jpg");
        assert!(dir.path().join("cafe_s.jpg").exists());
        assert!(dir.path().join("f00d_m.jpg").exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_aborts_the_run() {
        let scratch = TempDir::new().unwrap();
        let err = pipeline(&scratch)
            .run(Path::new("/nonexistent/photoline"), AssetKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ReadDir { .. }));
    }
}
