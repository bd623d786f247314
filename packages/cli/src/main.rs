//! `photoline-convert` — precompute thumbnails for photoline's stored files.
//!
//! Scans an image directory (`<hash>.jpg`) and/or an icon directory
//! (`<hash>.png`) and writes every missing derivative next to its source:
//!
//! | Kind | Files written |
//! |------|---------------|
//! | image | `<hash>_s.jpg` (128), `<hash>_m.jpg` (256), square-cropped |
//! | icon | `<hash>_s.png` (32), `<hash>_m.png` (64), `<hash>_l.png` (128), exact |
//!
//! Existing derivatives are left alone, so the tool is safe to re-run and to
//! run alongside the server. Every file is attempted; the exit status is 1
//! if any of them failed.
//!
//! ```sh
//! photoline-convert --imgconvdir ./data/image --iconconvdir ./data/icon
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use photoline::AssetKind;
use photoline_imaging::{PipelineReport, RasterKind, ThumbnailPipeline, Transformer, DEFAULT_WORKERS};
use tracing::{error, info};

/// JPEG quality for batch derivatives.
const BATCH_JPEG_QUALITY: u8 = 70;

/// photoline-convert — batch thumbnail generator
#[derive(Parser, Debug)]
#[command(name = "photoline-convert", version, about, long_about = None)]
struct Cli {
    /// Directory of entry photos (`<hash>.jpg`).
    #[arg(long, env = "PHOTOLINE_IMGCONVDIR", value_name = "DIR")]
    imgconvdir: Option<PathBuf>,

    /// Directory of user icons (`<hash>.png`).
    #[arg(long, env = "PHOTOLINE_ICONCONVDIR", value_name = "DIR")]
    iconconvdir: Option<PathBuf>,

    /// Files converted concurrently.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_name = "N")]
    workers: usize,

    /// Raster backend: `native` or `magick`.
    #[arg(long, env = "PHOTOLINE_RASTER", default_value_t = RasterKind::Native)]
    raster: RasterKind,

    /// Per-invocation limit for the `magick` backend.
    #[arg(long, env = "PHOTOLINE_MAGICK_TIMEOUT_SECS", default_value_t = 30, value_name = "SECS")]
    magick_timeout_secs: u64,

    /// Scratch directory for intermediate crops.
    #[arg(long, env = "PHOTOLINE_TMP_DIR", value_name = "DIR")]
    tmp_dir: Option<PathBuf>,
}

impl Cli {
    fn jobs(&self) -> Vec<(AssetKind, &Path)> {
        let mut jobs = Vec::new();
        if let Some(dir) = &self.imgconvdir {
            jobs.push((AssetKind::Image, dir.as_path()));
        }
        if let Some(dir) = &self.iconconvdir {
            jobs.push((AssetKind::Icon, dir.as_path()));
        }
        jobs
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoline_imaging=info,photoline_convert=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let jobs = cli.jobs();
    if jobs.is_empty() {
        eprintln!("error: nothing to do; pass --imgconvdir and/or --iconconvdir");
        return ExitCode::from(2);
    }

    let engine = cli.raster.build(Duration::from_secs(cli.magick_timeout_secs));
    let tmp_dir = cli.tmp_dir.clone().unwrap_or_else(std::env::temp_dir);
    let transformer =
        Arc::new(Transformer::new(engine, tmp_dir).with_jpeg_quality(BATCH_JPEG_QUALITY));
    let pipeline = ThumbnailPipeline::new(transformer).with_workers(cli.workers);

    info!(raster = %cli.raster, workers = cli.workers, "starting conversion");

    let mut ok = true;
    for (kind, dir) in jobs {
        match pipeline.run(dir, kind).await {
            Ok(report) => {
                print_summary(kind, dir, &report);
                ok &= report.is_success();
            }
            Err(e) => {
                error!(dir = %dir.display(), "{e}");
                eprintln!("error: {e}");
                ok = false;
            }
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(kind: AssetKind, dir: &Path, report: &PipelineReport) {
    println!(
        "{} {}: {} created, {} already present, {} ignored, {} failed",
        kind.dir_name(),
        dir.display(),
        report.created,
        report.skipped,
        report.ignored,
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("  failed {}: {}", failure.file, failure.error);
    }
}
