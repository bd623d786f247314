//! Server configuration, populated from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use photoline::AssetKind;
use photoline_imaging::RasterKind;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime configuration for the photoline server.
///
/// All fields have defaults, so the server starts with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PHOTOLINE_BIND` | `0.0.0.0:5000` | TCP socket address to listen on |
/// | `PHOTOLINE_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `PHOTOLINE_DATA_DIR` | `./data` | Holds `image/<hash>.jpg` and `icon/<hash>.png` |
/// | `PHOTOLINE_TMP_DIR` | system temp dir | Scratch space for transform temp files |
/// | `PHOTOLINE_POLL_TIMEOUT_SECS` | `30` | Timeline long-poll deadline |
/// | `PHOTOLINE_POLL_INTERVAL_SECS` | `2` | Re-query interval while the timeline is empty |
/// | `PHOTOLINE_RASTER` | `native` | `native` or `magick` |
/// | `PHOTOLINE_MAGICK_TIMEOUT_SECS` | `30` | Per-invocation limit for ImageMagick |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub data_dir: PathBuf,
    pub tmp_dir: PathBuf,

    pub poll_timeout: Duration,
    pub poll_interval: Duration,

    pub raster: RasterKind,
    pub magick_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            db_path: None,
            data_dir: PathBuf::from("./data"),
            tmp_dir: std::env::temp_dir(),
            poll_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            raster: RasterKind::Native,
            magick_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Populate config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("PHOTOLINE_BIND") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                var: "PHOTOLINE_BIND",
                expected: "a socket address (e.g. 0.0.0.0:5000)",
                value: v,
            })?,
            None => defaults.bind_addr,
        };

        let raster = match lookup("PHOTOLINE_RASTER") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                var: "PHOTOLINE_RASTER",
                expected: "`native` or `magick`",
                value: v,
            })?,
            None => defaults.raster,
        };

        Ok(Self {
            bind_addr,
            db_path: lookup("PHOTOLINE_DB").filter(|v| !v.is_empty()),
            data_dir: lookup("PHOTOLINE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            tmp_dir: lookup("PHOTOLINE_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_dir),
            poll_timeout: secs(&lookup, "PHOTOLINE_POLL_TIMEOUT_SECS", defaults.poll_timeout)?,
            poll_interval: secs(&lookup, "PHOTOLINE_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            raster,
            magick_timeout: secs(&lookup, "PHOTOLINE_MAGICK_TIMEOUT_SECS", defaults.magick_timeout)?,
        })
    }

    /// Directory holding sources of `kind`, e.g. `<data_dir>/image`.
    pub fn asset_dir(&self, kind: AssetKind) -> PathBuf {
        self.data_dir.join(kind.dir_name())
    }
}

fn secs<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(v) => match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
            _ => Err(ConfigError::Invalid {
                var,
                expected: "a positive number of seconds",
                value: v,
            }),
        },
    }
}
