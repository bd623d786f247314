//! Size classes and the geometry they map to.
//!
//! Every call site picks an explicit [`Fit`] instead of relying on how an
//! external tool happens to interpret a bare `WxH` geometry string:
//!
//! | Kind | Route | `s` | `m` | `l` |
//! |------|-------|-----|-----|-----|
//! | image | on demand (after square crop) | 128 within | 256 within | original |
//! | image | batch (after square crop) | 128 within | 256 within | never precomputed |
//! | icon | on demand | 32 within | 64 within | 128 within |
//! | icon | batch (after square crop) | 32 exact | 64 exact | 128 exact |

use serde::{Deserialize, Serialize};

/// How a resize treats the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    /// Scale preserving aspect ratio so the result fits inside the box.
    /// The box dimensions are maxima.
    Within,
    /// Force both dimensions, ignoring aspect ratio.
    Exact,
}

/// A resize request: a target box plus how to fit into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
}

impl ResizeTarget {
    pub const fn within(width: u32, height: u32) -> Self {
        Self { width, height, fit: Fit::Within }
    }

    pub const fn exact(width: u32, height: u32) -> Self {
        Self { width, height, fit: Fit::Exact }
    }

    /// Output dimensions for a `src_w × src_h` source.
    ///
    /// `Within` scales by `min(width / src_w, height / src_h)` and rounds,
    /// never producing a zero-sized side.
    pub fn output_dimensions(&self, src_w: u32, src_h: u32) -> (u32, u32) {
        match self.fit {
            Fit::Exact => (self.width.max(1), self.height.max(1)),
            Fit::Within => {
                if src_w == 0 || src_h == 0 {
                    return (self.width.max(1), self.height.max(1));
                }
                let scale = f64::min(
                    self.width as f64 / src_w as f64,
                    self.height as f64 / src_h as f64,
                );
                let w = ((src_w as f64 * scale).round() as u32).clamp(1, self.width.max(1));
                let h = ((src_h as f64 * scale).round() as u32).clamp(1, self.height.max(1));
                (w, h)
            }
        }
    }
}

/// One of the fixed derivative sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// The one-letter suffix used in query strings and derivative file names.
    pub fn suffix(self) -> &'static str {
        match self {
            SizeClass::Small => "s",
            SizeClass::Medium => "m",
            SizeClass::Large => "l",
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "s" => Some(SizeClass::Small),
            "m" => Some(SizeClass::Medium),
            "l" => Some(SizeClass::Large),
            _ => None,
        }
    }

    /// Parse a `size` query value, falling back to `default` when it is
    /// absent, empty, or unrecognised.
    pub fn parse_or(value: Option<&str>, default: SizeClass) -> SizeClass {
        value.and_then(Self::from_suffix).unwrap_or(default)
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// The two kinds of stored source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Entry photos, stored as `<hash>.jpg`.
    Image,
    /// User icons, stored as `<hash>.png`.
    Icon,
}

const IMAGE_SMALL: u32 = 128;
const IMAGE_MEDIUM: u32 = 256;
const ICON_SMALL: u32 = 32;
const ICON_MEDIUM: u32 = 64;
const ICON_LARGE: u32 = 128;

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Image => "jpg",
            AssetKind::Icon => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AssetKind::Image => "image/jpeg",
            AssetKind::Icon => "image/png",
        }
    }

    /// Subdirectory of the data directory holding this kind's sources.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Icon => "icon",
        }
    }

    /// Size served when the request does not name a valid one.
    pub fn default_size(self) -> SizeClass {
        match self {
            AssetKind::Image => SizeClass::Large,
            AssetKind::Icon => SizeClass::Small,
        }
    }

    /// Whether the on-demand route crops to a square before resizing.
    /// Icons are already square when stored, so only images are cropped.
    pub fn crops_on_demand(self) -> bool {
        matches!(self, AssetKind::Image)
    }

    /// Geometry for the on-demand route. `None` means serve the original.
    pub fn on_demand_target(self, size: SizeClass) -> Option<ResizeTarget> {
        match (self, size) {
            (AssetKind::Image, SizeClass::Small) => Some(ResizeTarget::within(IMAGE_SMALL, IMAGE_SMALL)),
            (AssetKind::Image, SizeClass::Medium) => Some(ResizeTarget::within(IMAGE_MEDIUM, IMAGE_MEDIUM)),
            (AssetKind::Image, SizeClass::Large) => None,
            (AssetKind::Icon, SizeClass::Small) => Some(ResizeTarget::within(ICON_SMALL, ICON_SMALL)),
            (AssetKind::Icon, SizeClass::Medium) => Some(ResizeTarget::within(ICON_MEDIUM, ICON_MEDIUM)),
            (AssetKind::Icon, SizeClass::Large) => Some(ResizeTarget::within(ICON_LARGE, ICON_LARGE)),
        }
    }

    /// The sizes the batch pipeline precomputes. Images never precompute
    /// the large size because it is the unmodified original.
    pub fn batch_sizes(self) -> &'static [SizeClass] {
        match self {
            AssetKind::Image => &[SizeClass::Small, SizeClass::Medium],
            AssetKind::Icon => &[SizeClass::Small, SizeClass::Medium, SizeClass::Large],
        }
    }

    /// Geometry for a batch derivative. Both kinds are cropped to a square
    /// first; icons are then forced to the exact box.
    pub fn batch_target(self, size: SizeClass) -> Option<ResizeTarget> {
        match (self, size) {
            (AssetKind::Image, SizeClass::Large) => None,
            (AssetKind::Image, _) => self.on_demand_target(size),
            (AssetKind::Icon, SizeClass::Small) => Some(ResizeTarget::exact(ICON_SMALL, ICON_SMALL)),
            (AssetKind::Icon, SizeClass::Medium) => Some(ResizeTarget::exact(ICON_MEDIUM, ICON_MEDIUM)),
            (AssetKind::Icon, SizeClass::Large) => Some(ResizeTarget::exact(ICON_LARGE, ICON_LARGE)),
        }
    }
}
