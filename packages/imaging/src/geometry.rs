//! Crop math shared by every engine.

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A rectangular region `width × height` at offset `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// The largest square that fits in `dims`, centred on the longer axis.
    ///
    /// The offset is `(long - short) / 2` with integer division, so an odd
    /// difference leaves the extra pixel on the far edge.
    pub fn centered_square(dims: Dimensions) -> Self {
        let side = dims.width.min(dims.height);
        Self {
            x: (dims.width - side) / 2,
            y: (dims.height - side) / 2,
            width: side,
            height: side,
        }
    }

    /// ImageMagick geometry syntax, e.g. `300x300+50+0`.
    pub fn to_geometry(&self) -> String {
        format!("{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
