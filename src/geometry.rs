//! Overlap validation and canvas-to-image geometry.

use thiserror::Error;

use crate::models::BoundingBox;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("shape has a non-finite {0}")]
    NonFinite(&'static str),
    #[error("shape collapses to {width}x{height} after scaling")]
    Degenerate { width: i64, height: i64 },
}

/// A rectangle as the drawing surface sees it.
///
/// `width`/`height` are the unscaled dimensions; interactive resizing only
/// touches `scale_x`/`scale_y`. `angle` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle: f64,
}

impl Shape {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }
}

impl From<&BoundingBox> for Shape {
    fn from(bbox: &BoundingBox) -> Self {
        Shape {
            angle: bbox.rotation as f64,
            ..Shape::new(
                bbox.x as f64,
                bbox.y as f64,
                bbox.width as f64,
                bbox.height as f64,
            )
        }
    }
}

/// Natural pixel dimensions of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Returns true if any two boxes intersect on both axes.
pub fn has_overlap(rects: &[BoundingBox]) -> bool {
    find_overlap(rects).is_some()
}

/// First overlapping pair `(i, j)` with `i < j`, in lexicographic order.
pub fn find_overlap(rects: &[BoundingBox]) -> Option<(usize, usize)> {
    for (i, a) in rects.iter().enumerate() {
        for (j, b) in rects.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Rounds to the nearest integer, ties toward positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Converts a canvas shape into a stored bounding box.
///
/// Scale factors are folded into the size by magnitude, so a flipped shape
/// keeps its extent. Shapes that end up narrower or shorter than one pixel are
/// rejected.
pub fn normalize_shape(shape: &Shape) -> Result<BoundingBox, GeometryError> {
    let fields = [
        ("left", shape.left),
        ("top", shape.top),
        ("width", shape.width),
        ("height", shape.height),
        ("scale_x", shape.scale_x),
        ("scale_y", shape.scale_y),
        ("angle", shape.angle),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(GeometryError::NonFinite(*name));
    }

    let width = round_half_up(shape.width * shape.scale_x.abs());
    let height = round_half_up(shape.height * shape.scale_y.abs());
    if width < 1 || height < 1 {
        return Err(GeometryError::Degenerate { width, height });
    }

    Ok(BoundingBox {
        x: clamp_i32(round_half_up(shape.left)),
        y: clamp_i32(round_half_up(shape.top)),
        width: clamp_i32(width),
        height: clamp_i32(height),
        rotation: clamp_i32(round_half_up(shape.angle)),
    })
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Scales an image down, keeping its aspect ratio, until it fits within
/// `max_width` x `max_height`. Images that already fit keep their size.
pub fn fit_to_viewport(natural: ImageSize, max_width: f64, max_height: f64) -> (f64, f64) {
    let mut width = natural.width as f64;
    let mut height = natural.height as f64;

    if width > max_width {
        height = (max_width / width) * height;
        width = max_width;
    }
    if height > max_height {
        width = (max_height / height) * width;
        height = max_height;
    }
    (width, height)
}
