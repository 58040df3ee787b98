use serde::{Deserialize, Serialize};

/// One annotated region in image pixel coordinates.
///
/// Canvas scale factors are already folded into `width`/`height`, and
/// `rotation` is in whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub rotation: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0,
        }
    }

    pub fn with_rotation(mut self, rotation: i32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Axis-aligned intersection test. Rotation is not taken into account.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let (ax, ay, aw, ah) = self.extent();
        let (bx, by, bw, bh) = other.extent();
        ax < bx + bw && ax + aw > bx && ay < by + bh && ay + ah > by
    }

    fn extent(&self) -> (i64, i64, i64, i64) {
        (
            self.x as i64,
            self.y as i64,
            self.width as i64,
            self.height as i64,
        )
    }
}

/// A persisted image together with its regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    /// Raw image file bytes, base64 encoded.
    pub image_data: String,
    pub bounding_boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub meta_info: Option<String>,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub image_data: String,
    pub bounding_boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub meta_info: Option<String>,
}

/// Body of an update request. `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUpdate {
    #[serde(default)]
    pub bounding_boxes: Option<Vec<BoundingBox>>,
    #[serde(default)]
    pub meta_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub detail: String,
}
