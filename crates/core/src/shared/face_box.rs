/// Raw face box as reported by a detector, in source-image pixels.
///
/// Coordinates are corner form `(x1, y1, x2, y2)` with `x2 >= x1`, `y2 >= y1`.
/// Detectors disagree on precision, so values stay floating point until NMS
/// selects the survivors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Area under the inclusive pixel-count convention: `(x2-x1+1)*(y2-y1+1)`.
    pub fn inclusive_area(&self) -> f64 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    /// Inclusive intersection area with `other`; zero when disjoint.
    pub fn inclusive_intersection(&self, other: &BoundingBox) -> f64 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        w * h
    }

    /// Integer box, truncating each coordinate toward zero.
    pub fn to_face_box(&self) -> FaceBox {
        FaceBox {
            x1: self.x1 as i32,
            y1: self.y1 as i32,
            x2: self.x2 as i32,
            y2: self.y2 as i32,
        }
    }
}

/// A deduplicated face box in integer pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl FaceBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

impl From<FaceBox> for BoundingBox {
    fn from(b: FaceBox) -> Self {
        BoundingBox::new(b.x1 as f64, b.y1 as f64, b.x2 as f64, b.y2 as f64)
    }
}

/// Face location in the encoder's `(top, right, bottom, left)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl From<FaceBox> for FaceLocation {
    fn from(b: FaceBox) -> Self {
        FaceLocation {
            top: b.y1,
            right: b.x2,
            bottom: b.y2,
            left: b.x1,
        }
    }
}
