//! Greedy, score-free non-maximum suppression for boxes pooled from
//! heterogeneous detectors.
//!
//! Detectors report no comparable confidence, so candidates are ranked by
//! their bottom edge (`y2`) alone: the bottommost box of a cluster survives.
//! Overlap is measured against the *candidate's* own inclusive area rather
//! than the union, which suppresses less aggressively than IoU.

use std::cmp::Ordering;

use crate::shared::face_box::{BoundingBox, FaceBox};

pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

/// Returns the surviving boxes, bottommost first.
///
/// Ties on `y2` are broken by `(x1, y1, x2)` so the result does not depend
/// on the order detectors reported their boxes in.
pub fn suppress(boxes: &[BoundingBox], overlap_threshold: f64) -> Vec<FaceBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let areas: Vec<f64> = boxes.iter().map(BoundingBox::inclusive_area).collect();
    let mut remaining: Vec<usize> = (0..boxes.len()).collect();
    remaining.sort_by(|&a, &b| rank(&boxes[a], &boxes[b]));

    let mut kept = Vec::new();
    while let Some(chosen) = remaining.pop() {
        kept.push(boxes[chosen].to_face_box());
        remaining.retain(|&candidate| {
            let overlap =
                boxes[chosen].inclusive_intersection(&boxes[candidate]) / areas[candidate];
            overlap <= overlap_threshold
        });
    }
    kept
}

fn rank(a: &BoundingBox, b: &BoundingBox) -> Ordering {
    a.y2.total_cmp(&b.y2)
        .then(a.x1.total_cmp(&b.x1))
        .then(a.y1.total_cmp(&b.y1))
        .then(a.x2.total_cmp(&b.x2))
}
