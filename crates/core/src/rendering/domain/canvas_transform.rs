//! Fit-and-pad geometry for the square output canvas.
//!
//! The image is scaled so its longer side equals the canvas side, then
//! centred with black padding. Face boxes go through the same scale and
//! offsets so overlays stay aligned. All rounding is truncation, so the
//! mapping is exactly reproducible for given dimensions.

use crate::shared::face_box::FaceBox;

pub const DEFAULT_CANVAS_SIZE: u32 = 512;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasTransform {
    pub scale: f64,
    /// Size of the scaled image before padding.
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub top: u32,
    pub left: u32,
    pub canvas_size: u32,
}

/// A face box in canvas pixels, as origin plus size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CanvasTransform {
    pub fn fit(width: u32, height: u32, canvas_size: u32) -> Self {
        let scale = canvas_size as f64 / width.max(height) as f64;
        let scaled_width = (width as f64 * scale) as u32;
        let scaled_height = (height as f64 * scale) as u32;
        Self {
            scale,
            scaled_width,
            scaled_height,
            top: (canvas_size - scaled_height) / 2,
            left: (canvas_size - scaled_width) / 2,
            canvas_size,
        }
    }

    pub fn map_box(&self, face: &FaceBox) -> CanvasRect {
        CanvasRect {
            x: self.scale_coord(face.x1) + self.left as i32,
            y: self.scale_coord(face.y1) + self.top as i32,
            width: self.scale_coord(face.width()),
            height: self.scale_coord(face.height()),
        }
    }

    fn scale_coord(&self, v: i32) -> i32 {
        (v as f64 * self.scale) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_landscape_is_padded_vertically() {
        let t = CanvasTransform::fit(1024, 768, 512);
        assert_relative_eq!(t.scale, 0.5);
        assert_eq!((t.scaled_width, t.scaled_height), (512, 384));
        assert_eq!((t.top, t.left), (64, 0));
    }

    #[test]
    fn test_portrait_is_padded_horizontally() {
        let t = CanvasTransform::fit(300, 600, 512);
        assert_eq!((t.scaled_width, t.scaled_height), (256, 512));
        assert_eq!((t.top, t.left), (0, 128));
    }

    #[test]
    fn test_odd_padding_puts_extra_pixel_after() {
        // 1000x333 → 512x170; delta 342 → top 171.
        let t = CanvasTransform::fit(1000, 333, 512);
        assert_eq!(t.scaled_height, 170);
        assert_eq!(t.top, 171);
    }

    #[test]
    fn test_small_image_is_upscaled() {
        let t = CanvasTransform::fit(128, 64, 512);
        assert_relative_eq!(t.scale, 4.0);
        assert_eq!((t.scaled_width, t.scaled_height, t.top), (512, 256, 128));
    }

    #[test]
    fn test_map_box_scales_and_offsets() {
        let t = CanvasTransform::fit(1024, 768, 512);
        let rect = t.map_box(&FaceBox::new(100, 200, 301, 401));
        assert_eq!(
            rect,
            CanvasRect {
                x: 50,
                y: 164,
                width: 100,
                height: 100
            }
        );
    }

    #[rstest]
    #[case(640, 480)]
    #[case(333, 1001)]
    #[case(512, 512)]
    fn test_map_box_is_deterministic(#[case] w: u32, #[case] h: u32) {
        let face = FaceBox::new(17, 23, 91, 117);
        let a = CanvasTransform::fit(w, h, 512).map_box(&face);
        let b = CanvasTransform::fit(w, h, 512).map_box(&face);
        assert_eq!(a, b);
    }
}
