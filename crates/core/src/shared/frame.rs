use image::RgbImage;
use ndarray::ArrayView3;

use crate::shared::error::AnalysisError;
use crate::shared::face_box::FaceBox;

/// A decoded image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, Self::CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copies out the pixels inside `face`, clamped to the frame.
    ///
    /// Fails when nothing of the box remains after clamping.
    pub fn crop(&self, face: &FaceBox) -> Result<Frame, AnalysisError> {
        let x1 = face.x1.clamp(0, self.width as i32) as usize;
        let y1 = face.y1.clamp(0, self.height as i32) as usize;
        let x2 = face.x2.clamp(0, self.width as i32) as usize;
        let y2 = face.y2.clamp(0, self.height as i32) as usize;

        if x2 <= x1 || y2 <= y1 {
            return Err(AnalysisError::Crop {
                x1: face.x1,
                y1: face.y1,
                x2: face.x2,
                y2: face.y2,
                width: self.width,
                height: self.height,
            });
        }

        let stride = self.width as usize * Self::CHANNELS;
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * Self::CHANNELS);
        for row in y1..y2 {
            let start = row * stride + x1 * Self::CHANNELS;
            let end = row * stride + x2 * Self::CHANNELS;
            data.extend_from_slice(&self.data[start..end]);
        }
        Ok(Frame::new(data, (x2 - x1) as u32, (y2 - y1) as u32))
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Frame::new(img.into_raw(), width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, w, h)
    }

    #[test]
    fn test_construction_and_accessors() {
        let frame = Frame::new(vec![0u8; 12], 2, 2);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.data().len(), 12);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2);
    }

    #[test]
    fn test_filled_repeats_colour() {
        let frame = Frame::filled(3, 2, [1, 2, 3]);
        assert_eq!(frame.data().len(), 18);
        assert_eq!(&frame.data()[15..18], &[1, 2, 3]);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_crop_extracts_region() {
        let frame = gradient_frame(10, 10);
        let crop = frame.crop(&FaceBox::new(2, 3, 5, 7)).unwrap();
        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 4);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 2);
        assert_eq!(arr[[0, 0, 1]], 3);
        assert_eq!(arr[[3, 2, 0]], 4);
        assert_eq!(arr[[3, 2, 1]], 6);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame(10, 10);
        let crop = frame.crop(&FaceBox::new(-5, -5, 4, 20)).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 10);
    }

    #[test]
    fn test_crop_outside_frame_fails() {
        let frame = gradient_frame(10, 10);
        let err = frame.crop(&FaceBox::new(20, 20, 30, 30)).unwrap_err();
        assert!(matches!(err, AnalysisError::Crop { .. }));
    }

    #[test]
    fn test_crop_degenerate_box_fails() {
        let frame = gradient_frame(10, 10);
        assert!(frame.crop(&FaceBox::new(4, 4, 4, 8)).is_err());
    }

    #[test]
    fn test_rgb_image_conversion_preserves_pixels() {
        let frame = gradient_frame(4, 3);
        let img = frame.to_rgb_image();
        assert_eq!(img.get_pixel(3, 2).0, [3, 2, 0]);
        assert_eq!(Frame::from(img), frame);
    }
}
