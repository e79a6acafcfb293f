use std::fs;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::rendering::domain::canvas_transform::{CanvasRect, CanvasTransform};
use crate::rendering::domain::face_renderer::{FaceRenderer, Overlay};
use crate::shared::error::{AnalysisError, BoxError};
use crate::shared::frame::Frame;

const LABEL_PADDING: i32 = 5;
const BOX_THICKNESS: i32 = 2;
const HEADER_MARGIN: u32 = 20;
const HEADER_TEXT_ORIGIN: i32 = 10;
const MIN_HEADER_FONT: u32 = 12;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Renders onto a square canvas with `imageproc`, text via an `ab_glyph` font.
pub struct OverlayRenderer {
    font: FontArc,
    canvas_size: u32,
    label_font_size: f32,
}

impl OverlayRenderer {
    /// The font must cover every script used in labels and the header.
    pub fn new(font_path: &Path, canvas_size: u32, label_font_size: f32) -> Result<Self, BoxError> {
        let bytes = fs::read(font_path)
            .map_err(|e| format!("cannot read font {}: {e}", font_path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| format!("invalid font {}: {e}", font_path.display()))?;
        Ok(Self::with_font(font, canvas_size, label_font_size))
    }

    pub fn with_font(font: FontArc, canvas_size: u32, label_font_size: f32) -> Self {
        Self {
            font,
            canvas_size,
            label_font_size,
        }
    }

    fn draw_label(&self, canvas: RgbImage, rect: &CanvasRect, text: &str, color: Rgb<u8>) -> RgbImage {
        if text.is_empty() {
            return canvas;
        }
        let scale = PxScale::from(self.label_font_size);
        let (text_w, text_h) = text_size(scale, &self.font, text);

        let box_x0 = rect.x - LABEL_PADDING;
        let box_y0 = rect.y - LABEL_PADDING;
        let box_x1 = rect.x + text_w as i32 + LABEL_PADDING;
        let box_y1 = rect.y + text_h as i32 + LABEL_PADDING;

        let mut canvas = extend_to(canvas, box_x1, box_y1);
        let background = Rect::at(box_x0, box_y0)
            .of_size((box_x1 - box_x0 + 1) as u32, (box_y1 - box_y0 + 1) as u32);
        draw_filled_rect_mut(&mut canvas, background, color);
        draw_text_mut(&mut canvas, BLACK, rect.x, rect.y, scale, &self.font, text);
        canvas
    }

    fn add_header(&self, body: &RgbImage, original_width: u32, header: &str) -> RgbImage {
        let font_size = header_font_size(original_width);
        let line_height = (font_size as f64 * 1.5) as u32;
        let lines: Vec<&str> = header.split('\n').collect();
        let header_height = line_height * lines.len() as u32 + HEADER_MARGIN;

        let mut out = RgbImage::from_pixel(body.width(), body.height() + header_height, BLACK);
        imageops::replace(&mut out, body, 0, header_height as i64);

        let scale = PxScale::from(font_size as f32);
        for (i, line) in lines.iter().enumerate() {
            let y = HEADER_TEXT_ORIGIN + (i as u32 * line_height) as i32;
            draw_text_mut(&mut out, WHITE, HEADER_TEXT_ORIGIN, y, scale, &self.font, line);
        }
        out
    }
}

impl FaceRenderer for OverlayRenderer {
    fn render(
        &self,
        image: &Frame,
        overlays: &[Overlay],
        header: &str,
    ) -> Result<Frame, AnalysisError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnalysisError::Render("cannot render an empty image".into()));
        }
        let transform = CanvasTransform::fit(image.width(), image.height(), self.canvas_size);
        let mut canvas = letterbox(image, &transform);

        for overlay in overlays {
            let rect = transform.map_box(&overlay.face);
            let color = Rgb(overlay.color);
            if let Some(label) = &overlay.label {
                canvas = self.draw_label(canvas, &rect, label, color);
            }
            draw_box(&mut canvas, &rect, color);
        }

        let out = self.add_header(&canvas, image.width(), header);
        log::debug!("Rendered {} overlays onto {}x{}", overlays.len(), out.width(), out.height());
        Ok(Frame::from(out))
    }
}

/// Header text size grows with the source width.
fn header_font_size(original_width: u32) -> u32 {
    MIN_HEADER_FONT.max(original_width / 200)
}

/// Scales the frame and centres it on a black square canvas.
fn letterbox(image: &Frame, transform: &CanvasTransform) -> RgbImage {
    let resized = imageops::resize(
        &image.to_rgb_image(),
        transform.scaled_width.max(1),
        transform.scaled_height.max(1),
        FilterType::Triangle,
    );
    let mut canvas = RgbImage::from_pixel(transform.canvas_size, transform.canvas_size, BLACK);
    imageops::replace(&mut canvas, &resized, transform.left as i64, transform.top as i64);
    canvas
}

/// Grows the canvas right and down with black so `(x, y)` is inside it.
fn extend_to(canvas: RgbImage, x: i32, y: i32) -> RgbImage {
    let need_w = (x.max(0) as u32).max(canvas.width());
    let need_h = (y.max(0) as u32).max(canvas.height());
    if need_w == canvas.width() && need_h == canvas.height() {
        return canvas;
    }
    let mut grown = RgbImage::from_pixel(need_w, need_h, BLACK);
    imageops::replace(&mut grown, &canvas, 0, 0);
    grown
}

fn draw_box(canvas: &mut RgbImage, rect: &CanvasRect, color: Rgb<u8>) {
    for inset in 0..BOX_THICKNESS {
        let w = rect.width + 1 - 2 * inset;
        let h = rect.height + 1 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let r = Rect::at(rect.x + inset, rect.y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, r, color);
    }
}
