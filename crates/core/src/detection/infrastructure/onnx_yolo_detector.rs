/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Prefers the original file on disk so it sees full-resolution pixels
/// independent of how the pipeline decoded the image; falls back to the
/// pipeline's frame when no path is available.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_detector::{DetectionSource, FaceDetector, InputShape};
use crate::shared::error::BoxError;
use crate::shared::face_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{ensure_outputs, load_session};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// IoU threshold for the model's own confidence-ranked NMS.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox fill, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded YOLO face model {} (input {input_size}px)",
            model_path.display()
        );
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }

    fn detect_frame(&self, frame: &Frame) -> Result<Vec<BoundingBox>, BoxError> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        ensure_outputs(outputs.len(), "YOLO")?;
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let rows = decode_rows(data, shape[1], shape[2]);
        let mut candidates: Vec<Scored> = rows
            .into_iter()
            .filter(|row| row.len() >= 5 && row[4] as f64 >= self.confidence)
            .map(|row| Scored {
                bbox: unletterbox(&row, scale, pad_x, pad_y),
                confidence: row[4] as f64,
            })
            .collect();

        Ok(nms(&mut candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|s| s.bbox)
            .collect())
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn name(&self) -> &str {
        "yolo"
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Path
    }

    fn detect(&self, source: DetectionSource<'_>) -> Result<Vec<BoundingBox>, BoxError> {
        match source {
            DetectionSource::Frame(frame) => self.detect_frame(frame),
            DetectionSource::Path(path) => {
                let frame = Frame::from(image::open(path)?.to_rgb8());
                self.detect_frame(&frame)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pre/post-processing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_VALUE,
    );

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Splits the raw output into one row per detection.
///
/// YOLO exports either `[1, features, detections]` (transposed) or
/// `[1, detections, features]`; the smaller axis is the feature axis.
fn decode_rows(data: &[f32], dim1: usize, dim2: usize) -> Vec<Vec<f32>> {
    if dim1 < dim2 {
        let (num_feats, num_dets) = (dim1, dim2);
        (0..num_dets)
            .map(|i| (0..num_feats).map(|f| data[f * num_dets + i]).collect())
            .collect()
    } else {
        let (num_dets, num_feats) = (dim1, dim2);
        (0..num_dets)
            .map(|i| data[i * num_feats..(i + 1) * num_feats].to_vec())
            .collect()
    }
}

/// Map a `[cx, cy, w, h, ...]` row from letterbox space back to source pixels.
fn unletterbox(row: &[f32], scale: f64, pad_x: u32, pad_y: u32) -> BoundingBox {
    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    BoundingBox::new(
        ((cx - w / 2.0) - pad_x as f64) / scale,
        ((cy - h / 2.0) - pad_y as f64) / scale,
        ((cx + w / 2.0) - pad_x as f64) / scale,
        ((cy + h / 2.0) - pad_y as f64) / scale,
    )
}

#[derive(Clone, Debug)]
struct Scored {
    bbox: BoundingBox,
    confidence: f64,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [Scored], iou_thresh: f64) -> Vec<Scored> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Scored> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0)
        * (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
