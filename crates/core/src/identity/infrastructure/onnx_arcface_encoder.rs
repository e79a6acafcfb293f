/// ArcFace face encoder using ONNX Runtime.
///
/// Produces L2-normalised embeddings, so Euclidean distances fall in `[0, 2]`.
use std::path::Path;
use std::sync::Mutex;

use crate::identity::domain::face_encoder::FaceEncoder;
use crate::shared::error::BoxError;
use crate::shared::face_box::{FaceBox, FaceLocation};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{ensure_outputs, load_session};

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// Regions narrower or shorter than this (after clamping) are not encoded.
const MIN_FACE_PX: i32 = 2;

pub struct OnnxArcFaceEncoder {
    session: Mutex<ort::session::Session>,
}

impl OnnxArcFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;
        log::info!("Loaded ArcFace model {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl FaceEncoder for OnnxArcFaceEncoder {
    fn encode(&self, image: &Frame, location: FaceLocation) -> Result<Option<Vec<f32>>, BoxError> {
        let Some(face) = clamp_location(location, image.width(), image.height()) else {
            return Ok(None);
        };
        let crop = image.crop(&face)?;

        let input_value = ort::value::Tensor::from_array(preprocess(&crop))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        ensure_outputs(outputs.len(), "ArcFace")?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding = embedding_slice.to_vec();
        l2_normalize(&mut embedding);
        Ok(Some(embedding))
    }
}

/// Clamps a location to the image and rejects regions too small to encode.
fn clamp_location(location: FaceLocation, width: u32, height: u32) -> Option<FaceBox> {
    let left = location.left.clamp(0, width as i32);
    let right = location.right.clamp(0, width as i32);
    let top = location.top.clamp(0, height as i32);
    let bottom = location.bottom.clamp(0, height as i32);

    if right - left < MIN_FACE_PX || bottom - top < MIN_FACE_PX {
        return None;
    }
    Some(FaceBox::new(left, top, right, bottom))
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(crop: &Frame) -> ndarray::Array4<f32> {
    let src = crop.as_ndarray();
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
