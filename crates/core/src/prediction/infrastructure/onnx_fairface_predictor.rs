/// FairFace race/gender/age classifier using ONNX Runtime.
///
/// The model is a ResNet-34 with an 18-way head: logits `[0..7)` are the
/// seven-race split (only the first four are reported), `[7..9)` gender and
/// `[9..18)` age bracket.
use std::ops::Range;
use std::path::Path;
use std::sync::Mutex;

use crate::prediction::domain::attribute_predictor::AttributePredictor;
use crate::prediction::domain::attributes::Attributes;
use crate::shared::constants::{
    AGE_BRACKETS, FEMALE, FEMALE_BOX_COLOR, KEY_AGE, KEY_BOX_COLOR, KEY_GENDER, KEY_RACE, MALE,
    MALE_BOX_COLOR, RACES,
};
use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{ensure_outputs, load_session};

const INPUT_SIZE: usize = 224;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const RACE_LOGITS: Range<usize> = 0..4;
const GENDER_LOGITS: Range<usize> = 7..9;
const AGE_LOGITS: Range<usize> = 9..18;

pub struct OnnxFairFacePredictor {
    session: Mutex<ort::session::Session>,
}

impl OnnxFairFacePredictor {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;
        log::info!("Loaded FairFace model {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl AttributePredictor for OnnxFairFacePredictor {
    fn name(&self) -> &str {
        "fairface"
    }

    fn predict(&self, face: &Frame) -> Result<Attributes, BoxError> {
        if face.width() == 0 || face.height() == 0 {
            return Err("face crop is empty".into());
        }

        let input_value = ort::value::Tensor::from_array(preprocess(face))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        ensure_outputs(outputs.len(), "FairFace")?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.as_slice().ok_or("Cannot get logits slice")?;

        decode(logits)
    }
}

/// Resize to 224x224 (nearest, pixel centres), ImageNet-normalise, NCHW.
fn preprocess(face: &Frame) -> ndarray::Array4<f32> {
    let src = face.as_ndarray();
    let src_w = face.width() as usize;
    let src_h = face.height() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let v = src[[src_y, src_x, c]] as f32 / 255.0;
                tensor[[0, c, y, x]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
    }
    tensor
}

fn decode(logits: &[f32]) -> Result<Attributes, BoxError> {
    if logits.len() < AGE_LOGITS.end {
        return Err(format!(
            "expected at least {} logits, got {}",
            AGE_LOGITS.end,
            logits.len()
        )
        .into());
    }

    let race = RACES[argmax(&logits[RACE_LOGITS])];
    let (gender, box_color) = match argmax(&logits[GENDER_LOGITS]) {
        0 => (MALE, MALE_BOX_COLOR),
        _ => (FEMALE, FEMALE_BOX_COLOR),
    };
    let age = AGE_BRACKETS[argmax(&logits[AGE_LOGITS])];

    Ok(Attributes::new()
        .with(KEY_RACE, race)
        .with(KEY_GENDER, gender)
        .with(KEY_BOX_COLOR, box_color)
        .with(KEY_AGE, age))
}

/// Index of the first maximum.
fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}
