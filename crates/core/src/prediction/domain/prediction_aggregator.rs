use crate::prediction::domain::attribute_predictor::AttributePredictor;
use crate::prediction::domain::attributes::Attributes;
use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;

/// Runs every configured predictor on one face crop and merges the results.
///
/// A failing predictor is logged and skipped. Results are collected first
/// and merged in registration order, so a later predictor overrides an
/// earlier one on the same key.
pub struct PredictionAggregator {
    predictors: Vec<Box<dyn AttributePredictor>>,
}

impl PredictionAggregator {
    pub fn new(predictors: Vec<Box<dyn AttributePredictor>>) -> Self {
        Self { predictors }
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    pub fn predictor_names(&self) -> Vec<&str> {
        self.predictors.iter().map(|p| p.name()).collect()
    }

    pub fn predict(&self, face: &Frame) -> Attributes {
        let results: Vec<Attributes> = self
            .predictors
            .iter()
            .filter_map(|predictor| match predictor.predict(face) {
                Ok(attributes) => {
                    log::debug!("{}: {attributes:?}", predictor.name());
                    Some(attributes)
                }
                Err(source) => {
                    let err = AnalysisError::Predictor {
                        predictor: predictor.name().to_string(),
                        source,
                    };
                    log::warn!("{err}; skipping");
                    None
                }
            })
            .collect();

        results.into_iter().fold(Attributes::new(), |mut merged, next| {
            merged.merge(next);
            merged
        })
    }
}
