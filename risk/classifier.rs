//! Adapter between the engine and the trained logistic carrier model.
//!
//! Loading and validating the artifact happens once; afterwards the
//! classifier is immutable and can be shared across threads behind an `Arc`.

use crate::calibrate::model::TrainedModel;
use crate::features::{CarrierFeatures, FEATURE_COLUMNS};
use crate::types::{RiskError, check_probability};
use std::path::Path;

/// File name the CLI looks for when `--model` is not given.
pub const DEFAULT_MODEL_PATH: &str = "carrier_model.toml";

#[derive(Debug, Clone)]
pub struct CarrierClassifier {
    model: TrainedModel,
}

impl CarrierClassifier {
    /// Reads a TOML model artifact. Every failure, from a missing file to an
    /// artifact trained on different columns, is reported as
    /// [`RiskError::ModelUnavailable`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RiskError> {
        let path = path.as_ref();
        let model = TrainedModel::load(path).map_err(|e| {
            RiskError::ModelUnavailable(format!("could not load '{}': {}", path.display(), e))
        })?;
        let classifier = Self::from_model(model)?;
        log::info!("Loaded carrier model from '{}'", path.display());
        Ok(classifier)
    }

    /// Wraps an in-memory model, checking its column contract.
    pub fn from_model(model: TrainedModel) -> Result<Self, RiskError> {
        let names = &model.config.feature_names;
        if !names.iter().map(String::as_str).eq(FEATURE_COLUMNS) {
            return Err(RiskError::ModelUnavailable(format!(
                "model expects feature columns [{}], but this engine produces [{}]",
                names.join(", "),
                FEATURE_COLUMNS.join(", ")
            )));
        }
        if model.coefficients.weights.len() != FEATURE_COLUMNS.len() {
            return Err(RiskError::ModelUnavailable(format!(
                "model stores {} weights for {} feature columns",
                model.coefficients.weights.len(),
                FEATURE_COLUMNS.len()
            )));
        }
        Ok(Self { model })
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Probability that the individual described by `features` is a carrier.
    pub fn predict_carrier_probability(&self, features: &CarrierFeatures) -> Result<f64, RiskError> {
        let probability = self
            .model
            .predict_one(features.as_slice())
            .map_err(|e| RiskError::ModelUnavailable(e.to_string()))?;
        check_probability("classifier output", probability)
    }
}
