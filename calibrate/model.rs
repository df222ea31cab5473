use crate::features::FEATURE_COLUMNS;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of the trained
// carrier classifier when serialized to a TOML file.

/// Hyperparameters and structural information needed to reproduce a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ridge penalty applied to every non-intercept weight.
    pub ridge_penalty: f64,
    /// Maximum number of IRLS iterations.
    pub max_iterations: usize,
    /// Convergence tolerance on the relative change of the penalized deviance.
    pub convergence_tolerance: f64,
    /// Share of rows held out for accuracy and ROC-AUC reporting.
    pub holdout_fraction: f64,
    /// Seed of the holdout shuffle.
    pub seed: u64,
    /// Defines the canonical order of the feature columns. Prediction inputs
    /// must follow exactly this order.
    pub feature_names: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ridge_penalty: 1.0,
            max_iterations: 50,
            convergence_tolerance: 1e-8,
            holdout_fraction: 0.2,
            seed: 42,
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fitted logistic-regression coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedCoefficients {
    pub intercept: f64,
    /// One weight per entry of `ModelConfig::feature_names`, in the same order.
    pub weights: Vec<f64>,
}

/// Quality of the fit as measured at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub training_rows: usize,
    pub evaluation_rows: usize,
    pub iterations: usize,
    pub penalized_deviance: f64,
    pub accuracy: f64,
    /// Absent when the evaluation rows contain a single class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc_auc: Option<f64>,
}

/// The top-level, self-contained, trained model artifact.
/// This is the structure that gets saved to and loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub config: ModelConfig,
    pub coefficients: MappedCoefficients,
    pub summary: TrainingSummary,
}

/// Custom error type for model loading, saving, and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Prediction data has {found} feature columns, but the model was trained on {expected}.")]
    MismatchedFeatureCount { found: usize, expected: usize },
    #[error(
        "Model stores {weights} weights for {features} feature names. The artifact is inconsistent."
    )]
    InconsistentCoefficients { weights: usize, features: usize },
}

impl TrainedModel {
    /// Predicts carrier probabilities for a batch of feature rows.
    ///
    /// # Arguments
    /// * `features`: A 2D array view with shape `[n_samples, n_features]`. The
    ///   column order must match `config.feature_names`.
    pub fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.check_consistency()?;
        if features.ncols() != self.config.feature_names.len() {
            return Err(ModelError::MismatchedFeatureCount {
                found: features.ncols(),
                expected: self.config.feature_names.len(),
            });
        }

        let x = internal::construct_design_matrix(features);
        let beta = internal::flatten_coefficients(&self.coefficients);
        let eta = x.dot(&beta);
        Ok(eta.mapv(logistic))
    }

    /// Predicts the carrier probability of a single feature vector.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64, ModelError> {
        let row = ArrayView1::from(features).insert_axis(Axis(0));
        Ok(self.predict(row)?[0])
    }

    fn check_consistency(&self) -> Result<(), ModelError> {
        if self.coefficients.weights.len() != self.config.feature_names.len() {
            return Err(ModelError::InconsistentCoefficients {
                weights: self.coefficients.weights.len(),
                features: self.config.feature_names.len(),
            });
        }
        Ok(())
    }

    /// Saves the trained model to a file in a human-readable TOML format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a trained model from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model: TrainedModel = toml::from_str(&toml_string)?;
        model.check_consistency()?;
        Ok(model)
    }
}

/// Inverse logit link.
///
/// The linear predictor is clamped to prevent overflow in `exp()`, and the
/// result is kept away from exactly 0 and 1, matching the fitting code.
pub fn logistic(eta: f64) -> f64 {
    let eta_clamped = eta.clamp(-700.0, 700.0);
    let p = 1.0 / (1.0 + f64::exp(-eta_clamped));
    p.clamp(1e-8, 1.0 - 1e-8)
}

/// Design-matrix layout shared by prediction and training.
pub(crate) mod internal {
    use super::*;

    /// Prepends the intercept column to the feature matrix.
    pub(crate) fn construct_design_matrix(features: ArrayView2<f64>) -> Array2<f64> {
        let (n_samples, n_features) = features.dim();
        Array2::from_shape_fn((n_samples, n_features + 1), |(i, j)| {
            if j == 0 { 1.0 } else { features[(i, j - 1)] }
        })
    }

    /// Flattens the coefficients in the same order as `construct_design_matrix`.
    pub(crate) fn flatten_coefficients(coeffs: &MappedCoefficients) -> Array1<f64> {
        std::iter::once(coeffs.intercept)
            .chain(coeffs.weights.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn hand_built_model(intercept: f64, weights: [f64; 5]) -> TrainedModel {
        TrainedModel {
            config: ModelConfig::default(),
            coefficients: MappedCoefficients {
                intercept,
                weights: weights.to_vec(),
            },
            summary: TrainingSummary {
                training_rows: 100,
                evaluation_rows: 25,
                iterations: 6,
                penalized_deviance: 80.5,
                accuracy: 0.72,
                roc_auc: Some(0.81),
            },
        }
    }

    #[test]
    fn test_trained_model_predict() {
        // eta = -1 + 2 * affected_self + 0.5 * generation
        let model = hand_built_model(-1.0, [2.0, 0.0, 0.0, 0.0, 0.5]);
        let features = array![[0.0, 0.0, 0.0, 0.0, 2.0], [1.0, 1.0, 1.0, 1.0, 1.0]];

        let predictions = model.predict(features.view()).unwrap();
        assert_abs_diff_eq!(predictions[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            predictions[1],
            1.0 / (1.0 + (-1.5f64).exp()),
            epsilon = 1e-12
        );

        let single = model.predict_one(&[0.0, 0.0, 0.0, 0.0, 2.0]).unwrap();
        assert_abs_diff_eq!(single, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_rejects_wrong_feature_count() {
        let model = hand_built_model(0.0, [0.0; 5]);
        match model.predict_one(&[1.0, 0.0, 0.0]) {
            Err(ModelError::MismatchedFeatureCount { found, expected }) => {
                assert_eq!((found, expected), (3, 5));
            }
            other => panic!("Expected MismatchedFeatureCount, got {:?}", other),
        }
    }

    #[test]
    fn test_logistic_stays_inside_open_interval() {
        assert_eq!(logistic(1e6), 1.0 - 1e-8);
        assert_eq!(logistic(-1e6), 1e-8);
        assert_abs_diff_eq!(logistic(0.0), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_save_load_functionality() {
        use tempfile::NamedTempFile;
        let original_model = hand_built_model(-3.2, [4.1, 0.7, 1.2, 0.9, -0.05]);
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");

        original_model
            .save(temp_file.path())
            .expect("Failed to save model");
        let loaded_model = TrainedModel::load(temp_file.path()).expect("Failed to load model");

        assert_eq!(loaded_model, original_model);
        assert_eq!(
            loaded_model.config.feature_names,
            FEATURE_COLUMNS.map(String::from).to_vec()
        );
    }

    #[test]
    fn test_load_rejects_inconsistent_artifact() {
        use tempfile::NamedTempFile;
        let mut model = hand_built_model(0.0, [0.0; 5]);
        model.coefficients.weights.pop();
        let temp_file = NamedTempFile::new().unwrap();
        model.save(temp_file.path()).unwrap();

        assert!(matches!(
            TrainedModel::load(temp_file.path()),
            Err(ModelError::InconsistentCoefficients {
                weights: 4,
                features: 5
            })
        ));
    }
}
