//! # Carrier Model Estimation via Penalized IRLS
//!
//! Fits the logistic carrier classifier. The fitting procedure is a single
//! Penalized Iteratively Reweighted Least Squares (P-IRLS) loop:
//!
//! 1.  From the current coefficients, compute the fitted probabilities, the
//!     IRLS weights and the working response.
//! 2.  Solve the penalized normal equations `(XᵀWX + S) β = XᵀWz` by Cholesky,
//!     where `S` is a ridge penalty on every coefficient except the intercept.
//! 3.  Step-halve towards the proposal until the penalized deviance does not
//!     increase.
//!
//! The ridge penalty is essential here: `affected_self` is only ever set for
//! carriers in the synthetic data, so the unpenalized maximum likelihood
//! weight for it is infinite.
//!
//! A seeded share of the rows is held out before fitting and used to report
//! accuracy and ROC-AUC in the saved artifact.

use crate::calibrate::data::TrainingData;
use crate::calibrate::diagnostics::{accuracy, roc_auc};
use crate::calibrate::linalg::{FaerLinalgError, solve_spd};
use crate::calibrate::model::internal::construct_design_matrix;
use crate::calibrate::model::{
    MappedCoefficients, ModelConfig, TrainedModel, TrainingSummary, logistic,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Step halving gives up after this many attempts.
const MAX_STEP_HALVINGS: usize = 30;

/// A comprehensive error type for the model estimation process.
#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("A linear system solve failed. The penalized Hessian may be singular. Error: {0}")]
    LinearSystemSolveFailed(#[from] FaerLinalgError),

    #[error(
        "The P-IRLS loop did not converge within {max_iterations} iterations. Last relative deviance change was {last_change:.6e}."
    )]
    DidNotConverge {
        max_iterations: usize,
        last_change: f64,
    },

    #[error(
        "Every training row has carrier = {label}. Both carriers and non-carriers are required to fit a classifier."
    )]
    SingleClass { label: f64 },

    #[error("Training data has {found} feature columns, but the configuration names {expected}.")]
    FeatureMismatch { found: usize, expected: usize },

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),
}

/// Result of a converged P-IRLS fit.
#[derive(Debug, Clone)]
pub struct IrlsFit {
    /// Intercept followed by one weight per feature.
    pub beta: Array1<f64>,
    pub iterations: usize,
    pub penalized_deviance: f64,
}

/// The main entry point for model training.
pub fn train_model(
    data: &TrainingData,
    config: &ModelConfig,
) -> Result<TrainedModel, EstimationError> {
    validate_config(data, config)?;
    log::info!(
        "Starting carrier model training. {} total samples.",
        data.y.len()
    );

    let (train_rows, eval_rows) = split_holdout(data.len(), config.holdout_fraction, config.seed);
    let x_train = data.x.select(Axis(0), &train_rows);
    let y_train = data.y.select(Axis(0), &train_rows);
    log::info!(
        "Fitting on {} rows, holding out {} rows for evaluation.",
        train_rows.len(),
        eval_rows.len()
    );

    let first_label = y_train[0];
    if y_train.iter().all(|&y| y == first_label) {
        return Err(EstimationError::SingleClass { label: first_label });
    }

    let fit = fit_logistic_irls(
        x_train.view(),
        y_train.view(),
        config.ridge_penalty,
        config.max_iterations,
        config.convergence_tolerance,
    )?;

    // Without a holdout the training rows are the only thing left to score.
    let (x_eval, y_eval) = if eval_rows.is_empty() {
        log::warn!("Holdout fraction is zero; reporting diagnostics on the training rows.");
        (x_train, y_train)
    } else {
        (
            data.x.select(Axis(0), &eval_rows),
            data.y.select(Axis(0), &eval_rows),
        )
    };
    let predictions = construct_design_matrix(x_eval.view())
        .dot(&fit.beta)
        .mapv(logistic);
    let summary = TrainingSummary {
        training_rows: train_rows.len(),
        evaluation_rows: eval_rows.len(),
        iterations: fit.iterations,
        penalized_deviance: fit.penalized_deviance,
        accuracy: accuracy(predictions.view(), y_eval.view()),
        roc_auc: roc_auc(predictions.view(), y_eval.view()),
    };
    match summary.roc_auc {
        Some(auc) => log::info!(
            "Evaluation accuracy {:.4}, ROC-AUC {:.4}",
            summary.accuracy,
            auc
        ),
        None => log::warn!(
            "Evaluation rows contain a single class; ROC-AUC is undefined. Accuracy {:.4}",
            summary.accuracy
        ),
    }

    Ok(TrainedModel {
        config: config.clone(),
        coefficients: MappedCoefficients {
            intercept: fit.beta[0],
            weights: fit.beta.slice(s![1..]).to_vec(),
        },
        summary,
    })
}

fn validate_config(data: &TrainingData, config: &ModelConfig) -> Result<(), EstimationError> {
    if data.x.ncols() != config.feature_names.len() {
        return Err(EstimationError::FeatureMismatch {
            found: data.x.ncols(),
            expected: config.feature_names.len(),
        });
    }
    if data.is_empty() {
        return Err(EstimationError::InvalidConfig(
            "training data contains no rows".to_string(),
        ));
    }
    if !(0.0..1.0).contains(&config.holdout_fraction) {
        return Err(EstimationError::InvalidConfig(format!(
            "holdout fraction must lie in [0, 1), got {}",
            config.holdout_fraction
        )));
    }
    if !(config.ridge_penalty >= 0.0 && config.ridge_penalty.is_finite()) {
        return Err(EstimationError::InvalidConfig(format!(
            "ridge penalty must be a finite non-negative number, got {}",
            config.ridge_penalty
        )));
    }
    if config.max_iterations == 0 {
        return Err(EstimationError::InvalidConfig(
            "at least one IRLS iteration is required".to_string(),
        ));
    }
    Ok(())
}

/// Shuffles row indices with a seeded generator and splits off the holdout.
///
/// At least one row always stays in the training part.
pub fn split_holdout(n: usize, holdout_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_eval = ((n as f64 * holdout_fraction).round() as usize).min(n.saturating_sub(1));
    let mut train = indices.split_off(n_eval);
    let mut eval = indices;
    train.sort_unstable();
    eval.sort_unstable();
    (train, eval)
}

/// Fits a ridge-penalized logistic regression by P-IRLS.
///
/// `x` holds the features without an intercept column; the intercept is
/// added here and is never penalized.
pub fn fit_logistic_irls(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    ridge_penalty: f64,
    max_iterations: usize,
    convergence_tolerance: f64,
) -> Result<IrlsFit, EstimationError> {
    let design = construct_design_matrix(x);
    let p = design.ncols();
    let penalty = ridge_penalty_matrix(p, ridge_penalty);

    let mut beta = Array1::<f64>::zeros(p);
    let mut eta = design.dot(&beta);
    let (mut mu, mut weights, mut z) = update_glm_vectors(y, &eta);
    let mut deviance = penalized_deviance(y, &mu, &beta, ridge_penalty);
    let mut last_change = f64::INFINITY;

    for iteration in 1..=max_iterations {
        // XᵀWX + S and XᵀWz
        let weighted = &design * &weights.view().insert_axis(Axis(1));
        let hessian = design.t().dot(&weighted) + &penalty;
        let rhs = weighted.t().dot(&z);
        let proposal = solve_spd(&hessian, &rhs)?;

        let direction = &proposal - &beta;
        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_STEP_HALVINGS {
            let candidate = &beta + &(step * &direction);
            let candidate_eta = design.dot(&candidate);
            let (candidate_mu, ..) = update_glm_vectors(y, &candidate_eta);
            let candidate_deviance = penalized_deviance(y, &candidate_mu, &candidate, ridge_penalty);
            if candidate_deviance <= deviance * (1.0 + 1e-12) {
                accepted = Some((candidate, candidate_eta, candidate_deviance));
                break;
            }
            step *= 0.5;
        }

        let Some((candidate, candidate_eta, candidate_deviance)) = accepted else {
            // No step lowers the objective: beta is at the optimum to machine precision.
            log::debug!("P-IRLS iteration {iteration}: step halving exhausted, stopping.");
            return Ok(IrlsFit {
                beta,
                iterations: iteration,
                penalized_deviance: deviance,
            });
        };

        last_change = (deviance - candidate_deviance).abs() / (candidate_deviance.abs() + 0.1);
        beta = candidate;
        eta = candidate_eta;
        deviance = candidate_deviance;
        (mu, weights, z) = update_glm_vectors(y, &eta);
        log::debug!(
            "P-IRLS iteration {iteration}: penalized deviance {deviance:.6}, step {step}, relative change {last_change:.3e}"
        );

        if last_change < convergence_tolerance {
            log::info!("P-IRLS converged after {iteration} iterations.");
            return Ok(IrlsFit {
                beta,
                iterations: iteration,
                penalized_deviance: deviance,
            });
        }
    }

    log::debug!(
        "P-IRLS stopped with mean fitted probability {:.4}",
        mu.mean().unwrap_or(0.0)
    );
    Err(EstimationError::DidNotConverge {
        max_iterations,
        last_change,
    })
}

/// Diagonal penalty with a zero for the intercept.
fn ridge_penalty_matrix(p: usize, ridge_penalty: f64) -> Array2<f64> {
    Array2::from_shape_fn((p, p), |(i, j)| {
        if i == j && i > 0 { ridge_penalty } else { 0.0 }
    })
}

/// Fitted probabilities, IRLS weights and working response for the logit link.
fn update_glm_vectors(
    y: ArrayView1<f64>,
    eta: &Array1<f64>,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    const MIN_WEIGHT: f64 = 1e-6;

    let mu = eta.mapv(logistic);
    let weights = (&mu * &(1.0 - &mu)).mapv(|v| v.max(MIN_WEIGHT));
    let z = eta.mapv(|e| e.clamp(-700.0, 700.0)) + &((&y - &mu) / &weights);
    (mu, weights, z)
}

/// Binomial deviance plus the ridge term on the non-intercept coefficients.
fn penalized_deviance(
    y: ArrayView1<f64>,
    mu: &Array1<f64>,
    beta: &Array1<f64>,
    ridge_penalty: f64,
) -> f64 {
    let deviance = Zip::from(y).and(mu).fold(0.0, |acc, &yi, &mui| {
        // Labels are 0 or 1, so only one log term survives.
        acc - 2.0 * if yi > 0.5 { mui.ln() } else { (1.0 - mui).ln() }
    });
    let ridge = beta.slice(s![1..]).mapv(|b| b * b).sum();
    deviance + ridge_penalty * ridge
}
