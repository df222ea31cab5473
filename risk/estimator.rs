//! Carrier-probability strategies and the top-down inference pass.

use crate::classifier::CarrierClassifier;
use crate::features::features_for;
use crate::inference::infer_carrier_probability;
use crate::pedigree::{MemberId, Pedigree};
use crate::types::{CarrierEstimate, EstimatorKind, RiskError};
use std::sync::Arc;

/// A way of assigning a carrier probability to one pedigree member.
///
/// Implementations must not mutate the pedigree; [`infer_pedigree`] owns the
/// writes so that every strategy sees parents already resolved.
pub trait CarrierEstimator: Send + Sync {
    fn kind(&self) -> EstimatorKind;

    fn estimate(&self, pedigree: &Pedigree, member: MemberId) -> Result<CarrierEstimate, RiskError>;
}

/// The fixed-priority rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEstimator;

impl CarrierEstimator for RuleBasedEstimator {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Rules
    }

    fn estimate(&self, pedigree: &Pedigree, member: MemberId) -> Result<CarrierEstimate, RiskError> {
        infer_carrier_probability(pedigree, member)
    }
}

/// Feature extraction followed by the logistic classifier.
#[derive(Debug, Clone)]
pub struct ClassifierEstimator {
    classifier: Arc<CarrierClassifier>,
}

impl ClassifierEstimator {
    pub fn new(classifier: Arc<CarrierClassifier>) -> Self {
        Self { classifier }
    }
}

impl CarrierEstimator for ClassifierEstimator {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Model
    }

    fn estimate(&self, pedigree: &Pedigree, member: MemberId) -> Result<CarrierEstimate, RiskError> {
        // Affected members are carriers regardless of what the model says.
        if pedigree.try_member(member)?.is_affected() {
            return Ok(CarrierEstimate::new(1.0, "affected ⇒ carrier"));
        }
        let features = features_for(pedigree, member)?;
        let probability = self.classifier.predict_carrier_probability(&features)?;
        Ok(CarrierEstimate::new(
            probability,
            format!("classifier on features {features}"),
        ))
    }
}

/// One row of an inference pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberEstimate {
    pub member: MemberId,
    pub estimate: CarrierEstimate,
}

/// Assigns a carrier probability to every member of `pedigree`.
///
/// Previous results are cleared first. Members are visited in id order,
/// which puts parents before children, and each probability is written
/// before the next member is estimated.
pub fn infer_pedigree(
    pedigree: &mut Pedigree,
    estimator: &dyn CarrierEstimator,
) -> Result<Vec<MemberEstimate>, RiskError> {
    pedigree.clear_carrier_probabilities();
    let mut estimates = Vec::with_capacity(pedigree.len());
    for member in pedigree.ids() {
        let estimate = estimator.estimate(pedigree, member)?;
        log::debug!(
            "[{}] {}: {:.4} ({})",
            estimator.kind(),
            pedigree.member(member).name(),
            estimate.probability,
            estimate.reason
        );
        pedigree.set_carrier_probability(member, estimate.probability)?;
        estimates.push(MemberEstimate { member, estimate });
    }
    Ok(estimates)
}
