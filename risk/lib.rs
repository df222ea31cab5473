#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod child_risk;
pub mod classifier;
pub mod estimator;
pub mod features;
pub mod inference;
pub mod pedigree;
pub mod request;
pub mod types;

// Dataset generation and model training
#[path = "../calibrate/lib.rs"]
pub mod calibrate;

pub use child_risk::{ChildRisk, calculate_child_risk};
pub use classifier::CarrierClassifier;
pub use estimator::{CarrierEstimator, ClassifierEstimator, RuleBasedEstimator, infer_pedigree};
pub use inference::infer_carrier_probability;
pub use pedigree::{FamilyMember, MemberId, Pedigree, PedigreeError};
pub use request::{RiskEngine, RiskReport, RiskRequest};
pub use types::{CarrierEstimate, EstimatorKind, InheritanceMode, RiskError, Sex};
