//! Shared vocabulary of the risk engine: biological sex, inheritance modes,
//! estimator selection, carrier estimates and the crate-wide error type.

use crate::pedigree::PedigreeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The error type for every operation of the risk engine.
///
/// All variants are surfaced to the caller immediately. Computations are
/// deterministic, so nothing is retried and no partial result is produced.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Unsupported inheritance mode '{0}'. Expected one of AR, AD or XL.")]
    InvalidInheritanceMode(String),

    #[error(
        "Carrier probability for '{member}' has not been inferred yet. Run carrier inference before computing child risk."
    )]
    MissingPrerequisite { member: String },

    #[error("Carrier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Probability {value} computed for {context} lies outside [0, 1].")]
    InvalidProbability { context: String, value: f64 },

    #[error("Generation index must be at least 1, but {0} was given.")]
    InvalidGeneration(u32),

    #[error("Invalid pedigree: {0}")]
    Pedigree(#[from] PedigreeError),
}

/// Biological sex category of a family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

/// Mode of inheritance selecting the child-risk formula.
///
/// Never stored on a family member; it is a per-request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InheritanceMode {
    AutosomalRecessive,
    AutosomalDominant,
    XLinked,
}

impl InheritanceMode {
    /// Short code used on the command line and in request files.
    pub fn code(self) -> &'static str {
        match self {
            InheritanceMode::AutosomalRecessive => "AR",
            InheritanceMode::AutosomalDominant => "AD",
            InheritanceMode::XLinked => "XL",
        }
    }

    /// Human-readable name, used as the first line of every explanation trail.
    pub fn name(self) -> &'static str {
        match self {
            InheritanceMode::AutosomalRecessive => "Autosomal Recessive",
            InheritanceMode::AutosomalDominant => "Autosomal Dominant",
            InheritanceMode::XLinked => "X-Linked",
        }
    }
}

impl fmt::Display for InheritanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InheritanceMode {
    type Err = RiskError;

    /// Parses `AR`, `AD` or `XL`. Surrounding whitespace and letter case are
    /// ignored; anything else is rejected rather than defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AR" => Ok(InheritanceMode::AutosomalRecessive),
            "AD" => Ok(InheritanceMode::AutosomalDominant),
            "XL" => Ok(InheritanceMode::XLinked),
            _ => Err(RiskError::InvalidInheritanceMode(s.to_string())),
        }
    }
}

/// Which carrier-probability strategy a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// The fixed-priority Bayesian rule table.
    #[default]
    Rules,
    /// The trained logistic carrier classifier.
    Model,
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Rules => write!(f, "rules"),
            EstimatorKind::Model => write!(f, "model"),
        }
    }
}

/// A carrier probability together with the reason it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierEstimate {
    pub probability: f64,
    pub reason: String,
}

impl CarrierEstimate {
    pub fn new(probability: f64, reason: impl Into<String>) -> Self {
        Self {
            probability,
            reason: reason.into(),
        }
    }
}

/// Rejects values outside [0, 1], including NaN.
///
/// Out-of-range values indicate a logic or input-data bug and are reported,
/// never clamped.
pub fn check_probability(context: &str, value: f64) -> Result<f64, RiskError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(RiskError::InvalidProbability {
            context: context.to_string(),
            value,
        })
    }
}
