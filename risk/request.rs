//! # Request Engine
//!
//! Turns plain family-history facts into a pedigree, runs the selected
//! carrier estimator over it and computes the child's risk. Requests and
//! reports are serde types so they can be read from and written to TOML.

use crate::child_risk::calculate_child_risk;
use crate::classifier::CarrierClassifier;
use crate::estimator::{CarrierEstimator, ClassifierEstimator, RuleBasedEstimator, infer_pedigree};
use crate::pedigree::{MemberId, Pedigree};
use crate::types::{EstimatorKind, InheritanceMode, RiskError, Sex};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Generation of the four grandparents, the oldest founders.
const GRANDPARENT_GENERATION: u32 = 1;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to read or write '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML file '{path}': {source}")]
    TomlParseError {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to serialize to TOML: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Sex and status of a sibling or a parent's sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeFacts {
    pub sex: Sex,
    #[serde(default)]
    pub affected: bool,
}

/// Family history of a single prospective or existing child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    /// `AR`, `AD` or `XL`. Kept as text so an unsupported mode is reported
    /// by the engine rather than rejected while parsing the file.
    pub mode: String,
    #[serde(default)]
    pub estimator: EstimatorKind,
    pub child_sex: Sex,
    #[serde(default)]
    pub child_affected: bool,
    #[serde(default)]
    pub mother_affected: bool,
    #[serde(default)]
    pub father_affected: bool,
    #[serde(default)]
    pub maternal_grandmother_affected: bool,
    #[serde(default)]
    pub maternal_grandfather_affected: bool,
    #[serde(default)]
    pub paternal_grandmother_affected: bool,
    #[serde(default)]
    pub paternal_grandfather_affected: bool,
    /// The mother's brothers and sisters.
    #[serde(default)]
    pub mother_siblings: Vec<RelativeFacts>,
    /// The father's brothers and sisters.
    #[serde(default)]
    pub father_siblings: Vec<RelativeFacts>,
    /// The child's brothers and sisters.
    #[serde(default)]
    pub siblings: Vec<RelativeFacts>,
}

impl RiskRequest {
    /// A request with no affected relatives and the rule-based estimator.
    pub fn new(mode: impl Into<String>, child_sex: Sex) -> Self {
        Self {
            mode: mode.into(),
            estimator: EstimatorKind::Rules,
            child_sex,
            child_affected: false,
            mother_affected: false,
            father_affected: false,
            maternal_grandmother_affected: false,
            maternal_grandfather_affected: false,
            paternal_grandmother_affected: false,
            paternal_grandfather_affected: false,
            mother_siblings: Vec::new(),
            father_siblings: Vec::new(),
            siblings: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        read_toml(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RequestError> {
        write_toml(path.as_ref(), self)
    }
}

/// The three members a risk calculation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedigreeRoles {
    pub child: MemberId,
    pub mother: MemberId,
    pub father: MemberId,
}

/// Builds the three-generation pedigree described by `request`.
///
/// Members are added grandparents first, then each parent followed by that
/// parent's siblings, then the child and the child's siblings.
pub fn build_pedigree(request: &RiskRequest) -> Result<(Pedigree, PedigreeRoles), RiskError> {
    let mut pedigree = Pedigree::new();

    let maternal_grandmother = pedigree.add_founder(
        "Maternal grandmother",
        Sex::Female,
        request.maternal_grandmother_affected,
        GRANDPARENT_GENERATION,
    )?;
    let maternal_grandfather = pedigree.add_founder(
        "Maternal grandfather",
        Sex::Male,
        request.maternal_grandfather_affected,
        GRANDPARENT_GENERATION,
    )?;
    let paternal_grandmother = pedigree.add_founder(
        "Paternal grandmother",
        Sex::Female,
        request.paternal_grandmother_affected,
        GRANDPARENT_GENERATION,
    )?;
    let paternal_grandfather = pedigree.add_founder(
        "Paternal grandfather",
        Sex::Male,
        request.paternal_grandfather_affected,
        GRANDPARENT_GENERATION,
    )?;

    let mother = pedigree.add_child(
        "Mother",
        Sex::Female,
        request.mother_affected,
        Some(maternal_grandmother),
        Some(maternal_grandfather),
    )?;
    add_siblings(
        &mut pedigree,
        &request.mother_siblings,
        |sex| relative_label("Maternal", sex, "aunt", "uncle"),
        (maternal_grandmother, maternal_grandfather),
    )?;

    let father = pedigree.add_child(
        "Father",
        Sex::Male,
        request.father_affected,
        Some(paternal_grandmother),
        Some(paternal_grandfather),
    )?;
    add_siblings(
        &mut pedigree,
        &request.father_siblings,
        |sex| relative_label("Paternal", sex, "aunt", "uncle"),
        (paternal_grandmother, paternal_grandfather),
    )?;

    let child = pedigree.add_child(
        "Child",
        request.child_sex,
        request.child_affected,
        Some(mother),
        Some(father),
    )?;
    add_siblings(
        &mut pedigree,
        &request.siblings,
        |sex| match sex {
            Sex::Female => "Sister".to_string(),
            Sex::Male => "Brother".to_string(),
        },
        (mother, father),
    )?;

    Ok((
        pedigree,
        PedigreeRoles {
            child,
            mother,
            father,
        },
    ))
}

fn relative_label(side: &str, sex: Sex, female: &str, male: &str) -> String {
    match sex {
        Sex::Female => format!("{side} {female}"),
        Sex::Male => format!("{side} {male}"),
    }
}

fn add_siblings(
    pedigree: &mut Pedigree,
    relatives: &[RelativeFacts],
    label: impl Fn(Sex) -> String,
    (mother, father): (MemberId, MemberId),
) -> Result<(), RiskError> {
    for (position, relative) in relatives.iter().enumerate() {
        let name = format!("{} {}", label(relative.sex), position + 1);
        pedigree.add_child(
            name,
            relative.sex,
            relative.affected,
            Some(mother),
            Some(father),
        )?;
    }
    Ok(())
}

/// Inferred state of one member, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberReport {
    pub name: String,
    pub sex: Sex,
    pub affected: bool,
    pub generation: u32,
    pub carrier_probability: f64,
    pub reason: String,
}

/// Outcome of a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Inheritance mode code (`AR`, `AD` or `XL`).
    pub mode: String,
    pub mode_name: String,
    pub estimator: EstimatorKind,
    /// Probability that the child is affected.
    pub risk: f64,
    pub explanation: Vec<String>,
    /// Every member in inference order.
    pub members: Vec<MemberReport>,
}

impl RiskReport {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RequestError> {
        write_toml(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        read_toml(path.as_ref())
    }
}

/// Evaluates requests against an optional shared classifier.
///
/// The engine holds no mutable state: every request gets its own pedigree,
/// so one engine can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    classifier: Option<Arc<CarrierClassifier>>,
}

impl RiskEngine {
    /// An engine that only supports the rule-based estimator.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: Arc<CarrierClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    pub fn classifier(&self) -> Option<&Arc<CarrierClassifier>> {
        self.classifier.as_ref()
    }

    fn estimator_for(&self, kind: EstimatorKind) -> Result<Box<dyn CarrierEstimator>, RiskError> {
        match kind {
            EstimatorKind::Rules => Ok(Box::new(RuleBasedEstimator)),
            EstimatorKind::Model => self
                .classifier
                .as_ref()
                .map(|classifier| {
                    Box::new(ClassifierEstimator::new(Arc::clone(classifier)))
                        as Box<dyn CarrierEstimator>
                })
                .ok_or_else(|| {
                    RiskError::ModelUnavailable(
                        "the model estimator was requested but no carrier model is loaded"
                            .to_string(),
                    )
                }),
        }
    }

    /// Runs carrier inference and the child-risk calculation for one request.
    pub fn estimate(&self, request: &RiskRequest) -> Result<RiskReport, RiskError> {
        let mode: InheritanceMode = request.mode.parse()?;
        let estimator = self.estimator_for(request.estimator)?;
        let (mut pedigree, roles) = build_pedigree(request)?;
        log::info!(
            "Estimating {} risk with the {} estimator over {} family members",
            mode,
            estimator.kind(),
            pedigree.len()
        );

        let estimates = infer_pedigree(&mut pedigree, estimator.as_ref())?;
        let child_risk =
            calculate_child_risk(&pedigree, roles.child, roles.mother, roles.father, mode)?;

        let members = estimates
            .into_iter()
            .map(|row| {
                let member = pedigree.member(row.member);
                MemberReport {
                    name: member.name().to_string(),
                    sex: member.sex(),
                    affected: member.is_affected(),
                    generation: member.generation(),
                    carrier_probability: row.estimate.probability,
                    reason: row.estimate.reason,
                }
            })
            .collect();

        Ok(RiskReport {
            mode: mode.code().to_string(),
            mode_name: mode.name().to_string(),
            estimator: estimator.kind(),
            risk: child_risk.risk,
            explanation: child_risk.explanation,
            members,
        })
    }

    /// Evaluates independent requests in parallel. Results keep input order
    /// and one failing request does not affect the others.
    pub fn estimate_batch(&self, requests: &[RiskRequest]) -> Vec<Result<RiskReport, RiskError>> {
        log::info!("Estimating a batch of {} requests", requests.len());
        requests
            .par_iter()
            .map(|request| self.estimate(request))
            .collect()
    }
}

/// A `[[requests]]` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBatch {
    pub requests: Vec<RiskRequest>,
}

impl RequestBatch {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        read_toml(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RequestError> {
        write_toml(path.as_ref(), self)
    }
}

/// Result of one batch entry. Exactly one of `report` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Zero-based position of the request in its batch.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<RiskReport>,
}

/// A `[[reports]]` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBatch {
    pub reports: Vec<BatchEntry>,
}

impl ReportBatch {
    pub fn from_results(results: Vec<Result<RiskReport, RiskError>>) -> Self {
        let reports = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(report) => BatchEntry {
                    index,
                    error: None,
                    report: Some(report),
                },
                Err(e) => BatchEntry {
                    index,
                    error: Some(e.to_string()),
                    report: None,
                },
            })
            .collect();
        Self { reports }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RequestError> {
        write_toml(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        read_toml(path.as_ref())
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, RequestError> {
    let text = fs::read_to_string(path).map_err(|source| RequestError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| RequestError::TomlParseError {
        path: path.display().to_string(),
        source,
    })
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), RequestError> {
    let text = toml::to_string_pretty(value)?;
    fs::write(path, text).map_err(|source| RequestError::IoError {
        path: path.display().to_string(),
        source,
    })
}
