//! # Child Risk Calculator
//!
//! Combines the parents' carrier probabilities into the probability that a
//! child is affected, and records a human-readable trail of how the number
//! was obtained. The trail always has three lines: the inheritance mode, the
//! qualitative rule, and the formula with the values substituted.

use crate::pedigree::{FamilyMember, MemberId, Pedigree};
use crate::types::{InheritanceMode, RiskError, Sex, check_probability};
use serde::{Deserialize, Serialize};

/// Probability that both alleles are passed on when both parents carry one.
pub const RECESSIVE_TRANSMISSION: f64 = 0.25;

/// Probability that a carrier mother passes her risk X to a daughter.
pub const X_LINKED_FEMALE_TRANSMISSION: f64 = 0.5;

/// Risk of an affected child together with its explanation trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRisk {
    pub risk: f64,
    pub explanation: Vec<String>,
}

/// `m × f × 0.25`
pub fn recessive_risk(mother: f64, father: f64) -> f64 {
    mother * father * RECESSIVE_TRANSMISSION
}

/// `1 − (1 − m)(1 − f)`, the chance that at least one parent carries.
pub fn dominant_risk(mother: f64, father: f64) -> f64 {
    1.0 - (1.0 - mother) * (1.0 - father)
}

/// Risk through the maternal X. An affected mother always transmits.
pub fn x_linked_risk(mother: f64, mother_affected: bool, child_sex: Sex) -> f64 {
    match (mother_affected, child_sex) {
        (true, _) => 1.0,
        (false, Sex::Male) => mother,
        (false, Sex::Female) => mother * X_LINKED_FEMALE_TRANSMISSION,
    }
}

/// Computes the risk that `child` is affected under `mode`.
///
/// The parents must already carry inferred probabilities; the father's is
/// not consulted for X-linked inheritance.
pub fn calculate_child_risk(
    pedigree: &Pedigree,
    child: MemberId,
    mother: MemberId,
    father: MemberId,
    mode: InheritanceMode,
) -> Result<ChildRisk, RiskError> {
    let child = pedigree.try_member(child)?;
    let mother = pedigree.try_member(mother)?;
    let father = pedigree.try_member(father)?;

    let m = inferred_probability(mother)?;
    let (risk, rule, formula) = match mode {
        InheritanceMode::AutosomalRecessive => {
            let f = inferred_probability(father)?;
            (
                recessive_risk(m, f),
                "Child affected only if both parents pass the allele".to_string(),
                format!("Risk = {m:.2} × {f:.2} × {RECESSIVE_TRANSMISSION}"),
            )
        }
        InheritanceMode::AutosomalDominant => {
            let f = inferred_probability(father)?;
            (
                dominant_risk(m, f),
                "Child affected if either parent passes the allele".to_string(),
                format!("Risk = 1 − (1 − {m:.2}) × (1 − {f:.2})"),
            )
        }
        InheritanceMode::XLinked => {
            let risk = x_linked_risk(m, mother.is_affected(), child.sex());
            let (rule, formula) = match (mother.is_affected(), child.sex()) {
                (true, _) => (
                    "Mother affected ⇒ the child inherits her risk X",
                    "Risk = 1.00".to_string(),
                ),
                (false, Sex::Male) => (
                    "Male child inherits his only X chromosome from the mother",
                    format!("Risk = {m:.2}"),
                ),
                (false, Sex::Female) => (
                    "Female child has a 50% chance of receiving the mother's risk X",
                    format!("Risk = {m:.2} × {X_LINKED_FEMALE_TRANSMISSION}"),
                ),
            };
            (risk, rule.to_string(), formula)
        }
    };

    let context = format!("{} risk of '{}'", mode, child.name());
    let risk = check_probability(&context, risk)?;
    log::debug!("{}: {:.6}", context, risk);

    Ok(ChildRisk {
        risk,
        explanation: vec![format!("{} Inheritance", mode.name()), rule, formula],
    })
}

fn inferred_probability(member: &FamilyMember) -> Result<f64, RiskError> {
    member
        .carrier_probability()
        .ok_or_else(|| RiskError::MissingPrerequisite {
            member: member.name().to_string(),
        })
}
