//! # Rule-Based Carrier Inference
//!
//! Assigns a carrier probability to a family member from pedigree facts alone.
//! The rules form an ordered table evaluated top-down; the first rule whose
//! predicate holds decides the probability and later rules are ignored. When
//! none applies, the population prior is used.
//!
//! The 0.67 posterior used by the sibling and both-parents rules approximates
//! the autosomal-recessive carrier posterior of an unaffected person with one
//! affected sibling. It is a fixed constant and is not re-derived per pedigree.

use crate::pedigree::{MemberId, Pedigree};
use crate::types::{CarrierEstimate, RiskError};

/// Background carrier rate used when the family history is uninformative.
pub const POPULATION_CARRIER_RATE: f64 = 0.02;

/// Approximate carrier posterior given an affected sibling.
pub const SIBLING_CARRIER_POSTERIOR: f64 = 0.67;

pub const POPULATION_PRIOR_REASON: &str = "no family history ⇒ population prior";

/// One entry of the inference table.
#[derive(Clone, Copy)]
pub struct CarrierRule {
    pub name: &'static str,
    pub applies: fn(&Pedigree, MemberId) -> bool,
    pub probability: f64,
    pub reason: &'static str,
}

/// The inference table, in priority order.
pub static CARRIER_RULES: [CarrierRule; 4] = [
    CarrierRule {
        name: "affected",
        applies: is_affected,
        probability: 1.0,
        reason: "affected ⇒ carrier",
    },
    CarrierRule {
        name: "affected-child",
        applies: has_affected_child,
        probability: 1.0,
        reason: "affected child ⇒ parent must be a carrier",
    },
    CarrierRule {
        name: "affected-sibling",
        applies: has_affected_sibling,
        probability: SIBLING_CARRIER_POSTERIOR,
        reason: "affected sibling ⇒ posterior ≈ 0.67",
    },
    CarrierRule {
        name: "carrier-parents",
        applies: has_two_certain_carrier_parents,
        probability: SIBLING_CARRIER_POSTERIOR,
        reason: "both parents carriers ⇒ posterior ≈ 0.67",
    },
];

/// Infers the carrier probability of `member` without mutating the pedigree.
///
/// The both-parents rule reads the parents' already assigned probabilities,
/// so callers must evaluate a pedigree top-down (see
/// [`crate::estimator::infer_pedigree`]).
pub fn infer_carrier_probability(
    pedigree: &Pedigree,
    member: MemberId,
) -> Result<CarrierEstimate, RiskError> {
    let estimate = matching_rule(pedigree, member)?
        .map(|rule| CarrierEstimate::new(rule.probability, rule.reason))
        .unwrap_or_else(|| CarrierEstimate::new(POPULATION_CARRIER_RATE, POPULATION_PRIOR_REASON));
    Ok(estimate)
}

/// The first rule of [`CARRIER_RULES`] that applies, if any.
pub fn matching_rule(
    pedigree: &Pedigree,
    member: MemberId,
) -> Result<Option<&'static CarrierRule>, RiskError> {
    pedigree.try_member(member)?;
    Ok(CARRIER_RULES
        .iter()
        .find(|rule| (rule.applies)(pedigree, member)))
}

fn is_affected(pedigree: &Pedigree, member: MemberId) -> bool {
    pedigree.member(member).is_affected()
}

fn has_affected_child(pedigree: &Pedigree, member: MemberId) -> bool {
    pedigree
        .children(member)
        .iter()
        .any(|&child| pedigree.member(child).is_affected())
}

fn has_affected_sibling(pedigree: &Pedigree, member: MemberId) -> bool {
    pedigree
        .siblings(member)
        .any(|sibling| pedigree.member(sibling).is_affected())
}

fn has_two_certain_carrier_parents(pedigree: &Pedigree, member: MemberId) -> bool {
    let certain = |parent: Option<MemberId>| {
        parent.is_some_and(|id| pedigree.member(id).carrier_probability() == Some(1.0))
    };
    let (mother, father) = pedigree.parents(member);
    certain(mother) && certain(father)
}
