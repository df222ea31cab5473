//! # Feature Extractor
//!
//! Maps a family member and its family context to the fixed five-element
//! vector consumed by the carrier classifier. The column order is a binding
//! contract shared with the dataset generator, the training data loader and
//! the persisted model artifact; it must never be reordered.

use crate::pedigree::{FamilyMember, MemberId, Pedigree};
use crate::types::RiskError;
use itertools::Itertools;
use std::fmt;

/// Number of classifier inputs.
pub const FEATURE_COUNT: usize = 5;

/// Canonical feature column names, in vector order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "affected_self",
    "affected_parent",
    "affected_sibling",
    "affected_child",
    "generation",
];

/// Name of the training label column that follows the feature columns.
pub const LABEL_COLUMN: &str = "carrier";

/// Feature vector `[affected_self, affected_parent, affected_sibling, affected_child, generation]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierFeatures([f64; FEATURE_COUNT]);

impl CarrierFeatures {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        self.0
    }
}

impl fmt::Display for CarrierFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// Builds the classifier input for `member`. Booleans become 0 or 1.
pub fn extract_features(
    member: &FamilyMember,
    generation: u32,
    affected_parent: bool,
    affected_sibling: bool,
    affected_child: bool,
) -> Result<CarrierFeatures, RiskError> {
    if generation == 0 {
        return Err(RiskError::InvalidGeneration(generation));
    }
    Ok(CarrierFeatures([
        indicator(member.is_affected()),
        indicator(affected_parent),
        indicator(affected_sibling),
        indicator(affected_child),
        f64::from(generation),
    ]))
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

/// The contextual affectation flags of one member, read off the pedigree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyContext {
    pub generation: u32,
    pub affected_parent: bool,
    pub affected_sibling: bool,
    pub affected_child: bool,
}

impl FamilyContext {
    pub fn from_pedigree(pedigree: &Pedigree, member: MemberId) -> Result<Self, RiskError> {
        let generation = pedigree.try_member(member)?.generation();
        let affected = |id: MemberId| pedigree.member(id).is_affected();
        let (mother, father) = pedigree.parents(member);
        Ok(Self {
            generation,
            affected_parent: mother.into_iter().chain(father).any(affected),
            affected_sibling: pedigree.siblings(member).any(affected),
            affected_child: pedigree.children(member).iter().copied().any(affected),
        })
    }
}

/// Feature vector of `member` with its context derived from the pedigree.
pub fn features_for(pedigree: &Pedigree, member: MemberId) -> Result<CarrierFeatures, RiskError> {
    let context = FamilyContext::from_pedigree(pedigree, member)?;
    extract_features(
        pedigree.member(member),
        context.generation,
        context.affected_parent,
        context.affected_sibling,
        context.affected_child,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::PedigreeError;
    use crate::types::Sex;

    #[test]
    fn layout_follows_column_contract() {
        let mut pedigree = Pedigree::new();
        let mother = pedigree
            .add_founder("Mother", Sex::Female, true, 2)
            .unwrap();

        let features =
            extract_features(pedigree.member(mother), 2, false, true, false).unwrap();
        assert_eq!(features.values(), [1.0, 0.0, 1.0, 0.0, 2.0]);
        assert_eq!(features.to_string(), "[1, 0, 1, 0, 2]");
        assert_eq!(FEATURE_COLUMNS[4], "generation");
    }

    #[test]
    fn generation_zero_is_rejected() {
        let mut pedigree = Pedigree::new();
        let member = pedigree.add_founder("Someone", Sex::Male, false, 1).unwrap();
        assert!(matches!(
            extract_features(pedigree.member(member), 0, false, false, false),
            Err(RiskError::InvalidGeneration(0))
        ));
    }

    #[test]
    fn context_reads_parents_siblings_and_children() {
        let mut pedigree = Pedigree::new();
        let grandmother = pedigree
            .add_founder("Grandmother", Sex::Female, true, 1)
            .unwrap();
        let mother = pedigree
            .add_child("Mother", Sex::Female, false, Some(grandmother), None)
            .unwrap();
        let uncle = pedigree
            .add_child("Uncle", Sex::Male, false, Some(grandmother), None)
            .unwrap();
        let child = pedigree
            .add_child("Child", Sex::Male, true, Some(mother), None)
            .unwrap();

        let context = FamilyContext::from_pedigree(&pedigree, mother).unwrap();
        assert_eq!(
            context,
            FamilyContext {
                generation: 2,
                affected_parent: true,
                affected_sibling: false,
                affected_child: true,
            }
        );

        let features = features_for(&pedigree, uncle).unwrap();
        assert_eq!(features.values(), [0.0, 1.0, 0.0, 0.0, 2.0]);

        let features = features_for(&pedigree, child).unwrap();
        assert_eq!(features.values(), [1.0, 0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn foreign_member_id_is_an_error() {
        let mut small = Pedigree::new();
        small.add_founder("Only", Sex::Female, false, 1).unwrap();
        let mut large = Pedigree::new();
        large.add_founder("First", Sex::Female, false, 1).unwrap();
        let second = large.add_founder("Second", Sex::Male, false, 1).unwrap();

        assert!(matches!(
            FamilyContext::from_pedigree(&small, second),
            Err(RiskError::Pedigree(PedigreeError::UnknownMember(1)))
        ));
        assert!(features_for(&small, second).is_err());
    }
}
