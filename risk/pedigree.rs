//! # Pedigree Model
//!
//! An index-based family graph. The [`Pedigree`] owns every [`FamilyMember`]
//! in a single arena and members refer to each other through [`MemberId`]s,
//! so parent and child links never form owning cycles.
//!
//! Acyclicity holds by construction: a child can only name parents that
//! already exist. Consequently, iterating members in id order always visits
//! parents before their children, which is the order carrier inference
//! requires.

use crate::types::{RiskError, Sex, check_probability};
use thiserror::Error;

/// Handle to a member of one particular [`Pedigree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(usize);

impl MemberId {
    /// Position of the member in construction order.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PedigreeError {
    #[error("Member id {0} does not belong to this pedigree.")]
    UnknownMember(usize),

    #[error("'{0}' was added as a child but names neither a mother nor a father.")]
    MissingParents(String),

    #[error("Founder '{0}' must be placed in generation 1 or later.")]
    InvalidGeneration(String),
}

/// A node of the pedigree.
#[derive(Debug, Clone)]
pub struct FamilyMember {
    name: String,
    sex: Sex,
    affected: bool,
    generation: u32,
    mother: Option<MemberId>,
    father: Option<MemberId>,
    children: Vec<MemberId>,
    carrier_probability: Option<f64>,
}

impl FamilyMember {
    /// Display label. Not unique within a pedigree.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    /// Observed disease status.
    pub fn is_affected(&self) -> bool {
        self.affected
    }

    /// 1-based generation index, counted from the oldest founders.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn mother(&self) -> Option<MemberId> {
        self.mother
    }

    pub fn father(&self) -> Option<MemberId> {
        self.father
    }

    pub fn children(&self) -> &[MemberId] {
        &self.children
    }

    /// `None` until an inference pass has assigned a value.
    pub fn carrier_probability(&self) -> Option<f64> {
        self.carrier_probability
    }
}

/// Owner of all family members built for one estimation request.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    members: Vec<FamilyMember>,
}

impl Pedigree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member without recorded parents.
    pub fn add_founder(
        &mut self,
        name: impl Into<String>,
        sex: Sex,
        affected: bool,
        generation: u32,
    ) -> Result<MemberId, PedigreeError> {
        let name = name.into();
        if generation == 0 {
            return Err(PedigreeError::InvalidGeneration(name));
        }
        Ok(self.push(FamilyMember {
            name,
            sex,
            affected,
            generation,
            mother: None,
            father: None,
            children: Vec::new(),
            carrier_probability: None,
        }))
    }

    /// Adds a member whose mother and/or father are already in the pedigree.
    ///
    /// The new member is appended to each parent's children, keeping links
    /// bidirectional. Its generation is one below the youngest parent.
    pub fn add_child(
        &mut self,
        name: impl Into<String>,
        sex: Sex,
        affected: bool,
        mother: Option<MemberId>,
        father: Option<MemberId>,
    ) -> Result<MemberId, PedigreeError> {
        let name = name.into();
        let parents: Vec<MemberId> = mother.into_iter().chain(father).collect();
        if parents.is_empty() {
            return Err(PedigreeError::MissingParents(name));
        }

        let mut parent_generation = 0;
        for &parent in &parents {
            let member = self
                .get(parent)
                .ok_or(PedigreeError::UnknownMember(parent.0))?;
            parent_generation = parent_generation.max(member.generation);
        }

        let id = self.push(FamilyMember {
            name,
            sex,
            affected,
            generation: parent_generation + 1,
            mother,
            father,
            children: Vec::new(),
            carrier_probability: None,
        });
        for parent in parents {
            self.members[parent.0].children.push(id);
        }
        Ok(id)
    }

    fn push(&mut self, member: FamilyMember) -> MemberId {
        let id = MemberId(self.members.len());
        log::trace!(
            "Added '{}' ({}) as member {} in generation {}",
            member.name,
            member.sex,
            id.0,
            member.generation
        );
        self.members.push(member);
        id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: MemberId) -> Option<&FamilyMember> {
        self.members.get(id.0)
    }

    /// Like [`Pedigree::get`], but reports a foreign id as an error.
    pub fn try_member(&self, id: MemberId) -> Result<&FamilyMember, PedigreeError> {
        self.get(id).ok_or(PedigreeError::UnknownMember(id.0))
    }

    /// Returns the member behind `id`.
    ///
    /// # Panics
    /// Panics if `id` was issued by a different pedigree with more members.
    /// Public entry points taking a caller's id go through
    /// [`Pedigree::try_member`] first.
    pub fn member(&self, id: MemberId) -> &FamilyMember {
        &self.members[id.0]
    }

    /// All member ids in construction order, which is a topological order.
    pub fn ids(&self) -> impl Iterator<Item = MemberId> + use<> {
        (0..self.members.len()).map(MemberId)
    }

    pub fn children(&self, id: MemberId) -> &[MemberId] {
        &self.member(id).children
    }

    /// `(mother, father)` of a member.
    pub fn parents(&self, id: MemberId) -> (Option<MemberId>, Option<MemberId>) {
        let member = self.member(id);
        (member.mother, member.father)
    }

    /// Other children of the member's mother, excluding the member itself.
    /// Empty when no mother is recorded.
    pub fn siblings(&self, id: MemberId) -> impl Iterator<Item = MemberId> + '_ {
        self.member(id)
            .mother
            .map(|mother| self.children(mother))
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(move |&sibling| sibling != id)
    }

    /// Records an inferred carrier probability, rejecting values outside [0, 1].
    pub fn set_carrier_probability(
        &mut self,
        id: MemberId,
        probability: f64,
    ) -> Result<(), RiskError> {
        let member = self
            .members
            .get_mut(id.0)
            .ok_or(PedigreeError::UnknownMember(id.0))?;
        let context = format!("carrier probability of '{}'", member.name);
        member.carrier_probability = Some(check_probability(&context, probability)?);
        Ok(())
    }

    /// Forgets every inferred probability so a fresh pass can run.
    pub fn clear_carrier_probabilities(&mut self) {
        for member in &mut self.members {
            member.carrier_probability = None;
        }
    }
}
