//! Relation types and the inference rules over them
//!
//! Both rule functions are total over the closed [`RelationType`] and
//! [`Sex`] enums. The only place an unknown relation or sex value can enter
//! is string parsing, which fails with [`UnsupportedRelation`].

use crate::person::Sex;
use std::fmt;

/// One of the seven primary kinship relation types
///
/// A relation is always read from the owner's side: "target is my `relation`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationType {
    /// Target is my father
    Father,
    /// Target is my mother
    Mother,
    /// Target is my spouse
    Spouse,
    /// Target is my brother
    Brother,
    /// Target is my sister
    Sister,
    /// Target is my son
    Son,
    /// Target is my daughter
    Daughter,
}

impl RelationType {
    /// Every relation type, in tree-projection angle order
    pub const ALL: [RelationType; 7] = [
        RelationType::Father,
        RelationType::Mother,
        RelationType::Spouse,
        RelationType::Brother,
        RelationType::Sister,
        RelationType::Son,
        RelationType::Daughter,
    ];

    /// Get the relation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Father => "father",
            RelationType::Mother => "mother",
            RelationType::Spouse => "spouse",
            RelationType::Brother => "brother",
            RelationType::Sister => "sister",
            RelationType::Son => "son",
            RelationType::Daughter => "daughter",
        }
    }

    /// Parse a relation type, rejecting anything outside the seven primary types
    pub fn parse(s: &str) -> Result<Self, UnsupportedRelation> {
        match s.trim().to_lowercase().as_str() {
            "father" => Ok(RelationType::Father),
            "mother" => Ok(RelationType::Mother),
            "spouse" => Ok(RelationType::Spouse),
            "brother" => Ok(RelationType::Brother),
            "sister" => Ok(RelationType::Sister),
            "son" => Ok(RelationType::Son),
            "daughter" => Ok(RelationType::Daughter),
            _ => Err(UnsupportedRelation::RelationType(s.to_string())),
        }
    }

    /// Whether a person holds at most one target of this type
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            RelationType::Father | RelationType::Mother | RelationType::Spouse
        )
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = UnsupportedRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An unknown relation type or sex value reached the inference rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedRelation {
    /// Relation name outside the seven primary types
    RelationType(String),
    /// Sex value other than male or female
    Sex(String),
}

impl fmt::Display for UnsupportedRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedRelation::RelationType(s) => write!(f, "unsupported relation type '{}'", s),
            UnsupportedRelation::Sex(s) => write!(f, "unsupported sex value '{}'", s),
        }
    }
}

impl std::error::Error for UnsupportedRelation {}

/// Compute the inverse of a relation edge
///
/// Given "A is B's `relation`", returns "B is A's `?`". The answer depends on
/// the sex of B, the person on the receiving end of the inverse edge.
///
/// # Examples
///
/// ```
/// use kindred_domain::{inverse_of, RelationType, Sex};
///
/// assert_eq!(inverse_of(RelationType::Father, Sex::Female), RelationType::Daughter);
/// assert_eq!(inverse_of(RelationType::Spouse, Sex::Male), RelationType::Spouse);
/// ```
pub fn inverse_of(relation: RelationType, receiver_sex: Sex) -> RelationType {
    match (relation, receiver_sex) {
        (RelationType::Father | RelationType::Mother, Sex::Male) => RelationType::Son,
        (RelationType::Father | RelationType::Mother, Sex::Female) => RelationType::Daughter,
        (RelationType::Son | RelationType::Daughter, Sex::Male) => RelationType::Father,
        (RelationType::Son | RelationType::Daughter, Sex::Female) => RelationType::Mother,
        (RelationType::Brother | RelationType::Sister, Sex::Male) => RelationType::Brother,
        (RelationType::Brother | RelationType::Sister, Sex::Female) => RelationType::Sister,
        (RelationType::Spouse, _) => RelationType::Spouse,
    }
}

/// Derive the relation implied for an existing relative of the requester
///
/// The requester is establishing `requested` with a target, and already has
/// a relative of type `existing`. The result is the relation type carried by
/// the satellite request between the target and that relative. `None` means
/// the relative is not asked to approve anything.
///
/// Only father, mother, brother and sister relatives can produce a result,
/// and a spouse request never implies anything.
pub fn derive_implied_relation(
    requested: RelationType,
    existing: RelationType,
) -> Option<RelationType> {
    use RelationType::*;

    match (requested, existing) {
        (Father, Mother) | (Mother, Father) => Some(Spouse),
        (Father | Mother, Brother) => Some(Son),
        (Father | Mother, Sister) => Some(Daughter),
        (Brother, Father | Mother) => Some(Son),
        (Sister, Father | Mother) => Some(Daughter),
        (Son, Father | Mother) => Some(Son),
        (Son, Brother) => Some(Brother),
        (Son, Sister) => Some(Sister),
        (Daughter, Father | Mother) => Some(Daughter),
        (Daughter, Brother | Sister) => Some(Sister),
        _ => None,
    }
}
