//! Family cluster module - the connected-component label over persons

use crate::id::uuid_id;
use crate::person::PersonId;
use std::collections::BTreeSet;

uuid_id!(
    /// Unique identifier for a family cluster based on UUIDv7
    ClusterId,
    "cluster"
);

impl ClusterId {
    /// Numeric family name derived from the id's random bits
    ///
    /// UUIDv7 keeps its low 62 bits random, so the name is stable for a given
    /// cluster and spread evenly. `digits` is clamped to 1..=18.
    ///
    /// # Examples
    ///
    /// ```
    /// use kindred_domain::ClusterId;
    ///
    /// let name = ClusterId::new().family_name(10);
    /// assert_eq!(name.len(), 10);
    /// assert!(name.chars().all(|c| c.is_ascii_digit()));
    /// ```
    pub fn family_name(&self, digits: u32) -> String {
        let digits = digits.clamp(1, 18);
        let floor = 10u64.pow(digits - 1);
        let span = 10u64.pow(digits) - floor;
        let random = (self.value() as u64) & ((1u64 << 62) - 1);
        format!("{}", floor + random % span)
    }
}

/// A family cluster
///
/// Members always form a non-empty set; the set of all clusters partitions
/// the person registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyCluster {
    /// Unique identifier
    pub id: ClusterId,
    /// Numeric family name
    pub name: String,
    /// Member person ids
    pub members: BTreeSet<PersonId>,
    /// The person whose registration created this cluster
    pub created_by: PersonId,
    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,
    /// Optimistic concurrency token
    pub version: u64,
}

impl FamilyCluster {
    /// Create a singleton cluster for a newly registered person
    pub fn singleton(id: ClusterId, name: String, founder: PersonId, created_at: u64) -> Self {
        Self {
            id,
            name,
            members: BTreeSet::from([founder]),
            created_by: founder,
            created_at,
            version: 0,
        }
    }

    /// Number of members
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Whether `person` is a member
    pub fn contains(&self, person: PersonId) -> bool {
        self.members.contains(&person)
    }
}
