//! Person module - identity records and their public summary

use crate::cluster::ClusterId;
use crate::edges::DirectRelations;
use crate::id::uuid_id;
use crate::relation::UnsupportedRelation;
use std::fmt;

uuid_id!(
    /// Unique identifier for a person based on UUIDv7
    PersonId,
    "person"
);

/// Biological sex, required by the inverse-relation rules
///
/// Only two values are supported; extending this enum requires extending
/// every table in [`crate::relation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    /// Male
    Male,
    /// Female
    Female,
}

impl Sex {
    /// Get the value as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    /// Parse a sex value, rejecting anything but male or female
    pub fn parse(s: &str) -> Result<Self, UnsupportedRelation> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(UnsupportedRelation::Sex(s.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sex {
    type Err = UnsupportedRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Attributes supplied when registering a person
#[derive(Debug, Clone, PartialEq)]
pub struct NewPerson {
    /// Unique public handle (username)
    pub handle: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Profile photo URL, may be empty
    pub photo: String,
    /// Sex, used by relation inference
    pub sex: Sex,
}

impl NewPerson {
    /// Create registration attributes with an empty photo
    pub fn new(
        handle: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        sex: Sex,
    ) -> Self {
        Self {
            handle: handle.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            photo: String::new(),
            sex,
        }
    }

    /// Set the photo URL
    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = photo.into();
        self
    }
}

/// A person in the registry
///
/// Relatives are referenced by id only; the graph lives in the flat person
/// table, never in nested ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    /// Unique identifier
    pub id: PersonId,
    /// Unique public handle
    pub handle: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Profile photo URL
    pub photo: String,
    /// Sex
    pub sex: Sex,
    /// The one cluster this person belongs to
    pub cluster: ClusterId,
    /// Typed direct-relation edges
    pub relations: DirectRelations,
    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,
    /// Optimistic concurrency token, bumped by the store on every update
    pub version: u64,
}

impl Person {
    /// Build a new person record with no relatives
    pub fn new(id: PersonId, attrs: NewPerson, cluster: ClusterId, created_at: u64) -> Self {
        Self {
            id,
            handle: attrs.handle,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            photo: attrs.photo,
            sex: attrs.sex,
            cluster,
            relations: DirectRelations::default(),
            created_at,
            version: 0,
        }
    }

    /// Full display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Public summary of this person
    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            handle: self.handle.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            photo: self.photo.clone(),
            sex: self.sex,
            cluster: self.cluster,
        }
    }
}

/// Public view of a person, as shown next to relation listings
#[derive(Debug, Clone, PartialEq)]
pub struct PersonSummary {
    /// Person id
    pub id: PersonId,
    /// Public handle
    pub handle: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Profile photo URL
    pub photo: String,
    /// Sex
    pub sex: Sex,
    /// Current cluster
    pub cluster: ClusterId,
}
