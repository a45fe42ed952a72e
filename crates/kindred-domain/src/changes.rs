//! Change sets - the unit of atomic, optimistically-checked persistence
//!
//! The engine never writes records one by one. It reads what it needs,
//! computes every insert, update and delete of an operation, and hands the
//! resulting [`ChangeSet`] to [`crate::KinshipStore::commit`]. Each update and
//! delete names the `version` it was computed from; the store re-checks all
//! of them inside one transaction and applies nothing if any check fails.

use crate::cluster::{ClusterId, FamilyCluster};
use crate::person::{Person, PersonId};
use crate::request::{ConnectionRequest, RequestId};
use std::fmt;

/// One write inside a change set
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert a new person; fails on a taken id or handle
    InsertPerson(Person),
    /// Replace a person whose stored version equals `person.version`
    UpdatePerson(Person),
    /// Delete a person at the given version
    DeletePerson(PersonId, u64),
    /// Insert a new cluster
    InsertCluster(FamilyCluster),
    /// Replace a cluster whose stored version equals `cluster.version`
    UpdateCluster(FamilyCluster),
    /// Delete a cluster at the given version
    DeleteCluster(ClusterId, u64),
    /// Insert a new request
    InsertRequest(ConnectionRequest),
    /// Replace a request whose stored version equals `request.version`
    UpdateRequest(ConnectionRequest),
    /// Delete a request at the given version
    DeleteRequest(RequestId, u64),
}

/// An ordered list of writes committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    /// Insert a person
    pub fn insert_person(&mut self, person: Person) -> &mut Self {
        self.push(Change::InsertPerson(person))
    }

    /// Update a person
    pub fn update_person(&mut self, person: Person) -> &mut Self {
        self.push(Change::UpdatePerson(person))
    }

    /// Delete a person
    pub fn delete_person(&mut self, person: &Person) -> &mut Self {
        self.push(Change::DeletePerson(person.id, person.version))
    }

    /// Insert a cluster
    pub fn insert_cluster(&mut self, cluster: FamilyCluster) -> &mut Self {
        self.push(Change::InsertCluster(cluster))
    }

    /// Update a cluster
    pub fn update_cluster(&mut self, cluster: FamilyCluster) -> &mut Self {
        self.push(Change::UpdateCluster(cluster))
    }

    /// Delete a cluster
    pub fn delete_cluster(&mut self, cluster: &FamilyCluster) -> &mut Self {
        self.push(Change::DeleteCluster(cluster.id, cluster.version))
    }

    /// Insert a request
    pub fn insert_request(&mut self, request: ConnectionRequest) -> &mut Self {
        self.push(Change::InsertRequest(request))
    }

    /// Update a request
    pub fn update_request(&mut self, request: ConnectionRequest) -> &mut Self {
        self.push(Change::UpdateRequest(request))
    }

    /// Delete a request
    pub fn delete_request(&mut self, request: &ConnectionRequest) -> &mut Self {
        self.push(Change::DeleteRequest(request.id, request.version))
    }

    /// The changes in commit order
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Consume into the ordered changes
    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// Number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether there is nothing to commit
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A record a commit conflicted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// A person record
    Person(PersonId),
    /// A person handle (unique key)
    Handle(String),
    /// A cluster record
    Cluster(ClusterId),
    /// A request record
    Request(RequestId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Person(id) => write!(f, "person {}", id),
            EntityRef::Handle(handle) => write!(f, "handle '{}'", handle),
            EntityRef::Cluster(id) => write!(f, "cluster {}", id),
            EntityRef::Request(id) => write!(f, "request {}", id),
        }
    }
}

/// Why a change set was refused as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitConflict {
    /// The stored version differs from the one the change was computed from
    Stale {
        /// Record concerned
        entity: EntityRef,
        /// Version the change expected
        expected: u64,
        /// Version found in the store
        found: u64,
    },
    /// An update or delete targeted a record that no longer exists
    Missing(EntityRef),
    /// An insert collided with an existing id or unique key
    Duplicate(EntityRef),
}

impl fmt::Display for CommitConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitConflict::Stale { entity, expected, found } => write!(
                f,
                "{} changed concurrently (expected version {}, found {})",
                entity, expected, found
            ),
            CommitConflict::Missing(entity) => write!(f, "{} no longer exists", entity),
            CommitConflict::Duplicate(entity) => write!(f, "{} already exists", entity),
        }
    }
}

/// Result of a commit that reached the store without a backend fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every change applied
    Committed,
    /// Nothing applied
    Conflict(CommitConflict),
}

impl CommitOutcome {
    /// Whether the change set was applied
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}
