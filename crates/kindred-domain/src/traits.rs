//! Trait definitions for external interactions
//!
//! These traits define the boundary between the graph rules and storage.
//! Implementations live in `kindred-store`.

use crate::changes::{ChangeSet, CommitOutcome};
use crate::cluster::{ClusterId, FamilyCluster};
use crate::person::{Person, PersonId};
use crate::relation::RelationType;
use crate::request::{ConnectionRequest, RequestId, RequestStatus};

/// Trait for storing persons, clusters and connection requests
///
/// Reads return snapshots; all writes go through [`KinshipStore::commit`],
/// which applies a whole [`ChangeSet`] atomically or not at all.
pub trait KinshipStore {
    /// Error type for backend faults (I/O, corruption)
    type Error;

    /// Get a person by id
    fn get_person(&self, id: PersonId) -> Result<Option<Person>, Self::Error>;

    /// Get a person by unique handle
    fn find_person_by_handle(&self, handle: &str) -> Result<Option<Person>, Self::Error>;

    /// All persons, in id order
    fn list_persons(&self) -> Result<Vec<Person>, Self::Error>;

    /// Get a cluster by id
    fn get_cluster(&self, id: ClusterId) -> Result<Option<FamilyCluster>, Self::Error>;

    /// All clusters, in id order
    fn list_clusters(&self) -> Result<Vec<FamilyCluster>, Self::Error>;

    /// Get a request by id
    fn get_request(&self, id: RequestId) -> Result<Option<ConnectionRequest>, Self::Error>;

    /// Requests matching the query, oldest first
    fn query_requests(&self, query: &RequestQuery) -> Result<Vec<ConnectionRequest>, Self::Error>;

    /// Apply every change or none of them
    fn commit(&mut self, changes: ChangeSet) -> Result<CommitOutcome, Self::Error>;
}

/// Query criteria for retrieving connection requests
///
/// All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    /// Filter by requester
    pub requester: Option<PersonId>,

    /// Filter by target
    pub target: Option<PersonId>,

    /// Person must be requester, target or an approver
    pub involving: Option<PersonId>,

    /// Person must be among the outstanding approvers
    pub awaiting: Option<PersonId>,

    /// Filter by parent request (satellites of a primary)
    pub parent: Option<RequestId>,

    /// Only primary requests (no parent)
    pub primary_only: bool,

    /// Filter by status
    pub status: Option<RequestStatus>,

    /// Filter by relation type
    pub relation_type: Option<RelationType>,
}

impl RequestQuery {
    /// Whether `request` satisfies every set criterion
    pub fn matches(&self, request: &ConnectionRequest) -> bool {
        self.requester.is_none_or(|p| request.requester == p)
            && self.target.is_none_or(|p| request.target == p)
            && self.involving.is_none_or(|p| request.involves(p))
            && self.awaiting.is_none_or(|p| request.pending_approvals.contains(&p))
            && self.parent.is_none_or(|id| request.parent == Some(id))
            && (!self.primary_only || request.parent.is_none())
            && self.status.is_none_or(|s| request.status == s)
            && self.relation_type.is_none_or(|r| request.relation_type == r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_query_matching() {
        let a = PersonId::from_value(1);
        let b = PersonId::from_value(2);
        let m = PersonId::from_value(3);
        let request = ConnectionRequest::pending(
            a,
            b,
            RelationType::Father,
            BTreeSet::from([b, m]),
            a,
            None,
            0,
        );

        assert!(RequestQuery::default().matches(&request));
        assert!(RequestQuery { awaiting: Some(m), ..Default::default() }.matches(&request));
        assert!(!RequestQuery { awaiting: Some(a), ..Default::default() }.matches(&request));
        assert!(RequestQuery { involving: Some(a), primary_only: true, ..Default::default() }.matches(&request));
        assert!(!RequestQuery { status: Some(RequestStatus::Accepted), ..Default::default() }.matches(&request));
        assert!(!RequestQuery { parent: Some(request.id), ..Default::default() }.matches(&request));
        assert!(!RequestQuery { relation_type: Some(RelationType::Son), ..Default::default() }.matches(&request));
    }
}
