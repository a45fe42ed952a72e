//! In-memory implementation of KinshipStore

use crate::StoreError;
use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{
    Change, ChangeSet, ClusterId, CommitConflict, CommitOutcome, ConnectionRequest, EntityRef,
    FamilyCluster, Person, PersonId, RequestId,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Tables {
    persons: BTreeMap<PersonId, Person>,
    clusters: BTreeMap<ClusterId, FamilyCluster>,
    requests: BTreeMap<RequestId, ConnectionRequest>,
}

/// In-memory KinshipStore
///
/// Commits are applied to a copy of the tables that replaces the live ones
/// only when every change passed its checks, so a conflicting change set
/// leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(stored: Option<u64>, expected: u64, entity: EntityRef) -> Option<CommitConflict> {
    match stored {
        None => Some(CommitConflict::Missing(entity)),
        Some(found) if found != expected => Some(CommitConflict::Stale {
            entity,
            expected,
            found,
        }),
        Some(_) => None,
    }
}

impl Tables {
    fn handle_taken(&self, handle: &str, except: Option<PersonId>) -> bool {
        self.persons
            .values()
            .any(|p| p.handle == handle && Some(p.id) != except)
    }

    fn apply(&mut self, change: Change) -> Option<CommitConflict> {
        match change {
            Change::InsertPerson(mut person) => {
                if self.persons.contains_key(&person.id) {
                    return Some(CommitConflict::Duplicate(EntityRef::Person(person.id)));
                }
                if self.handle_taken(&person.handle, None) {
                    return Some(CommitConflict::Duplicate(EntityRef::Handle(person.handle)));
                }
                person.version = 0;
                self.persons.insert(person.id, person);
            }
            Change::UpdatePerson(mut person) => {
                let stored = self.persons.get(&person.id).map(|p| p.version);
                if let Some(conflict) =
                    check_version(stored, person.version, EntityRef::Person(person.id))
                {
                    return Some(conflict);
                }
                if self.handle_taken(&person.handle, Some(person.id)) {
                    return Some(CommitConflict::Duplicate(EntityRef::Handle(person.handle)));
                }
                person.version += 1;
                self.persons.insert(person.id, person);
            }
            Change::DeletePerson(id, version) => {
                let stored = self.persons.get(&id).map(|p| p.version);
                if let Some(conflict) = check_version(stored, version, EntityRef::Person(id)) {
                    return Some(conflict);
                }
                self.persons.remove(&id);
            }
            Change::InsertCluster(mut cluster) => {
                if self.clusters.contains_key(&cluster.id) {
                    return Some(CommitConflict::Duplicate(EntityRef::Cluster(cluster.id)));
                }
                cluster.version = 0;
                self.clusters.insert(cluster.id, cluster);
            }
            Change::UpdateCluster(mut cluster) => {
                let stored = self.clusters.get(&cluster.id).map(|c| c.version);
                if let Some(conflict) =
                    check_version(stored, cluster.version, EntityRef::Cluster(cluster.id))
                {
                    return Some(conflict);
                }
                cluster.version += 1;
                self.clusters.insert(cluster.id, cluster);
            }
            Change::DeleteCluster(id, version) => {
                let stored = self.clusters.get(&id).map(|c| c.version);
                if let Some(conflict) = check_version(stored, version, EntityRef::Cluster(id)) {
                    return Some(conflict);
                }
                self.clusters.remove(&id);
            }
            Change::InsertRequest(mut request) => {
                if self.requests.contains_key(&request.id) {
                    return Some(CommitConflict::Duplicate(EntityRef::Request(request.id)));
                }
                request.version = 0;
                self.requests.insert(request.id, request);
            }
            Change::UpdateRequest(mut request) => {
                let stored = self.requests.get(&request.id).map(|r| r.version);
                if let Some(conflict) =
                    check_version(stored, request.version, EntityRef::Request(request.id))
                {
                    return Some(conflict);
                }
                request.version += 1;
                self.requests.insert(request.id, request);
            }
            Change::DeleteRequest(id, version) => {
                let stored = self.requests.get(&id).map(|r| r.version);
                if let Some(conflict) = check_version(stored, version, EntityRef::Request(id)) {
                    return Some(conflict);
                }
                self.requests.remove(&id);
            }
        }
        None
    }
}

impl KinshipStore for MemoryStore {
    type Error = StoreError;

    fn get_person(&self, id: PersonId) -> Result<Option<Person>, Self::Error> {
        Ok(self.tables.persons.get(&id).cloned())
    }

    fn find_person_by_handle(&self, handle: &str) -> Result<Option<Person>, Self::Error> {
        Ok(self
            .tables
            .persons
            .values()
            .find(|p| p.handle == handle)
            .cloned())
    }

    fn list_persons(&self) -> Result<Vec<Person>, Self::Error> {
        Ok(self.tables.persons.values().cloned().collect())
    }

    fn get_cluster(&self, id: ClusterId) -> Result<Option<FamilyCluster>, Self::Error> {
        Ok(self.tables.clusters.get(&id).cloned())
    }

    fn list_clusters(&self) -> Result<Vec<FamilyCluster>, Self::Error> {
        Ok(self.tables.clusters.values().cloned().collect())
    }

    fn get_request(&self, id: RequestId) -> Result<Option<ConnectionRequest>, Self::Error> {
        Ok(self.tables.requests.get(&id).cloned())
    }

    fn query_requests(&self, query: &RequestQuery) -> Result<Vec<ConnectionRequest>, Self::Error> {
        let mut requests: Vec<ConnectionRequest> = self
            .tables
            .requests
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<CommitOutcome, Self::Error> {
        let mut staged = self.tables.clone();
        for change in changes.into_changes() {
            if let Some(conflict) = staged.apply(change) {
                return Ok(CommitOutcome::Conflict(conflict));
            }
        }
        self.tables = staged;
        Ok(CommitOutcome::Committed)
    }
}
