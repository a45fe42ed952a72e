//! Integration tests for kindred-store
//!
//! The same scenarios run against both backends; SQLite additionally has to
//! survive a close and reopen.

use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{
    ChangeSet, ClusterId, CommitConflict, CommitOutcome, ConnectionRequest, EntityRef,
    FamilyCluster, NewPerson, Person, PersonId, RelationType, RequestStatus, Sex,
};
use kindred_store::{MemoryStore, SqliteStore};
use std::collections::BTreeSet;

fn registered(handle: &str, sex: Sex, created_at: u64) -> (Person, FamilyCluster) {
    let cluster_id = ClusterId::new();
    let person = Person::new(
        PersonId::new(),
        NewPerson::new(handle, handle, "Family", sex),
        cluster_id,
        created_at,
    );
    let cluster = FamilyCluster::singleton(cluster_id, cluster_id.family_name(10), person.id, created_at);
    (person, cluster)
}

fn register<S: KinshipStore>(store: &mut S, handle: &str, sex: Sex) -> (Person, FamilyCluster)
where
    S::Error: std::fmt::Debug,
{
    let (person, cluster) = registered(handle, sex, 100);
    let mut changes = ChangeSet::new();
    changes.insert_person(person.clone()).insert_cluster(cluster.clone());
    assert!(store.commit(changes).unwrap().is_committed());
    (person, cluster)
}

fn edges_survive_round_trip<S: KinshipStore>(store: &mut S)
where
    S::Error: std::fmt::Debug,
{
    let (mut parent, _) = register(store, "parent", Sex::Female);
    let (first, _) = register(store, "first", Sex::Male);
    let (second, _) = register(store, "second", Sex::Female);
    let (third, _) = register(store, "third", Sex::Male);

    parent.relations.set(RelationType::Son, third.id);
    parent.relations.set(RelationType::Son, first.id);
    parent.relations.set(RelationType::Daughter, second.id);
    parent.relations.set(RelationType::Spouse, first.id);

    let mut changes = ChangeSet::new();
    changes.update_person(parent.clone());
    assert!(store.commit(changes).unwrap().is_committed());

    let stored = store.get_person(parent.id).unwrap().unwrap();
    assert_eq!(stored.relations, parent.relations);
    assert_eq!(stored.relations.get(RelationType::Son), vec![third.id, first.id]);
    assert_eq!(stored.version, 1);
}

fn merge_moves_members<S: KinshipStore>(store: &mut S)
where
    S::Error: std::fmt::Debug,
{
    let (mut a, mut cluster_a) = register(store, "a", Sex::Male);
    let (b, cluster_b) = register(store, "b", Sex::Female);

    let mut moved = b.clone();
    moved.cluster = cluster_a.id;
    a.relations.set(RelationType::Spouse, b.id);
    moved.relations.set(RelationType::Spouse, a.id);
    cluster_a.members.insert(b.id);

    let mut changes = ChangeSet::new();
    changes
        .update_person(a.clone())
        .update_person(moved)
        .update_cluster(cluster_a.clone())
        .delete_cluster(&cluster_b);
    assert!(store.commit(changes).unwrap().is_committed());

    assert!(store.get_cluster(cluster_b.id).unwrap().is_none());
    let survivor = store.get_cluster(cluster_a.id).unwrap().unwrap();
    assert_eq!(survivor.members, BTreeSet::from([a.id, b.id]));
    assert_eq!(store.get_person(b.id).unwrap().unwrap().cluster, cluster_a.id);
    assert_eq!(store.list_clusters().unwrap().len(), 1);
}

fn conflict_applies_nothing<S: KinshipStore>(store: &mut S)
where
    S::Error: std::fmt::Debug,
{
    let (a, cluster_a) = register(store, "a", Sex::Male);
    let (b, _) = register(store, "b", Sex::Male);

    // Someone else updates b first.
    let mut changes = ChangeSet::new();
    changes.update_person(b.clone());
    assert!(store.commit(changes).unwrap().is_committed());

    let mut renamed = cluster_a.clone();
    renamed.name = "renamed".into();
    let mut changes = ChangeSet::new();
    changes.update_cluster(renamed).update_person(b.clone());

    let outcome = store.commit(changes).unwrap();
    assert_eq!(
        outcome,
        CommitOutcome::Conflict(CommitConflict::Stale {
            entity: EntityRef::Person(b.id),
            expected: 0,
            found: 1,
        })
    );
    assert_eq!(store.get_cluster(cluster_a.id).unwrap().unwrap().name, cluster_a.name);
    assert_eq!(store.get_person(a.id).unwrap().unwrap().version, 0);
}

fn requests_are_queryable<S: KinshipStore>(store: &mut S)
where
    S::Error: std::fmt::Debug,
{
    let (a, _) = register(store, "a", Sex::Male);
    let (b, _) = register(store, "b", Sex::Male);
    let (m, _) = register(store, "m", Sex::Female);

    let primary = ConnectionRequest::pending(
        a.id,
        b.id,
        RelationType::Father,
        BTreeSet::from([b.id]),
        a.id,
        None,
        10,
    );
    let satellite = ConnectionRequest::pending(
        b.id,
        m.id,
        RelationType::Spouse,
        BTreeSet::from([m.id]),
        b.id,
        Some(primary.id),
        11,
    );

    let mut changes = ChangeSet::new();
    changes
        .insert_request(primary.clone())
        .insert_request(satellite.clone());
    assert!(store.commit(changes).unwrap().is_committed());

    let stored = store.get_request(satellite.id).unwrap().unwrap();
    assert_eq!(stored.pending_approvals, BTreeSet::from([m.id]));
    assert_eq!(stored.approved_by, BTreeSet::from([b.id]));
    assert_eq!(stored.parent, Some(primary.id));

    let awaiting_m = store
        .query_requests(&RequestQuery { awaiting: Some(m.id), ..Default::default() })
        .unwrap();
    assert_eq!(awaiting_m.iter().map(|r| r.id).collect::<Vec<_>>(), vec![satellite.id]);

    let involving_b = store
        .query_requests(&RequestQuery { involving: Some(b.id), ..Default::default() })
        .unwrap();
    assert_eq!(
        involving_b.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![primary.id, satellite.id]
    );

    let primaries = store
        .query_requests(&RequestQuery { primary_only: true, ..Default::default() })
        .unwrap();
    assert_eq!(primaries.len(), 1);

    let unit = store
        .query_requests(&RequestQuery { parent: Some(primary.id), ..Default::default() })
        .unwrap();
    assert_eq!(unit.len(), 1);

    let mut approved = stored.clone();
    approved.record_approval(m.id, 12).unwrap();
    approved.accept(12).unwrap();
    let mut changes = ChangeSet::new();
    changes.update_request(approved);
    assert!(store.commit(changes).unwrap().is_committed());

    let accepted = store
        .query_requests(&RequestQuery {
            status: Some(RequestStatus::Accepted),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(accepted.len(), 1);
    assert!(accepted[0].pending_approvals.is_empty());
    assert_eq!(accepted[0].approved_by, BTreeSet::from([b.id, m.id]));
}

fn duplicate_handle_is_conflict<S: KinshipStore>(store: &mut S)
where
    S::Error: std::fmt::Debug,
{
    register(store, "taken", Sex::Male);
    let (again, cluster) = registered("taken", Sex::Female, 200);

    let mut changes = ChangeSet::new();
    changes.insert_cluster(cluster.clone()).insert_person(again);
    assert_eq!(
        store.commit(changes).unwrap(),
        CommitOutcome::Conflict(CommitConflict::Duplicate(EntityRef::Handle("taken".into())))
    );
    assert!(store.get_cluster(cluster.id).unwrap().is_none());
}

#[test]
fn test_sqlite_edges_round_trip() {
    edges_survive_round_trip(&mut SqliteStore::new(":memory:").unwrap());
}

#[test]
fn test_memory_edges_round_trip() {
    edges_survive_round_trip(&mut MemoryStore::new());
}

#[test]
fn test_sqlite_merge_moves_members() {
    merge_moves_members(&mut SqliteStore::new(":memory:").unwrap());
}

#[test]
fn test_memory_merge_moves_members() {
    merge_moves_members(&mut MemoryStore::new());
}

#[test]
fn test_sqlite_conflict_applies_nothing() {
    conflict_applies_nothing(&mut SqliteStore::new(":memory:").unwrap());
}

#[test]
fn test_memory_conflict_applies_nothing() {
    conflict_applies_nothing(&mut MemoryStore::new());
}

#[test]
fn test_sqlite_request_queries() {
    requests_are_queryable(&mut SqliteStore::new(":memory:").unwrap());
}

#[test]
fn test_memory_request_queries() {
    requests_are_queryable(&mut MemoryStore::new());
}

#[test]
fn test_sqlite_duplicate_handle() {
    duplicate_handle_is_conflict(&mut SqliteStore::new(":memory:").unwrap());
}

#[test]
fn test_memory_duplicate_handle() {
    duplicate_handle_is_conflict(&mut MemoryStore::new());
}

#[test]
fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kindred.db");

    let (person, cluster) = {
        let mut store = SqliteStore::new(&path).unwrap();
        register(&mut store, "durable", Sex::Female)
    };

    let store = SqliteStore::new(&path).unwrap();
    let stored = store.find_person_by_handle("durable").unwrap().unwrap();
    assert_eq!(stored, person);
    assert_eq!(store.get_cluster(cluster.id).unwrap().unwrap(), cluster);
    assert_eq!(store.list_persons().unwrap().len(), 1);
}
