//! End-to-end workflow scenarios
//!
//! Proposal, approval, rejection and merge over the in-memory store, plus
//! one run against SQLite on disk.

use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{NewPerson, Person, RelationType, RequestStatus, Sex};
use kindred_engine::{ApprovalOutcome, EngineConfig, EngineError, KinshipEngine, MergeReport};
use kindred_store::{MemoryStore, SqliteStore};
use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

fn add<S: KinshipStore>(engine: &mut KinshipEngine<S>, handle: &str, sex: Sex) -> Person
where
    S::Error: Display,
{
    engine
        .create_person(NewPerson::new(handle, handle, "Test", sex))
        .unwrap()
}

fn accepted(outcome: ApprovalOutcome) -> MergeReport {
    match outcome {
        ApprovalOutcome::Accepted(report) => report,
        other => panic!("expected finalization, got {:?}", other),
    }
}

/// Link `a` to `b` through a single-approval proposal
fn connect<S: KinshipStore>(
    engine: &mut KinshipEngine<S>,
    a: &Person,
    b: &Person,
    relation: RelationType,
) -> MergeReport
where
    S::Error: Display,
{
    let request = engine.propose(a.id, &b.handle, relation).unwrap();
    accepted(engine.approve(request.id, b.id).unwrap())
}

fn refresh<S: KinshipStore>(engine: &KinshipEngine<S>, person: &Person) -> Person
where
    S::Error: Display,
{
    engine.get_person(person.id).unwrap()
}

fn request_count<S: KinshipStore>(engine: &KinshipEngine<S>) -> usize
where
    S::Error: Debug + Display,
{
    engine
        .store()
        .query_requests(&RequestQuery::default())
        .unwrap()
        .len()
}

#[test]
fn test_scenario_a_single_approval_merge() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let y = add(&mut engine, "y", Sex::Male);

    let request = engine.propose(x.id, "y", RelationType::Father).unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.pending_approvals, BTreeSet::from([y.id]));
    assert_eq!(request.approved_by, BTreeSet::from([x.id]));
    assert_eq!(engine.list_unit(request.id).unwrap().len(), 1);

    let report = accepted(engine.approve(request.id, y.id).unwrap());

    // Equal sizes: the requester's family survives.
    assert_eq!(report.surviving_cluster, x.cluster);
    assert_eq!(report.absorbed_cluster, Some(y.cluster));
    assert_eq!(report.moved_members, 1);
    assert_eq!(report.edges_written, 2);
    assert_eq!(report.requests_accepted, 1);

    let x = refresh(&engine, &x);
    let y = refresh(&engine, &y);
    assert_eq!(x.relations.father, Some(y.id));
    assert_eq!(y.relations.son, vec![x.id]);
    assert_eq!(y.cluster, x.cluster);
    assert!(matches!(
        engine.get_cluster(report.absorbed_cluster.unwrap()),
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(
        engine.get_cluster(x.cluster).unwrap().members,
        BTreeSet::from([x.id, y.id])
    );
    assert_eq!(
        engine.get_request(request.id).unwrap().status,
        RequestStatus::Accepted
    );
    assert!(engine.audit().unwrap().is_healthy());
}

#[test]
fn test_scenario_b_satellite_approval() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let m = add(&mut engine, "m", Sex::Female);
    let y = add(&mut engine, "y", Sex::Male);
    connect(&mut engine, &x, &m, RelationType::Mother);

    let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
    assert_eq!(primary.pending_approvals, BTreeSet::from([m.id, y.id]));

    let unit = engine.list_unit(primary.id).unwrap();
    assert_eq!(unit.len(), 2);
    let satellite = unit[1].clone();
    assert_eq!(satellite.requester, y.id);
    assert_eq!(satellite.target, m.id);
    assert_eq!(satellite.relation_type, RelationType::Spouse);
    assert_eq!(satellite.pending_approvals, BTreeSet::from([m.id]));
    assert_eq!(satellite.approved_by, BTreeSet::from([y.id]));
    assert_eq!(satellite.parent, Some(primary.id));

    assert_eq!(
        engine.approve(primary.id, y.id).unwrap(),
        ApprovalOutcome::Waiting {
            remaining: 1,
            unit_remaining: 2
        }
    );
    assert_eq!(
        engine.approve(primary.id, m.id).unwrap(),
        ApprovalOutcome::Waiting {
            remaining: 0,
            unit_remaining: 1
        }
    );
    // Nothing is written while the satellite is outstanding.
    assert!(refresh(&engine, &x).relations.father.is_none());
    assert_eq!(
        engine.get_request(primary.id).unwrap().status,
        RequestStatus::Pending
    );

    let report = accepted(engine.approve(satellite.id, m.id).unwrap());
    assert_eq!(report.requests_accepted, 2);
    assert_eq!(report.edges_written, 4);
    // {x, m} outweighs {y}.
    assert_eq!(report.surviving_cluster, x.cluster);
    assert_eq!(report.moved_members, 1);

    let x = refresh(&engine, &x);
    let y = refresh(&engine, &y);
    let m = refresh(&engine, &m);
    assert_eq!(x.relations.father, Some(y.id));
    assert_eq!(y.relations.son, vec![x.id]);
    assert_eq!(y.relations.spouse, Some(m.id));
    assert_eq!(m.relations.spouse, Some(y.id));
    assert_eq!(y.cluster, x.cluster);
    assert!(engine
        .list_unit(primary.id)
        .unwrap()
        .iter()
        .all(|r| r.status == RequestStatus::Accepted));
    assert!(engine.audit().unwrap().is_healthy());
}

#[test]
fn test_scenario_c_rejection_voids_unit() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let m = add(&mut engine, "m", Sex::Female);
    let y = add(&mut engine, "y", Sex::Male);
    connect(&mut engine, &x, &m, RelationType::Mother);

    let x_before = refresh(&engine, &x);
    let y_before = refresh(&engine, &y);

    let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
    let rejected = engine.reject(primary.id, y.id).unwrap();
    assert_eq!(rejected.len(), 2);

    for request in engine.list_unit(primary.id).unwrap() {
        assert_eq!(request.status, RequestStatus::Rejected);
        assert_eq!(request.rejected_by, Some(y.id));
    }
    assert_eq!(refresh(&engine, &x), x_before);
    assert_eq!(refresh(&engine, &y), y_before);
    assert_ne!(x_before.cluster, y_before.cluster);

    // M can no longer approve the voided satellite.
    let satellite = engine.list_unit(primary.id).unwrap()[1].id;
    assert!(matches!(
        engine.approve(satellite, m.id),
        Err(EngineError::InvalidState(_))
    ));
    // A fresh proposal is allowed once the old one is rejected.
    assert!(engine.propose(x.id, "y", RelationType::Father).is_ok());
}

#[test]
fn test_scenario_c_satellite_rejection_voids_parent() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let m = add(&mut engine, "m", Sex::Female);
    add(&mut engine, "y", Sex::Male);
    connect(&mut engine, &x, &m, RelationType::Mother);

    let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
    let satellite = engine.list_unit(primary.id).unwrap()[1].id;

    engine.reject(satellite, m.id).unwrap();
    assert_eq!(
        engine.get_request(primary.id).unwrap().status,
        RequestStatus::Rejected
    );
}

#[test]
fn test_scenario_d_same_family_conflict() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let z = add(&mut engine, "z", Sex::Female);
    connect(&mut engine, &x, &z, RelationType::Sister);
    let before = request_count(&engine);

    assert!(matches!(
        engine.propose(x.id, "z", RelationType::Spouse),
        Err(EngineError::Conflict(_))
    ));
    assert!(matches!(
        engine.propose(x.id, "x", RelationType::Brother),
        Err(EngineError::Conflict(_))
    ));
    assert_eq!(request_count(&engine), before);
}

#[test]
fn test_larger_family_survives() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Female);
    let y = add(&mut engine, "y", Sex::Male);
    let w = add(&mut engine, "w", Sex::Female);
    connect(&mut engine, &y, &w, RelationType::Spouse);
    let y_family = refresh(&engine, &y).cluster;

    let report = connect(&mut engine, &x, &y, RelationType::Father);
    assert_eq!(report.surviving_cluster, y_family);
    assert_eq!(report.absorbed_cluster, Some(x.cluster));
    assert_eq!(refresh(&engine, &x).cluster, y_family);
    assert_eq!(engine.get_cluster(y_family).unwrap().size(), 3);
    // Daughter, since the requester is female.
    assert_eq!(refresh(&engine, &y).relations.daughter, vec![x.id]);
}

#[test]
fn test_sibling_proposal_implicates_parents() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let f = add(&mut engine, "f", Sex::Male);
    let s = add(&mut engine, "s", Sex::Female);
    connect(&mut engine, &x, &f, RelationType::Father);

    let primary = engine.propose(x.id, "s", RelationType::Sister).unwrap();
    assert_eq!(primary.pending_approvals, BTreeSet::from([f.id, s.id]));
    let unit = engine.list_unit(primary.id).unwrap();
    assert_eq!(unit[1].requester, s.id);
    assert_eq!(unit[1].target, f.id);
    assert_eq!(unit[1].relation_type, RelationType::Daughter);
}

#[test]
fn test_directly_linked_relative_keeps_own_family() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Female);
    let m = add(&mut engine, "m", Sex::Female);
    let y = add(&mut engine, "y", Sex::Male);
    engine.set_direct_edge(x.id, RelationType::Mother, m.id).unwrap();
    engine.set_direct_edge(m.id, RelationType::Daughter, x.id).unwrap();

    // m sits in another family but is implicated through the direct edge.
    let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
    assert_eq!(primary.pending_approvals, BTreeSet::from([y.id, m.id]));
    let satellite = engine.list_unit(primary.id).unwrap()[1].id;
    engine.approve(primary.id, y.id).unwrap();
    engine.approve(primary.id, m.id).unwrap();
    let report = accepted(engine.approve(satellite, m.id).unwrap());

    // Only the families of requester and target merge.
    assert_eq!(report.absorbed_cluster, Some(y.cluster));
    assert_eq!(refresh(&engine, &y).cluster, x.cluster);
    let m = refresh(&engine, &m);
    assert_ne!(m.cluster, x.cluster);
    assert_eq!(engine.get_cluster(m.cluster).unwrap().members, BTreeSet::from([m.id]));
    assert_eq!(m.relations.spouse, Some(y.id));
    assert_eq!(refresh(&engine, &y).relations.spouse, Some(m.id));
    assert!(engine.audit().unwrap().is_healthy());
}

#[test]
fn test_remove_person_guarded_by_pending_requests() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Male);
    let y = add(&mut engine, "y", Sex::Male);
    let z = add(&mut engine, "z", Sex::Female);

    let pending = engine.propose(x.id, "y", RelationType::Brother).unwrap();
    assert!(matches!(
        engine.remove_person(y.id),
        Err(EngineError::Conflict(_))
    ));
    engine.reject(pending.id, y.id).unwrap();

    connect(&mut engine, &y, &z, RelationType::Spouse);
    engine.remove_person(y.id).unwrap();

    let z = refresh(&engine, &z);
    assert!(z.relations.is_empty());
    assert_eq!(engine.get_cluster(z.cluster).unwrap().members, BTreeSet::from([z.id]));
    // Finished requests naming y are purged.
    assert_eq!(request_count(&engine), 0);
    assert!(engine.audit().unwrap().is_healthy());
}

#[test]
fn test_remove_person_purges_whole_unit() {
    let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
    let x = add(&mut engine, "x", Sex::Female);
    let m = add(&mut engine, "m", Sex::Female);
    add(&mut engine, "y", Sex::Male);
    connect(&mut engine, &x, &m, RelationType::Mother);

    let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
    let satellite = engine.list_unit(primary.id).unwrap()[1].clone();
    assert!(!satellite.involves(x.id));
    engine.reject(satellite.id, m.id).unwrap();

    engine.remove_person(x.id).unwrap();

    // The satellite names only y and m but goes with its primary.
    assert_eq!(request_count(&engine), 0);
    assert!(matches!(
        engine.list_unit(satellite.id),
        Err(EngineError::NotFound { .. })
    ));
    assert!(engine.list_incoming(m.id).unwrap().is_empty());
    assert!(refresh(&engine, &m).relations.is_empty());
    assert!(engine.audit().unwrap().is_healthy());
}

#[test]
fn test_remove_person_keeps_history_when_configured() {
    let config = EngineConfig {
        purge_requests_on_remove: false,
        ..Default::default()
    };
    let mut engine = KinshipEngine::new(MemoryStore::new(), config).unwrap();
    let y = add(&mut engine, "y", Sex::Male);
    let z = add(&mut engine, "z", Sex::Female);
    connect(&mut engine, &y, &z, RelationType::Spouse);

    engine.remove_person(z.id).unwrap();
    assert_eq!(request_count(&engine), 1);
    assert!(engine.list_incoming(z.id).is_err());
    assert_eq!(engine.list_outgoing(y.id).unwrap().len(), 1);
}

#[test]
fn test_sqlite_backed_workflow_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kindred.db");

    let (x, y, m) = {
        let mut engine = KinshipEngine::with_defaults(SqliteStore::new(&path).unwrap());
        let x = add(&mut engine, "x", Sex::Male);
        let m = add(&mut engine, "m", Sex::Female);
        let y = add(&mut engine, "y", Sex::Male);
        connect(&mut engine, &x, &m, RelationType::Mother);

        let primary = engine.propose(x.id, "y", RelationType::Father).unwrap();
        let satellite = engine.list_unit(primary.id).unwrap()[1].id;
        engine.approve(primary.id, y.id).unwrap();
        engine.approve(primary.id, m.id).unwrap();
        accepted(engine.approve(satellite, m.id).unwrap());
        (x, y, m)
    };

    let engine = KinshipEngine::with_defaults(SqliteStore::new(&path).unwrap());
    let view = engine.get_direct_relations(x.id).unwrap();
    assert_eq!(view.father.map(|p| p.id), Some(y.id));
    assert_eq!(view.mother.map(|p| p.id), Some(m.id));

    let family = engine.list_cluster_members(refresh(&engine, &x).cluster).unwrap();
    assert_eq!(family.len(), 3);

    let report = engine.audit().unwrap();
    assert!(report.is_healthy(), "{:?}", report.violations);
    assert_eq!(report.clusters_checked, 1);
}
