//! Property tests over random proposal histories

use kindred_domain::{inverse_of, NewPerson, PersonId, RelationType, RequestId, Sex};
use kindred_engine::{ApprovalOutcome, AuditViolation, KinshipEngine, MergeReport};
use kindred_store::MemoryStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Step {
    requester: usize,
    target: usize,
    relation: RelationType,
    reject: bool,
}

fn any_step(people: usize) -> impl Strategy<Value = Step> {
    (
        0..people,
        0..people,
        prop::sample::select(RelationType::ALL.to_vec()),
        prop::bool::weighted(0.2),
    )
        .prop_map(|(requester, target, relation, reject)| Step {
            requester,
            target,
            relation,
            reject,
        })
}

fn any_sexes() -> impl Strategy<Value = Vec<Sex>> {
    prop::collection::vec(prop::sample::select(vec![Sex::Male, Sex::Female]), 2..7)
}

/// Drive every approver of the unit until it finalizes
fn approve_all(
    engine: &mut KinshipEngine<MemoryStore>,
    primary: RequestId,
) -> Option<MergeReport> {
    loop {
        let unit = engine.list_unit(primary).ok()?;
        let (request, approver) = unit
            .iter()
            .find_map(|r| r.pending_approvals.iter().next().map(|p| (r.id, *p)))?;
        match engine.approve(request, approver).ok()? {
            ApprovalOutcome::Accepted(report) => return Some(report),
            ApprovalOutcome::Waiting { .. } => continue,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: clusters partition the registry after any history, and the
    /// number of clusters drops by one per merge across families
    #[test]
    fn test_partition_invariant(
        (sexes, steps) in any_sexes().prop_flat_map(|sexes| {
            let people = sexes.len();
            (Just(sexes), prop::collection::vec(any_step(people), 0..12))
        })
    ) {
        let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
        let ids: Vec<PersonId> = sexes
            .iter()
            .enumerate()
            .map(|(i, sex)| {
                let handle = format!("p{}", i);
                engine
                    .create_person(NewPerson::new(handle.clone(), handle, "Prop", *sex))
                    .unwrap()
                    .id
            })
            .collect();

        let mut merges = 0;
        for step in steps {
            let target_handle = format!("p{}", step.target);
            let Ok(primary) = engine.propose(ids[step.requester], &target_handle, step.relation) else {
                continue;
            };
            if step.reject {
                let rejected = engine.reject(primary.id, ids[step.target]).unwrap();
                prop_assert!(!rejected.is_empty());
                continue;
            }
            let report = approve_all(&mut engine, primary.id);
            prop_assert!(report.is_some());
            if let Some(report) = report {
                if report.absorbed_cluster.is_some() {
                    merges += 1;
                }
                let requester = engine.get_person(ids[step.requester]).unwrap();
                let target = engine.get_person(ids[step.target]).unwrap();
                prop_assert_eq!(requester.cluster, target.cluster);
                prop_assert!(requester.relations.contains(step.relation, target.id));

                // Every request of the unit holds in both directions right
                // after finalization.
                for request in engine.list_unit(primary.id).unwrap() {
                    let from = engine.get_person(request.requester).unwrap();
                    let to = engine.get_person(request.target).unwrap();
                    prop_assert!(from.relations.contains(request.relation_type, to.id));
                    prop_assert!(to
                        .relations
                        .contains(inverse_of(request.relation_type, from.sex), from.id));
                }
            }
        }

        let report = engine.audit().unwrap();
        // Singular edges may be overwritten by a later proposal, leaving the
        // former relative's edge without a partner; everything else must hold.
        let partition_violations: Vec<_> = report
            .violations
            .iter()
            .filter(|v| !matches!(v, AuditViolation::MissingInverse { .. }))
            .collect();
        prop_assert!(partition_violations.is_empty(), "{:?}", partition_violations);
        prop_assert_eq!(report.clusters_checked, ids.len() - merges);
    }
}
