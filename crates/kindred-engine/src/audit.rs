//! Whole-store consistency audit

use crate::{store_error, EngineError, KinshipEngine};
use kindred_domain::traits::KinshipStore;
use kindred_domain::{ClusterId, PersonId, RelationType};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};

/// One inconsistency found by [`KinshipEngine::audit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditViolation {
    /// The person is listed by no cluster
    Unclustered(PersonId),
    /// The person is listed by more than one cluster
    MultipleClusters(PersonId, Vec<ClusterId>),
    /// The person's own cluster field disagrees with the listing cluster
    ClusterMismatch {
        /// Person concerned
        person: PersonId,
        /// Cluster stored on the person
        recorded: ClusterId,
        /// Cluster listing the person as a member
        listed_in: ClusterId,
    },
    /// A cluster with no members
    EmptyCluster(ClusterId),
    /// A cluster lists a person that does not exist
    UnknownMember(ClusterId, PersonId),
    /// An edge points at a person that does not exist
    DanglingEdge {
        /// Edge owner
        person: PersonId,
        /// Edge type
        relation: RelationType,
        /// Missing target
        target: PersonId,
    },
    /// An edge whose target has no edge back
    MissingInverse {
        /// Edge owner
        person: PersonId,
        /// Edge type
        relation: RelationType,
        /// Target without a reverse edge
        target: PersonId,
    },
}

impl Display for AuditViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditViolation::Unclustered(person) => {
                write!(f, "person {} belongs to no family", person)
            }
            AuditViolation::MultipleClusters(person, clusters) => {
                write!(f, "person {} is listed by {} families", person, clusters.len())
            }
            AuditViolation::ClusterMismatch {
                person,
                recorded,
                listed_in,
            } => write!(
                f,
                "person {} records family {} but is listed by {}",
                person, recorded, listed_in
            ),
            AuditViolation::EmptyCluster(cluster) => write!(f, "family {} has no members", cluster),
            AuditViolation::UnknownMember(cluster, person) => {
                write!(f, "family {} lists unknown person {}", cluster, person)
            }
            AuditViolation::DanglingEdge {
                person,
                relation,
                target,
            } => write!(f, "{} of {} is unknown person {}", relation, person, target),
            AuditViolation::MissingInverse {
                person,
                relation,
                target,
            } => write!(
                f,
                "{} is {}'s {} but has no edge back",
                target, person, relation
            ),
        }
    }
}

/// Result of an audit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Persons inspected
    pub persons_checked: usize,
    /// Clusters inspected
    pub clusters_checked: usize,
    /// Every inconsistency found
    pub violations: Vec<AuditViolation>,
}

impl AuditReport {
    /// Whether no violation was found
    pub fn is_healthy(&self) -> bool {
        self.violations.is_empty()
    }
}

impl<S: KinshipStore> KinshipEngine<S>
where
    S::Error: Display,
{
    /// Check that clusters partition the registry and that edges resolve
    ///
    /// Edges only need a reverse edge of any type; the exact inverse depends
    /// on data the registry does not validate (a `father` edge may point at a
    /// person recorded as female).
    pub fn audit(&self) -> Result<AuditReport, EngineError> {
        let persons = self.store.list_persons().map_err(store_error)?;
        let clusters = self.store.list_clusters().map_err(store_error)?;

        let by_id: HashMap<PersonId, _> = persons.iter().map(|p| (p.id, p)).collect();
        let mut listed: BTreeMap<PersonId, Vec<ClusterId>> = BTreeMap::new();
        let mut violations = Vec::new();

        for cluster in &clusters {
            if cluster.members.is_empty() {
                violations.push(AuditViolation::EmptyCluster(cluster.id));
            }
            for member in &cluster.members {
                if by_id.contains_key(member) {
                    listed.entry(*member).or_default().push(cluster.id);
                } else {
                    violations.push(AuditViolation::UnknownMember(cluster.id, *member));
                }
            }
        }

        for person in &persons {
            match listed.get(&person.id).map(Vec::as_slice) {
                None | Some([]) => violations.push(AuditViolation::Unclustered(person.id)),
                Some([cluster]) => {
                    if *cluster != person.cluster {
                        violations.push(AuditViolation::ClusterMismatch {
                            person: person.id,
                            recorded: person.cluster,
                            listed_in: *cluster,
                        });
                    }
                }
                Some(many) => {
                    violations.push(AuditViolation::MultipleClusters(person.id, many.to_vec()))
                }
            }

            for (relation, target) in person.relations.iter() {
                match by_id.get(&target) {
                    None => violations.push(AuditViolation::DanglingEdge {
                        person: person.id,
                        relation,
                        target,
                    }),
                    Some(other) if !other.relations.relatives().contains(&person.id) => {
                        violations.push(AuditViolation::MissingInverse {
                            person: person.id,
                            relation,
                            target,
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        if !violations.is_empty() {
            tracing::warn!(violations = violations.len(), "Audit found inconsistencies");
        }

        Ok(AuditReport {
            persons_checked: persons.len(),
            clusters_checked: clusters.len(),
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_domain::{NewPerson, Sex};
    use kindred_store::MemoryStore;

    #[test]
    fn test_fresh_registry_is_healthy() {
        let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
        engine
            .create_person(NewPerson::new("a", "A", "One", Sex::Male))
            .unwrap();
        engine
            .create_person(NewPerson::new("b", "B", "Two", Sex::Female))
            .unwrap();

        let report = engine.audit().unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.persons_checked, 2);
        assert_eq!(report.clusters_checked, 2);
    }

    #[test]
    fn test_one_sided_edge_is_reported() {
        let mut engine = KinshipEngine::with_defaults(MemoryStore::new());
        let a = engine
            .create_person(NewPerson::new("a", "A", "One", Sex::Male))
            .unwrap();
        let b = engine
            .create_person(NewPerson::new("b", "B", "Two", Sex::Female))
            .unwrap();
        engine.set_direct_edge(a.id, RelationType::Spouse, b.id).unwrap();

        let report = engine.audit().unwrap();
        assert_eq!(
            report.violations,
            vec![AuditViolation::MissingInverse {
                person: a.id,
                relation: RelationType::Spouse,
                target: b.id,
            }]
        );
        assert!(report.violations[0].to_string().contains("no edge back"));
    }
}
