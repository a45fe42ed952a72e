//! Person registry operations

use crate::{current_timestamp, store_error, EngineError, KinshipEngine};
use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{
    projection, ChangeSet, ClusterId, CommitConflict, EntityRef, FamilyCluster, NewPerson, Person,
    PersonId, PersonSummary, PlacedRelative, RelationType, RequestId, RequestStatus,
};
use std::collections::BTreeSet;
use std::fmt::Display;

/// A person's direct relatives, resolved to public summaries
///
/// Edges pointing at persons that no longer exist are left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectRelationsView {
    /// Father
    pub father: Option<PersonSummary>,
    /// Mother
    pub mother: Option<PersonSummary>,
    /// Spouse
    pub spouse: Option<PersonSummary>,
    /// Brothers, in the order they were added
    pub brother: Vec<PersonSummary>,
    /// Sisters
    pub sister: Vec<PersonSummary>,
    /// Sons
    pub son: Vec<PersonSummary>,
    /// Daughters
    pub daughter: Vec<PersonSummary>,
}

impl DirectRelationsView {
    /// Every relative with the relation it holds, in relation-type order
    pub fn entries(&self) -> Vec<(RelationType, &PersonSummary)> {
        let singles = [
            (RelationType::Father, &self.father),
            (RelationType::Mother, &self.mother),
            (RelationType::Spouse, &self.spouse),
        ];
        let lists = [
            (RelationType::Brother, &self.brother),
            (RelationType::Sister, &self.sister),
            (RelationType::Son, &self.son),
            (RelationType::Daughter, &self.daughter),
        ];

        singles
            .into_iter()
            .filter_map(|(relation, summary)| summary.as_ref().map(|s| (relation, s)))
            .chain(
                lists
                    .into_iter()
                    .flat_map(|(relation, list)| list.iter().map(move |s| (relation, s))),
            )
            .collect()
    }

    /// Whether no relative is present
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<S: KinshipStore> KinshipEngine<S>
where
    S::Error: Display,
{
    /// Register a person in a new singleton family
    ///
    /// The handle is trimmed and must be non-empty and unused.
    pub fn create_person(&mut self, attrs: NewPerson) -> Result<Person, EngineError> {
        let mut attrs = attrs;
        attrs.handle = attrs.handle.trim().to_string();
        if attrs.handle.is_empty() {
            return Err(EngineError::InvalidState("handle must not be empty".to_string()));
        }
        if self
            .store
            .find_person_by_handle(&attrs.handle)
            .map_err(store_error)?
            .is_some()
        {
            return Err(EngineError::Conflict(format!(
                "handle '{}' is already taken",
                attrs.handle
            )));
        }

        let now = current_timestamp();
        let cluster_id = ClusterId::new();
        let person = Person::new(PersonId::new(), attrs, cluster_id, now);
        let cluster = FamilyCluster::singleton(
            cluster_id,
            cluster_id.family_name(self.config.cluster_name_digits),
            person.id,
            now,
        );

        let mut changes = ChangeSet::new();
        changes
            .insert_cluster(cluster.clone())
            .insert_person(person.clone());

        match self.commit(changes) {
            Err(EngineError::TransactionFailure(CommitConflict::Duplicate(EntityRef::Handle(
                handle,
            )))) => {
                return Err(EngineError::Conflict(format!(
                    "handle '{}' is already taken",
                    handle
                )))
            }
            other => other?,
        }

        tracing::info!(
            person = %person.id,
            handle = %person.handle,
            family = %cluster.name,
            "Person registered"
        );
        Ok(person)
    }

    /// Get a person by id
    pub fn get_person(&self, id: PersonId) -> Result<Person, EngineError> {
        self.load_person(id)
    }

    /// Get a person by handle
    pub fn find_person(&self, handle: &str) -> Result<Person, EngineError> {
        let handle = handle.trim();
        self.store
            .find_person_by_handle(handle)
            .map_err(store_error)?
            .ok_or_else(|| EngineError::not_found("person", handle))
    }

    /// Get a family cluster by id
    pub fn get_cluster(&self, id: ClusterId) -> Result<FamilyCluster, EngineError> {
        self.load_cluster(id)
    }

    /// Write one direct edge without touching its inverse
    ///
    /// Singular types overwrite, plural types append. Returns whether
    /// anything changed; an unchanged edge commits nothing.
    pub fn set_direct_edge(
        &mut self,
        person: PersonId,
        relation: RelationType,
        target: PersonId,
    ) -> Result<bool, EngineError> {
        if person == target {
            return Err(EngineError::InvalidState(format!(
                "person {} cannot be their own {}",
                person, relation
            )));
        }
        let mut record = self.load_person(person)?;
        self.load_person(target)?;

        if !record.relations.set(relation, target) {
            return Ok(false);
        }

        let mut changes = ChangeSet::new();
        changes.update_person(record);
        self.commit(changes)?;

        tracing::info!(%person, %relation, %target, "Direct edge written");
        Ok(true)
    }

    /// Remove a person from the registry
    ///
    /// Refused with `Conflict` while any pending request references the
    /// person. Otherwise every edge pointing at the person is detached, the
    /// person leaves its family (which is deleted once empty) and, when
    /// configured, each request unit naming the person is purged with its
    /// primary and all satellites, all in one commit.
    pub fn remove_person(&mut self, id: PersonId) -> Result<(), EngineError> {
        let person = self.load_person(id)?;

        let pending = self
            .store
            .query_requests(&RequestQuery {
                involving: Some(id),
                status: Some(RequestStatus::Pending),
                ..Default::default()
            })
            .map_err(store_error)?;
        if !pending.is_empty() {
            return Err(EngineError::Conflict(format!(
                "person {} is referenced by {} pending request(s)",
                id,
                pending.len()
            )));
        }

        let cluster = self.store.get_cluster(person.cluster).map_err(store_error)?;

        // Direct edges may cross families.
        let mut changes = ChangeSet::new();
        let mut detached = 0;
        for mut holder in self.store.list_persons().map_err(store_error)? {
            if holder.id != id && holder.relations.detach(id) {
                detached += 1;
                changes.update_person(holder);
            }
        }

        match cluster {
            Some(mut cluster) => {
                cluster.members.remove(&id);
                if cluster.members.is_empty() {
                    changes.delete_cluster(&cluster);
                } else {
                    changes.update_cluster(cluster);
                }
            }
            None => tracing::warn!(person = %id, cluster = %person.cluster, "Family of removed person is missing"),
        }

        let mut purged = 0;
        if self.config.purge_requests_on_remove {
            let finished = self
                .store
                .query_requests(&RequestQuery {
                    involving: Some(id),
                    ..Default::default()
                })
                .map_err(store_error)?;
            let roots: BTreeSet<RequestId> = finished.iter().map(|r| r.root()).collect();

            let mut seen = BTreeSet::new();
            for root in roots {
                let mut unit: Vec<_> =
                    self.store.get_request(root).map_err(store_error)?.into_iter().collect();
                unit.extend(
                    self.store
                        .query_requests(&RequestQuery {
                            parent: Some(root),
                            ..Default::default()
                        })
                        .map_err(store_error)?,
                );
                for request in &unit {
                    if seen.insert(request.id) {
                        changes.delete_request(request);
                    }
                }
            }
            // Satellites whose primary is already gone.
            for request in &finished {
                if seen.insert(request.id) {
                    changes.delete_request(request);
                }
            }
            purged = seen.len();
        }

        changes.delete_person(&person);
        self.commit(changes)?;

        tracing::info!(
            person = %id,
            handle = %person.handle,
            detached,
            purged,
            "Person removed"
        );
        Ok(())
    }

    /// A person's direct relatives as public summaries
    pub fn get_direct_relations(&self, id: PersonId) -> Result<DirectRelationsView, EngineError> {
        let person = self.load_person(id)?;
        let mut view = DirectRelationsView::default();

        for (relation, relative) in person.relations.iter() {
            let Some(summary) = self
                .store
                .get_person(relative)
                .map_err(store_error)?
                .map(|p| p.summary())
            else {
                tracing::warn!(person = %id, %relation, %relative, "Dangling edge skipped");
                continue;
            };
            match relation {
                RelationType::Father => view.father = Some(summary),
                RelationType::Mother => view.mother = Some(summary),
                RelationType::Spouse => view.spouse = Some(summary),
                RelationType::Brother => view.brother.push(summary),
                RelationType::Sister => view.sister.push(summary),
                RelationType::Son => view.son.push(summary),
                RelationType::Daughter => view.daughter.push(summary),
            }
        }

        Ok(view)
    }

    /// Members of a family cluster, in id order
    pub fn list_cluster_members(&self, cluster: ClusterId) -> Result<Vec<PersonSummary>, EngineError> {
        let cluster = self.load_cluster(cluster)?;
        cluster
            .members
            .iter()
            .map(|member| self.load_person(*member).map(|p| p.summary()))
            .collect()
    }

    /// Place a person's direct relatives around them
    pub fn project_tree(&self, id: PersonId) -> Result<Vec<PlacedRelative>, EngineError> {
        let person = self.load_person(id)?;
        Ok(projection::project(&person.relations, &self.config.layout.params()))
    }
}
