//! Cluster merge - finalization of a fully approved request unit

use crate::{store_error, EngineError, KinshipEngine};
use kindred_domain::traits::KinshipStore;
use kindred_domain::{
    inverse_of, ChangeSet, ClusterId, ConnectionRequest, Person, PersonId, RelationType,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// What a finalization changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Family the two sides now share
    pub surviving_cluster: ClusterId,
    /// Family folded into the survivor and deleted; `None` when both sides
    /// already shared a family
    pub absorbed_cluster: Option<ClusterId>,
    /// Persons whose family changed
    pub moved_members: usize,
    /// Edges that were not present before
    pub edges_written: usize,
    /// Requests of the unit marked accepted
    pub requests_accepted: usize,
}

/// Persons read once and modified in place while a unit is finalized
struct PersonCache<'a, S> {
    store: &'a S,
    persons: BTreeMap<PersonId, Person>,
    dirty: BTreeSet<PersonId>,
}

impl<'a, S: KinshipStore> PersonCache<'a, S>
where
    S::Error: Display,
{
    fn new(store: &'a S) -> Self {
        Self {
            store,
            persons: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    fn get(&mut self, id: PersonId) -> Result<&mut Person, EngineError> {
        if !self.persons.contains_key(&id) {
            let person = self
                .store
                .get_person(id)
                .map_err(store_error)?
                .ok_or_else(|| EngineError::not_found("person", id))?;
            self.persons.insert(id, person);
        }
        self.persons
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("person", id))
    }

    fn mark(&mut self, id: PersonId) {
        self.dirty.insert(id);
    }

    /// Write `from.relations[relation] = to`; true when the edge is new
    fn write_edge(
        &mut self,
        from: PersonId,
        relation: RelationType,
        to: PersonId,
    ) -> Result<bool, EngineError> {
        let changed = self.get(from)?.relations.set(relation, to);
        if changed {
            self.mark(from);
        }
        Ok(changed)
    }

    fn into_updates(self, changes: &mut ChangeSet) {
        let PersonCache {
            mut persons, dirty, ..
        } = self;
        for id in dirty {
            if let Some(person) = persons.remove(&id) {
                changes.update_person(person);
            }
        }
    }
}

impl<S: KinshipStore> KinshipEngine<S>
where
    S::Error: Display,
{
    /// Append the finalization of `unit` to `changes`
    ///
    /// `unit` holds the primary request and its satellites, all with
    /// empty pending sets. Edges go in both directions, the smaller of the
    /// two families is folded into the larger (the requester's family wins
    /// a tie), and every request is accepted. Clusters are read here, not
    /// earlier, so the sizes compared are the ones the commit will check.
    pub(crate) fn plan_finalization(
        &self,
        unit: Vec<ConnectionRequest>,
        now: u64,
        changes: &mut ChangeSet,
    ) -> Result<MergeReport, EngineError> {
        let primary = unit
            .iter()
            .find(|r| !r.is_satellite())
            .cloned()
            .ok_or_else(|| EngineError::InvalidState("request unit has no primary".to_string()))?;

        let mut cache = PersonCache::new(&self.store);
        let mut edges_written = 0;

        for request in &unit {
            let requester_sex = cache.get(request.requester)?.sex;
            if cache.write_edge(request.requester, request.relation_type, request.target)? {
                edges_written += 1;
            }
            let inverse = inverse_of(request.relation_type, requester_sex);
            if cache.write_edge(request.target, inverse, request.requester)? {
                edges_written += 1;
            }
            tracing::debug!(
                request = %request.id,
                from = %request.requester,
                relation = %request.relation_type,
                to = %request.target,
                %inverse,
                "Edges written"
            );
        }

        let requester_cluster = cache.get(primary.requester)?.cluster;
        let target_cluster = cache.get(primary.target)?.cluster;

        let (surviving_cluster, absorbed_cluster, moved_members) =
            if requester_cluster == target_cluster {
                (requester_cluster, None, 0)
            } else {
                let requester_side = self.load_cluster(requester_cluster)?;
                let target_side = self.load_cluster(target_cluster)?;

                let (mut survivor, absorbed) = if target_side.size() > requester_side.size() {
                    (target_side, requester_side)
                } else {
                    (requester_side, target_side)
                };

                for member in &absorbed.members {
                    let person = cache.get(*member)?;
                    person.cluster = survivor.id;
                    cache.mark(*member);
                    survivor.members.insert(*member);
                }

                let report = (survivor.id, Some(absorbed.id), absorbed.size());
                changes.update_cluster(survivor).delete_cluster(&absorbed);
                report
            };

        cache.into_updates(changes);

        let requests_accepted = unit.len();
        for mut request in unit {
            request.accept(now)?;
            changes.update_request(request);
        }

        Ok(MergeReport {
            surviving_cluster,
            absorbed_cluster,
            moved_members,
            edges_written,
            requests_accepted,
        })
    }
}
