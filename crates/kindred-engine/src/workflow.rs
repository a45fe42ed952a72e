//! Connection request workflow
//!
//! A proposal creates a primary request plus one satellite per relative of
//! the requester that the new relation implicates. The primary and its
//! satellites form a unit: every approver of every request in it must
//! approve before anything is written to the graph, and one rejection
//! voids all of them.

use crate::{current_timestamp, store_error, EngineError, KinshipEngine, MergeReport};
use kindred_domain::traits::{KinshipStore, RequestQuery};
use kindred_domain::{
    derive_implied_relation, ChangeSet, ConnectionRequest, PersonId, RelationType,
    RequestId, RequestStateError, RequestStatus,
};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Result of a successful approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Approvals are still outstanding somewhere in the unit
    Waiting {
        /// Approvals still required on the approved request
        remaining: usize,
        /// Approvals still required across the whole unit
        unit_remaining: usize,
    },
    /// The unit was finalized and the families merged
    Accepted(MergeReport),
}

fn newest_first(requests: &mut [ConnectionRequest]) {
    requests.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

impl<S: KinshipStore> KinshipEngine<S>
where
    S::Error: Display,
{
    /// Propose that the person with `target_handle` is the requester's
    /// `relation`
    ///
    /// Fails with `Conflict` when both already share a family or when an
    /// equivalent pending request exists between them in either direction.
    /// The returned primary request is already approved by the requester.
    pub fn propose(
        &mut self,
        requester: PersonId,
        target_handle: &str,
        relation: RelationType,
    ) -> Result<ConnectionRequest, EngineError> {
        let requester = self.load_person(requester)?;
        let target = self.find_person(target_handle)?;

        if requester.cluster == target.cluster {
            return Err(EngineError::Conflict(format!(
                "{} and {} already belong to the same family",
                requester.handle, target.handle
            )));
        }

        for (from, to) in [(requester.id, target.id), (target.id, requester.id)] {
            let existing = self
                .store
                .query_requests(&RequestQuery {
                    requester: Some(from),
                    target: Some(to),
                    status: Some(RequestStatus::Pending),
                    relation_type: Some(relation),
                    ..Default::default()
                })
                .map_err(store_error)?;
            if let Some(existing) = existing.first() {
                return Err(EngineError::Conflict(format!(
                    "a pending {} request already links {} and {} ({})",
                    relation, requester.handle, target.handle, existing.id
                )));
            }
        }

        let mut implicated = Vec::new();
        for (existing, relative) in requester.relations.iter() {
            if relative == target.id {
                continue;
            }
            if let Some(derived) = derive_implied_relation(relation, existing) {
                tracing::debug!(
                    requested = %relation,
                    %existing,
                    %relative,
                    %derived,
                    "Relative implicated"
                );
                implicated.push((relative, derived));
            }
        }

        let now = current_timestamp();
        let mut approvers = BTreeSet::from([target.id]);
        approvers.extend(implicated.iter().map(|(relative, _)| *relative));

        let primary = ConnectionRequest::pending(
            requester.id,
            target.id,
            relation,
            approvers,
            requester.id,
            None,
            now,
        );

        let mut changes = ChangeSet::new();
        changes.insert_request(primary.clone());
        for (relative, derived) in &implicated {
            changes.insert_request(ConnectionRequest::pending(
                target.id,
                *relative,
                *derived,
                BTreeSet::from([*relative]),
                target.id,
                Some(primary.id),
                now,
            ));
        }
        self.commit(changes)?;

        tracing::info!(
            request = %primary.id,
            requester = %requester.handle,
            target = %target.handle,
            %relation,
            satellites = implicated.len(),
            "Connection proposed"
        );
        Ok(primary)
    }

    /// Record `approver`'s approval of one request
    ///
    /// When this was the last approval outstanding across the request's unit,
    /// the unit is finalized in the same commit.
    pub fn approve(
        &mut self,
        request: RequestId,
        approver: PersonId,
    ) -> Result<ApprovalOutcome, EngineError> {
        let mut request = self.load_request(request)?;
        self.load_person(approver)?;

        let now = current_timestamp();
        let remaining = request.record_approval(approver, now)?;

        let mut unit = self.load_unit(request.root())?;
        for member in unit.iter_mut() {
            if member.id == request.id {
                *member = request.clone();
            }
        }
        if let Some(closed) = unit.iter().find(|r| r.is_terminal()) {
            return Err(RequestStateError::NotPending {
                request: closed.id,
                status: closed.status,
            }
            .into());
        }
        let unit_remaining: usize = unit.iter().map(|r| r.remaining()).sum();

        let mut changes = ChangeSet::new();
        if unit_remaining > 0 {
            // Every member is written back at its read version, so a
            // concurrent approval elsewhere in the unit fails this commit.
            for member in unit {
                changes.update_request(member);
            }
            self.commit(changes)?;

            tracing::info!(
                request = %request.id,
                %approver,
                remaining,
                unit_remaining,
                "Approval recorded"
            );
            return Ok(ApprovalOutcome::Waiting {
                remaining,
                unit_remaining,
            });
        }

        let report = self.plan_finalization(unit, now, &mut changes)?;
        self.commit(changes)?;

        tracing::info!(
            request = %request.id,
            %approver,
            surviving = %report.surviving_cluster,
            moved = report.moved_members,
            edges = report.edges_written,
            accepted = report.requests_accepted,
            "Connection finalized"
        );
        Ok(ApprovalOutcome::Accepted(report))
    }

    /// Reject a request and with it its whole unit
    ///
    /// Any participant of the named request may reject: its requester, its
    /// target or one of its approvers. Returns the rejected requests.
    pub fn reject(
        &mut self,
        request: RequestId,
        rejecter: PersonId,
    ) -> Result<Vec<ConnectionRequest>, EngineError> {
        let request = self.load_request(request)?;
        if request.is_terminal() {
            return Err(RequestStateError::NotPending {
                request: request.id,
                status: request.status,
            }
            .into());
        }
        if !request.involves(rejecter) {
            return Err(RequestStateError::NotAParticipant {
                request: request.id,
                person: rejecter,
            }
            .into());
        }

        let now = current_timestamp();
        let mut rejected = Vec::new();
        let mut changes = ChangeSet::new();
        for mut member in self.load_unit(request.root())? {
            if member.is_terminal() {
                continue;
            }
            let expected_version = member.version;
            member.reject(rejecter, now)?;
            changes.update_request(member.clone());
            member.version = expected_version + 1;
            rejected.push(member);
        }
        self.commit(changes)?;

        tracing::info!(
            request = %request.id,
            %rejecter,
            rejected = rejected.len(),
            "Connection rejected"
        );
        Ok(rejected)
    }

    /// Get a request by id
    pub fn get_request(&self, id: RequestId) -> Result<ConnectionRequest, EngineError> {
        self.load_request(id)
    }

    /// The unit a request belongs to: its primary first, then the satellites
    pub fn list_unit(&self, id: RequestId) -> Result<Vec<ConnectionRequest>, EngineError> {
        let request = self.load_request(id)?;
        self.load_unit(request.root())
    }

    /// Requests a person received as target or approver, newest first
    pub fn list_incoming(&self, person: PersonId) -> Result<Vec<ConnectionRequest>, EngineError> {
        self.load_person(person)?;
        let mut requests: Vec<ConnectionRequest> = self
            .store
            .query_requests(&RequestQuery {
                involving: Some(person),
                ..Default::default()
            })
            .map_err(store_error)?
            .into_iter()
            .filter(|r| r.requester != person)
            .collect();
        newest_first(&mut requests);
        Ok(requests)
    }

    /// Primary requests a person initiated, newest first
    pub fn list_outgoing(&self, person: PersonId) -> Result<Vec<ConnectionRequest>, EngineError> {
        self.load_person(person)?;
        let mut requests = self
            .store
            .query_requests(&RequestQuery {
                requester: Some(person),
                primary_only: true,
                ..Default::default()
            })
            .map_err(store_error)?;
        newest_first(&mut requests);
        Ok(requests)
    }

    /// Pending requests still waiting for this person's approval, newest first
    pub fn list_awaiting_approval(
        &self,
        person: PersonId,
    ) -> Result<Vec<ConnectionRequest>, EngineError> {
        self.load_person(person)?;
        let mut requests = self
            .store
            .query_requests(&RequestQuery {
                awaiting: Some(person),
                status: Some(RequestStatus::Pending),
                ..Default::default()
            })
            .map_err(store_error)?;
        newest_first(&mut requests);
        Ok(requests)
    }

    fn load_unit(&self, root: RequestId) -> Result<Vec<ConnectionRequest>, EngineError> {
        let primary = self.load_request(root)?;
        let satellites = self
            .store
            .query_requests(&RequestQuery {
                parent: Some(root),
                ..Default::default()
            })
            .map_err(store_error)?;

        let mut unit = Vec::with_capacity(satellites.len() + 1);
        unit.push(primary);
        unit.extend(satellites);
        Ok(unit)
    }
}
