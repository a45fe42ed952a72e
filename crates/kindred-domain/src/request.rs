//! Connection request module - the per-request approval state machine
//!
//! A request moves `Pending -> Accepted` or `Pending -> Rejected` and never
//! leaves a terminal state. A primary request and the satellites that point
//! at it through `parent` form one unit: they are accepted together and
//! rejected together.

use crate::id::uuid_id;
use crate::person::PersonId;
use crate::relation::RelationType;
use std::collections::BTreeSet;
use std::fmt;

uuid_id!(
    /// Unique identifier for a connection request based on UUIDv7
    RequestId,
    "request"
);

/// Lifecycle status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// Awaiting approvals
    Pending,
    /// Finalized; edges written and clusters merged
    Accepted,
    /// Voided by one of the parties
    Rejected,
}

impl RequestStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Parse a status from a string (storage use)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition the state machine refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStateError {
    /// The request already reached a terminal status
    NotPending {
        /// Request id
        request: RequestId,
        /// Its current status
        status: RequestStatus,
    },
    /// The person is not among the outstanding approvers
    NotAnApprover {
        /// Request id
        request: RequestId,
        /// Person attempting to approve
        person: PersonId,
    },
    /// The person already approved
    AlreadyApproved {
        /// Request id
        request: RequestId,
        /// Person attempting to approve again
        person: PersonId,
    },
    /// The person takes no part in the request
    NotAParticipant {
        /// Request id
        request: RequestId,
        /// Person attempting the transition
        person: PersonId,
    },
    /// Acceptance attempted while approvals are outstanding
    ApprovalsOutstanding {
        /// Request id
        request: RequestId,
        /// Approvals still required
        remaining: usize,
    },
}

impl fmt::Display for RequestStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStateError::NotPending { request, status } => {
                write!(f, "request {} is already {}", request, status)
            }
            RequestStateError::NotAnApprover { request, person } => {
                write!(f, "person {} is not a pending approver of request {}", person, request)
            }
            RequestStateError::AlreadyApproved { request, person } => {
                write!(f, "person {} already approved request {}", person, request)
            }
            RequestStateError::NotAParticipant { request, person } => {
                write!(f, "person {} takes no part in request {}", person, request)
            }
            RequestStateError::ApprovalsOutstanding { request, remaining } => {
                write!(f, "request {} still needs {} approval(s)", request, remaining)
            }
        }
    }
}

impl std::error::Error for RequestStateError {}

/// A proposed edge awaiting multi-party ratification
///
/// `relation_type` is read from the requester's side: "target is my
/// `relation_type`".
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRequest {
    /// Unique identifier
    pub id: RequestId,
    /// Person proposing the edge
    pub requester: PersonId,
    /// Person the edge points at
    pub target: PersonId,
    /// Requested relation type
    pub relation_type: RelationType,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Approvers still required
    pub pending_approvals: BTreeSet<PersonId>,
    /// Approvers already given
    pub approved_by: BTreeSet<PersonId>,
    /// Primary request this satellite belongs to
    pub parent: Option<RequestId>,
    /// Who rejected the unit, once rejected
    pub rejected_by: Option<PersonId>,
    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,
    /// Last transition timestamp
    pub updated_at: u64,
    /// Optimistic concurrency token
    pub version: u64,
}

impl ConnectionRequest {
    /// Create a pending request already approved by `approved_by`
    pub fn pending(
        requester: PersonId,
        target: PersonId,
        relation_type: RelationType,
        pending_approvals: BTreeSet<PersonId>,
        approved_by: PersonId,
        parent: Option<RequestId>,
        now: u64,
    ) -> Self {
        let mut pending_approvals = pending_approvals;
        pending_approvals.remove(&approved_by);
        Self {
            id: RequestId::new(),
            requester,
            target,
            relation_type,
            status: RequestStatus::Pending,
            pending_approvals,
            approved_by: BTreeSet::from([approved_by]),
            parent,
            rejected_by: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether this request is a satellite of another
    pub fn is_satellite(&self) -> bool {
        self.parent.is_some()
    }

    /// Id of the primary request of this request's unit
    pub fn root(&self) -> RequestId {
        self.parent.unwrap_or(self.id)
    }

    /// Whether the request reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `person` is requester, target or an approver
    pub fn involves(&self, person: PersonId) -> bool {
        self.requester == person
            || self.target == person
            || self.pending_approvals.contains(&person)
            || self.approved_by.contains(&person)
    }

    /// Number of approvals still required
    pub fn remaining(&self) -> usize {
        self.pending_approvals.len()
    }

    /// Move `approver` from the pending set to the approved set
    ///
    /// Returns the number of approvals still required afterwards.
    pub fn record_approval(&mut self, approver: PersonId, now: u64) -> Result<usize, RequestStateError> {
        self.ensure_pending()?;
        if self.approved_by.contains(&approver) {
            return Err(RequestStateError::AlreadyApproved {
                request: self.id,
                person: approver,
            });
        }
        if !self.pending_approvals.remove(&approver) {
            return Err(RequestStateError::NotAnApprover {
                request: self.id,
                person: approver,
            });
        }
        self.approved_by.insert(approver);
        self.updated_at = now;
        Ok(self.pending_approvals.len())
    }

    /// Mark the request accepted; requires an empty pending set
    pub fn accept(&mut self, now: u64) -> Result<(), RequestStateError> {
        self.ensure_pending()?;
        if !self.pending_approvals.is_empty() {
            return Err(RequestStateError::ApprovalsOutstanding {
                request: self.id,
                remaining: self.pending_approvals.len(),
            });
        }
        self.status = RequestStatus::Accepted;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the request rejected by `rejecter`
    ///
    /// Authorization is checked by the caller against the whole unit, so any
    /// satellite can be voided on behalf of its parent's rejecter.
    pub fn reject(&mut self, rejecter: PersonId, now: u64) -> Result<(), RequestStateError> {
        self.ensure_pending()?;
        self.status = RequestStatus::Rejected;
        self.rejected_by = Some(rejecter);
        self.updated_at = now;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), RequestStateError> {
        if self.is_terminal() {
            return Err(RequestStateError::NotPending {
                request: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
