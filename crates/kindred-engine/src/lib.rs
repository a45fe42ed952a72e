//! Kindred Engine
//!
//! The relationship graph engine: person registry, connection request
//! workflow, cluster merge, listings and tree projection, over any
//! [`KinshipStore`].
//!
//! # Overview
//!
//! - **Registry**: registers persons into singleton family clusters, reads
//!   and edits direct edges, removes unreferenced persons
//! - **Workflow**: proposes a relation to a person in another family,
//!   collects approvals from the requester's affected relatives through
//!   satellite requests, rejects whole units
//! - **Merge**: once a unit is fully approved, writes every stated edge and
//!   its inverse and folds the smaller family into the larger one
//! - **Audit**: checks the partition invariant over the whole store
//!
//! Every operation reads what it needs, builds one [`ChangeSet`] and commits
//! it through the store. A commit refused because another writer got there
//! first is reported as [`EngineError::TransactionFailure`]; nothing is
//! retried.
//!
//! # Usage
//!
//! ```no_run
//! use kindred_domain::{NewPerson, RelationType, Sex};
//! use kindred_engine::{ApprovalOutcome, EngineConfig, KinshipEngine};
//! use kindred_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("kindred.db")?;
//! let mut engine = KinshipEngine::new(store, EngineConfig::default())?;
//!
//! let x = engine.create_person(NewPerson::new("x", "Xavier", "Stone", Sex::Male))?;
//! let y = engine.create_person(NewPerson::new("y", "Yusuf", "Reed", Sex::Male))?;
//!
//! let request = engine.propose(x.id, "y", RelationType::Father)?;
//! if let ApprovalOutcome::Accepted(report) = engine.approve(request.id, y.id)? {
//!     println!("Family {} survived", report.surviving_cluster);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! cluster_name_digits = 10
//! purge_requests_on_remove = true
//!
//! [layout]
//! origin_x = 50.0
//! origin_y = 50.0
//! radius = 35.0
//! fan_step_degrees = 30.0
//! ```

#![warn(missing_docs)]

mod audit;
mod config;
mod error;
mod merge;
mod registry;
mod workflow;

pub use audit::{AuditReport, AuditViolation};
pub use config::{EngineConfig, LayoutSettings};
pub use error::EngineError;
pub use merge::MergeReport;
pub use registry::DirectRelationsView;
pub use workflow::ApprovalOutcome;

use kindred_domain::traits::KinshipStore;
use kindred_domain::{
    ChangeSet, ClusterId, CommitOutcome, ConnectionRequest, FamilyCluster, Person, PersonId,
    RequestId,
};
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current timestamp in seconds since Unix epoch
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub(crate) fn store_error<E: Display>(err: E) -> EngineError {
    EngineError::Store(err.to_string())
}

/// The relationship graph engine
///
/// Owns its store. Operations are split across the registry, workflow,
/// merge and audit modules, all as methods on this type.
pub struct KinshipEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: KinshipStore> KinshipEngine<S>
where
    S::Error: Display,
{
    /// Create an engine over `store` after validating `config`
    pub fn new(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create an engine with default configuration
    pub fn with_defaults(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back
    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn load_person(&self, id: PersonId) -> Result<Person, EngineError> {
        self.store
            .get_person(id)
            .map_err(store_error)?
            .ok_or_else(|| EngineError::not_found("person", id))
    }

    pub(crate) fn load_cluster(&self, id: ClusterId) -> Result<FamilyCluster, EngineError> {
        self.store
            .get_cluster(id)
            .map_err(store_error)?
            .ok_or_else(|| EngineError::not_found("cluster", id))
    }

    pub(crate) fn load_request(&self, id: RequestId) -> Result<ConnectionRequest, EngineError> {
        self.store
            .get_request(id)
            .map_err(store_error)?
            .ok_or_else(|| EngineError::not_found("request", id))
    }

    /// Commit a change set; a refused commit becomes `TransactionFailure`
    pub(crate) fn commit(&mut self, changes: ChangeSet) -> Result<(), EngineError> {
        let size = changes.len();
        match self.store.commit(changes).map_err(store_error)? {
            CommitOutcome::Committed => {
                tracing::debug!(changes = size, "Change set committed");
                Ok(())
            }
            CommitOutcome::Conflict(conflict) => {
                tracing::warn!(%conflict, "Change set refused");
                Err(EngineError::TransactionFailure(conflict))
            }
        }
    }
}
