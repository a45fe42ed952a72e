//! Command implementations.

pub mod audit;
pub mod decision;
pub mod family;
pub mod person;
pub mod propose;
pub mod relations;
pub mod requests;

pub use self::audit::execute_audit;
pub use self::decision::{execute_approve, execute_reject};
pub use self::family::execute_family;
pub use self::person::execute_person;
pub use self::propose::execute_propose;
pub use self::relations::{execute_relations, execute_tree};
pub use self::requests::execute_requests;

use crate::cli::Command;
use crate::error::{CliError, Result};
use crate::output::{Formatter, RequestRow};
use kindred_domain::{ConnectionRequest, KinshipStore, PersonId, RequestId};
use kindred_engine::{EngineError, KinshipEngine};
use std::collections::HashMap;
use std::fmt::Display;

/// Run one command and return what should be printed.
pub fn execute<S: KinshipStore>(
    command: Command,
    engine: &mut KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    match command {
        Command::Person(args) => execute_person(args, engine, formatter),
        Command::Propose(args) => execute_propose(args, engine, formatter),
        Command::Approve(args) => execute_approve(args, engine, formatter),
        Command::Reject(args) => execute_reject(args, engine, formatter),
        Command::Requests(args) => execute_requests(args, engine, formatter),
        Command::Relations(args) => execute_relations(args, engine, formatter),
        Command::Tree(args) => execute_tree(args, engine, formatter),
        Command::Family(args) => execute_family(args, engine, formatter),
        Command::Audit => execute_audit(engine, formatter),
    }
}

pub(crate) fn parse_request_id(s: &str) -> Result<RequestId> {
    RequestId::from_string(s.trim()).map_err(CliError::InvalidInput)
}

pub(crate) fn parse_person_id(s: &str) -> Result<PersonId> {
    PersonId::from_string(s.trim()).map_err(CliError::InvalidInput)
}

/// Resolves person ids to handles, remembering each lookup.
///
/// Removed persons are shown by id.
pub(crate) struct Handles<'a, S> {
    engine: &'a KinshipEngine<S>,
    cache: HashMap<PersonId, String>,
}

impl<'a, S: KinshipStore> Handles<'a, S>
where
    S::Error: Display,
{
    pub(crate) fn new(engine: &'a KinshipEngine<S>) -> Self {
        Self {
            engine,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn get(&mut self, id: PersonId) -> Result<String> {
        if let Some(handle) = self.cache.get(&id) {
            return Ok(handle.clone());
        }
        let handle = match self.engine.get_person(id) {
            Ok(person) => person.handle,
            Err(EngineError::NotFound { .. }) => id.to_string(),
            Err(e) => return Err(e.into()),
        };
        self.cache.insert(id, handle.clone());
        Ok(handle)
    }

    pub(crate) fn rows(&mut self, requests: &[ConnectionRequest]) -> Result<Vec<RequestRow>> {
        requests
            .iter()
            .map(|request| {
                Ok(RequestRow {
                    id: request.id,
                    parent: request.parent,
                    requester: self.get(request.requester)?,
                    target: self.get(request.target)?,
                    relation: request.relation_type,
                    status: request.status,
                    pending: self.all(&request.pending_approvals)?,
                    approved: self.all(&request.approved_by)?,
                    created_at: request.created_at,
                })
            })
            .collect()
    }

    fn all<'p>(&mut self, ids: impl IntoIterator<Item = &'p PersonId>) -> Result<Vec<String>> {
        ids.into_iter().map(|id| self.get(*id)).collect()
    }
}
