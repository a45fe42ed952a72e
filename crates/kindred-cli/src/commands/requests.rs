//! Requests command implementation.

use super::{parse_request_id, Handles};
use crate::cli::{RequestsAction, RequestsArgs};
use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::KinshipStore;
use kindred_engine::KinshipEngine;
use std::fmt::Display;

/// Execute a requests listing.
pub fn execute_requests<S: KinshipStore>(
    args: RequestsArgs,
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let requests = match args.action {
        RequestsAction::Incoming(who) => {
            let person = engine.find_person(&who.handle)?;
            engine.list_incoming(person.id)?
        }
        RequestsAction::Outgoing(who) => {
            let person = engine.find_person(&who.handle)?;
            engine.list_outgoing(person.id)?
        }
        RequestsAction::Awaiting(who) => {
            let person = engine.find_person(&who.handle)?;
            engine.list_awaiting_approval(person.id)?
        }
        RequestsAction::Show { id } => engine.list_unit(parse_request_id(&id)?)?,
    };

    let rows = Handles::new(engine).rows(&requests)?;
    formatter.format_requests(&rows)
}
