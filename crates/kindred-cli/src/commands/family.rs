//! Family command implementation.

use crate::cli::HandleArgs;
use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::KinshipStore;
use kindred_engine::KinshipEngine;
use std::fmt::Display;

/// Execute the family command.
pub fn execute_family<S: KinshipStore>(
    args: HandleArgs,
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let person = engine.find_person(&args.handle)?;
    let family = engine.get_cluster(person.cluster)?;
    let members = engine.list_cluster_members(family.id)?;
    formatter.format_family(&family, &members)
}
