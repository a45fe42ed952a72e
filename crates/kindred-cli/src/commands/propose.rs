//! Propose command implementation.

use super::Handles;
use crate::cli::ProposeArgs;
use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::{KinshipStore, RelationType};
use kindred_engine::{EngineError, KinshipEngine};
use std::fmt::Display;

/// Execute the propose command.
///
/// Prints the primary request and, in JSON mode, every satellite it spawned.
pub fn execute_propose<S: KinshipStore>(
    args: ProposeArgs,
    engine: &mut KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let relation = RelationType::parse(&args.relation).map_err(EngineError::from)?;
    let actor = engine.find_person(&args.actor)?;
    let request = engine.propose(actor.id, &args.target, relation)?;

    if formatter.is_quiet() {
        return Ok(request.id.to_string());
    }

    let unit = engine.list_unit(request.id)?;
    if formatter.is_json() {
        let rows = Handles::new(engine).rows(&unit)?;
        return formatter.format_requests(&rows);
    }

    let mut lines = vec![formatter.success(&format!(
        "Proposed {} as {}'s {} (request {})",
        args.target.trim(),
        actor.handle,
        relation,
        request.id
    ))];
    let satellites = unit.len() - 1;
    if satellites > 0 {
        lines.push(formatter.info(&format!(
            "{} relative(s) of {} must also approve",
            satellites, actor.handle
        )));
    }
    Ok(lines.join("\n"))
}
