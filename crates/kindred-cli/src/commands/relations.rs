//! Relations and tree command implementations.

use super::Handles;
use crate::cli::HandleArgs;
use crate::error::Result;
use crate::output::{Formatter, TreeRow};
use kindred_domain::KinshipStore;
use kindred_engine::KinshipEngine;
use std::fmt::Display;

/// Execute the relations command.
pub fn execute_relations<S: KinshipStore>(
    args: HandleArgs,
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let person = engine.find_person(&args.handle)?;
    let view = engine.get_direct_relations(person.id)?;
    formatter.format_relations(&view)
}

/// Execute the tree command.
pub fn execute_tree<S: KinshipStore>(
    args: HandleArgs,
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let person = engine.find_person(&args.handle)?;
    let placed = engine.project_tree(person.id)?;

    let mut handles = Handles::new(engine);
    let rows = placed
        .iter()
        .map(|p| {
            Ok(TreeRow {
                handle: handles.get(p.person)?,
                relation: p.relation,
                angle_degrees: p.angle_degrees,
                x: p.x,
                y: p.y,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    formatter.format_tree(&rows)
}
