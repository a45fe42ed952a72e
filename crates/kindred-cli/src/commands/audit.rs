//! Audit command implementation.

use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::KinshipStore;
use kindred_engine::KinshipEngine;
use std::fmt::Display;

/// Execute the audit command.
pub fn execute_audit<S: KinshipStore>(
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let report = engine.audit()?;
    formatter.format_audit(&report)
}
