//! Approve and reject command implementations.

use super::{parse_request_id, Handles};
use crate::cli::DecisionArgs;
use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::KinshipStore;
use kindred_engine::{ApprovalOutcome, KinshipEngine};
use std::fmt::Display;

/// Execute the approve command.
pub fn execute_approve<S: KinshipStore>(
    args: DecisionArgs,
    engine: &mut KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let request = parse_request_id(&args.request)?;
    let actor = engine.find_person(&args.actor)?;
    let outcome = engine.approve(request, actor.id)?;

    let family = match &outcome {
        ApprovalOutcome::Accepted(report) => {
            Some(engine.get_cluster(report.surviving_cluster)?.name)
        }
        ApprovalOutcome::Waiting { .. } => None,
    };
    formatter.format_approval(request, &outcome, family.as_deref())
}

/// Execute the reject command.
pub fn execute_reject<S: KinshipStore>(
    args: DecisionArgs,
    engine: &mut KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let request = parse_request_id(&args.request)?;
    let actor = engine.find_person(&args.actor)?;
    let rejected = engine.reject(request, actor.id)?;

    if formatter.is_json() || formatter.is_quiet() {
        let rows = Handles::new(engine).rows(&rejected)?;
        return formatter.format_requests(&rows);
    }
    Ok(formatter.success(&format!(
        "Rejected {} request(s) on behalf of {}",
        rejected.len(),
        actor.handle
    )))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::error::CliError;
    use kindred_domain::{RelationType, RequestStatus, Sex};
    use kindred_engine::EngineError;

    fn args(actor: &str, request: impl ToString) -> DecisionArgs {
        DecisionArgs {
            actor: actor.to_string(),
            request: request.to_string(),
        }
    }

    #[test]
    fn test_approve_finalizes_and_names_family() {
        let mut engine = engine();
        let x = add(&mut engine, "x", Sex::Female);
        add(&mut engine, "y", Sex::Male);
        let request = engine.propose(x.id, "y", RelationType::Father).unwrap();

        let output = execute_approve(args("y", request.id), &mut engine, &table()).unwrap();
        let family = engine.get_cluster(x.cluster).unwrap();
        assert!(output.contains("Proposal accepted: 1 request(s) settled, 2 edge(s) written"));
        assert!(output.contains(&format!("Moved 1 member(s) into family {}", family.name)));
    }

    #[test]
    fn test_approve_waits_for_satellites() {
        let mut engine = engine();
        let a = add(&mut engine, "a", Sex::Male);
        let m = add(&mut engine, "m", Sex::Female);
        add(&mut engine, "b", Sex::Male);
        let first = engine.propose(a.id, "m", RelationType::Mother).unwrap();
        engine.approve(first.id, m.id).unwrap();
        let request = engine.propose(a.id, "b", RelationType::Brother).unwrap();

        let output = execute_approve(args("b", request.id), &mut engine, &json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["unit_remaining"], 2);
    }

    #[test]
    fn test_reject_lists_unit() {
        let mut engine = engine();
        let x = add(&mut engine, "x", Sex::Female);
        add(&mut engine, "y", Sex::Male);
        let request = engine.propose(x.id, "y", RelationType::Father).unwrap();

        let output = execute_reject(args("y", request.id), &mut engine, &json()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["status"], "rejected");
        assert_eq!(
            engine.get_request(request.id).unwrap().status,
            RequestStatus::Rejected
        );
    }

    #[test]
    fn test_outsider_cannot_reject() {
        let mut engine = engine();
        let x = add(&mut engine, "x", Sex::Female);
        add(&mut engine, "y", Sex::Male);
        add(&mut engine, "z", Sex::Male);
        let request = engine.propose(x.id, "y", RelationType::Father).unwrap();

        let err = execute_reject(args("z", request.id), &mut engine, &table()).unwrap_err();
        assert!(matches!(err, CliError::Engine(EngineError::InvalidState(_))));
    }
}
