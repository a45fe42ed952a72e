//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use kindred_domain::{FamilyCluster, Person, PersonSummary, RelationType, RequestId, RequestStatus};
use kindred_engine::{ApprovalOutcome, AuditReport, DirectRelationsView};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// A request with its participants resolved to handles.
#[derive(Debug, Clone)]
pub struct RequestRow {
    pub id: RequestId,
    pub parent: Option<RequestId>,
    pub requester: String,
    pub target: String,
    pub relation: RelationType,
    pub status: RequestStatus,
    pub pending: Vec<String>,
    pub approved: Vec<String>,
    pub created_at: u64,
}

/// A placed relative with its handle resolved.
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub handle: String,
    pub relation: RelationType,
    pub angle_degrees: f64,
    pub x: f64,
    pub y: f64,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a single person with the name of their family.
    pub fn format_person(&self, person: &Person, family: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "id": person.id.to_string(),
                    "handle": person.handle,
                    "first_name": person.first_name,
                    "last_name": person.last_name,
                    "sex": person.sex.as_str(),
                    "photo": person.photo,
                    "cluster": person.cluster.to_string(),
                    "family": family,
                    "relatives": person.relations.len(),
                    "created_at": person.created_at,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => {
                let mut fields = vec![
                    ("ID", person.id.to_string()),
                    ("Handle", person.handle.clone()),
                    ("Name", person.display_name()),
                    ("Sex", person.sex.to_string()),
                ];
                if !person.photo.is_empty() {
                    fields.push(("Photo", person.photo.clone()));
                }
                fields.push(("Family", family.to_string()));
                fields.push(("Relatives", person.relations.len().to_string()));

                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (field, value) in fields {
                    builder.push_record([field.to_string(), value]);
                }
                Ok(self.render(builder))
            }
            OutputFormat::Quiet => Ok(person.id.to_string()),
        }
    }

    /// Format a list of people.
    pub fn format_people(&self, people: &[PersonSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = people.iter().map(summary_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => {
                if people.is_empty() {
                    return Ok(self.colorize("No people found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Handle", "Name", "Sex", "ID"]);
                for person in people {
                    builder.push_record([
                        person.handle.clone(),
                        format!("{} {}", person.first_name, person.last_name),
                        person.sex.to_string(),
                        person.id.to_string(),
                    ]);
                }
                Ok(self.render(builder))
            }
            OutputFormat::Quiet => Ok(people
                .iter()
                .map(|p| p.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a family with its members.
    pub fn format_family(&self, family: &FamilyCluster, members: &[PersonSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "id": family.id.to_string(),
                    "name": family.name,
                    "size": family.size(),
                    "created_at": family.created_at,
                    "members": members.iter().map(summary_json).collect::<Vec<_>>(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => Ok(format!(
                "{}\n{}",
                self.info(&format!("Family {} ({} members)", family.name, family.size())),
                self.format_people(members)?
            )),
            OutputFormat::Quiet => self.format_people(members),
        }
    }

    /// Format the result of an approval.
    ///
    /// `family` is the name of the surviving family when the approval
    /// finalized the proposal.
    pub fn format_approval(
        &self,
        request: RequestId,
        outcome: &ApprovalOutcome,
        family: Option<&str>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = match outcome {
                    ApprovalOutcome::Waiting {
                        remaining,
                        unit_remaining,
                    } => serde_json::json!({
                        "request": request.to_string(),
                        "status": "waiting",
                        "remaining": remaining,
                        "unit_remaining": unit_remaining,
                    }),
                    ApprovalOutcome::Accepted(report) => serde_json::json!({
                        "request": request.to_string(),
                        "status": "accepted",
                        "surviving_cluster": report.surviving_cluster.to_string(),
                        "family": family,
                        "absorbed_cluster": report.absorbed_cluster.map(|c| c.to_string()),
                        "moved_members": report.moved_members,
                        "edges_written": report.edges_written,
                        "requests_accepted": report.requests_accepted,
                    }),
                };
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => match outcome {
                ApprovalOutcome::Waiting { unit_remaining, .. } => Ok(format!(
                    "{}\n{}",
                    self.success(&format!("Approved request {}", request)),
                    self.info(&format!(
                        "Waiting on {} more approval(s) before the proposal completes",
                        unit_remaining
                    ))
                )),
                ApprovalOutcome::Accepted(report) => {
                    let mut lines = vec![self.success(&format!(
                        "Proposal accepted: {} request(s) settled, {} edge(s) written",
                        report.requests_accepted, report.edges_written
                    ))];
                    if report.absorbed_cluster.is_some() {
                        lines.push(self.info(&format!(
                            "Moved {} member(s) into family {}",
                            report.moved_members,
                            family.unwrap_or("?")
                        )));
                    }
                    Ok(lines.join("\n"))
                }
            },
            OutputFormat::Quiet => Ok(request.to_string()),
        }
    }

    /// Format connection requests.
    pub fn format_requests(&self, requests: &[RequestRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = requests
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "id": r.id.to_string(),
                            "parent": r.parent.map(|p| p.to_string()),
                            "requester": r.requester,
                            "target": r.target,
                            "relation_type": r.relation.as_str(),
                            "status": r.status.as_str(),
                            "pending_approvals": r.pending,
                            "approved_by": r.approved,
                            "created_at": r.created_at,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => {
                if requests.is_empty() {
                    return Ok(self.colorize("No requests found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Proposal", "Status", "Waiting on", "Approved by"]);
                for request in requests {
                    let proposal = format!(
                        "{}{} is {}'s {}",
                        if request.parent.is_some() { "↳ " } else { "" },
                        request.target,
                        request.requester,
                        request.relation
                    );
                    builder.push_record([
                        request.id.to_string(),
                        proposal,
                        self.status(request.status),
                        request.pending.join(", "),
                        request.approved.join(", "),
                    ]);
                }
                Ok(self.render(builder))
            }
            OutputFormat::Quiet => Ok(requests
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a person's direct relatives.
    pub fn format_relations(&self, view: &DirectRelationsView) -> Result<String> {
        let entries = view.entries();
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|(relation, person)| {
                        let mut value = summary_json(person);
                        value["relation"] = serde_json::json!(relation.as_str());
                        value
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => {
                if entries.is_empty() {
                    return Ok(self.colorize("No relatives recorded.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Relation", "Handle", "Name"]);
                for (relation, person) in entries {
                    builder.push_record([
                        relation.to_string(),
                        person.handle.clone(),
                        format!("{} {}", person.first_name, person.last_name),
                    ]);
                }
                Ok(self.render(builder))
            }
            OutputFormat::Quiet => Ok(entries
                .iter()
                .map(|(_, p)| p.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a projected tree.
    pub fn format_tree(&self, rows: &[TreeRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "handle": r.handle,
                            "relation": r.relation.as_str(),
                            "angle": r.angle_degrees,
                            "x": r.x,
                            "y": r.y,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No relatives to place.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Relation", "Handle", "Angle", "X", "Y"]);
                for row in rows {
                    builder.push_record([
                        row.relation.to_string(),
                        row.handle.clone(),
                        format!("{:.0}°", row.angle_degrees),
                        format!("{:.2}", row.x),
                        format!("{:.2}", row.y),
                    ]);
                }
                Ok(self.render(builder))
            }
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|r| r.handle.clone())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format an audit report.
    pub fn format_audit(&self, report: &AuditReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "healthy": report.is_healthy(),
                    "persons_checked": report.persons_checked,
                    "clusters_checked": report.clusters_checked,
                    "violations": report
                        .violations
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Table => {
                let summary = format!(
                    "Checked {} people in {} families",
                    report.persons_checked, report.clusters_checked
                );
                if report.is_healthy() {
                    return Ok(self.success(&summary));
                }
                let mut lines = vec![self.warning(&format!(
                    "{}: {} problem(s)",
                    summary,
                    report.violations.len()
                ))];
                lines.extend(report.violations.iter().map(|v| format!("  - {}", v)));
                Ok(lines.join("\n"))
            }
            OutputFormat::Quiet => Ok(report.violations.len().to_string()),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Whether output should be limited to ids.
    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    /// Whether output is machine-readable JSON.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn status(&self, status: RequestStatus) -> String {
        match status {
            RequestStatus::Pending => self.colorize(status.as_str(), "yellow"),
            RequestStatus::Accepted => self.colorize(status.as_str(), "green"),
            RequestStatus::Rejected => self.colorize(status.as_str(), "red"),
        }
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn summary_json(person: &PersonSummary) -> serde_json::Value {
    serde_json::json!({
        "id": person.id.to_string(),
        "handle": person.handle,
        "first_name": person.first_name,
        "last_name": person.last_name,
        "sex": person.sex.as_str(),
        "photo": person.photo,
        "cluster": person.cluster.to_string(),
    })
}
