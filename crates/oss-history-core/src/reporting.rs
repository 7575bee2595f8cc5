use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::commit::{Baseline, CommitId};
use crate::domain::error::CheckError;
use crate::pipeline::CheckOutcome;

/// Per-project verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Verified,
    Failed,
    Skipped,
}

/// One project's entry in the check report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectReport {
    pub project: String,
    pub status: ProjectStatus,
    pub before: Option<CommitId>,
    pub rewritten: Option<CommitId>,
    #[serde(default)]
    pub redundant: Vec<CommitId>,
    pub error: Option<String>,
}

/// JSON artifact describing a whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub schema_version: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub baseline: Baseline,
    pub success: bool,
    pub projects: Vec<ProjectReport>,
}

impl CheckReport {
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        let mut projects: Vec<ProjectReport> = outcome
            .results
            .iter()
            .map(|r| ProjectReport {
                project: r.project.clone(),
                status: ProjectStatus::Verified,
                before: Some(r.before.clone()),
                rewritten: Some(r.rewritten.clone()),
                redundant: r.redundant.clone(),
                error: None,
            })
            .collect();

        for failure in &outcome.failures {
            // A mismatch still names both tips.
            let (before, rewritten) = match &failure.error {
                CheckError::HistoryMismatch {
                    before, rewritten, ..
                } => (CommitId::parse(before).ok(), CommitId::parse(rewritten).ok()),
                _ => (None, None),
            };
            projects.push(ProjectReport {
                project: failure.project.clone(),
                status: ProjectStatus::Failed,
                before,
                rewritten,
                redundant: Vec::new(),
                error: Some(failure.error.to_string()),
            });
        }

        projects.extend(outcome.skipped.iter().map(|project| ProjectReport {
            project: project.clone(),
            status: ProjectStatus::Skipped,
            before: None,
            rewritten: None,
            redundant: Vec::new(),
            error: None,
        }));

        Self {
            schema_version: "1.0".to_string(),
            run_id: outcome.run_id.clone(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            baseline: outcome.baseline.clone(),
            success: outcome.is_success(),
            projects,
        }
    }
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &CheckReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize check report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Plain-text summary for the terminal.
pub fn render_summary(report: &CheckReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("baseline: {}\n", report.baseline.commit));
    for p in &report.projects {
        match p.status {
            ProjectStatus::Verified => {
                let rewritten = p.rewritten.as_ref().map(CommitId::as_str).unwrap_or("?");
                out.push_str(&format!("{}: ok, rewritten history at {}", p.project, rewritten));
                if !p.redundant.is_empty() {
                    out.push_str(&format!(" ({} redundant)", p.redundant.len()));
                }
                out.push('\n');
            }
            ProjectStatus::Failed => {
                let error = p.error.as_deref().unwrap_or("unknown error");
                let first_line = error.lines().next().unwrap_or(error);
                out.push_str(&format!("{}: FAILED: {}\n", p.project, first_line));
            }
            ProjectStatus::Skipped => {
                out.push_str(&format!("{}: skipped\n", p.project));
            }
        }
    }
    if report.success {
        out.push_str("diff is empty! all good!\n");
    }
    out
}
