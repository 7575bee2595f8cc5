//! Out-of-tree patch extraction and validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::commit::CommitId;
use crate::domain::error::{CheckError, Result};
use crate::domain::patch::{Patch, PatchSet};
use crate::loot::LootSource;

/// Per-project entry of the loot payload.
#[derive(Debug, Deserialize)]
struct LootEntry {
    path: String,
    ncs_commit: String,
    upstream_commit: String,
    shas: Vec<String>,
    shortlogs: Vec<String>,
}

/// Whether a shortlog was cut short by the tool that rendered it.
pub fn is_truncated(summary: &str) -> bool {
    let summary = summary.trim_end();
    summary.ends_with("...") || summary.ends_with('\u{2026}')
}

/// List the out-of-tree patches of `projects` relative to `baseline`.
///
/// The loot tool is invoked once for all projects. Every project in the
/// result has been checked for truncated shortlogs; any truncation aborts
/// the whole extraction, before anything is cloned or checked out.
pub fn extract_patches(
    source: &dyn LootSource,
    workspace: &Path,
    baseline: &CommitId,
    projects: &[String],
) -> Result<BTreeMap<String, PatchSet>> {
    info!("getting out of tree patches relative to {baseline}");
    let payload = source.resolve(workspace, baseline, projects)?;
    let patch_sets = parse_payload(&payload, projects)?;

    for project in projects {
        if let Some(set) = patch_sets.get(project) {
            info!("out of tree {project} patches:");
            for patch in &set.patches {
                info!("- {} {}", patch.id, patch.summary);
            }
        }
    }
    Ok(patch_sets)
}

/// Structure and validate a raw loot payload.
pub fn parse_payload(
    payload: &serde_json::Value,
    projects: &[String],
) -> Result<BTreeMap<String, PatchSet>> {
    let object = payload
        .as_object()
        .ok_or_else(|| CheckError::Extraction("payload is not a JSON object".to_string()))?;

    let mut patch_sets = BTreeMap::new();
    for project in projects {
        let raw = object.get(project).ok_or_else(|| {
            CheckError::Extraction(format!("no entry for project \"{project}\""))
        })?;
        let entry: LootEntry = serde_json::from_value(raw.clone())
            .map_err(|e| CheckError::Extraction(format!("{project}: {e}")))?;
        patch_sets.insert(project.clone(), patch_set(project, entry)?);
    }
    Ok(patch_sets)
}

fn patch_set(project: &str, entry: LootEntry) -> Result<PatchSet> {
    if entry.shas.len() != entry.shortlogs.len() {
        return Err(CheckError::Extraction(format!(
            "{project}: {} shas but {} shortlogs",
            entry.shas.len(),
            entry.shortlogs.len()
        )));
    }

    let commit = |field: &str, raw: &str| {
        CommitId::parse(raw).map_err(|_| {
            CheckError::Extraction(format!("{project}: {field} {raw:?} is not a commit id"))
        })
    };

    let mut patches = Vec::with_capacity(entry.shas.len());
    for (sha, summary) in entry.shas.iter().zip(entry.shortlogs) {
        let id = commit("sha", sha)?;
        if is_truncated(&summary) {
            return Err(CheckError::TruncatedSummary {
                project: project.to_string(),
                commit: id.to_string(),
                summary,
            });
        }
        patches.push(Patch { id, summary });
    }

    Ok(PatchSet {
        project: project.to_string(),
        path: entry.path,
        patches,
        before: commit("ncs_commit", &entry.ncs_commit)?,
        upstream_commit: commit("upstream_commit", &entry.upstream_commit)?,
    })
}
