//! End-to-end history check: baseline, extraction, then per-project
//! rewrite and verification.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::baseline::resolve_baseline;
use crate::clone::prepare_clone;
use crate::config::CheckConfig;
use crate::domain::commit::{Baseline, CommitId};
use crate::domain::error::{CheckError, Result};
use crate::domain::patch::{PatchSet, RewriteResult};
use crate::git::Git;
use crate::loot::LootSource;
use crate::obs;
use crate::patches::extract_patches;
use crate::rewrite::rewrite_and_verify;

/// A project whose pipeline aborted.
#[derive(Debug)]
pub struct ProjectFailure {
    pub project: String,
    pub error: CheckError,
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct CheckOutcome {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub baseline: Baseline,
    /// Verified projects, in processing order.
    pub results: Vec<RewriteResult>,
    pub failures: Vec<ProjectFailure>,
    /// Projects never attempted because an earlier one failed.
    pub skipped: Vec<String>,
}

impl CheckOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Run a full history check.
///
/// Errors before any project is rewritten (configuration, baseline,
/// extraction, truncated shortlogs) are returned as `Err`. Failures of an
/// individual project are collected in [`CheckOutcome::failures`]; unless
/// `keep_going` is set, the first one stops the remaining projects.
pub fn run_check(git: &Git, loot: &dyn LootSource, config: &CheckConfig) -> Result<CheckOutcome> {
    config.validate()?;

    let run_id = Uuid::new_v4().to_string();
    let _span = obs::CheckSpan::enter(&run_id);
    let started_at = Utc::now();
    let clock = Instant::now();

    let anchor_repo = config.anchor_repo();
    let baseline = match &config.baseline {
        Some(rev) => Baseline::from_override(git, &anchor_repo, rev)?,
        None => resolve_baseline(
            git,
            &anchor_repo,
            &config.anchor.upstream_url,
            config.anchor.upstream_branch.as_deref(),
        )?,
    };
    obs::emit_check_started(&run_id, &baseline.commit, config.projects.len());

    let patch_sets = extract_patches(loot, &config.workspace, &baseline.commit, &config.projects)?;

    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut skipped = Vec::new();

    for project in &config.projects {
        if !failures.is_empty() && !config.keep_going {
            skipped.push(project.clone());
            continue;
        }

        let Some(set) = patch_sets.get(project) else {
            return Err(CheckError::Extraction(format!(
                "no patch set for project \"{project}\""
            )));
        };
        let root = replay_root(config, &baseline, set);

        match check_project(git, config, set, &root) {
            Ok(result) => results.push(result),
            Err(error) => {
                obs::emit_project_failed(project, &error);
                failures.push(ProjectFailure {
                    project: project.clone(),
                    error,
                });
            }
        }
    }

    let finished_at = Utc::now();
    obs::emit_check_finished(
        &run_id,
        clock.elapsed().as_millis() as u64,
        results.len(),
        failures.len(),
    );

    Ok(CheckOutcome {
        run_id,
        started_at,
        finished_at,
        baseline,
        results,
        failures,
        skipped,
    })
}

/// Commit a project's patches are replayed onto: the run's baseline for the
/// anchor project, the loot-reported upstream commit for the others.
fn replay_root(config: &CheckConfig, baseline: &Baseline, set: &PatchSet) -> CommitId {
    if set.project != config.anchor.name {
        return set.upstream_commit.clone();
    }
    if set.upstream_commit != baseline.commit {
        warn!(
            "{}: loot measured patches against {} but the baseline is {}",
            set.project, set.upstream_commit, baseline.commit
        );
    }
    baseline.commit.clone()
}

fn check_project(
    git: &Git,
    config: &CheckConfig,
    set: &PatchSet,
    root: &CommitId,
) -> Result<RewriteResult> {
    info!(
        "{}: downstream tip is {}, {} out of tree patches",
        set.project,
        set.before,
        set.patches.len()
    );
    let source = config.workspace.join(Path::new(&set.path));
    let clone = prepare_clone(
        git,
        &source,
        &config.clone_path(&set.project),
        config.overwrite,
    )?;

    let result = rewrite_and_verify(
        git,
        &clone,
        &set.project,
        root,
        &set.patches,
        &set.before,
        config.identity.as_ref(),
    )?;
    let result = result.verified()?;
    info!("{}: diff is empty! all good!", set.project);
    Ok(result)
}
