//! History rewriting and verification.
//!
//! The out-of-tree patches of a project are cherry-picked, in order, onto
//! the baseline inside a disposable clone. The rewritten tip must then have
//! an empty diff against the original downstream tip.
//!
//! Cherry-picks use `-X ours`: on conflicting hunks the rewritten tree wins.
//! The bias can hide a real divergence, so only the final diff decides `ok`.
//!
//! A patch whose plain cherry-pick fails is retried once with
//! `--keep-redundant-commits`. Success there means the patch was already
//! present at the tip; the replay continues. Failure there ends the
//! project's rewrite with [`CheckError::PatchReplay`] and leaves the clone in
//! its conflicted state.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Identity;
use crate::domain::commit::CommitId;
use crate::domain::error::{CheckError, Result};
use crate::domain::patch::{Patch, PatchOutcome, RewriteResult, RewriteStage};
use crate::git::{DiffOutcome, Git, PickMode, PickOutcome};
use crate::obs;

/// Drives one project's rewrite in one clone.
pub struct HistoryRewriter<'a> {
    git: &'a Git,
    clone: &'a Path,
    project: &'a str,
    stage: RewriteStage,
}

impl<'a> HistoryRewriter<'a> {
    pub fn new(git: &'a Git, clone: &'a Path, project: &'a str) -> Self {
        Self {
            git,
            clone,
            project,
            stage: RewriteStage::Init,
        }
    }

    pub fn stage(&self) -> RewriteStage {
        self.stage
    }

    /// Configure the committer identity of the clone.
    ///
    /// Only allowed before the first mutating operation.
    pub fn set_identity(&mut self, identity: &Identity) -> Result<()> {
        self.require_init("set the identity")?;
        self.git.config_set(self.clone, "user.name", &identity.name)?;
        self.git.config_set(self.clone, "user.email", &identity.email)?;
        Ok(())
    }

    fn require_init(&self, operation: &'static str) -> Result<()> {
        if self.stage == RewriteStage::Init {
            return Ok(());
        }
        Err(CheckError::InvalidStage {
            project: self.project.to_string(),
            operation,
            stage: self.stage.to_string(),
        })
    }

    /// Replay one patch onto the current tip.
    fn replay_patch(&mut self, patch: &Patch) -> Result<PatchOutcome> {
        let stderr = match self.git.cherry_pick(self.clone, &patch.id, PickMode::Strict)? {
            PickOutcome::Picked => return Ok(PatchOutcome::Applied),
            PickOutcome::Failed { stderr } => stderr,
        };
        info!("cherry-pick of {} failed: {}", patch.id, stderr);
        info!("checking if {} is a redundant commit...", patch.id);

        if let Err(e) = self.git.cherry_pick_abort(self.clone) {
            warn!("cherry-pick --abort after {} failed: {}", patch.id, e);
        }

        match self
            .git
            .cherry_pick(self.clone, &patch.id, PickMode::KeepRedundant)?
        {
            PickOutcome::Picked => {
                info!("{}", redundant_note(&patch.id));
                obs::emit_patch_redundant(self.project, &patch.id);
                Ok(PatchOutcome::AppliedAsRedundant)
            }
            PickOutcome::Failed { stderr } => Ok(PatchOutcome::Failed { stderr }),
        }
    }

    /// Replay `patches` onto `baseline` and diff the result against
    /// `original_tip`.
    ///
    /// Runs once per rewriter: `Verified` and `Failed` are terminal.
    pub fn rewrite_and_verify(
        &mut self,
        baseline: &CommitId,
        patches: &[Patch],
        original_tip: &CommitId,
    ) -> Result<RewriteResult> {
        self.require_init("rewrite")?;
        let result = self.run(baseline, patches, original_tip);
        if result.is_err() {
            self.stage = RewriteStage::Failed;
        }
        result
    }

    fn run(
        &mut self,
        baseline: &CommitId,
        patches: &[Patch],
        original_tip: &CommitId,
    ) -> Result<RewriteResult> {
        info!(
            "creating rewritten {} history on top of {}",
            self.project, baseline
        );
        self.git.checkout(self.clone, baseline.as_str())?;
        tracing::debug!("{}", self.git.status(self.clone)?);
        self.stage = RewriteStage::Baselined;

        let mut redundant = Vec::new();
        for (i, patch) in patches.iter().enumerate() {
            self.stage = RewriteStage::Replaying(i);
            match self.replay_patch(patch)? {
                PatchOutcome::Applied => {}
                PatchOutcome::AppliedAsRedundant => redundant.push(patch.id.clone()),
                PatchOutcome::Failed { stderr } => {
                    return Err(CheckError::PatchReplay {
                        project: self.project.to_string(),
                        commit: patch.id.to_string(),
                        summary: patch.summary.clone(),
                        stderr,
                    });
                }
            }
        }

        let rewritten = self.git.rev_parse(self.clone, "HEAD")?;
        info!(
            "leaving rewritten history HEAD ({}) in {}",
            rewritten,
            self.clone.display()
        );
        obs::emit_project_rewritten(self.project, &rewritten, patches.len(), redundant.len());

        self.stage = RewriteStage::Verifying;
        info!(
            "checking for empty diff between {} and {}",
            original_tip, rewritten
        );
        let diff = self
            .git
            .diff(self.clone, original_tip.as_str(), rewritten.as_str())?;
        let ok = diff.is_empty();
        self.stage = if ok {
            RewriteStage::Verified
        } else {
            RewriteStage::Failed
        };
        obs::emit_project_verified(self.project, ok);

        Ok(RewriteResult {
            project: self.project.to_string(),
            before: original_tip.clone(),
            rewritten,
            ok,
            redundant,
            diff: match diff {
                DiffOutcome::Empty => None,
                DiffOutcome::Changed(text) => Some(text),
            },
        })
    }
}

/// Operator hint for a patch that only replayed as an empty commit.
fn redundant_note(commit: &CommitId) -> String {
    format!(
        "{commit} is a redundant commit; do you need to revert it before creating \
         the [nrf mergeup] commit?"
    )
}

/// Rewrite one project's history in `clone` and verify it.
///
/// When `identity` is given it is configured in the clone before anything
/// else touches it.
pub fn rewrite_and_verify(
    git: &Git,
    clone: &Path,
    project: &str,
    baseline: &CommitId,
    patches: &[Patch],
    original_tip: &CommitId,
    identity: Option<&Identity>,
) -> Result<RewriteResult> {
    let mut rewriter = HistoryRewriter::new(git, clone, project);
    if let Some(identity) = identity {
        rewriter.set_identity(identity)?;
    }
    rewriter.rewrite_and_verify(baseline, patches, original_tip)
}
