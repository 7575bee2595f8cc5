//! Out-of-tree patches and replay results.

use serde::{Deserialize, Serialize};

use crate::domain::commit::CommitId;
use crate::domain::error::{CheckError, Result};

/// One downstream-only commit to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub id: CommitId,
    pub summary: String,
}

/// Ordered out-of-tree patches of one project, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub project: String,
    /// Source path of the project, relative to the workspace root.
    pub path: String,
    pub patches: Vec<Patch>,
    /// Downstream tip the replayed history must match.
    pub before: CommitId,
    /// Upstream commit the loot tool measured the patches against.
    pub upstream_commit: CommitId,
}

/// Outcome of replaying a single patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Cherry-picked cleanly.
    Applied,
    /// Only succeeded when kept as an empty, redundant commit.
    AppliedAsRedundant,
    /// Could not be replayed even as a redundant commit.
    Failed { stderr: String },
}

/// Position of one project in the rewrite state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStage {
    Init,
    Baselined,
    Replaying(usize),
    Verifying,
    Verified,
    Failed,
}

impl std::fmt::Display for RewriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewriteStage::Init => write!(f, "init"),
            RewriteStage::Baselined => write!(f, "baselined"),
            RewriteStage::Replaying(i) => write!(f, "replaying({i})"),
            RewriteStage::Verifying => write!(f, "verifying"),
            RewriteStage::Verified => write!(f, "verified"),
            RewriteStage::Failed => write!(f, "failed"),
        }
    }
}

/// Result of rewriting and verifying one project's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResult {
    pub project: String,
    pub before: CommitId,
    /// Tip of the rewritten history, left in the clone for inspection.
    pub rewritten: CommitId,
    /// `true` iff the diff between `before` and `rewritten` is empty.
    pub ok: bool,
    /// Patches that were only replayable as redundant commits.
    #[serde(default)]
    pub redundant: Vec<CommitId>,
    /// Diff text when verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl RewriteResult {
    /// Turn a failed verification into [`CheckError::HistoryMismatch`].
    pub fn verified(self) -> Result<Self> {
        if self.ok {
            return Ok(self);
        }
        Err(CheckError::HistoryMismatch {
            project: self.project,
            before: self.before.to_string(),
            rewritten: self.rewritten.to_string(),
            diff: self.diff.unwrap_or_default(),
        })
    }
}
