//! Commit identifiers and baselines.

use serde::{Deserialize, Serialize};

use crate::domain::error::{CheckError, Result};

/// Hex digest naming a commit.
///
/// Only ever obtained from git output, the loot payload, or configuration;
/// the value is treated as an opaque token beyond the shape check in
/// [`CommitId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Accept abbreviated (7+) through SHA-256 (64) hex ids.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let valid = (7..=64).contains(&trimmed.len())
            && trimmed.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(CheckError::InvalidCommitId(raw.to_string()));
        }
        Ok(CommitId(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = CheckError;

    fn try_from(value: String) -> Result<Self> {
        CommitId::parse(&value)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

/// How a baseline was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSource {
    /// Supplied explicitly by the operator.
    Override { rev: String },
    /// Merge-base of the downstream HEAD and a freshly fetched upstream branch.
    MergeBase {
        upstream_url: String,
        branch: String,
        upstream_tip: CommitId,
    },
}

/// Upstream commit the out-of-tree patches are replayed onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub commit: CommitId,
    pub source: BaselineSource,
}

impl std::fmt::Display for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.commit)
    }
}
