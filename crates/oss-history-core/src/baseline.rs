//! Upstream baseline resolution.
//!
//! The baseline is the merge-base between a project's current HEAD and the
//! tip of its upstream default branch, freshly fetched. An operator may pin it
//! instead with an explicit revision.

use std::path::Path;

use tracing::info;

use crate::domain::commit::{Baseline, BaselineSource};
use crate::domain::error::{CheckError, Result};
use crate::git::Git;

/// Extract the branch a remote's HEAD points to from
/// `git ls-remote --symref <url> HEAD` output.
///
/// The output looks like:
///
/// ```text
/// ref: refs/heads/main	HEAD
/// 6145ab537fcb3adc3ee77db5f5f95e661f1e91e6	HEAD
/// ```
///
/// Ref names cannot contain tabs, so splitting on the first tab is exact.
pub fn parse_head_symref(output: &str) -> Option<&str> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("ref: "))
        .filter_map(|rest| rest.split('\t').next())
        .find(|name| !name.is_empty())
}

/// Ask `url` which branch its HEAD points to.
pub fn head_branch(git: &Git, cwd: &Path, url: &str) -> Result<String> {
    let output = git.ls_remote_head_symref(cwd, url)?;
    parse_head_symref(&output)
        .map(str::to_string)
        .ok_or_else(|| CheckError::RemoteProtocol {
            url: url.to_string(),
            output,
        })
}

/// Compute the baseline of the repository at `repo_path` against `branch` of
/// `upstream_url` (the remote's default branch when `branch` is `None`).
pub fn resolve_baseline(
    git: &Git,
    repo_path: &Path,
    upstream_url: &str,
    branch: Option<&str>,
) -> Result<Baseline> {
    info!("finding merge-base in {}", repo_path.display());

    let branch = match branch {
        Some(branch) => branch.to_string(),
        None => {
            let branch = head_branch(git, repo_path, upstream_url)?;
            info!("upstream main branch: {branch}");
            branch
        }
    };

    git.fetch(repo_path, upstream_url, &branch)?;
    let upstream_tip = git.rev_parse(repo_path, "FETCH_HEAD")?;
    info!("upstream {branch} is at {upstream_tip}");

    let commit = git.merge_base(repo_path, "HEAD", upstream_tip.as_str())?;
    info!("merge-base is {commit}");

    Ok(Baseline {
        commit,
        source: BaselineSource::MergeBase {
            upstream_url: upstream_url.to_string(),
            branch,
            upstream_tip,
        },
    })
}

impl Baseline {
    /// Pin the baseline to an operator-supplied revision, resolved in
    /// `repo_path` so tags and abbreviated ids are accepted.
    pub fn from_override(git: &Git, repo_path: &Path, rev: &str) -> Result<Baseline> {
        let commit = git.rev_parse(repo_path, rev)?;
        info!("using baseline override {rev} ({commit})");
        Ok(Baseline {
            commit,
            source: BaselineSource::Override {
                rev: rev.to_string(),
            },
        })
    }
}
