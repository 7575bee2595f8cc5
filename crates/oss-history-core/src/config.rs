//! Run configuration.
//!
//! A [`CheckConfig`] is built once (defaults, then an optional JSON file,
//! then command-line overrides) and passed explicitly to every component.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::{CheckError, Result};
use crate::git::Git;

pub const DEFAULT_ANCHOR: &str = "zephyr";
pub const DEFAULT_UPSTREAM_URL: &str = "https://github.com/zephyrproject-rtos/zephyr";
pub const DEFAULT_CLONE_DIR: &str = "check-oss-history";

/// Committer identity written into each clone before replaying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: "check-oss-history".to_string(),
            email: "bot".to_string(),
        }
    }
}

/// The project whose upstream merge-base anchors the loot query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnchorConfig {
    pub name: String,
    /// Repository path relative to the workspace root.
    pub path: PathBuf,
    pub upstream_url: String,
    /// Upstream branch to fetch; the remote's HEAD branch when unset.
    pub upstream_branch: Option<String>,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ANCHOR.to_string(),
            path: PathBuf::from(DEFAULT_ANCHOR),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_branch: None,
        }
    }
}

/// How to invoke the external loot-resolution tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LootCommand {
    pub program: String,
    pub subcommand: Vec<String>,
    /// Flag that carries the baseline revision.
    pub rev_flag: String,
}

impl Default for LootCommand {
    fn default() -> Self {
        Self {
            program: "west".to_string(),
            subcommand: vec!["ncs-loot".to_string()],
            rev_flag: "--zephyr-rev".to_string(),
        }
    }
}

/// Everything one history check needs to know.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckConfig {
    /// Workspace top directory.
    pub workspace: PathBuf,
    /// Explicit baseline revision; skips merge-base computation.
    pub baseline: Option<String>,
    pub anchor: AnchorConfig,
    /// Projects to check, in processing order.
    pub projects: Vec<String>,
    /// Where per-project clones are created; `<workspace>/check-oss-history`
    /// when unset.
    pub clone_root: Option<PathBuf>,
    /// Replace stale clones instead of refusing to run.
    pub overwrite: bool,
    /// Identity set in each clone; `None` keeps the ambient git identity.
    pub identity: Option<Identity>,
    /// Keep checking other projects after one fails.
    pub keep_going: bool,
    pub git_program: String,
    /// Extra environment for git, e.g. `GIT_COMMITTER_DATE`.
    pub git_env: BTreeMap<String, String>,
    pub loot: LootCommand,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            baseline: None,
            anchor: AnchorConfig::default(),
            projects: vec![DEFAULT_ANCHOR.to_string()],
            clone_root: None,
            overwrite: false,
            identity: Some(Identity::default()),
            keep_going: false,
            git_program: "git".to_string(),
            git_env: BTreeMap::new(),
            loot: LootCommand::default(),
        }
    }
}

impl CheckConfig {
    /// Defaults for a given workspace.
    pub fn for_workspace(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file; absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CheckError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| CheckError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Git gateway configured for this run.
    pub fn git(&self) -> Git {
        Git::new(&self.git_program).with_env(self.git_env.clone())
    }

    pub fn clone_root(&self) -> PathBuf {
        self.clone_root
            .clone()
            .unwrap_or_else(|| self.workspace.join(DEFAULT_CLONE_DIR))
    }

    pub fn clone_path(&self, project: &str) -> PathBuf {
        self.clone_root().join(project)
    }

    pub fn anchor_repo(&self) -> PathBuf {
        self.workspace.join(&self.anchor.path)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if !self.workspace.is_dir() {
            return Err(CheckError::Config(format!(
                "workspace \"{}\" is not a directory",
                self.workspace.display()
            )));
        }
        if self.projects.is_empty() {
            return Err(CheckError::Config("no projects to check".to_string()));
        }

        let mut seen = BTreeSet::new();
        for project in &self.projects {
            if project.is_empty()
                || project == "."
                || project == ".."
                || project.contains(['/', '\\'])
            {
                return Err(CheckError::Config(format!(
                    "invalid project name \"{project}\""
                )));
            }
            if !seen.insert(project.as_str()) {
                return Err(CheckError::Config(format!(
                    "project \"{project}\" listed more than once"
                )));
            }
        }

        if self.loot.program.is_empty() || self.git_program.is_empty() {
            return Err(CheckError::Config("tool program must not be empty".to_string()));
        }
        Ok(())
    }
}
