//! Error taxonomy for history checking.

use std::path::PathBuf;

/// Errors produced while resolving, replaying, or verifying downstream history.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("command \"{command}\" failed in \"{}\" ({status}): {stderr}", .cwd.display())]
    CommandFailed {
        command: String,
        cwd: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("could not run \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote {url} did not report a symbolic HEAD; ls-remote output was:\n{output}")]
    RemoteProtocol { url: String, output: String },

    #[error("loot resolution returned unusable data: {0}")]
    Extraction(String),

    #[error(
        "{project}: shortlog of {commit} is truncated: \"{summary}\"; fix the commit message upstream"
    )]
    TruncatedSummary {
        project: String,
        commit: String,
        summary: String,
    },

    #[error(
        "clone path {} already exists; pass --force to overwrite it or remove it manually",
        .path.display()
    )]
    ClonePathConflict { path: PathBuf },

    #[error(
        "{project}: {commit} ({summary}) could not be replayed even as a redundant commit; \
         either the downstream changes or the current downstream history is malformed: {stderr}"
    )]
    PatchReplay {
        project: String,
        commit: String,
        summary: String,
        stderr: String,
    },

    #[error("{project}: rewritten history {rewritten} differs from {before}:\n{diff}")]
    HistoryMismatch {
        project: String,
        before: String,
        rewritten: String,
        diff: String,
    },

    #[error("{project}: cannot {operation} in stage {stage}")]
    InvalidStage {
        project: String,
        operation: &'static str,
        stage: String,
    },

    #[error("invalid commit id: {0:?}")]
    InvalidCommitId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// Project the error is attributed to, when it concerns a single project.
    pub fn project(&self) -> Option<&str> {
        match self {
            CheckError::TruncatedSummary { project, .. }
            | CheckError::PatchReplay { project, .. }
            | CheckError::HistoryMismatch { project, .. }
            | CheckError::InvalidStage { project, .. } => Some(project),
            _ => None,
        }
    }
}

/// Result type for history checking operations.
pub type Result<T> = std::result::Result<T, CheckError>;
