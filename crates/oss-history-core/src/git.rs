//! Git gateway: the narrow set of git operations history checking needs.
//!
//! Every call runs the `git` binary synchronously in a given working
//! directory. A non-zero exit becomes [`CheckError::CommandFailed`] carrying
//! the command line, directory, exit status and captured stderr, except for
//! the two operations whose failure is an expected answer: `diff` (exit 1
//! means "changed") and `cherry_pick` (failure is a [`PickOutcome`]).
//! Nothing here retries.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::domain::commit::CommitId;
use crate::domain::error::{CheckError, Result};

const COMMITTER_DATE: &str = "GIT_COMMITTER_DATE";

/// Result of a single cherry-pick attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Picked,
    Failed { stderr: String },
}

/// How a cherry-pick treats commits that turn out to introduce no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMode {
    /// An empty result stops the cherry-pick.
    Strict,
    /// An empty result is kept as an empty commit.
    KeepRedundant,
}

/// Result of comparing two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Empty,
    Changed(String),
}

impl DiffOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, DiffOutcome::Empty)
    }
}

/// Handle on the git binary.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    env: BTreeMap<String, String>,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Git {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: BTreeMap::new(),
        }
    }

    /// Extra environment for every invocation, e.g. a fixed
    /// `GIT_COMMITTER_DATE` for reproducible rewrites.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `git ls-remote --quiet --symref <url> HEAD`, raw output.
    pub fn ls_remote_head_symref(&self, cwd: &Path, url: &str) -> Result<String> {
        self.stdout(cwd, ["ls-remote", "--quiet", "--symref", url, "HEAD"])
    }

    /// Fetch `refspec` from `remote` (a remote name or URL).
    pub fn fetch(&self, cwd: &Path, remote: &str, refspec: &str) -> Result<()> {
        self.stdout(cwd, ["fetch", "-q", remote, refspec]).map(drop)
    }

    /// Resolve a revision to the commit it names.
    pub fn rev_parse(&self, cwd: &Path, rev: &str) -> Result<CommitId> {
        let peeled = format!("{rev}^{{commit}}");
        let out = self.stdout(cwd, ["rev-parse", "--verify", peeled.as_str()])?;
        CommitId::parse(&out)
    }

    pub fn merge_base(&self, cwd: &Path, a: &str, b: &str) -> Result<CommitId> {
        let out = self.stdout(cwd, ["merge-base", a, b])?;
        CommitId::parse(&out)
    }

    /// Check out `rev` on a detached HEAD.
    pub fn checkout(&self, cwd: &Path, rev: &str) -> Result<()> {
        self.stdout(cwd, ["checkout", "-q", "--detach", rev]).map(drop)
    }

    /// Committer date of `commit`, in strict ISO 8601.
    pub fn committer_date(&self, cwd: &Path, commit: &CommitId) -> Result<String> {
        self.stdout(cwd, ["log", "-1", "--format=%cI", commit.as_str()])
    }

    /// Cherry-pick `commit` onto HEAD, letting the current tree win
    /// conflicting hunks (`-X ours`).
    ///
    /// The new commit takes over the committer date of `commit`, so replaying
    /// the same series onto the same base always yields the same ids. A
    /// `GIT_COMMITTER_DATE` set through [`Git::with_env`] takes precedence.
    pub fn cherry_pick(&self, cwd: &Path, commit: &CommitId, mode: PickMode) -> Result<PickOutcome> {
        let date = self.committer_date(cwd, commit)?;
        let mut args = vec!["cherry-pick", "-x", "--strategy=recursive", "-X", "ours"];
        if mode == PickMode::KeepRedundant {
            args.push("--keep-redundant-commits");
        }
        args.push(commit.as_str());

        let output = self.output_with(cwd, args.as_slice(), &[(COMMITTER_DATE, date.as_str())])?;
        if output.status.success() {
            Ok(PickOutcome::Picked)
        } else {
            Ok(PickOutcome::Failed {
                stderr: captured_diagnostics(&output),
            })
        }
    }

    /// Abort an in-progress cherry-pick, restoring the pre-pick state.
    pub fn cherry_pick_abort(&self, cwd: &Path) -> Result<()> {
        self.stdout(cwd, ["cherry-pick", "--abort"]).map(drop)
    }

    /// Exact diff between two revisions.
    pub fn diff(&self, cwd: &Path, a: &str, b: &str) -> Result<DiffOutcome> {
        let args = ["diff", "--no-color", "--no-ext-diff", "--exit-code", a, b];
        let output = self.output(cwd, &args)?;
        match output.status.code() {
            Some(0) => Ok(DiffOutcome::Empty),
            Some(1) => Ok(DiffOutcome::Changed(
                String::from_utf8_lossy(&output.stdout).into_owned(),
            )),
            _ => Err(self.failure(cwd, &args, &output)),
        }
    }

    /// Clone a local repository without checking out a work tree.
    ///
    /// Local clones copy the whole object store, so commits only reachable
    /// through `FETCH_HEAD` in `src` are still available in `dst`.
    pub fn clone_local(&self, src: &Path, dst: &Path) -> Result<()> {
        let cwd = dst.parent().unwrap_or(src);
        let args = [
            OsStr::new("clone"),
            OsStr::new("--quiet"),
            OsStr::new("--no-checkout"),
            src.as_os_str(),
            dst.as_os_str(),
        ];
        self.stdout(cwd, args).map(drop)
    }

    /// Set a repository-local config value.
    pub fn config_set(&self, cwd: &Path, key: &str, value: &str) -> Result<()> {
        self.stdout(cwd, ["config", key, value]).map(drop)
    }

    pub fn status(&self, cwd: &Path) -> Result<String> {
        self.stdout(cwd, ["status", "--short", "--branch"])
    }

    fn stdout<I, S>(&self, cwd: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let output = self.output(cwd, args.as_slice())?;
        if !output.status.success() {
            return Err(self.failure(cwd, args.as_slice(), &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn output<S: AsRef<OsStr>>(&self, cwd: &Path, args: &[S]) -> Result<Output> {
        self.output_with(cwd, args, &[])
    }

    /// Like `output`, with per-call environment that the configured
    /// environment overrides.
    fn output_with<S: AsRef<OsStr>>(
        &self,
        cwd: &Path,
        args: &[S],
        env: &[(&str, &str)],
    ) -> Result<Output> {
        debug!(
            r#"running "{}" in "{}""#,
            render_command(&self.program, args),
            cwd.display()
        );
        Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_EDITOR", "true")
            .envs(env.iter().copied())
            .envs(&self.env)
            .output()
            .map_err(|source| CheckError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }

    fn failure<S: AsRef<OsStr>>(&self, cwd: &Path, args: &[S], output: &Output) -> CheckError {
        CheckError::CommandFailed {
            command: render_command(&self.program, args),
            cwd: cwd.to_path_buf(),
            status: output.status.to_string(),
            stderr: captured_diagnostics(output),
        }
    }
}

/// Render a command line for diagnostics.
pub(crate) fn render_command<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}

/// Stderr, falling back to stdout: git reports cherry-pick conflicts on
/// stdout.
fn captured_diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match (stderr.is_empty(), stdout.is_empty()) {
        (false, true) => stderr,
        (true, _) => stdout,
        (false, false) => format!("{stderr}\n{stdout}"),
    }
}
