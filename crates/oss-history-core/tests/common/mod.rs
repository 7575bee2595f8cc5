//! Scratch git repositories for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use oss_history_core::{CommitId, Git, Patch};

/// Fixed dates so rewritten commit ids are reproducible.
pub const FIXED_DATE: &str = "2024-06-01T12:00:00Z";

pub fn run_git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .env("GIT_AUTHOR_DATE", FIXED_DATE)
        .env("GIT_COMMITTER_DATE", FIXED_DATE)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Gateway with a pinned committer date.
pub fn pinned_git() -> Git {
    Git::default().with_env([("GIT_COMMITTER_DATE", FIXED_DATE)])
}

pub fn init_repo(path: &Path) {
    std::fs::create_dir_all(path).unwrap();
    run_git(path, &["init", "-q"]);
    run_git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(path, &["config", "user.name", "test-user"]);
    run_git(path, &["config", "user.email", "test@example.com"]);
    run_git(path, &["config", "commit.gpgsign", "false"]);
}

pub fn head(repo: &Path) -> CommitId {
    CommitId::parse(&run_git(repo, &["rev-parse", "HEAD"])).unwrap()
}

pub fn write_and_commit(repo: &Path, name: &str, contents: &str, message: &str) -> CommitId {
    std::fs::write(repo.join(name), contents).unwrap();
    run_git(repo, &["add", name]);
    run_git(repo, &["commit", "-q", "-m", message]);
    head(repo)
}

pub fn remove_and_commit(repo: &Path, name: &str, message: &str) -> CommitId {
    run_git(repo, &["rm", "-q", name]);
    run_git(repo, &["commit", "-q", "-m", message]);
    head(repo)
}

pub fn checkout(repo: &Path, rev: &str) {
    run_git(repo, &["checkout", "-q", rev]);
}

pub fn patch(id: &CommitId, summary: &str) -> Patch {
    Patch {
        id: id.clone(),
        summary: summary.to_string(),
    }
}

/// Upstream repo plus a downstream fork of it under one temp dir.
pub struct Fork {
    pub dir: tempfile::TempDir,
    pub upstream: PathBuf,
    pub downstream: PathBuf,
}

impl Fork {
    /// Upstream with one commit, downstream cloned from it.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let upstream = dir.path().join("upstream");
        init_repo(&upstream);
        write_and_commit(&upstream, "a.txt", "line 1\nline 2\nline 3\n", "initial");

        let downstream = dir.path().join("downstream");
        run_git(
            dir.path(),
            &[
                "clone",
                "-q",
                upstream.to_str().unwrap(),
                downstream.to_str().unwrap(),
            ],
        );
        run_git(&downstream, &["config", "user.name", "downstream-dev"]);
        run_git(&downstream, &["config", "user.email", "dev@example.com"]);
        run_git(&downstream, &["config", "commit.gpgsign", "false"]);

        Self {
            dir,
            upstream,
            downstream,
        }
    }

    pub fn upstream_url(&self) -> String {
        self.upstream.to_string_lossy().to_string()
    }

    /// A fresh clone of the downstream repo to rewrite in.
    pub fn sandbox(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("clones").join(name);
        oss_history_core::prepare_clone(&Git::default(), &self.downstream, &path, false).unwrap();
        path
    }
}
