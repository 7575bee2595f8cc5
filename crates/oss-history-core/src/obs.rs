//! Structured observability hooks for history check lifecycle events.
//!
//! This module provides:
//! - A run-scoped tracing span via the `CheckSpan` RAII guard
//! - Emission functions for check start/finish and per-project milestones
//!
//! Events are emitted at `info!` level; filter with `RUST_LOG`.

use tracing::info;

use crate::domain::commit::CommitId;

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// check.
///
/// # Example
///
/// ```ignore
/// let _span = CheckSpan::enter("6c0e...");
/// // every event below carries run_id = "6c0e..."
/// ```
pub struct CheckSpan {
    _span: tracing::span::EnteredSpan,
}

impl CheckSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("check", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: check started against a baseline.
pub fn emit_check_started(run_id: &str, baseline: &CommitId, projects: usize) {
    info!(
        event = "check.started",
        run_id = %run_id,
        baseline = %baseline,
        projects = projects,
    );
}

/// Emit event: a patch was only replayable as a redundant commit.
pub fn emit_patch_redundant(project: &str, commit: &CommitId) {
    info!(event = "patch.redundant", project = %project, commit = %commit);
}

/// Emit event: all patches of a project were replayed.
pub fn emit_project_rewritten(project: &str, rewritten: &CommitId, patches: usize, redundant: usize) {
    info!(
        event = "project.rewritten",
        project = %project,
        rewritten = %rewritten,
        patches = patches,
        redundant = redundant,
    );
}

/// Emit event: verification diff computed.
pub fn emit_project_verified(project: &str, ok: bool) {
    info!(event = "project.verified", project = %project, ok = ok);
}

/// Emit event: a project's pipeline aborted (error level).
pub fn emit_project_failed(project: &str, error: &dyn std::fmt::Display) {
    tracing::error!(event = "project.failed", project = %project, error = %error);
}

/// Emit event: check finished.
pub fn emit_check_finished(run_id: &str, duration_ms: u64, passed: usize, failed: usize) {
    info!(
        event = "check.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        passed = passed,
        failed = failed,
        success = failed == 0,
    );
}
