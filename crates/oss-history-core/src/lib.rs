//! check-oss-history core library
//!
//! Verifies that the out-of-tree patches of a downstream fork can be replayed,
//! in order, onto the upstream merge-base, and that the replayed history has
//! an empty diff against the downstream tip.
//!
//! The pieces, leaves first:
//! - [`git::Git`]: synchronous gateway to the git binary
//! - [`baseline`]: upstream merge-base resolution
//! - [`patches`] / [`loot`]: out-of-tree patch extraction and validation
//! - [`rewrite`]: replay in a disposable clone plus empty-diff verification
//! - [`pipeline::run_check`]: all of the above, per configured project

pub mod baseline;
pub mod clone;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod loot;
pub mod obs;
pub mod patches;
pub mod pipeline;
pub mod reporting;
pub mod rewrite;
pub mod telemetry;

pub use baseline::{head_branch, parse_head_symref, resolve_baseline};
pub use clone::prepare_clone;
pub use config::{AnchorConfig, CheckConfig, Identity, LootCommand};
pub use domain::{
    Baseline, BaselineSource, CheckError, CommitId, Patch, PatchOutcome, PatchSet, Result,
    RewriteResult, RewriteStage,
};
pub use git::{DiffOutcome, Git, PickMode, PickOutcome};
pub use loot::{LootSource, WestLoot};
pub use patches::{extract_patches, is_truncated, parse_payload};
pub use pipeline::{run_check, CheckOutcome, ProjectFailure};
pub use reporting::{render_summary, write_report_json, CheckReport, ProjectReport, ProjectStatus};
pub use rewrite::{rewrite_and_verify, HistoryRewriter};
pub use telemetry::init_tracing;

/// check-oss-history version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
