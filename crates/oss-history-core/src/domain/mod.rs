//! Domain models for history checking.
//!
//! - `CommitId` / `Baseline`: points in a project's history
//! - `Patch` / `PatchSet`: ordered out-of-tree commits of one project
//! - `RewriteResult`: what a replay produced and whether it verified

pub mod commit;
pub mod error;
pub mod patch;

pub use commit::{Baseline, BaselineSource, CommitId};
pub use error::{CheckError, Result};
pub use patch::{Patch, PatchOutcome, PatchSet, RewriteResult, RewriteStage};
