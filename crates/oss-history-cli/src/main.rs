//! check-oss-history CLI
//!
//! Checks that the out-of-tree patches of a downstream workspace replay
//! cleanly onto the upstream merge-base and reproduce the downstream tree
//! exactly.
//!
//! Each project is rewritten in a fresh clone under `--clone-dir`, which is
//! left behind for inspection. Exit status is 0 only when every project
//! verified.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use oss_history_core::telemetry::level_for;
use oss_history_core::{
    init_tracing, render_summary, run_check, write_report_json, CheckConfig, CheckReport,
    WestLoot,
};

#[derive(Parser, Debug)]
#[command(name = "check-oss-history")]
#[command(version = oss_history_core::VERSION)]
#[command(
    about = "Verify that out-of-tree patches replay onto the upstream merge-base",
    long_about = None
)]
struct Cli {
    /// Workspace top directory
    #[arg(long)]
    workspace: PathBuf,

    /// Use this upstream revision instead of computing the merge-base
    #[arg(long, value_name = "SHA")]
    baseline: Option<String>,

    /// Project to check; may be repeated (default: zephyr)
    #[arg(long = "project", value_name = "NAME")]
    projects: Vec<String>,

    /// Upstream repository of the anchor project
    #[arg(long)]
    upstream_url: Option<String>,

    /// Upstream branch to fetch (default: the remote's HEAD branch)
    #[arg(long)]
    upstream_branch: Option<String>,

    /// Directory for the per-project clones (default: <workspace>/check-oss-history)
    #[arg(long, value_name = "DIR")]
    clone_dir: Option<PathBuf>,

    /// Overwrite existing clones
    #[arg(short, long)]
    force: bool,

    /// Keep the ambient git identity instead of setting one in each clone
    #[arg(long)]
    no_identity: bool,

    /// Continue with the remaining projects after one fails
    #[arg(long)]
    keep_going: bool,

    /// JSON file with a full or partial configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a JSON report of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn to_config(&self) -> Result<CheckConfig> {
        let mut config = match &self.config {
            Some(path) => CheckConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => CheckConfig::default(),
        };

        config.workspace = self.workspace.clone();
        if let Some(rev) = &self.baseline {
            config.baseline = Some(rev.clone());
        }
        if !self.projects.is_empty() {
            config.projects = self.projects.clone();
        }
        if let Some(url) = &self.upstream_url {
            config.anchor.upstream_url = url.clone();
        }
        if let Some(branch) = &self.upstream_branch {
            config.anchor.upstream_branch = Some(branch.clone());
        }
        if let Some(dir) = &self.clone_dir {
            config.clone_root = Some(dir.clone());
        }
        if self.force {
            config.overwrite = true;
        }
        if self.no_identity {
            config.identity = None;
        }
        if self.keep_going {
            config.keep_going = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose, cli.quiet));

    let config = cli.to_config()?;
    info!("workspace: {}", config.workspace.display());

    let loot = WestLoot::new(config.loot.clone());
    let outcome = run_check(&config.git(), &loot, &config).context("History check failed")?;

    let report = CheckReport::from_outcome(&outcome);
    if let Some(path) = &cli.report {
        write_report_json(path, &report)?;
        info!("report written to {}", path.display());
    }
    print!("{}", render_summary(&report));

    if report.success {
        Ok(())
    } else {
        anyhow::bail!("history check failed for {} project(s)", outcome.failures.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("check-oss-history").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_comes_from_the_library() {
        assert_eq!(Cli::command().get_version(), Some(oss_history_core::VERSION));
    }

    #[test]
    fn workspace_is_required() {
        let err = Cli::try_parse_from(["check-oss-history"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse(&["--workspace", "/ncs"]).to_config().unwrap();
        assert_eq!(config.workspace, PathBuf::from("/ncs"));
        assert_eq!(config.projects, vec!["zephyr".to_string()]);
        assert!(config.identity.is_some());
        assert!(!config.overwrite);
        assert_eq!(config.clone_root(), PathBuf::from("/ncs/check-oss-history"));
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--workspace",
            "/ncs",
            "--project",
            "zephyr",
            "--project",
            "mcuboot",
            "--baseline",
            "6145ab537fcb",
            "--upstream-branch",
            "release",
            "--clone-dir",
            "/tmp/clones",
            "-f",
            "--no-identity",
            "--keep-going",
        ])
        .to_config()
        .unwrap();

        assert_eq!(config.projects, vec!["zephyr", "mcuboot"]);
        assert_eq!(config.baseline.as_deref(), Some("6145ab537fcb"));
        assert_eq!(config.anchor.upstream_branch.as_deref(), Some("release"));
        assert_eq!(config.clone_root(), PathBuf::from("/tmp/clones"));
        assert!(config.overwrite);
        assert!(config.identity.is_none());
        assert!(config.keep_going);
    }

    #[test]
    fn flags_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.json");
        std::fs::write(
            &path,
            r#"{ "workspace": "/elsewhere", "projects": ["mcuboot"], "keep_going": true }"#,
        )
        .unwrap();

        let config = parse(&[
            "--workspace",
            "/ncs",
            "--config",
            path.to_str().unwrap(),
            "--project",
            "zephyr",
        ])
        .to_config()
        .unwrap();

        assert_eq!(config.workspace, PathBuf::from("/ncs"));
        assert_eq!(config.projects, vec!["zephyr"]);
        assert!(config.keep_going, "unset flags keep the file value");
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let err = Cli::try_parse_from(["check-oss-history", "--workspace", ".", "-v", "-q"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
