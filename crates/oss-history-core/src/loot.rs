//! Loot resolution: asking the workspace tooling for out-of-tree commits.
//!
//! [`LootSource`] is the seam between patch extraction and the external
//! tool. [`WestLoot`] runs `west ncs-loot` (or a configured equivalent) and
//! hands back its JSON payload; validation lives in [`crate::patches`].

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::LootCommand;
use crate::domain::commit::CommitId;
use crate::domain::error::{CheckError, Result};
use crate::git::render_command;

/// Something that can list a workspace's out-of-tree commits.
pub trait LootSource {
    /// Resolve out-of-tree commits of `projects` relative to `baseline`.
    ///
    /// Returns the raw payload: a JSON object keyed by project name.
    fn resolve(
        &self,
        workspace: &Path,
        baseline: &CommitId,
        projects: &[String],
    ) -> Result<serde_json::Value>;
}

/// Runs the loot command with its `--json` output redirected to a scoped
/// temporary file.
#[derive(Debug, Clone, Default)]
pub struct WestLoot {
    command: LootCommand,
}

impl WestLoot {
    pub fn new(command: LootCommand) -> Self {
        Self { command }
    }
}

impl LootSource for WestLoot {
    fn resolve(
        &self,
        workspace: &Path,
        baseline: &CommitId,
        projects: &[String],
    ) -> Result<serde_json::Value> {
        // Removed on drop, whichever way this function returns.
        let json_tmp = tempfile::Builder::new()
            .prefix("check-oss-history-")
            .suffix(".json")
            .tempfile()?
            .into_temp_path();

        let mut args: Vec<std::ffi::OsString> =
            self.command.subcommand.iter().map(Into::into).collect();
        args.push(self.command.rev_flag.clone().into());
        args.push(baseline.as_str().into());
        args.push("--json".into());
        args.push(json_tmp.as_os_str().to_owned());
        args.extend(projects.iter().map(Into::into));

        let rendered = render_command(Path::new(&self.command.program), args.as_slice());
        debug!(r#"running "{}" in "{}""#, rendered, workspace.display());

        let output = Command::new(&self.command.program)
            .args(&args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| CheckError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CheckError::CommandFailed {
                command: rendered,
                cwd: workspace.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let content = std::fs::read_to_string(&json_tmp)?;
        if content.trim().is_empty() {
            return Err(CheckError::Extraction(format!(
                "\"{rendered}\" produced no JSON output"
            )));
        }
        serde_json::from_str(&content)
            .map_err(|e| CheckError::Extraction(format!("malformed loot JSON: {e}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Write an executable fake loot tool that records the path it was told
    /// to write to in `seen`, then writes `payload` there and exits `code`.
    fn fake_tool(dir: &Path, payload: &str, code: i32) -> (PathBuf, PathBuf) {
        let seen = dir.join("seen-path");
        let script = dir.join("fake-loot");
        let body = format!(
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = \"--json\" ]; then\n\
                 shift\n\
                 printf '%s' \"$1\" > '{seen}'\n\
                 printf '%s' '{payload}' > \"$1\"\n\
               fi\n\
               shift\n\
             done\n\
             exit {code}\n",
            seen = seen.display(),
        );
        std::fs::write(&script, body).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        (script, seen)
    }

    fn loot_for(script: &Path) -> WestLoot {
        WestLoot::new(LootCommand {
            program: script.display().to_string(),
            subcommand: vec!["ncs-loot".to_string()],
            rev_flag: "--zephyr-rev".to_string(),
        })
    }

    fn baseline() -> CommitId {
        CommitId::parse("0123456789abcdef0123456789abcdef01234567").unwrap()
    }

    #[test]
    fn returns_payload_and_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let (script, seen) = fake_tool(dir.path(), r#"{"zephyr":{"shas":[]}}"#, 0);

        let value = loot_for(&script)
            .resolve(dir.path(), &baseline(), &["zephyr".to_string()])
            .unwrap();
        assert!(value["zephyr"]["shas"].is_array());

        let tmp = PathBuf::from(std::fs::read_to_string(&seen).unwrap());
        assert!(tmp.file_name().unwrap().to_string_lossy().starts_with("check-oss-history-"));
        assert!(!tmp.exists(), "temp file {tmp:?} should be gone");
    }

    #[test]
    fn failing_tool_is_command_failed_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (script, seen) = fake_tool(dir.path(), "{}", 3);

        let err = loot_for(&script)
            .resolve(dir.path(), &baseline(), &["zephyr".to_string()])
            .unwrap_err();
        match err {
            CheckError::CommandFailed { command, .. } => {
                assert!(command.contains("--zephyr-rev"));
                assert!(command.contains(baseline().as_str()));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }

        let tmp = PathBuf::from(std::fs::read_to_string(&seen).unwrap());
        assert!(!tmp.exists());
    }

    #[test]
    fn malformed_json_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let (script, _) = fake_tool(dir.path(), "{ nope", 0);

        let err = loot_for(&script)
            .resolve(dir.path(), &baseline(), &["zephyr".to_string()])
            .unwrap_err();
        assert!(matches!(err, CheckError::Extraction(_)));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = loot_for(Path::new("/nonexistent/west"))
            .resolve(dir.path(), &baseline(), &[])
            .unwrap_err();
        assert!(matches!(err, CheckError::Spawn { .. }));
    }
}
