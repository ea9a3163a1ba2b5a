//! The npm side of a publish: registry auth, version write, publish.
//!
//! [`PackagePublisher`] is the seam the engine drives; [`NpmCli`] implements
//! it by running the `npm` executable in the package's working directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use betapub_process::{CommandResult, run_command_with_timeout};

use crate::config::Secret;
use crate::error::PublishError;
use crate::types::UniqueVersion;
use crate::version::PRERELEASE_TAG;

/// Registry key npm reads the publish token from.
pub const REGISTRY_AUTH_KEY: &str = "//registry.npmjs.org/:_authToken";

const NPM: &str = "npm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub dry_run: bool,
    /// npm dist-tag. Without one npm would move `latest`.
    pub tag: String,
}

impl PublishOptions {
    pub fn beta(dry_run: bool) -> Self {
        Self {
            dry_run,
            tag: PRERELEASE_TAG.to_string(),
        }
    }
}

/// Package-manager operations a publish run needs.
pub trait PackagePublisher {
    fn set_auth(&mut self, token: &Secret) -> Result<()>;
    /// Write `version` into the manifest without committing or tagging.
    fn bump_version(&mut self, version: &UniqueVersion) -> Result<String>;
    fn publish(&mut self, opts: &PublishOptions) -> Result<String>;
    /// Raw `npm pkg get <field>` output: a JSON string, or an object keyed by workspace.
    fn package_field(&mut self, field: &str) -> Result<String>;
}

/// `npm config set` arguments storing the registry token.
///
/// Workspace repos need the extra flags or npm refuses to write config
/// (npm/cli#6099).
pub fn auth_args(token: &str, workspace: Option<&str>) -> Vec<String> {
    let mut args = vec!["config".to_string(), "set".to_string()];
    if workspace.is_some() {
        args.push("--workspaces=false".to_string());
        args.push("--include-workspace-root".to_string());
    }
    args.push(REGISTRY_AUTH_KEY.to_string());
    args.push(token.to_string());
    args
}

pub fn version_args(version: &str, workspace: Option<&str>) -> Vec<String> {
    let mut args = vec!["version".to_string()];
    if let Some(ws) = workspace {
        args.push(format!("--workspace={ws}"));
    }
    args.extend(["--git-tag-version".to_string(), "false".to_string()]);
    args.push(version.to_string());
    args
}

pub fn publish_args(opts: &PublishOptions, workspace: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "publish".to_string(),
        "--verbose".to_string(),
        "--tag".to_string(),
        opts.tag.clone(),
    ];
    if let Some(ws) = workspace {
        args.push(format!("--workspace={ws}"));
    }
    if opts.dry_run {
        args.push("--dry-run".to_string());
    }
    args
}

pub fn pkg_get_args(field: &str, workspace: Option<&str>) -> Vec<String> {
    let mut args = vec!["pkg".to_string(), "get".to_string(), field.to_string()];
    if let Some(ws) = workspace {
        args.push(format!("--workspace={ws}"));
    }
    args
}

/// Render an npm invocation for logs with `secret` replaced.
pub fn display_command(args: &[String], secret: Option<&str>) -> String {
    let shown: Vec<&str> = args
        .iter()
        .map(|a| match secret {
            Some(s) if !s.is_empty() && a == s => "***",
            _ => a.as_str(),
        })
        .collect();
    format!("{NPM} {}", shown.join(" "))
}

/// [`PackagePublisher`] backed by the `npm` CLI.
#[derive(Debug, Clone)]
pub struct NpmCli {
    dir: PathBuf,
    workspace: Option<String>,
    timeout: Option<Duration>,
}

impl NpmCli {
    pub fn new(dir: impl Into<PathBuf>, workspace: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            dir: dir.into(),
            workspace,
            timeout,
        }
    }

    fn run(&self, step: &str, args: &[String]) -> Result<CommandResult> {
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = run_command_with_timeout(NPM, &argv, &self.dir, self.timeout)?;
        if !result.success {
            let detail = if result.timed_out {
                result.stderr.trim().to_string()
            } else {
                format!(
                    "exit code {:?}: {}",
                    result.exit_code,
                    result.combined_output()
                )
            };
            return Err(PublishError::collaborator(format!("{NPM} {step}"), detail).into());
        }
        Ok(result)
    }
}

impl PackagePublisher for NpmCli {
    fn set_auth(&mut self, token: &Secret) -> Result<()> {
        let args = auth_args(token.expose(), self.workspace.as_deref());
        self.run("config set", &args)?;
        Ok(())
    }

    fn bump_version(&mut self, version: &UniqueVersion) -> Result<String> {
        let args = version_args(version.as_str(), self.workspace.as_deref());
        Ok(self.run("version", &args)?.combined_output())
    }

    fn publish(&mut self, opts: &PublishOptions) -> Result<String> {
        let args = publish_args(opts, self.workspace.as_deref());
        Ok(self.run("publish", &args)?.combined_output())
    }

    fn package_field(&mut self, field: &str) -> Result<String> {
        let args = pkg_get_args(field, self.workspace.as_deref());
        Ok(self.run("pkg get", &args)?.stdout.trim().to_string())
    }
}
