//! Run configuration.
//!
//! Everything the run reads from its environment is gathered here once, at
//! startup, into an [`ActionConfig`]. Nothing downstream touches `std::env`.
//!
//! Inputs arrive the way the Actions runner passes them: `INPUT_<NAME>`
//! variables with the value as a plain string. Runner context comes from the
//! standard `GITHUB_*` variables.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::coerce::coerce_to_bool;
use crate::error::PublishError;
use crate::types::{EventKind, IssueContext, RepoSlug};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKING_DIRECTORY: &str = ".";

/// Looks up a variable by name; `|k| std::env::var(k).ok()` in production.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// A token that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Raw action inputs, as supplied. Empty values are normalized to `None`.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    pub github_token: Option<String>,
    pub npm_token: Option<String>,
    pub commit_hash: Option<String>,
    pub dry_run: Option<String>,
    pub workspace: Option<String>,
    pub working_directory: Option<String>,
    pub api_timeout: Option<String>,
    pub command_timeout: Option<String>,
}

impl ActionInputs {
    /// Read `INPUT_*` variables through `lookup`.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let input = |name: &str| normalize(lookup(&input_var(name)));
        Self {
            github_token: input("github_token"),
            npm_token: input("npm_token"),
            commit_hash: input("commit_hash"),
            dry_run: input("dry_run"),
            workspace: input("workspace"),
            working_directory: input("working_directory"),
            api_timeout: input("api_timeout"),
            command_timeout: input("command_timeout"),
        }
    }

    /// Normalize values that came from somewhere other than [`Self::from_lookup`].
    pub fn normalized(self) -> Self {
        Self {
            github_token: normalize(self.github_token),
            npm_token: normalize(self.npm_token),
            commit_hash: normalize(self.commit_hash),
            dry_run: normalize(self.dry_run),
            workspace: normalize(self.workspace),
            working_directory: normalize(self.working_directory),
            api_timeout: normalize(self.api_timeout),
            command_timeout: normalize(self.command_timeout),
        }
    }
}

/// Environment variable name the runner uses for an input.
pub fn input_var(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub github_token: Secret,
    pub npm_token: Secret,
    pub commit_hash: String,
    pub dry_run: bool,
    /// Workspace selector passed to `npm --workspace`.
    pub workspace: Option<String>,
    /// Relative to `github_workspace`.
    pub working_directory: PathBuf,
    /// Checkout root (`GITHUB_WORKSPACE`).
    pub github_workspace: PathBuf,
    pub event: EventKind,
    pub repository: Option<RepoSlug>,
    /// Issue or pull-request number from the event payload.
    pub issue_number: Option<u64>,
    pub api_base: String,
    pub api_timeout: Duration,
    pub command_timeout: Option<Duration>,
}

impl ActionConfig {
    /// Validate inputs and read runner context through `lookup`.
    pub fn resolve(inputs: ActionInputs, lookup: Lookup<'_>) -> Result<Self> {
        let inputs = inputs.normalized();
        let env = |name: &str| normalize(lookup(name));

        let github_token = required(inputs.github_token, "github_token")?;
        let npm_token = required(inputs.npm_token, "npm_token")?;
        let commit_hash = required(inputs.commit_hash, "commit_hash")?;

        let github_workspace = env("GITHUB_WORKSPACE")
            .ok_or_else(|| PublishError::configuration("GITHUB_WORKSPACE env var missing"))?;
        let event_name = env("GITHUB_EVENT_NAME")
            .ok_or_else(|| PublishError::configuration("GITHUB_EVENT_NAME env var missing"))?;

        let repository = env("GITHUB_REPOSITORY")
            .map(|s| s.parse::<RepoSlug>())
            .transpose()?;

        let issue_number = match env("GITHUB_EVENT_PATH") {
            Some(path) => issue_number_from_event_file(Path::new(&path))?,
            None => None,
        };

        let api_timeout = match inputs.api_timeout {
            Some(raw) => parse_duration("api_timeout", &raw)?,
            None => DEFAULT_API_TIMEOUT,
        };
        let command_timeout = inputs
            .command_timeout
            .map(|raw| parse_duration("command_timeout", &raw))
            .transpose()?;

        Ok(Self {
            github_token: Secret::new(github_token),
            npm_token: Secret::new(npm_token),
            commit_hash,
            dry_run: coerce_to_bool(inputs.dry_run.as_deref()),
            workspace: inputs.workspace,
            working_directory: PathBuf::from(
                inputs
                    .working_directory
                    .as_deref()
                    .unwrap_or(DEFAULT_WORKING_DIRECTORY),
            ),
            github_workspace: PathBuf::from(github_workspace),
            event: EventKind::parse(&event_name),
            repository,
            issue_number,
            api_base: env("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_timeout,
            command_timeout,
        })
    }

    /// Read inputs and runner context from the process environment.
    pub fn from_env() -> Result<Self> {
        let lookup = |k: &str| std::env::var(k).ok();
        Self::resolve(ActionInputs::from_lookup(&lookup), &lookup)
    }

    /// Directory the manifest is read from and npm runs in.
    pub fn working_dir(&self) -> PathBuf {
        self.github_workspace.join(&self.working_directory)
    }

    /// The triggering issue context; needs `GITHUB_REPOSITORY`.
    pub fn issue_context(&self) -> Result<IssueContext> {
        let repo = self
            .repository
            .clone()
            .ok_or_else(|| PublishError::configuration("GITHUB_REPOSITORY env var missing"))?;
        Ok(IssueContext {
            repo,
            number: self.issue_number,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, PublishError> {
    value.ok_or_else(|| {
        PublishError::configuration(format!("Input required and not supplied: {name}"))
    })
}

fn parse_duration(name: &str, raw: &str) -> Result<Duration, PublishError> {
    humantime::parse_duration(raw)
        .map_err(|e| PublishError::configuration(format!("invalid {name} {raw:?}: {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    pull_request: Option<Numbered>,
    issue: Option<Numbered>,
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Numbered {
    number: Option<u64>,
}

/// Issue number from a webhook payload: `pull_request`, then `issue`, then top-level `number`.
pub fn issue_number_from_payload(json: &str) -> Result<Option<u64>> {
    let payload: EventPayload =
        serde_json::from_str(json).context("failed to parse event payload JSON")?;
    Ok(payload
        .pull_request
        .and_then(|p| p.number)
        .or_else(|| payload.issue.and_then(|i| i.number))
        .or(payload.number))
}

fn issue_number_from_event_file(path: &Path) -> Result<Option<u64>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read event payload at {}", path.display()))?;
    issue_number_from_payload(&content)
        .with_context(|| format!("invalid event payload at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_vars() -> HashMap<String, String> {
        vars(&[
            ("INPUT_GITHUB_TOKEN", "ghs_token"),
            ("INPUT_NPM_TOKEN", "npm_token"),
            ("INPUT_COMMIT_HASH", "df20d95efe1569bb854f994217f8712cd3a29aa6"),
            ("GITHUB_WORKSPACE", "/home/runner/work/app"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_REPOSITORY", "acme/widgets"),
        ])
    }

    fn resolve(map: &HashMap<String, String>) -> Result<ActionConfig> {
        let lookup = |k: &str| map.get(k).cloned();
        ActionConfig::resolve(ActionInputs::from_lookup(&lookup), &lookup)
    }

    fn config_error(err: &anyhow::Error) -> String {
        match err.downcast_ref::<PublishError>() {
            Some(PublishError::Configuration(msg)) => msg.clone(),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn input_var_uppercases_and_replaces_spaces() {
        assert_eq!(input_var("github_token"), "INPUT_GITHUB_TOKEN");
        assert_eq!(input_var("dry run"), "INPUT_DRY_RUN");
    }

    #[test]
    fn resolves_defaults() {
        let cfg = resolve(&base_vars()).expect("config");
        assert_eq!(cfg.github_token.expose(), "ghs_token");
        assert_eq!(cfg.npm_token.expose(), "npm_token");
        assert!(!cfg.dry_run);
        assert_eq!(cfg.workspace, None);
        assert_eq!(cfg.working_directory, PathBuf::from("."));
        assert_eq!(cfg.event, EventKind::PullRequest);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.api_timeout, DEFAULT_API_TIMEOUT);
        assert_eq!(cfg.command_timeout, None);
        assert_eq!(cfg.issue_number, None);
        assert_eq!(
            cfg.working_dir(),
            PathBuf::from("/home/runner/work/app").join(".")
        );
    }

    #[test]
    fn missing_required_input_names_it() {
        for (key, name) in [
            ("INPUT_GITHUB_TOKEN", "github_token"),
            ("INPUT_NPM_TOKEN", "npm_token"),
            ("INPUT_COMMIT_HASH", "commit_hash"),
        ] {
            let mut map = base_vars();
            map.remove(key);
            let err = resolve(&map).expect_err("missing input");
            assert_eq!(
                config_error(&err),
                format!("Input required and not supplied: {name}")
            );
        }
    }

    #[test]
    fn blank_required_input_counts_as_missing() {
        let mut map = base_vars();
        map.insert("INPUT_NPM_TOKEN".to_string(), "   ".to_string());
        let err = resolve(&map).expect_err("blank input");
        assert!(config_error(&err).contains("npm_token"));
    }

    #[test]
    fn missing_runner_context_is_configuration_error() {
        let mut map = base_vars();
        map.remove("GITHUB_WORKSPACE");
        assert_eq!(
            config_error(&resolve(&map).expect_err("no workspace")),
            "GITHUB_WORKSPACE env var missing"
        );

        let mut map = base_vars();
        map.remove("GITHUB_EVENT_NAME");
        assert_eq!(
            config_error(&resolve(&map).expect_err("no event")),
            "GITHUB_EVENT_NAME env var missing"
        );
    }

    #[test]
    fn dry_run_is_coerced() {
        for (raw, expected) in [("true", true), ("false", false), ("", false), ("yes", true)] {
            let mut map = base_vars();
            map.insert("INPUT_DRY_RUN".to_string(), raw.to_string());
            assert_eq!(resolve(&map).expect("config").dry_run, expected, "{raw:?}");
        }
    }

    #[test]
    fn workspace_and_working_directory_are_optional() {
        let mut map = base_vars();
        map.insert("INPUT_WORKSPACE".to_string(), "packages/ui".to_string());
        map.insert("INPUT_WORKING_DIRECTORY".to_string(), "frontend".to_string());
        let cfg = resolve(&map).expect("config");
        assert_eq!(cfg.workspace.as_deref(), Some("packages/ui"));
        assert_eq!(
            cfg.working_dir(),
            PathBuf::from("/home/runner/work/app/frontend")
        );

        map.insert("INPUT_WORKSPACE".to_string(), String::new());
        assert_eq!(resolve(&map).expect("config").workspace, None);
    }

    #[test]
    fn timeouts_parse_humantime() {
        let mut map = base_vars();
        map.insert("INPUT_API_TIMEOUT".to_string(), "10s".to_string());
        map.insert("INPUT_COMMAND_TIMEOUT".to_string(), "5m".to_string());
        let cfg = resolve(&map).expect("config");
        assert_eq!(cfg.api_timeout, Duration::from_secs(10));
        assert_eq!(cfg.command_timeout, Some(Duration::from_secs(300)));

        map.insert("INPUT_API_TIMEOUT".to_string(), "soon".to_string());
        assert!(config_error(&resolve(&map).expect_err("bad duration")).contains("api_timeout"));
    }

    #[test]
    fn malformed_repository_is_rejected() {
        let mut map = base_vars();
        map.insert("GITHUB_REPOSITORY".to_string(), "widgets".to_string());
        assert!(config_error(&resolve(&map).expect_err("bad repo")).contains("owner/repo"));
    }

    #[test]
    fn issue_context_requires_repository() {
        let mut map = base_vars();
        map.remove("GITHUB_REPOSITORY");
        let cfg = resolve(&map).expect("config");
        let err = cfg.issue_context().expect_err("no repo");
        assert_eq!(config_error(&err), "GITHUB_REPOSITORY env var missing");
    }

    #[test]
    fn issue_number_is_read_from_event_file() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join("event.json");
        fs::write(&path, r#"{"action":"synchronize","number":42,"pull_request":{"number":42}}"#)
            .expect("write");

        let mut map = base_vars();
        map.insert(
            "GITHUB_EVENT_PATH".to_string(),
            path.to_string_lossy().to_string(),
        );
        let cfg = resolve(&map).expect("config");
        assert_eq!(cfg.issue_number, Some(42));
        let ctx = cfg.issue_context().expect("context");
        assert_eq!(ctx.repo.to_string(), "acme/widgets");
        assert_eq!(ctx.number, Some(42));
    }

    #[test]
    fn missing_event_file_means_no_issue_number() {
        let td = tempdir().expect("tempdir");
        let mut map = base_vars();
        map.insert(
            "GITHUB_EVENT_PATH".to_string(),
            td.path().join("absent.json").to_string_lossy().to_string(),
        );
        assert_eq!(resolve(&map).expect("config").issue_number, None);
    }

    #[test]
    fn payload_number_precedence() {
        assert_eq!(
            issue_number_from_payload(r#"{"pull_request":{"number":1},"issue":{"number":2},"number":3}"#)
                .expect("parse"),
            Some(1)
        );
        assert_eq!(
            issue_number_from_payload(r#"{"issue":{"number":2},"number":3}"#).expect("parse"),
            Some(2)
        );
        assert_eq!(
            issue_number_from_payload(r#"{"number":3}"#).expect("parse"),
            Some(3)
        );
        assert_eq!(
            issue_number_from_payload(r#"{"inputs":{}}"#).expect("parse"),
            None
        );
        assert!(issue_number_from_payload("not json").is_err());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let cfg = resolve(&base_vars()).expect("config");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("ghs_token"));
        assert!(!dbg.contains("npm_token\""));
        assert!(dbg.contains("Secret(***)"));
    }

    #[test]
    #[serial]
    fn from_env_reads_process_environment() {
        temp_env::with_vars(
            [
                ("INPUT_GITHUB_TOKEN", Some("ghs_env")),
                ("INPUT_NPM_TOKEN", Some("npm_env")),
                ("INPUT_COMMIT_HASH", Some("abc1234")),
                ("INPUT_DRY_RUN", Some("true")),
                ("INPUT_WORKSPACE", None),
                ("INPUT_WORKING_DIRECTORY", None),
                ("INPUT_API_TIMEOUT", None),
                ("INPUT_COMMAND_TIMEOUT", None),
                ("GITHUB_WORKSPACE", Some("/tmp/checkout")),
                ("GITHUB_EVENT_NAME", Some("workflow_dispatch")),
                ("GITHUB_REPOSITORY", Some("acme/widgets")),
                ("GITHUB_EVENT_PATH", None),
                ("GITHUB_API_URL", None),
            ],
            || {
                let cfg = ActionConfig::from_env().expect("config");
                assert_eq!(cfg.github_token.expose(), "ghs_env");
                assert_eq!(cfg.commit_hash, "abc1234");
                assert!(cfg.dry_run);
                assert_eq!(cfg.event, EventKind::WorkflowDispatch);
                assert_eq!(cfg.api_base, DEFAULT_API_BASE);
            },
        );
    }
}
