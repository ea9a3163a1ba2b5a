//! The publish run: resolve package, version, publish, tell the PR how to install.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::comment::{CommentStore, comment_marker, reconcile};
use crate::config::ActionConfig;
use crate::error::{PublishError, is_tolerated_version_write_failure};
use crate::manifest::load_identity;
use crate::npm::{
    PackagePublisher, PublishOptions, auth_args, display_command, publish_args, version_args,
};
use crate::render::{name_and_version, render_annotation, render_comment_markdown};
use crate::types::{CommentWriteResult, EventKind, PackageIdentity, UniqueVersion};
use crate::version::{CommitPolicy, synthesize};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);

    /// A message the user should see after the run, e.g. install instructions.
    fn notice(&mut self, msg: &str) {
        self.info(msg);
    }

    fn group(&mut self, title: &str) {
        self.info(title);
    }

    fn end_group(&mut self) {}

    /// Verbatim output of an external command.
    fn output(&mut self, text: &str) {
        self.info(text);
    }

    /// Register a value that must be scrubbed from any later log output.
    fn mask(&mut self, _secret: &str) {}
}

/// How the install instructions were delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instructions {
    Comment(CommentWriteResult),
    Annotation,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub identity: PackageIdentity,
    pub version: UniqueVersion,
    pub instructions: Instructions,
}

impl RunReport {
    pub fn name_and_version(&self) -> String {
        name_and_version(&self.identity.name, self.version.as_str())
    }
}

/// Publish a beta build and surface install instructions.
///
/// Nothing is retried: a CI step that fails is simply re-run.
pub fn run(
    cfg: &ActionConfig,
    publisher: &mut dyn PackagePublisher,
    comments: &mut dyn CommentStore,
    reporter: &mut dyn Reporter,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    reporter.mask(cfg.github_token.expose());
    reporter.mask(cfg.npm_token.expose());

    let dir = cfg.working_dir();
    let identity = load_identity(&dir, cfg.workspace.as_deref(), publisher)?;
    let version = synthesize(&identity.base_version, &cfg.commit_hash, CommitPolicy::Required)?;

    reporter.group(&format!(
        "Publish {} package to registry in {}",
        identity.name,
        dir.display()
    ));

    let result = publish_and_announce(cfg, &identity, &version, publisher, comments, reporter, now);

    reporter.end_group();
    result
}

fn publish_and_announce(
    cfg: &ActionConfig,
    identity: &PackageIdentity,
    version: &UniqueVersion,
    publisher: &mut dyn PackagePublisher,
    comments: &mut dyn CommentStore,
    reporter: &mut dyn Reporter,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let workspace = cfg.workspace.as_deref();
    let token = cfg.npm_token.expose();

    reporter.info(&display_command(&auth_args(token, workspace), Some(token)));
    publisher.set_auth(&cfg.npm_token)?;

    reporter.info(&display_command(&version_args(version.as_str(), workspace), None));
    match publisher.bump_version(version) {
        Ok(out) => report_output(reporter, &out),
        // npm rejects `workspace:*` dependency specs but still writes the
        // version before failing.
        Err(e) if is_tolerated_version_write_failure(&e) => {
            reporter.warn(
                "Encountered EUNSUPPORTEDPROTOCOL error from npm version command. Ignoring and continuing...",
            );
        }
        Err(e) => return Err(e.context(format!("failed to write version {version}"))),
    }

    let opts = PublishOptions::beta(cfg.dry_run);
    reporter.info(&display_command(&publish_args(&opts, workspace), None));
    let out = publisher
        .publish(&opts)
        .with_context(|| format!("failed to publish {}@{version}", identity.name))?;
    report_output(reporter, &out);

    let instructions = display_instructions(cfg, identity, version, comments, reporter, now)?;

    Ok(RunReport {
        identity: identity.clone(),
        version: version.clone(),
        instructions,
    })
}

/// Comment on the pull request, or annotate a manual run.
pub fn display_instructions(
    cfg: &ActionConfig,
    identity: &PackageIdentity,
    version: &UniqueVersion,
    comments: &mut dyn CommentStore,
    reporter: &mut dyn Reporter,
    now: DateTime<Utc>,
) -> Result<Instructions> {
    let nv = name_and_version(&identity.name, version.as_str());

    match &cfg.event {
        EventKind::PullRequest => {
            let issue = cfg.issue_context()?;
            let marker = comment_marker(&identity.name);
            let body = render_comment_markdown(&identity.name, &nv, &marker, now);
            let written = reconcile(comments, &issue, &marker, &body)?;
            match written {
                CommentWriteResult::Created { id } => {
                    reporter.info(&format!("created install comment {id}"))
                }
                CommentWriteResult::Updated { id } => {
                    reporter.info(&format!("updated install comment {id}"))
                }
            }
            Ok(Instructions::Comment(written))
        }
        EventKind::WorkflowDispatch => {
            reporter.notice(&render_annotation(&identity.name, &nv));
            Ok(Instructions::Annotation)
        }
        EventKind::Other(_) => Err(PublishError::InstructionsUnavailable {
            name: identity.name.clone(),
            name_and_version: nv,
        }
        .into()),
    }
}

fn report_output(reporter: &mut dyn Reporter, out: &str) {
    let out = out.trim();
    if !out.is_empty() {
        reporter.output(out);
    }
}
