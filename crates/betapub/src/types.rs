use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// A `MAJOR.MINOR.PATCH` version with any pre-release or build suffix removed.
///
/// Only [`crate::version::trim_version`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemverTriple(pub(crate) String);

impl SemverTriple {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SemverTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthesized pre-release version, e.g. `1.4.0-beta.3f9c01ab.df20d95`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueVersion(pub(crate) String);

impl UniqueVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub base_version: SemverTriple,
}

/// `owner/repo` of the repository that triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoSlug {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(PublishError::configuration(format!(
                "GITHUB_REPOSITORY must look like owner/repo, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The issue context of the triggering event.
///
/// `number` is `None` when the event payload carries no issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueContext {
    pub repo: RepoSlug,
    pub number: Option<u64>,
}

impl IssueContext {
    /// Resolve to a concrete thread, or fail when there is nothing to comment on.
    pub fn thread(&self) -> Result<ThreadRef, PublishError> {
        match self.number {
            Some(number) if number > 0 => Ok(ThreadRef {
                repo: self.repo.clone(),
                number,
            }),
            _ => Err(PublishError::NotAPullRequest),
        }
    }
}

/// A discussion thread (issue or pull request) that comments are attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRef {
    pub repo: RepoSlug,
    pub number: u64,
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    /// GitHub returns `null` for an empty body.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommentWriteResult {
    Created { id: u64 },
    Updated { id: u64 },
}

impl CommentWriteResult {
    pub fn id(&self) -> u64 {
        match self {
            Self::Created { id } | Self::Updated { id } => *id,
        }
    }
}

/// The kind of workflow event that triggered the run (`GITHUB_EVENT_NAME`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PullRequest,
    WorkflowDispatch,
    Other(String),
}

impl EventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "pull_request" => Self::PullRequest,
            "workflow_dispatch" => Self::WorkflowDispatch,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PullRequest => "pull_request",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::Other(name) => name,
        }
    }
}

/// Package managers the install instructions cover, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Yarn,
    Npm,
    Pnpm,
}

impl PackageManager {
    pub const ALL: [PackageManager; 3] = [Self::Yarn, Self::Npm, Self::Pnpm];

    pub fn label(self) -> &'static str {
        match self {
            Self::Yarn => "yarn",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
        }
    }

    pub fn install_command(self, name_and_version: &str) -> String {
        let verb = match self {
            Self::Yarn => "yarn add",
            Self::Npm => "npm install",
            Self::Pnpm => "pnpm add",
        };
        format!("{verb} {name_and_version}")
    }
}
