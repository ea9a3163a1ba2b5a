//! # Betapub
//!
//! Publishes a uniquely versioned npm beta build for every pull-request commit
//! and tells reviewers how to install it.
//!
//! ## Pipeline
//!
//! 1. [`config::ActionConfig::resolve`] reads the action inputs and the runner
//!    context (event name, repository, event payload).
//! 2. [`manifest::load_identity`] finds the package name and its base
//!    `major.minor.patch` version.
//! 3. [`version::synthesize`] builds `X.Y.Z-beta.<random>.<commit>`.
//! 4. [`engine::run`] authenticates npm, writes the version, publishes under
//!    the `beta` dist-tag, then either upserts a pull-request comment through
//!    [`comment::reconcile`] or emits a workflow notice.
//!
//! ## Example
//!
//! ```ignore
//! use betapub::{actions, config, engine, github, npm};
//!
//! let cfg = config::ActionConfig::from_env()?;
//! let mut npm = npm::NpmCli::new(cfg.working_dir(), cfg.workspace.clone(), cfg.command_timeout);
//! let mut gh = github::GitHubClient::new(&cfg.api_base, &cfg.github_token, cfg.api_timeout)?;
//! let mut reporter = actions::ActionsReporter::stdout();
//! let report = engine::run(&cfg, &mut npm, &mut gh, &mut reporter, chrono::Utc::now())?;
//! println!("{}", report.name_and_version());
//! ```

/// GitHub Actions workflow commands and the stdout [`engine::Reporter`].
pub mod actions;
pub mod coerce;
/// Marker-based single-comment reconciliation.
pub mod comment;
/// Action inputs and runner context.
///
/// Inputs come from `INPUT_*` variables; runner context from `GITHUB_*`.
/// Both are read through a lookup function so tests never touch the process
/// environment.
pub mod config;
/// The publish run and the [`engine::Reporter`] trait.
pub mod engine;
pub mod error;
/// GitHub REST client for issue comments.
pub mod github;
pub mod manifest;
/// npm command construction and execution.
pub mod npm;
/// Markdown and plain-text install instructions.
pub mod render;
/// Domain types shared across modules.
pub mod types;
/// Base-version trimming and unique prerelease synthesis.
pub mod version;
