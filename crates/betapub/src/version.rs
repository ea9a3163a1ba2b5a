//! Unique pre-release version synthesis.
//!
//! A beta build is versioned `{MAJOR.MINOR.PATCH}-beta.{random8}.{commit7}`:
//! the manifest's base version with its own suffix dropped, eight random hex
//! digits, and the abbreviated commit. Every run therefore publishes a fresh
//! version even when the same commit is rebuilt.

use crate::error::PublishError;
use crate::types::{SemverTriple, UniqueVersion};

/// Pre-release channel; also the npm dist-tag used when publishing.
pub const PRERELEASE_TAG: &str = "beta";

/// Length of the abbreviated commit hash.
pub const COMMIT_PREFIX_LEN: usize = 7;

/// Length of the random token, in hex digits.
pub const RANDOM_TOKEN_LEN: usize = 8;

/// Whether a commit reference is mandatory for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    /// An empty commit reference fails with [`PublishError::MissingCommitReference`].
    Required,
    /// An empty commit reference drops the commit identifier from the version.
    Optional,
}

/// Reduce a manifest version to its `MAJOR.MINOR.PATCH` part.
///
/// Splits on `.` or `-` and keeps the first three segments, so
/// `"1.2.3-rc.1"` becomes `"1.2.3"` and `"2.0.0.4"` becomes `"2.0.0"`.
pub fn trim_version(raw: &str) -> Result<SemverTriple, PublishError> {
    let invalid = |reason: &str| PublishError::InvalidVersion {
        version: raw.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = raw.trim().split(['.', '-']).take(3).collect();
    if segments.len() < 3 {
        return Err(invalid("expected at least three dot-separated components"));
    }

    for seg in &segments {
        if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("version components must be numeric"));
        }
        if seg.len() > 1 && seg.starts_with('0') {
            return Err(invalid("version components must not have leading zeros"));
        }
    }

    Ok(SemverTriple(segments.join(".")))
}

/// Build a unique pre-release version from a trimmed base and a commit reference.
pub fn synthesize(
    base: &SemverTriple,
    commit_ref: &str,
    policy: CommitPolicy,
) -> Result<UniqueVersion, PublishError> {
    let commit = commit_identifier(commit_ref, policy)?;
    let token = random_token();

    let version = match commit {
        Some(commit) => format!("{base}-{PRERELEASE_TAG}.{token}.{commit}"),
        None => format!("{base}-{PRERELEASE_TAG}.{token}"),
    };

    semver::Version::parse(&version).map_err(|e| PublishError::InvalidVersion {
        version: version.clone(),
        reason: e.to_string(),
    })?;

    Ok(UniqueVersion(version))
}

fn commit_identifier(
    commit_ref: &str,
    policy: CommitPolicy,
) -> Result<Option<String>, PublishError> {
    let trimmed = commit_ref.trim();
    if trimmed.is_empty() {
        return match policy {
            CommitPolicy::Required => Err(PublishError::MissingCommitReference),
            CommitPolicy::Optional => Ok(None),
        };
    }

    let prefix: String = trimmed.chars().take(COMMIT_PREFIX_LEN).collect();
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(PublishError::InvalidCommitReference(commit_ref.to_string()));
    }

    // Semver forbids leading zeros in numeric identifiers; an all-digit
    // abbreviation like `0451234` gets git-describe's `g` prefix instead.
    if has_numeric_leading_zero(&prefix) {
        return Ok(Some(format!("g{prefix}")));
    }

    Ok(Some(prefix))
}

/// Eight lowercase hex digits, redrawn in the rare case they would form an
/// all-digit identifier with a leading zero.
fn random_token() -> String {
    loop {
        let token = format!("{:0width$x}", rand::random::<u32>(), width = RANDOM_TOKEN_LEN);
        if !has_numeric_leading_zero(&token) {
            return token;
        }
    }
}

fn has_numeric_leading_zero(ident: &str) -> bool {
    ident.len() > 1 && ident.starts_with('0') && ident.bytes().all(|b| b.is_ascii_digit())
}
