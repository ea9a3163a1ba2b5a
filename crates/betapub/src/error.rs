use thiserror::Error;

/// Classified failures for a publish run.
///
/// Functions return `anyhow::Result` and wrap these; callers that need to
/// branch on the class use `err.downcast_ref::<PublishError>()`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    /// A required input or environment variable is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("commit reference is required to build a unique version")]
    MissingCommitReference,

    #[error("commit reference {0:?} contains characters not allowed in a semver identifier")]
    InvalidCommitReference(String),

    #[error("invalid package version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid package manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("This is not a PR or commenting is disabled")]
    NotAPullRequest,

    /// The hosting API or the package manager reported a failure.
    #[error("{step} failed: {message}")]
    Collaborator { step: String, message: String },

    #[error(
        "Package ({name_and_version}) may have been published but installation instructions could not be displayed, check https://www.npmjs.com/package/{name}?activeTab=versions"
    )]
    InstructionsUnavailable {
        name: String,
        name_and_version: String,
    },
}

impl PublishError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn collaborator(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// npm's error code for `workspace:*` dependency specs it cannot parse.
pub const UNSUPPORTED_PROTOCOL_CODE: &str = "EUNSUPPORTEDPROTOCOL";

/// Whether a version-bump failure is the tolerated `workspace:` protocol error.
///
/// npm still writes the new version before failing on this, so the run can continue.
pub fn is_tolerated_version_write_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.to_string().contains(UNSUPPORTED_PROTOCOL_CODE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_unavailable_links_to_registry_versions() {
        let err = PublishError::InstructionsUnavailable {
            name: "@scope/pkg".to_string(),
            name_and_version: "@scope/pkg@1.0.0-beta.abcdef12.df20d95".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("(@scope/pkg@1.0.0-beta.abcdef12.df20d95)"));
        assert!(msg.contains("https://www.npmjs.com/package/@scope/pkg?activeTab=versions"));
    }

    #[test]
    fn tolerated_failure_matches_anywhere_in_chain() {
        let err = anyhow::Error::new(PublishError::collaborator(
            "npm version",
            "npm error code EUNSUPPORTEDPROTOCOL\nnpm error Unsupported URL Type \"workspace:\"",
        ))
        .context("failed to write version");
        assert!(is_tolerated_version_write_failure(&err));
    }

    #[test]
    fn other_failures_are_not_tolerated() {
        let err = anyhow::Error::new(PublishError::collaborator("npm version", "npm error code E403"));
        assert!(!is_tolerated_version_write_failure(&err));
    }

    #[test]
    fn downcast_recovers_class() {
        let err: anyhow::Error = PublishError::NotAPullRequest.into();
        assert_eq!(
            err.downcast_ref::<PublishError>(),
            Some(&PublishError::NotAPullRequest)
        );
    }
}
