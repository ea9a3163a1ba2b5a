//! Single-comment reconciliation on a pull request.
//!
//! Each run lists the thread's comments, looks for one whose body starts with
//! the package's hidden marker, and either rewrites it or creates it. The
//! marker is the only correlation key; nothing is stored between runs.
//!
//! Two runs racing on the same thread can both miss the marker and both
//! create a comment. GitHub has no conditional update for comment bodies, so
//! this is left as is; the next run updates the first of the two.

use anyhow::{Context, Result};

use crate::error::PublishError;
use crate::types::{Comment, CommentWriteResult, IssueContext, ThreadRef};

/// Comment CRUD on a hosting service.
pub trait CommentStore {
    fn list(&mut self, thread: &ThreadRef) -> Result<Vec<Comment>>;
    fn create(&mut self, thread: &ThreadRef, body: &str) -> Result<Comment>;
    fn update(&mut self, thread: &ThreadRef, comment_id: u64, body: &str) -> Result<Comment>;
}

/// Hidden HTML marker identifying this tool's comment for one package.
///
/// Scoped per package so workspace runs publishing several packages on the
/// same PR keep one comment each.
pub fn comment_marker(package_name: &str) -> String {
    format!(
        "<!-- NPM_PUBLISH_BRANCH_COMMENT_PR_{} -->",
        package_name.to_uppercase()
    )
}

/// First comment whose body starts with `marker`.
pub fn find_marked_comment<'a>(comments: &'a [Comment], marker: &str) -> Option<&'a Comment> {
    comments.iter().find(|c| c.body.starts_with(marker))
}

/// Make `body` the content of the single `marker` comment on the issue's thread.
///
/// `body` must itself start with `marker`, or the next run will not find it.
pub fn reconcile(
    store: &mut dyn CommentStore,
    issue: &IssueContext,
    marker: &str,
    body: &str,
) -> Result<CommentWriteResult> {
    let thread = issue.thread()?;
    debug_assert!(body.starts_with(marker), "rendered body must lead with its marker");

    let comments = store
        .list(&thread)
        .with_context(|| format!("failed to list comments on {thread}"))?;

    match find_marked_comment(&comments, marker) {
        Some(existing) => {
            let updated = store
                .update(&thread, existing.id, body)
                .with_context(|| format!("failed to update comment {} on {thread}", existing.id))?;
            Ok(CommentWriteResult::Updated { id: updated.id })
        }
        None => {
            let created = store
                .create(&thread, body)
                .with_context(|| format!("failed to create comment on {thread}"))?;
            Ok(CommentWriteResult::Created { id: created.id })
        }
    }
}

/// Whether an error from [`reconcile`] means the run is not on a pull request.
#[cfg(test)]
pub(crate) fn is_not_a_pull_request(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PublishError>(),
        Some(PublishError::NotAPullRequest)
    )
}
