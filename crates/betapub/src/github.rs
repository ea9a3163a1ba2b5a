use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;

use crate::comment::CommentStore;
use crate::config::Secret;
use crate::error::PublishError;
use crate::types::{Comment, ThreadRef};

const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
/// GitHub caps `per_page` at 100; one page is all that is read.
const PER_PAGE: u32 = 100;

/// Issue-comment client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api_base: String,
    token: Secret,
    http: Client,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: &Secret, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("betapub/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.clone(),
            http,
        })
    }

    fn issue_comments_url(&self, thread: &ThreadRef) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, thread.repo.owner, thread.repo.repo, thread.number
        )
    }

    fn comment_url(&self, thread: &ThreadRef, comment_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.api_base, thread.repo.owner, thread.repo.repo, comment_id
        )
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(self.token.expose())
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn send(&self, step: &str, req: RequestBuilder) -> Result<Response> {
        let resp = self
            .authorized(req)
            .send()
            .with_context(|| format!("GitHub {step} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(PublishError::collaborator(
                format!("GitHub {step}"),
                format!("unexpected status {status}: {}", body.trim()),
            )
            .into());
        }
        Ok(resp)
    }
}

impl CommentStore for GitHubClient {
    fn list(&mut self, thread: &ThreadRef) -> Result<Vec<Comment>> {
        let url = format!("{}?per_page={PER_PAGE}", self.issue_comments_url(thread));
        let resp = self.send("list comments", self.http.get(url))?;
        resp.json().context("failed to parse comments JSON")
    }

    fn create(&mut self, thread: &ThreadRef, body: &str) -> Result<Comment> {
        let req = self
            .http
            .post(self.issue_comments_url(thread))
            .json(&CommentBody { body });
        let resp = self.send("create comment", req)?;
        resp.json().context("failed to parse created comment JSON")
    }

    fn update(&mut self, thread: &ThreadRef, comment_id: u64, body: &str) -> Result<Comment> {
        let req = self
            .http
            .patch(self.comment_url(thread, comment_id))
            .json(&CommentBody { body });
        let resp = self.send("update comment", req)?;
        resp.json().context("failed to parse updated comment JSON")
    }
}
