//! Minimal GitHub REST v3 client used by the on-the-fly pipeline.

use serde::Deserialize;

use crate::{PackError, Result};

pub(crate) const OTF_USER_AGENT: &str = "BedrockPack-OTF-Agent";
const API_VERSION: &str = "2022-11-28";

/// Production API base; tests point the client at a local server instead.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct CommitRow {
    sha: String,
}

impl GithubClient {
    /// Client against the public GitHub API, optionally authenticated with a
    /// personal access token.
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        }
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, OTF_USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// SHA of the most recent commit on `branch` of `org/repo`.
    pub async fn last_commit(&self, org: &str, repo: &str, branch: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{org}/{repo}/commits?sha={branch}&per_page=1",
            self.base_url
        );
        let response = self.get(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(PackError::RemoteApi(format!(
                "commit listing returned status {}",
                response.status().as_u16()
            )));
        }

        let commits: Vec<CommitRow> = response.json().await?;
        match commits.into_iter().next() {
            Some(commit) => Ok(commit.sha),
            None => Err(PackError::RemoteApi(format!(
                "no commits found for branch {branch}"
            ))),
        }
    }

    /// Download the whole repository as a zip archive at `reference` (a
    /// commit SHA or branch name).
    pub async fn download_zipball(&self, org: &str, repo: &str, reference: &str) -> Result<Vec<u8>> {
        let url = format!("{}/repos/{org}/{repo}/zipball/{reference}", self.base_url);
        let response = self.get(url.clone()).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(PackError::RemoteApi(format!(
                "failed to download {url}: status {}",
                response.status().as_u16()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
