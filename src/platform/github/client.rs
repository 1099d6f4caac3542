use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub REST API v3 client authenticated with a personal access token.
pub struct GitHubPlatform {
    client: Client,
    api_url: String,
    token: String,
}

impl GitHubPlatform {
    pub fn new(config: &GitHubConfig, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(AppError::Config("GitHub token is empty".to_string()));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<Response> {
        let url = format!("{}{path}", self.api_url);
        tracing::debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn create_repository(&self, repo: &RepoDescriptor) -> Result<CreateRepoOutcome> {
        let path = if repo.organization {
            format!("/orgs/{}/repos", repo.owner)
        } else {
            "/user/repos".to_string()
        };

        let payload = json!({
            "name": repo.name,
            "description": repo.description,
            "private": repo.private,
            "auto_init": false,
        });

        let response = self.post_json(&path, &payload).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(status = %status, repo = %repo.full_name(), "Create repository response");
        Ok(mapper::classify_create_response(status, &body, &repo.html_url()))
    }

    async fn activate_pages(&self, repo: &RepoDescriptor, source: &PagesSource) -> Result<PagesOutcome> {
        let path = format!("/repos/{}/{}/pages", repo.owner, repo.name);
        let payload = json!({
            "source": {
                "branch": source.branch,
                "path": source.path,
            }
        });

        let response = self.post_json(&path, &payload).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(status = %status, repo = %repo.full_name(), "Activate Pages response");
        Ok(mapper::classify_pages_response(status, &body))
    }
}
