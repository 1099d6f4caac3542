use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::platform::types::RepoDescriptor;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub repo: RepoConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub commit: CommitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepoConfig {
    /// Local project directory (the git checkout).
    pub path: PathBuf,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub private: bool,
    /// Create the repository under an organization instead of the token's user.
    #[serde(default)]
    pub organization: bool,
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Explicit remote URL, used verbatim instead of the token-bearing
    /// GitHub URL (e.g. SSH or a mirror).
    #[serde(default)]
    pub remote_url: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// Manual Debug impl to avoid leaking the access token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    #[serde(default = "default_build_command")]
    pub command: String,
    /// Quick command proving the build toolchain is installed, run before
    /// anything else. Empty disables the check.
    #[serde(default = "default_preflight")]
    pub preflight: String,
    /// Build configuration file, relative to the project directory.
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            preflight: default_preflight(),
            config_file: default_config_file(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    /// Command template; `{output_dir}`, `{deploy_branch}`, `{message}` and
    /// `{remote_url}` are substituted shell-quoted.
    #[serde(default = "default_publish_command")]
    pub command: String,
    #[serde(default = "default_deploy_branch")]
    pub deploy_branch: String,
    #[serde(default = "default_pages_path")]
    pub path: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            command: default_publish_command(),
            deploy_branch: default_deploy_branch(),
            path: default_pages_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// No prompts; creates the repository and activates Pages.
    #[default]
    Unattended,
    /// Prompts for token, confirmation and message; stops early when clean.
    Interactive,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: RunMode,
    /// Defaults to true in unattended mode, false in interactive mode.
    #[serde(default)]
    pub create_repository: Option<bool>,
    /// Defaults to true in unattended mode, false in interactive mode.
    #[serde(default)]
    pub activate_pages: Option<bool>,
    #[serde(default)]
    pub message_prefix: Option<String>,
    #[serde(default = "default_true")]
    pub pause_on_exit: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            create_repository: None,
            activate_pages: None,
            message_prefix: None,
            pause_on_exit: true,
        }
    }
}

impl RunConfig {
    pub fn create_repository(&self) -> bool {
        self.create_repository
            .unwrap_or(self.mode == RunMode::Unattended)
    }

    pub fn activate_pages(&self) -> bool {
        self.activate_pages.unwrap_or(self.mode == RunMode::Unattended)
    }

    pub fn message_prefix(&self) -> &str {
        match (&self.message_prefix, self.mode) {
            (Some(prefix), _) => prefix,
            (None, RunMode::Unattended) => "Initial project",
            (None, RunMode::Interactive) => "Update",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    concat!("pages-deploy/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_build_command() -> String {
    "npm run build".to_string()
}

fn default_preflight() -> String {
    "npm --version".to_string()
}

fn default_config_file() -> PathBuf {
    PathBuf::from("vite.config.ts")
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_publish_command() -> String {
    "npx gh-pages -d {output_dir} -b {deploy_branch} -m {message}".to_string()
}

fn default_deploy_branch() -> String {
    "gh-pages".to_string()
}

fn default_pages_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_author_name() -> String {
    "pages-deploy".to_string()
}

fn default_author_email() -> String {
    "pages-deploy@users.noreply.github.com".to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("pages-deploy").required(false));
        }

        // Environment variable overrides, e.g. PAGES_DEPLOY__GITHUB__TOKEN
        builder = builder.add_source(
            config::Environment::with_prefix("PAGES_DEPLOY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repo.owner.trim().is_empty() {
            return Err(AppError::Config("repo.owner must not be empty".to_string()));
        }
        if self.repo.name.trim().is_empty() {
            return Err(AppError::Config("repo.name must not be empty".to_string()));
        }
        for (key, branch) in [
            ("repo.branch", &self.repo.branch),
            ("publish.deploy_branch", &self.publish.deploy_branch),
        ] {
            if branch.is_empty() || branch.starts_with('-') {
                return Err(AppError::Config(format!("{key} is not a valid branch name: {branch:?}")));
            }
        }
        Ok(())
    }

    pub fn descriptor(&self) -> RepoDescriptor {
        RepoDescriptor {
            owner: self.repo.owner.clone(),
            name: self.repo.name.clone(),
            description: self.repo.description.clone(),
            private: self.repo.private,
            organization: self.repo.organization,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.repo.path
    }

    /// Non-empty token from configuration, if any.
    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
