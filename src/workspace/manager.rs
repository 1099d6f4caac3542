use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::workspace::git::{self, Author, CommitOutcome, RemoteChange};

/// The local project checkout a deployment runs in.
pub struct Workspace {
    pub path: PathBuf,
    pub branch: String,
    pub remote: String,
    author: Author,
}

/// What `finalize` did with the pending changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The tree was clean; nothing was staged.
    Clean,
    Committed { id: String },
    /// Changes were staged but the index already matched HEAD.
    NothingToCommit,
}

impl Workspace {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            path: config.repo.path.clone(),
            branch: config.repo.branch.clone(),
            remote: config.repo.remote.clone(),
            author: Author {
                name: config.commit.author_name.clone(),
                email: config.commit.author_email.clone(),
            },
        }
    }

    /// Fail unless the project directory exists.
    pub async fn verify(&self) -> Result<()> {
        let is_dir = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(AppError::Workspace(format!(
                "Project directory not found: {}",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Initialise git when needed and point the remote at `remote_url`.
    ///
    /// Returns whether the repository was created and how the remote changed.
    pub async fn prepare(&self, remote_url: &str) -> Result<(bool, RemoteChange)> {
        let created = git::ensure_repository(&self.path, &self.branch).await?;
        let change = git::configure_remote(&self.path, &self.remote, remote_url).await?;
        Ok((created, change))
    }

    /// Pending changes as short status lines.
    pub async fn pending_changes(&self) -> Result<Vec<String>> {
        git::status_lines(&self.path).await
    }

    /// Stage everything and commit it with `commit_message`.
    pub async fn finalize(&self, commit_message: &str) -> Result<FinalizeOutcome> {
        if !git::has_changes(&self.path).await? {
            tracing::info!("No changes to commit");
            return Ok(FinalizeOutcome::Clean);
        }

        git::add_all(&self.path).await?;
        match git::commit(&self.path, commit_message, &self.author).await? {
            CommitOutcome::Committed { id } => Ok(FinalizeOutcome::Committed { id }),
            CommitOutcome::NothingToCommit => Ok(FinalizeOutcome::NothingToCommit),
        }
    }

    pub async fn push(&self, token: &str) -> Result<()> {
        git::push(&self.path, &self.remote, &self.branch, token).await
    }

    /// True when the remote already has the branch tip.
    pub async fn is_in_sync(&self, token: &str) -> Result<bool> {
        git::is_in_sync(&self.path, &self.remote, &self.branch, token).await
    }

    /// Resolve a path relative to the project directory.
    pub fn join<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.path.join(relative)
    }
}
