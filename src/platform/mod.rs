pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Hosting provider operations used by the deployment pipeline.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Create the remote repository. An existing repository is reported as
    /// `AlreadyExists`, not as an error.
    async fn create_repository(&self, repo: &RepoDescriptor) -> Result<CreateRepoOutcome>;

    /// Enable Pages hosting for the repository from the given source.
    async fn activate_pages(&self, repo: &RepoDescriptor, source: &PagesSource) -> Result<PagesOutcome>;
}
