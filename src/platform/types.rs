/// The repository being deployed. Built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub private: bool,
    pub organization: bool,
}

impl RepoDescriptor {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    pub fn pages_url(&self) -> String {
        format!("https://{}.github.io/{}/", self.owner, self.name)
    }

    /// HTTPS remote URL with the token embedded as credentials.
    pub fn authenticated_url(&self, token: &str) -> String {
        format!(
            "https://x-access-token:{}@github.com/{}/{}.git",
            urlencoding::encode(token),
            self.owner,
            self.name
        )
    }
}

/// Result of a repository creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRepoOutcome {
    Created { url: String },
    /// Tolerated: repeated runs find the repository in place.
    AlreadyExists { url: String },
    Failed { status: u16, message: String },
}

/// Result of a Pages activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagesOutcome {
    Activated,
    AlreadyActive,
    Failed { status: u16, message: String },
}

/// Where Pages serves the site from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesSource {
    pub branch: String,
    pub path: String,
}
