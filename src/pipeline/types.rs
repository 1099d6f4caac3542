use std::fmt;

/// A step of the deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    VerifyPath,
    CheckTools,
    CreateRepository,
    ConfigureGit,
    PatchConfig,
    Build,
    Commit,
    Push,
    Publish,
    ActivatePages,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::VerifyPath => "verify project directory",
            Step::CheckTools => "check build tools",
            Step::CreateRepository => "create repository",
            Step::ConfigureGit => "configure git",
            Step::PatchConfig => "patch build config",
            Step::Build => "build",
            Step::Commit => "commit",
            Step::Push => "push",
            Step::Publish => "publish",
            Step::ActivatePages => "activate pages",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a step ended. Only `Fatal` stops the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success(String),
    /// Expected on repeated runs (already exists, nothing to commit, ...).
    Tolerated(String),
    /// A best-effort step failed; the run continues.
    BestEffortFailed(String),
    Fatal(String),
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Success(d)
            | StepOutcome::Tolerated(d)
            | StepOutcome::BestEffortFailed(d)
            | StepOutcome::Fatal(d) => d,
        }
    }
}

/// Progress of a run. Stages are reached in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    RemoteConfigured,
    ConfigPatched,
    Built,
    SourcePushed,
    ArtifactPublished,
    HostingActivated,
    Done,
    /// Terminal: `step` was fatal.
    Failed { step: Step },
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Site published.
    Deployed { repo_url: String, site_url: String },
    /// Interactive run found a clean working tree.
    NothingToDeploy,
    /// User declined the confirmation.
    Cancelled,
}
