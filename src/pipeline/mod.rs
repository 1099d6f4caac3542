pub mod types;


use chrono::{DateTime, Local};

use crate::config::{AppConfig, RunMode};
use crate::error::{AppError, Result};
use crate::patch::{self, PatchOutcome};
use crate::platform::types::{CreateRepoOutcome, PagesOutcome, PagesSource, RepoDescriptor};
use crate::platform::Platform;
use crate::process;
use crate::prompt::Prompter;
use crate::workspace::git::RemoteChange;
use crate::workspace::{FinalizeOutcome, Workspace};

pub use types::{DeployOutcome, Stage, Step, StepOutcome};

const RULE_WIDTH: usize = 60;

/// Timestamp-derived message used when the user gives none.
pub fn default_message(prefix: &str, now: DateTime<Local>) -> String {
    format!("{prefix} - {}", now.format("%d/%m/%Y %H:%M"))
}

/// Token from configuration, or asked for in interactive mode.
pub async fn resolve_token(config: &AppConfig, prompter: &dyn Prompter) -> Result<String> {
    if let Some(token) = config.github_token() {
        return Ok(token.to_string());
    }

    if config.run.mode != RunMode::Interactive {
        return Err(AppError::Config(
            "No GitHub token configured (set github.token or PAGES_DEPLOY__GITHUB__TOKEN)".to_string(),
        ));
    }

    println!("\nGitHub Personal Access Token:");
    let token = prompter.ask("   > ").await?;
    if token.is_empty() {
        return Err(AppError::Config("Token is empty".to_string()));
    }
    Ok(token)
}

/// One deployment run: create the repository, configure git, patch the build
/// config, build, push the source, publish the build output and activate Pages.
///
/// Steps run strictly in order. Every step yields a [`StepOutcome`]; the first
/// `Fatal` one ends the run with [`AppError::StepFailed`].
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    platform: &'a dyn Platform,
    prompter: &'a dyn Prompter,
    token: String,
    repo: RepoDescriptor,
    workspace: Workspace,
    stage: Stage,
    step_number: usize,
    report: Vec<(Step, StepOutcome)>,
    /// The remote repository was created by this run, so it is empty.
    repo_created: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AppConfig,
        platform: &'a dyn Platform,
        prompter: &'a dyn Prompter,
        token: String,
    ) -> Self {
        Self {
            config,
            platform,
            prompter,
            token,
            repo: config.descriptor(),
            workspace: Workspace::new(config),
            stage: Stage::Init,
            step_number: 0,
            report: Vec::new(),
            repo_created: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every step that ran, with its outcome.
    pub fn report(&self) -> &[(Step, StepOutcome)] {
        &self.report
    }

    /// URL the remote is configured with; carries the token unless overridden.
    fn remote_url(&self) -> String {
        match &self.config.repo.remote_url {
            Some(url) => url.clone(),
            None => self.repo.authenticated_url(&self.token),
        }
    }

    /// Remote URL safe to print.
    fn display_remote(&self) -> String {
        match &self.config.repo.remote_url {
            Some(url) => url.clone(),
            None => self.repo.html_url(),
        }
    }

    fn banner(&mut self, title: &str) {
        self.step_number += 1;
        println!("\n{}", "-".repeat(RULE_WIDTH));
        println!("STEP {}: {title}", self.step_number);
        println!("{}", "-".repeat(RULE_WIDTH));
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = ?self.stage, to = ?stage, "Stage reached");
        self.stage = stage;
    }

    /// Record a step outcome. A fatal outcome ends the run.
    fn record(&mut self, step: Step, outcome: StepOutcome) -> Result<()> {
        match &outcome {
            StepOutcome::Success(detail) => {
                tracing::info!(step = %step, "Step succeeded");
                println!("   OK {detail}");
            }
            StepOutcome::Tolerated(detail) => {
                tracing::info!(step = %step, detail = %detail, "Step tolerated");
                println!("   {detail}");
            }
            StepOutcome::BestEffortFailed(detail) => {
                tracing::warn!(step = %step, detail = %detail, "Best-effort step failed");
                println!("   {detail}");
            }
            // Printed once by the caller
            StepOutcome::Fatal(detail) => {
                tracing::error!(step = %step, detail = %detail, "Step failed");
            }
        }

        let fatal = outcome.detail().to_string();
        let is_fatal = outcome.is_fatal();
        self.report.push((step, outcome));

        if is_fatal {
            self.stage = Stage::Failed { step };
            return Err(AppError::StepFailed {
                step: step.name().to_string(),
                message: fatal,
            });
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result<DeployOutcome> {
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("   BUILD + DEPLOY {} TO GITHUB PAGES", self.repo.full_name());
        println!("{}", "=".repeat(RULE_WIDTH));
        tracing::info!(repo = %self.repo.full_name(), mode = ?self.config.run.mode, "Starting deployment");

        let outcome = self.verify_path().await;
        self.record(Step::VerifyPath, outcome)?;

        if !self.config.build.preflight.trim().is_empty() {
            let outcome = self.check_tools().await.unwrap_or_else(fatal);
            self.record(Step::CheckTools, outcome)?;
        }

        if self.config.run.create_repository() {
            self.banner("Creating repository on GitHub");
            let outcome = self.create_repository().await.unwrap_or_else(fatal);
            self.record(Step::CreateRepository, outcome)?;
        }

        self.banner("Configuring local git");
        let outcome = self.configure_git().await.unwrap_or_else(fatal);
        self.record(Step::ConfigureGit, outcome)?;
        self.advance(Stage::RemoteConfigured);

        if self.config.run.mode == RunMode::Interactive {
            if let Some(early) = self.review_changes().await? {
                return Ok(early);
            }
        }

        self.banner(&format!("Updating {}", self.config.build.config_file.display()));
        let outcome = self.patch_config().await.unwrap_or_else(fatal);
        self.record(Step::PatchConfig, outcome)?;
        self.advance(Stage::ConfigPatched);

        self.banner(&format!("Building ({})", self.config.build.command));
        let outcome = self.build().await.unwrap_or_else(fatal);
        self.record(Step::Build, outcome)?;
        self.advance(Stage::Built);

        self.banner("Commit and push source");
        let message = self.deploy_message().await?;
        let (outcome, committed) = match self.commit(&message).await {
            Ok(result) => result,
            Err(e) => (fatal(e), false),
        };
        self.record(Step::Commit, outcome)?;
        let outcome = self.push(committed).await.unwrap_or_else(fatal);
        self.record(Step::Push, outcome)?;
        self.advance(Stage::SourcePushed);

        self.banner(&format!(
            "Publishing to GitHub Pages (branch {})",
            self.config.publish.deploy_branch
        ));
        let outcome = self.publish(&message).await.unwrap_or_else(fatal);
        self.record(Step::Publish, outcome)?;
        self.advance(Stage::ArtifactPublished);

        if self.config.run.activate_pages() {
            self.banner("Activating GitHub Pages via API");
            let outcome = self.activate_pages().await;
            self.record(Step::ActivatePages, outcome)?;
            self.advance(Stage::HostingActivated);
        }

        let repo_url = self.repo.html_url();
        let site_url = self.repo.pages_url();
        println!("\n{}", "=".repeat(RULE_WIDTH));
        println!("   DONE - SITE UPDATED");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("\nRepository  : {repo_url}");
        println!("GitHub Pages: {site_url}");
        println!("\nChanges can take 1-2 minutes to show up.\n");

        self.advance(Stage::Done);
        tracing::info!(repo = %repo_url, site = %site_url, "Deployment finished");
        Ok(DeployOutcome::Deployed { repo_url, site_url })
    }

    async fn verify_path(&self) -> StepOutcome {
        match self.workspace.verify().await {
            Ok(()) => StepOutcome::Success(format!(
                "Project directory {}",
                self.workspace.path.display()
            )),
            Err(e) => StepOutcome::Fatal(e.to_string()),
        }
    }

    /// Fail early, before touching the remote, when the build toolchain is
    /// missing.
    async fn check_tools(&self) -> Result<StepOutcome> {
        let check = self.config.build.preflight.trim();
        let result = process::run_captured(check, &self.workspace.path).await?;

        if !result.success() {
            let stderr = result.stderr.trim();
            let reason = if stderr.is_empty() {
                String::new()
            } else {
                format!(": {stderr}")
            };
            return Ok(StepOutcome::Fatal(format!(
                "`{check}` failed (exit {}){reason}. Is the build toolchain installed?",
                result.status
            )));
        }

        let version = result.stdout.lines().next().unwrap_or_default().trim();
        tracing::debug!(check = %check, version = %version, "Build toolchain found");
        Ok(StepOutcome::Success(format!("Build toolchain found ({version})")))
    }

    async fn create_repository(&mut self) -> Result<StepOutcome> {
        Ok(match self.platform.create_repository(&self.repo).await? {
            CreateRepoOutcome::Created { url } => {
                self.repo_created = true;
                StepOutcome::Success(format!("Repository created: {url}"))
            }
            CreateRepoOutcome::AlreadyExists { url } => {
                StepOutcome::Tolerated(format!("Repository already exists ({url}), continuing"))
            }
            CreateRepoOutcome::Failed { status, message } => StepOutcome::Fatal(format!(
                "could not create repository (HTTP {status}): {message}"
            )),
        })
    }

    async fn configure_git(&self) -> Result<StepOutcome> {
        let (created, change) = self.workspace.prepare(&self.remote_url()).await?;
        if created {
            println!(
                "   OK Git repository initialised on branch '{}'",
                self.workspace.branch
            );
        }

        let verb = match change {
            RemoteChange::Added => "added",
            RemoteChange::Updated => "updated",
        };
        Ok(StepOutcome::Success(format!(
            "Remote '{}' {verb} -> {}",
            self.workspace.remote,
            self.display_remote()
        )))
    }

    /// Interactive only: stop when there is nothing to deploy, otherwise
    /// list the changes and ask to continue.
    async fn review_changes(&mut self) -> Result<Option<DeployOutcome>> {
        println!("\n{}", "-".repeat(RULE_WIDTH));
        println!("Detected changes:");
        println!("{}", "-".repeat(RULE_WIDTH));

        let changes = self.workspace.pending_changes().await?;
        if changes.is_empty() {
            println!("   No pending changes.");
            println!("   Edit the project files and run again.");
            tracing::info!("Working tree clean, nothing to deploy");
            self.advance(Stage::Done);
            return Ok(Some(DeployOutcome::NothingToDeploy));
        }

        for line in &changes {
            println!("   {line}");
        }
        println!();

        if !self.prompter.confirm("Continue with build and deploy?").await? {
            println!("Cancelled.");
            tracing::info!("Deployment cancelled by user");
            self.advance(Stage::Done);
            return Ok(Some(DeployOutcome::Cancelled));
        }
        Ok(None)
    }

    async fn patch_config(&self) -> Result<StepOutcome> {
        let file = &self.config.build.config_file;
        let name = &self.repo.name;

        Ok(match patch::set_base_path(&self.workspace.join(file), name).await? {
            PatchOutcome::Missing => {
                StepOutcome::Tolerated(format!("{} not found, skipping", file.display()))
            }
            PatchOutcome::Unchanged => {
                StepOutcome::Success(format!("{} already has base '/{name}'", file.display()))
            }
            PatchOutcome::Replaced | PatchOutcome::Inserted => {
                StepOutcome::Success(format!("{} updated with base '/{name}'", file.display()))
            }
            PatchOutcome::NoAnchor => StepOutcome::Tolerated(format!(
                "{} has no base option nor server block, left unchanged",
                file.display()
            )),
        })
    }

    async fn build(&self) -> Result<StepOutcome> {
        let status = process::run_streamed(&self.config.build.command, &self.workspace.path).await?;
        if status != 0 {
            return Ok(StepOutcome::Fatal(format!(
                "build failed (exit {status}), see the output above"
            )));
        }
        Ok(StepOutcome::Success(format!(
            "Build finished, {}/ generated",
            self.config.build.output_dir
        )))
    }

    async fn deploy_message(&self) -> Result<String> {
        let fallback = default_message(self.config.run.message_prefix(), Local::now());
        if self.config.run.mode != RunMode::Interactive {
            return Ok(fallback);
        }

        let answer = self
            .prompter
            .ask("\n   Change description (Enter = current date): ")
            .await?;
        Ok(if answer.is_empty() { fallback } else { answer })
    }

    /// Returns the outcome and whether a commit was created.
    async fn commit(&self, message: &str) -> Result<(StepOutcome, bool)> {
        Ok(match self.workspace.finalize(message).await? {
            FinalizeOutcome::Committed { id } => {
                tracing::info!(commit = %id, "Committed source");
                (StepOutcome::Success(format!("Commit: {message}")), true)
            }
            FinalizeOutcome::Clean | FinalizeOutcome::NothingToCommit => (
                StepOutcome::Tolerated("No new changes in the source".to_string()),
                false,
            ),
        })
    }

    async fn push(&self, committed: bool) -> Result<StepOutcome> {
        let branch = &self.workspace.branch;
        if !committed && !self.repo_created && self.workspace.is_in_sync(&self.token).await? {
            return Ok(StepOutcome::Tolerated(format!(
                "Branch '{branch}' already up to date on '{}'",
                self.workspace.remote
            )));
        }

        if let Err(e) = self.workspace.push(&self.token).await {
            return Ok(StepOutcome::Fatal(format!("push failed: {e}")));
        }
        Ok(StepOutcome::Success(format!(
            "Source pushed to branch '{branch}'"
        )))
    }

    async fn publish(&self, message: &str) -> Result<StepOutcome> {
        let publish = &self.config.publish;
        let output_dir = &self.config.build.output_dir;
        let hint = format!(
            "Check GitHub -> Settings -> Pages -> Source -> {} / root",
            publish.deploy_branch
        );

        if !tokio::fs::try_exists(self.workspace.join(output_dir)).await? {
            return Ok(StepOutcome::Fatal(format!(
                "build output '{output_dir}' not found. {hint}"
            )));
        }

        let remote_url = self.remote_url();
        let command = process::render_command(
            &publish.command,
            &[
                ("output_dir", output_dir.as_str()),
                ("deploy_branch", publish.deploy_branch.as_str()),
                ("message", message),
                ("remote_url", remote_url.as_str()),
            ],
        );
        tracing::debug!(template = %publish.command, "Running publish command");

        let status = process::run_streamed(&command, &self.workspace.path).await?;
        if status != 0 {
            return Ok(StepOutcome::Fatal(format!(
                "publish failed (exit {status}). {hint}"
            )));
        }
        Ok(StepOutcome::Success(format!(
            "{output_dir}/ published to branch '{}'",
            publish.deploy_branch
        )))
    }

    /// Best effort: never fatal.
    async fn activate_pages(&self) -> StepOutcome {
        let source = PagesSource {
            branch: self.config.publish.deploy_branch.clone(),
            path: self.config.publish.path.clone(),
        };
        let manual = format!(
            "Activate it manually: Settings -> Pages -> {} / root",
            source.branch
        );

        match self.platform.activate_pages(&self.repo, &source).await {
            Ok(PagesOutcome::Activated) => StepOutcome::Success("GitHub Pages activated".to_string()),
            Ok(PagesOutcome::AlreadyActive) => {
                StepOutcome::Tolerated("GitHub Pages already active".to_string())
            }
            Ok(PagesOutcome::Failed { status, message }) => StepOutcome::BestEffortFailed(format!(
                "Pages activation failed (HTTP {status}): {message}. {manual}"
            )),
            Err(e) => StepOutcome::BestEffortFailed(format!("Pages activation failed: {e}. {manual}")),
        }
    }
}

fn fatal(e: AppError) -> StepOutcome {
    StepOutcome::Fatal(e.to_string())
}
