use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pages_deploy::config::{AppConfig, RunMode};
use pages_deploy::error::AppError;
use pages_deploy::pipeline::{resolve_token, DeployOutcome, Pipeline};
use pages_deploy::platform::github::GitHubPlatform;
use pages_deploy::prompt::{wait_for_enter, ConsolePrompter};
use pages_deploy::shutdown::wait_for_shutdown;

#[derive(Parser)]
#[command(
    name = "pages-deploy",
    about = "Build a static site and publish it to GitHub Pages"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Ask for confirmation and a change description; stop when nothing changed
    #[arg(short, long)]
    interactive: bool,

    /// Exit without waiting for ENTER
    #[arg(long)]
    no_pause: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = if cli.verbose {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration rejected");
            println!("\nUnexpected error: {e:#}");
            pause(&cli, None).await;
            exit(1)
        }
    };

    let code = tokio::select! {
        result = run(&config) => match result {
            Ok(outcome) => {
                tracing::info!(?outcome, "Run finished");
                0
            }
            Err(e) => {
                report_error(&e);
                1
            }
        },
        _ = wait_for_shutdown() => {
            // A prompt may still be blocked reading stdin: no pause, leave now
            println!("\n\nOperation cancelled");
            exit(0)
        }
    };

    pause(&cli, Some(&config)).await;
    exit(code)
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.interactive {
        config.run.mode = RunMode::Interactive;
    }
    Ok(config)
}

async fn run(config: &AppConfig) -> anyhow::Result<DeployOutcome> {
    let prompter = ConsolePrompter;
    let token = resolve_token(config, &prompter).await?;
    let platform = GitHubPlatform::new(&config.github, &token)?;

    let mut pipeline = Pipeline::new(config, &platform, &prompter, token);
    let outcome = pipeline.run().await?;
    Ok(outcome)
}

/// Print a failed run once. Step failures were already logged by the pipeline.
fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<AppError>() {
        Some(AppError::StepFailed { step, message }) => {
            println!("\nERROR ({step}): {message}");
        }
        _ => {
            tracing::error!(error = %e, "Deployment failed");
            println!("\nUnexpected error: {e:#}");
        }
    }
}

/// Wait for ENTER unless disabled. Ctrl+C at the pause ends it too.
async fn pause(cli: &Cli, config: Option<&AppConfig>) {
    let enabled = config.map_or(true, |c| c.run.pause_on_exit);
    if !cli.no_pause && enabled {
        let enter = tokio::task::spawn_blocking(|| wait_for_enter("\nPress ENTER to close..."));
        tokio::select! {
            _ = enter => {}
            _ = wait_for_shutdown() => {}
        }
    }
}

/// Exit without dropping the runtime, which would wait for blocking stdin
/// readers that can no longer be cancelled.
fn exit(code: i32) -> ! {
    let _ = std::io::stdout().flush();
    std::process::exit(code)
}
