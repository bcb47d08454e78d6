//! keyrot: rotate the access keys in an AWS shared credentials file
//!
//! Exit status: 0 when every selected profile succeeded or needed nothing,
//! 1 when at least one profile failed, 2 on configuration errors.

mod cli;
mod config;
mod report;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use keyrot_rotation::orchestrator::{Orchestrator, RunReport};
use keyrot_rotation::providers::IamAuthority;
use keyrot_rotation::store::CredentialsFile;

use crate::cli::{Cli, OutputFormat};
use crate::config::Settings;

const EXIT_PROFILE_FAILED: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match keyrot_log::init_with(cli.log_config()) {
        Ok(guard) => {
            tracing::debug!(format = %guard.format(), filter = guard.filter(), "logging ready");
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    }

    match run(&cli).await {
        Ok(report) if report.has_failures() => ExitCode::from(EXIT_PROFILE_FAILED),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("run aborted: {err:?}");
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_CONFIGURATION)
        }
    }
}

/// Everything that can go wrong here aborts the run before any key changes
async fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let settings = Settings::load(cli).context("invalid configuration")?;
    let selection = settings.selection()?;
    let path = settings.credentials_path()?;
    tracing::debug!(?settings, path = %path.display(), "settings resolved");

    let authority = IamAuthority::new(settings.iam_config())
        .await
        .context("failed to set up IAM client")?;
    let file = CredentialsFile::new(path);

    let report = Orchestrator::new(&authority, &file, settings.rotation_options())
        .run(&selection)
        .await?;

    match settings.output {
        OutputFormat::Text => print!("{}", report::render_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            report.to_json_pretty().context("failed to render report")?
        ),
    }

    Ok(report)
}
