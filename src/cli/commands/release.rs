//! Release command: pre-flight, release, report.

use super::helpers::{resolve_branch, resolve_root, settings_from_args};
use crate::changelog::GitChangelogGenerator;
use crate::cli::{Args, RuntimeConfig};
use crate::config::{EnvConfig, Preflight};
use crate::error::Result;
use crate::git::Git;
use crate::github::GitHubReleaseManager;
use crate::process::SystemRunner;
use crate::release::Releaser;
use crate::state::{ExecutionLedger, RunOutcome, RunReport, StateManager};

/// Execute a full release
pub(super) async fn execute_release(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let preflight = Preflight::validate(&EnvConfig::from_env())?;
    Preflight::require_tools(&["git", "npm"])?;

    let root = resolve_root(args)?;
    let runner = SystemRunner::with_timeout(args.timeout());
    let git = Git::new(runner.clone(), &root);
    let branch = resolve_branch(args, &git).await?;
    let settings = settings_from_args(args, root, branch);

    config.section("Release");
    config.info_println(&format!(
        "Releasing {} from {} ({})",
        preflight.repository,
        settings.root.display(),
        settings.branch
    ));
    config.verbose_println(&format!("Registry: {}", settings.registry));

    let host = GitHubReleaseManager::new(&preflight.token, &preflight.api_url)?;
    let releaser = Releaser::new(
        runner,
        settings,
        preflight.repository.clone(),
        GitChangelogGenerator::new(git),
        host,
    )
    .with_run_url(preflight.run_url.clone())
    .with_channel(args.channel);

    let mut ledger = ExecutionLedger::new();
    let mut report = RunReport::start();
    let result = releaser.run(&mut ledger, &mut report).await;

    let outcome = match &result {
        Ok(outcome) => outcome.clone(),
        Err(e) => RunOutcome::Failed {
            last_completed_phase: ledger.phase(),
            error: e.to_string(),
            rolled_back: report.rollback.is_some(),
        },
    };
    report.finish(&ledger, outcome);
    save_report(args, config, &report);

    match result? {
        RunOutcome::NothingToRelease => {
            config.success_println("No package changes detected. Nothing to release.");
        }
        _ => {
            config.success_println(&format!("Released {} package(s)", ledger.tags_created().len()));
            for tag in ledger.tags_created() {
                config.indent(tag);
            }
        }
    }
    Ok(0)
}

/// Persist the run report when `--state-file` was given
fn save_report(args: &Args, config: &RuntimeConfig, report: &RunReport) {
    let Some(path) = &args.state_file else {
        return;
    };
    match StateManager::new(path).save(report) {
        Ok(saved) => config.verbose_println(&format!(
            "Run report written to {} ({} bytes)",
            path.display(),
            saved.file_size_bytes
        )),
        Err(e) => config.warning_println(&format!("Could not write run report: {e}")),
    }
}
