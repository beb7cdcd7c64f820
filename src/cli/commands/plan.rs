//! Plan command: read-only release preview.

use super::helpers::resolve_root;
use crate::cli::{Args, RuntimeConfig};
use crate::config::Preflight;
use crate::error::Result;
use crate::git::Git;
use crate::plan::DependencyGraphScanner;
use crate::process::SystemRunner;
use crate::version::BumpCalculator;
use crate::workspace::Workspace;

/// Show direct bumps and the dependency rewrites they cause.
///
/// Triggered bumps are listed as candidates only: their versions depend on
/// the dependency commits a real release makes first.
pub(super) async fn execute_plan(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    Preflight::require_tools(&["git"])?;

    let root = resolve_root(args)?;
    let git = Git::new(SystemRunner::with_timeout(args.timeout()), &root);
    let workspace = Workspace::discover(&root)?;
    config.verbose_println(&format!(
        "Discovered {} manifest(s) under {}",
        workspace.manifests().len(),
        root.display()
    ));

    let calculator = BumpCalculator::new(git, &root).with_channel(args.channel);
    let direct = calculator.compute_all(workspace.manifests().to_vec()).await?;
    if direct.is_empty() {
        config.success_println("No package changes detected. Nothing to release.");
        return Ok(0);
    }

    config.section("Direct releases");
    for transition in &direct {
        config.indent(&format!(
            "{}: {} -> {}",
            transition.name(),
            transition.current(),
            transition.next()
        ));
    }

    let rewrites = DependencyGraphScanner::scan(workspace.manifests(), &direct);
    if rewrites.is_empty() {
        return Ok(0);
    }

    config.section("Dependency rewrites");
    for (package, set) in rewrites.iter() {
        let role = if direct.iter().any(|t| t.name() == package) {
            "direct"
        } else {
            "triggered"
        };
        config.indent(&format!("{package} ({role})"));
        for (dependency, version) in set.iter() {
            config.indent(&format!("  {dependency} -> {version}"));
        }
    }
    Ok(0)
}
