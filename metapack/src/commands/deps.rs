//! `deps update`: bulk dependency bumps.

use anyhow::Result;
use metapack_core::{
    load_manifests, DependencySpec, DependencyUpdater, UpdateOptions, UpdatePlan,
};

use tracing::info;

use crate::formatting::print_section_header;

use super::Workspace;

pub fn cmd_deps_update(
    workspace: &Workspace,
    specs: Vec<String>,
    dry_run: bool,
    commit: bool,
) -> Result<()> {
    let specs = specs
        .iter()
        .map(|s| DependencySpec::parse(s))
        .collect::<metapack_core::Result<Vec<_>>>()?;

    let roots = workspace.project_roots()?;
    let manifests = load_manifests(&workspace.dir, &roots)?;
    let plan = UpdatePlan::build(&manifests, &specs);

    if plan.is_empty() {
        return Ok(());
    }

    // Stdout is identical with and without --dry-run; mode-specific notes go to the log.
    print_section_header("Dependency Updates");

    let updater = DependencyUpdater::new(
        &workspace.runner,
        &workspace.dir,
        UpdateOptions { dry_run, commit },
    );
    let mut stdout = std::io::stdout();
    let report = updater.apply(&plan, &mut stdout)?;
    println!();

    if dry_run {
        info!(tasks = plan.task_count(), "dry run, nothing installed");
    } else {
        info!(
            tasks = plan.task_count(),
            installs = report.groups_installed,
            commits = report.commits.len(),
            "dependencies updated"
        );
    }

    Ok(())
}
