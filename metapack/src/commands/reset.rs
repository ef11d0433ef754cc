//! `reset`: reinstall every sub-project's dependencies.

use anyhow::Result;
use metapack_core::{ResetOptions, ResetPlan, WorkspaceReset};

use crate::formatting::{create_progress_bar, format_duration, print_key_value, print_success};

use super::Workspace;

pub fn cmd_reset(workspace: &Workspace, metapackage: bool, quick: bool, dry_run: bool) -> Result<()> {
    let options = ResetOptions {
        metapackage,
        quick,
        dry_run,
    };
    let roots = workspace.project_roots()?;
    let plan = ResetPlan::new(&workspace.dir, &roots, options);

    let start = std::time::Instant::now();
    let pb = create_progress_bar((plan.removals.len() + plan.installs.len()) as u64);
    let result = WorkspaceReset::new(&workspace.runner, options).execute(&plan, |step| {
        pb.set_message(step.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();
    result?;

    print_key_value("Projects", &roots.len().to_string());
    print_key_value("Installs", &plan.installs.len().to_string());
    if dry_run {
        print_success("Dry run, nothing changed");
    } else {
        print_success(&format!(
            "Reset finished in {}",
            format_duration(start.elapsed().as_secs_f64())
        ));
    }
    Ok(())
}
