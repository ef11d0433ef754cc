//! `watch`: the build → docs → serve development loop.

use anyhow::{Context, Result};
use metapack_core::{DevLoop, DevLoopPlan};

use crate::formatting::{print_key_value, print_section_header, print_warning};

use super::Workspace;

pub fn cmd_watch(mut workspace: Workspace, project: Option<String>) -> Result<()> {
    if let Some(project) = project {
        workspace.config.watch.project = project;
    }

    let roots = workspace.project_roots()?;
    let plan = DevLoopPlan::from_config(&workspace.dir, &workspace.config)?;

    print_section_header("Watch Mode");
    print_key_value("Project", &plan.project);
    print_key_value("Docs", &workspace.config.watch.docs_output);
    println!("  Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let mut dev_loop = DevLoop::new(&workspace.dir, plan, Box::new(std::io::stdout()));
    runtime.block_on(async {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        dev_loop.run_until(&roots, shutdown).await
    })?;

    println!();
    print_warning("Stopped watch mode");
    Ok(())
}
