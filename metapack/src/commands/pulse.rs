//! `pulse`: status dashboard generation.

use anyhow::Result;
use metapack_core::{write_pulse, DependencyDiagram};

use crate::formatting::{print_key_value, print_success};

use super::Workspace;

pub fn cmd_pulse(mut workspace: Workspace, output: Option<String>, no_graph: bool) -> Result<()> {
    if let Some(output) = output {
        workspace.config.pulse.output = output;
    }
    let config = &workspace.config;

    let diagram = if no_graph {
        None
    } else {
        let graph = workspace.graph_reader()?.query(&workspace.runner)?;
        Some(DependencyDiagram::build(
            &graph,
            &workspace.dir,
            &config.pulse,
            &config.namespace,
        ))
    };

    let path = write_pulse(&workspace.dir, &config.pulse, &config.namespace, diagram.as_ref())?;

    print_success(&format!("Wrote {}", path.display()));
    if let Some(diagram) = &diagram {
        print_key_value("Graph nodes", &diagram.node_count().to_string());
    }
    Ok(())
}
