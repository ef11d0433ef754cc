//! `projects`: list sub-project roots.

use anyhow::Result;

use crate::formatting::print_project_table;

use super::Workspace;

pub fn cmd_projects(workspace: &Workspace, json: bool) -> Result<()> {
    let graph = workspace.graph_reader()?.query(&workspace.runner)?;

    let projects: Vec<(String, String)> = graph
        .nodes
        .iter()
        .filter_map(|(id, node)| Some((id.clone(), node.data.root.clone()?)))
        .collect();

    if json {
        let output: Vec<_> = projects
            .iter()
            .map(|(id, root)| serde_json::json!({ "name": id, "root": root }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_project_table(&projects);
    }
    Ok(())
}
