//! Tables via comfy-table.

use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;

/// Prints graph projects with their roots.
pub fn print_project_table(projects: &[(String, String)]) {
    if projects.is_empty() {
        println!("  {} {}", "→".cyan(), "(no projects)".bright_black());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Project").add_attribute(comfy_table::Attribute::Bold),
            Cell::new("Root").add_attribute(comfy_table::Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);

    for (name, root) in projects {
        table.add_row(vec![
            Cell::new(name).fg(comfy_table::Color::White),
            Cell::new(root).fg(comfy_table::Color::DarkGrey),
        ]);
    }

    println!("{}", table);
}
