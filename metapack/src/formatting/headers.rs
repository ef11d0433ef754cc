//! Section headers.

use owo_colors::OwoColorize;

fn section_header(title: &str) -> String {
    title.cyan().bold().to_string()
}

pub fn print_section_header(title: &str) {
    println!("{}", section_header(title));
    println!();
}
