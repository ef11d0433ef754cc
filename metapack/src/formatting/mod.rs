//! Console formatting for command output.
//!
//! Colors and layout live here so commands only decide what to say.

mod headers;
mod output;
mod progress;
mod status;
mod tables;

pub use headers::print_section_header;
pub use output::{format_duration, print_key_value};
pub use progress::create_progress_bar;
pub use status::{print_success, print_warning};
pub use tables::print_project_table;
