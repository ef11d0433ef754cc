mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "metapack")]
#[command(about = "Maintenance tooling for a metapackage workspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the metapackage checkout.
    #[arg(long, global = true, default_value = ".")]
    workspace_dir: PathBuf,

    /// Configuration file. Defaults to `metapack.toml` in the workspace.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, global = true, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Dependency maintenance across every sub-project.
    Deps {
        #[command(subcommand)]
        command: DepsCommands,
    },
    /// Regenerate the status dashboard.
    Pulse {
        /// Output file, relative to the workspace root.
        #[arg(long)]
        output: Option<String>,
        /// Skip the project graph query and the dependency diagram.
        #[arg(long, action)]
        no_graph: bool,
    },
    /// Delete and reinstall node_modules everywhere.
    Reset {
        /// Install once as a unified workspace.
        #[arg(short = 'u', long, action)]
        metapackage: bool,
        /// Keep existing node_modules; only install.
        #[arg(short, long, action)]
        quick: bool,
        #[arg(long, action)]
        dry_run: bool,
    },
    /// Build, document and serve a package, rebuilding on change.
    Watch {
        /// Package to develop. Defaults to the configured test package.
        #[arg(long)]
        project: Option<String>,
    },
    /// List the sub-project roots reported by the project graph.
    Projects {
        #[arg(long, action)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DepsCommands {
    /// Move pinned dependencies to a new version.
    Update {
        /// `name[@version]`; the version defaults to `latest`.
        #[arg(required = true)]
        specs: Vec<String>,
        #[arg(long, action)]
        dry_run: bool,
        /// Commit manifest and lockfile per project.
        #[arg(long, action)]
        commit: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let workspace = commands::Workspace::load(cli.workspace_dir, cli.config)?;

    match cli.command {
        Commands::Deps {
            command:
                DepsCommands::Update {
                    specs,
                    dry_run,
                    commit,
                },
        } => commands::cmd_deps_update(&workspace, specs, dry_run, commit)?,
        Commands::Pulse { output, no_graph } => commands::cmd_pulse(workspace, output, no_graph)?,
        Commands::Reset {
            metapackage,
            quick,
            dry_run,
        } => commands::cmd_reset(&workspace, metapackage, quick, dry_run)?,
        Commands::Watch { project } => commands::cmd_watch(workspace, project)?,
        Commands::Projects { json } => commands::cmd_projects(&workspace, json)?,
    }

    Ok(())
}
