//! # Command Line Interface
//!
//! Offline tooling over YAML object files: render one virtual service into
//! proxy records, or inspect the certificate index auto-discovery would use.

pub mod index;
pub mod output;
pub mod render;

use crate::config::AssemblerSettings;
use crate::observability::init_logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edgeplane")]
#[command(about = "Assemble Envoy xDS resources from VirtualService intents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (YAML, TOML or JSON); EDGEPLANE__* variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble one virtual service and print a summary
    Render(render::RenderArgs),

    /// Print the domain to credential index built from TLS credentials
    Index(index::IndexArgs),
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    init_logging(&settings.logging)?;

    match cli.command {
        Commands::Render(args) => render::handle_render_command(args, &settings).await?,
        Commands::Index(args) => index::handle_index_command(args, &settings)?,
    }

    Ok(())
}

fn load_settings(path: Option<&std::path::Path>) -> anyhow::Result<AssemblerSettings> {
    let path = path
        .map(|p| {
            p.to_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("settings path is not valid UTF-8: {}", p.display()))
        })
        .transpose()?;
    Ok(AssemblerSettings::load(path.as_deref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_arguments() {
        let cli = Cli::try_parse_from([
            "edgeplane",
            "render",
            "--objects",
            "a.yaml",
            "--objects",
            "b.yaml",
            "--intent",
            "edge/web",
            "--output-dir",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.objects.len(), 2);
                assert_eq!(args.intent, "edge/web");
                assert_eq!(args.output_dir, Some(PathBuf::from("out")));
            }
            Commands::Index(_) => panic!("expected render"),
        }
    }
}
