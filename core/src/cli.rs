use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::assembler::DefaultAssembler;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "wasmify")]
#[command(about = "wasmify - Compile typed TypeScript modules into Wasm components", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bundle a source file and package it with its interface as a component
    Build {
        /// TypeScript source file
        source: PathBuf,

        /// Directory for the component (default: config `out_dir`, then cwd)
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<PathBuf>,
    },

    /// Print the WIT interface synthesized for a source file
    Wit {
        /// TypeScript source file
        source: PathBuf,
    },

    /// Print the reflected declarations of a source file as JSON
    Reflect {
        /// TypeScript source file
        source: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let out_dir_override = match &cli.command {
        Commands::Build { out_dir, .. } => out_dir.clone(),
        _ => None,
    };

    // Load eagerly so config errors surface before any work starts
    let config = Config::builder()
        .config_path(cli.config.clone())
        .out_dir(out_dir_override)
        .build()
        .context("Failed to load configuration")?;

    let assembler = DefaultAssembler::from_config(&config);

    match cli.command {
        Commands::Build { source, .. } => {
            let out_dir = config.resolve_out_dir()?;
            let result = assembler
                .build(&source, Some(&out_dir))
                .await
                .with_context(|| format!("Failed to build {}", source.display()))?;

            for diagnostic in &result.diagnostics {
                eprintln!("{}", diagnostic);
            }
            println!("✓ Built world '{}' → {}", result.world, result.out_path.display());
        }

        Commands::Wit { source } => {
            let synthesized = assembler
                .interface(&source)
                .await
                .with_context(|| format!("Failed to synthesize interface for {}", source.display()))?;

            for diagnostic in &synthesized.diagnostics {
                eprintln!("{}", diagnostic);
            }
            print!("{}", synthesized.world);
        }

        Commands::Reflect { source } => {
            let reflection = assembler
                .reflector()
                .reflect(&source)
                .await
                .with_context(|| format!("Failed to reflect {}", source.display()))?;

            for diagnostic in &reflection.diagnostics {
                eprintln!("{}", diagnostic);
            }
            println!("{}", serde_json::to_string_pretty(&reflection.module)?);
        }

        Commands::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render configuration")?
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_args() {
        let cli = Cli::parse_from(["wasmify", "build", "src/math.ts", "--out-dir", "/out"]);
        match cli.command {
            Commands::Build { source, out_dir } => {
                assert_eq!(source, PathBuf::from("src/math.ts"));
                assert_eq!(out_dir, Some(PathBuf::from("/out")));
            }
            _ => panic!("Expected build command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["wasmify", "wit", "a.ts", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Wit { .. }));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
