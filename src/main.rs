//! Visage CLI - Expression Blending Engine
//!
//! Command-line interface for the Visage expression blending engine.

use clap::Parser;
use env_logger::Env;
use log::info;

use visage::cli::{commands, Cli, Commands};
use visage::Result;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    info!("Visage Expression Blender v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Visage Expression Blender v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Simulate {
            path,
            expression,
            ticks,
            dt,
        } => commands::simulate(&path, &expression, ticks, dt),
    }
}
