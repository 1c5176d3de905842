//! CLI Module
//!
//! Command-line interface for the Visage expression blending engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Visage Expression Blender - layered facial expression engine
#[derive(Parser, Debug)]
#[command(name = "visage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a profile's channels, layers, and expressions
    #[command(name = "inspect")]
    Inspect {
        /// Path to the profile JSON
        path: PathBuf,
    },

    /// Apply an expression and print the blended output per tick
    #[command(name = "simulate")]
    Simulate {
        /// Path to the profile JSON
        path: PathBuf,

        /// Id of the expression to apply
        #[arg(short, long)]
        expression: String,

        /// Number of ticks to run
        #[arg(short, long, default_value_t = 60)]
        ticks: u32,

        /// Seconds per tick
        #[arg(short, long, default_value_t = 1.0 / 60.0)]
        dt: f32,
    },
}
