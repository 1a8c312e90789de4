//! Command-line interface.
//!
//! The CLI plays the session/workflow shell role for demonstration: it
//! owns file I/O and persistence of the case document, renders proposed
//! edits for acceptance, and drives the engine's four operations.

pub mod commands;
pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::domain::models::WorkflowPhase;

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Redline - contextual updates for safety documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a case document
    Show {
        /// Path to the case document (YAML)
        file: PathBuf,
    },

    /// Run an interactive update session against a case document
    Session {
        /// Path to the case document (YAML)
        file: PathBuf,

        /// Workflow phase used as interpretation context
        #[arg(short, long, default_value = "review", value_parser = parse_phase)]
        phase: WorkflowPhase,
    },
}

/// Clap value parser for workflow phases.
fn parse_phase(s: &str) -> Result<WorkflowPhase, String> {
    WorkflowPhase::from_str(s).ok_or_else(|| {
        format!(
            "unknown phase '{s}' (expected one of: process_description, \
             hazard_identification, control_planning, action_planning, review)"
        )
    })
}

/// Print an error and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "error": format!("{err:#}") })
        );
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
    std::process::exit(1);
}
