//! `redline show` - render a case document.

use std::path::Path;

use anyhow::Result;
use console::style;

use super::load_case;
use crate::cli::display::{actions_table, controls_table, hazards_table, steps_table};

/// Handle the show command.
pub fn execute(file: &Path, json: bool) -> Result<()> {
    let document = load_case(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!(
        "{} ({})",
        style(&document.title).bold(),
        document.kind.as_str()
    );
    println!("\n{}", style("Steps").underlined());
    println!("{}", steps_table(&document));
    if !document.hazards.is_empty() {
        println!("\n{}", style("Hazards").underlined());
        println!("{}", hazards_table(&document));
    }
    if !document.controls.is_empty() {
        println!("\n{}", style("Controls").underlined());
        println!("{}", controls_table(&document));
    }
    if !document.actions.is_empty() {
        println!("\n{}", style("Actions").underlined());
        println!("{}", actions_table(&document));
    }
    Ok(())
}
