//! CLI command handlers.

pub mod session;
pub mod show;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::CaseDocument;

/// Load a case document from a YAML file.
pub fn load_case(path: &Path) -> Result<CaseDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read case file {}", path.display()))?;
    let document: CaseDocument = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse case file {}", path.display()))?;
    Ok(document)
}

/// Write a case document back to its YAML file.
pub fn save_case(path: &Path, document: &CaseDocument) -> Result<()> {
    let raw = serde_yaml::to_string(document).context("Failed to serialize case document")?;
    std::fs::write(path, raw)
        .with_context(|| format!("Failed to write case file {}", path.display()))?;
    Ok(())
}
