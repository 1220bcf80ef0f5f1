use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::ModuleMetadata;

/// Reads one module dump produced by the external disassembler.
pub fn read_module(path: &Path) -> Result<ModuleMetadata> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let module: ModuleMetadata =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(module)
}

#[derive(Debug, Deserialize)]
struct StringLiteral {
    value: String,
}

/// Reads the out-of-band string-literal hint file: a JSON array of records
/// each holding one string value.
pub fn read_hint_literals(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let literals: Vec<StringLiteral> =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(literals.into_iter().map(|l| l.value).collect())
}
