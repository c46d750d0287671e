//! Symbol list loading.
//!
//! Symbols come from a file (one per line) and/or a comma-separated list;
//! both are uppercased and merged. Running with no symbols at all is a
//! startup error.

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to read symbol file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no symbols provided; use --file and/or --symbols")]
    Empty,
}

/// Read symbols from a file, one per line, skipping blanks.
pub fn read_symbols_from_file(path: impl AsRef<Path>) -> Result<BTreeSet<String>, SymbolError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SymbolError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_uppercase)
        .collect())
}

/// Merge file-provided and inline comma-separated symbols.
pub fn collect_symbols(
    file: Option<&Path>,
    list: Option<&str>,
) -> Result<BTreeSet<String>, SymbolError> {
    let mut symbols = BTreeSet::new();

    if let Some(path) = file {
        symbols.extend(read_symbols_from_file(path)?);
    }
    if let Some(list) = list {
        symbols.extend(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_uppercase),
        );
    }

    if symbols.is_empty() {
        return Err(SymbolError::Empty);
    }
    Ok(symbols)
}
