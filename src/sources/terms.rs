//! Search-term list loading.
//!
//! Terms come from a plain text file, one per line. Surrounding
//! whitespace is trimmed; blank lines and `#` comments are ignored.

use std::path::Path;
use tracing::info;

use crate::types::TermFileError;

/// Read the search terms from a line-delimited file.
///
/// Fails if the path does not exist, cannot be read, or contains no terms.
pub fn load_search_terms(path: impl AsRef<Path>) -> Result<Vec<String>, TermFileError> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(TermFileError::NotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|source| TermFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let terms = parse_terms(&contents);
    if terms.is_empty() {
        return Err(TermFileError::Empty(path.to_path_buf()));
    }

    info!(path = %path.display(), count = terms.len(), "Search terms loaded");
    Ok(terms)
}

fn parse_terms(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
