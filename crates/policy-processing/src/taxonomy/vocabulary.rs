//! Controlled vocabulary of one taxonomy column.

use crate::error::{PolicyError, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Ordered, deduplicated set of accepted terms.
///
/// Terms are trimmed on load and blank lines are skipped. Membership is an
/// exact, case-sensitive comparison.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyVocabulary {
    terms: Vec<String>,
    index: HashSet<String>,
}

impl TaxonomyVocabulary {
    /// Build a vocabulary from raw lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::default();
        for line in lines {
            let term = line.as_ref().trim();
            if term.is_empty() || vocabulary.index.contains(term) {
                continue;
            }
            vocabulary.index.insert(term.to_string());
            vocabulary.terms.push(term.to_string());
        }
        vocabulary
    }

    /// Load a vocabulary file with one term per line.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PolicyError::VocabularyLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let vocabulary = Self::from_lines(content.lines());
        debug!("Loaded {} terms from {}", vocabulary.len(), path.display());
        Ok(vocabulary)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains(token.trim())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
