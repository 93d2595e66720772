use std::collections::BTreeMap;
use std::fmt;

use crate::error::CodexError;

/// Failures from one data load, keyed by the structure or tag that failed.
/// Failed entries are left out of the registry; everything else loads.
#[derive(Debug, Default)]
pub struct LoadErrors {
    errors: BTreeMap<String, Vec<CodexError>>,
}

impl LoadErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, error: impl Into<CodexError>) {
        let key = key.into();
        let error = error.into();
        log::warn!("Failed to load {}: {}", key, error);
        self.errors.entry(key).or_default().push(error);
    }

    pub fn get(&self, key: &str) -> Option<&[CodexError]> {
        self.errors.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CodexError)> {
        self.errors
            .iter()
            .flat_map(|(key, errors)| errors.iter().map(move |error| (key.as_str(), error)))
    }

    /// Number of failed entries
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One line per error, grouped by key
impl fmt::Display for LoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "no load errors");
        }
        writeln!(f, "{} entries failed to load:", self.errors.len())?;
        for (key, error) in self.iter() {
            writeln!(f, "  {}: {}", key, error)?;
        }
        Ok(())
    }
}
